//! Strong random password generation.
//!
//! Guarantees at least one character from each of four classes, fills
//! the rest uniformly from the combined alphabet, then shuffles so the
//! guaranteed characters do not sit in fixed positions.  `rand::rng()`
//! is a CSPRNG reseeded from the operating system.

use rand::seq::SliceRandom;
use rand::Rng;

/// Minimum generated password length; shorter requests are clamped up.
pub const MIN_PASSWORD_LEN: usize = 8;

const UPPER: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const LOWER: &[u8] = b"abcdefghijklmnopqrstuvwxyz";
const DIGITS: &[u8] = b"0123456789";
const SYMBOLS: &[u8] = b"!@#$%^&*()_+-=[]{}|;:,.<>?";

/// Generate a random password of `length` characters (minimum 8).
pub fn generate_strong_password(length: usize) -> String {
    let length = length.max(MIN_PASSWORD_LEN);
    let mut rng = rand::rng();

    let combined: Vec<u8> = [UPPER, LOWER, DIGITS, SYMBOLS].concat();

    let mut password = Vec::with_capacity(length);

    // One guaranteed character from each class.
    for class in [UPPER, LOWER, DIGITS, SYMBOLS] {
        password.push(class[rng.random_range(0..class.len())]);
    }

    // Fill the remainder uniformly from the combined alphabet.
    for _ in password.len()..length {
        password.push(combined[rng.random_range(0..combined.len())]);
    }

    password.shuffle(&mut rng);

    // The alphabet is pure ASCII, so byte-to-char is lossless.
    password.into_iter().map(char::from).collect()
}
