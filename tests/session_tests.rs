//! Integration tests for the login/registration state machine.

use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use passvault::crypto::kdf::Argon2Params;
use passvault::errors::{PassVaultError, Result};
use passvault::session::{SessionState, VaultSession};
use passvault::store::{PlainEntry, SqliteBackend, VaultStore};
use passvault::twofactor::{totp, CodeDelivery, SecondFactorStrategy};
use tempfile::TempDir;

/// Small KDF cost profile so the test suite stays fast.
fn test_params() -> Argon2Params {
    Argon2Params {
        memory_kib: 8_192,
        iterations: 1,
        parallelism: 1,
    }
}

fn open_store(dir: &TempDir) -> VaultStore {
    let path = dir.path().join("vault.db");
    let backend = SqliteBackend::open(&path.to_string_lossy(), "local").unwrap();
    VaultStore::from_backends(Box::new(backend), None)
}

fn totp_session<'a>(store: &'a VaultStore) -> VaultSession<'a> {
    VaultSession::with_kdf_params(store, SecondFactorStrategy::Totp, test_params())
}

fn now_unix() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs()
}

/// Drive a full TOTP login to `Authenticated`.
fn authenticate(session: &mut VaultSession<'_>, email: &str, password: &str, secret: &str) {
    session.login(email, password).expect("login");
    assert_eq!(session.state(), SessionState::MasterVerified);
    assert!(session.begin_second_factor().unwrap());
    let code = totp::code_at(secret, now_unix()).unwrap();
    assert!(session.verify_second_factor(&code).unwrap());
    assert_eq!(session.state(), SessionState::Authenticated);
}

// ---------------------------------------------------------------------------
// Registration
// ---------------------------------------------------------------------------

#[test]
fn register_then_duplicate_identity_fails() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);
    let mut session = totp_session(&store);

    let registration = session.register("a@x.com", "Secret123!").unwrap();
    assert!(!registration.totp.secret.is_empty());
    assert!(registration.totp.otpauth_url.starts_with("otpauth://totp/"));
    assert_eq!(registration.backup_codes.len(), 8);

    assert!(matches!(
        session.register("a@x.com", "Another1!"),
        Err(PassVaultError::AlreadyExists(_))
    ));
}

// ---------------------------------------------------------------------------
// Login state machine
// ---------------------------------------------------------------------------

#[test]
fn login_unknown_identity_is_not_found() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);
    let mut session = totp_session(&store);

    assert!(matches!(
        session.login("nobody@x.com", "pw"),
        Err(PassVaultError::NotFound(_))
    ));
    assert_eq!(session.state(), SessionState::Unauthenticated);
}

#[test]
fn wrong_password_never_reaches_master_verified() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);
    let mut session = totp_session(&store);
    session.register("a@x.com", "Secret123!").unwrap();

    assert!(matches!(
        session.login("a@x.com", "wrong"),
        Err(PassVaultError::InvalidCredential)
    ));
    assert_eq!(session.state(), SessionState::Unauthenticated);
}

#[test]
fn failed_second_factor_allows_retry_without_password() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);
    let mut session = totp_session(&store);
    let registration = session.register("a@x.com", "Secret123!").unwrap();

    session.login("a@x.com", "Secret123!").unwrap();
    assert!(session.begin_second_factor().unwrap());

    // Non-numeric input is a plain rejection; the master password
    // stays verified.
    assert!(!session.verify_second_factor("not-a-code").unwrap());
    assert_eq!(session.state(), SessionState::MasterVerified);

    // Retry with the real code, no new login call.
    assert!(session.begin_second_factor().unwrap());
    let code = totp::code_at(&registration.totp.secret, now_unix()).unwrap();
    assert!(session.verify_second_factor(&code).unwrap());
    assert_eq!(session.state(), SessionState::Authenticated);
}

#[test]
fn abandon_drops_back_to_unauthenticated() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);
    let mut session = totp_session(&store);
    session.register("a@x.com", "Secret123!").unwrap();

    session.login("a@x.com", "Secret123!").unwrap();
    session.abandon();
    assert_eq!(session.state(), SessionState::Unauthenticated);
    assert!(matches!(
        session.verify_second_factor("123456"),
        Err(PassVaultError::NotAuthenticated)
    ));
}

#[test]
fn entry_operations_require_authentication() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);
    let mut session = totp_session(&store);
    session.register("a@x.com", "Secret123!").unwrap();

    // Unauthenticated.
    assert!(matches!(
        session.add_entry("github", "alice", "hunter2"),
        Err(PassVaultError::NotAuthenticated)
    ));

    // MasterVerified is still not enough.
    session.login("a@x.com", "Secret123!").unwrap();
    assert!(matches!(
        session.get_entry("github"),
        Err(PassVaultError::NotAuthenticated)
    ));
    assert!(matches!(
        session.list_entries(),
        Err(PassVaultError::NotAuthenticated)
    ));
}

#[test]
fn closed_session_rejects_everything() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);
    let mut session = totp_session(&store);
    session.register("a@x.com", "Secret123!").unwrap();
    session.logout();

    assert_eq!(session.state(), SessionState::Closed);
    assert!(matches!(
        session.login("a@x.com", "Secret123!"),
        Err(PassVaultError::NotAuthenticated)
    ));
    assert!(matches!(
        session.register("b@x.com", "Other123!"),
        Err(PassVaultError::NotAuthenticated)
    ));
}

// ---------------------------------------------------------------------------
// Backup codes
// ---------------------------------------------------------------------------

#[test]
fn backup_code_is_accepted_once() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);
    let mut session = totp_session(&store);
    let registration = session.register("a@x.com", "Secret123!").unwrap();
    let backup = registration.backup_codes[0].clone();

    session.login("a@x.com", "Secret123!").unwrap();
    assert!(session.begin_second_factor().unwrap());
    assert!(session.verify_second_factor(&backup).unwrap());
    assert_eq!(session.state(), SessionState::Authenticated);

    // The code was consumed; a later login cannot reuse it.
    session.login("a@x.com", "Secret123!").unwrap();
    assert!(session.begin_second_factor().unwrap());
    assert!(!session.verify_second_factor(&backup).unwrap());
    assert_eq!(session.state(), SessionState::MasterVerified);
}

// ---------------------------------------------------------------------------
// Email-code strategy
// ---------------------------------------------------------------------------

/// Test sink recording delivered codes; can be switched to fail.
struct RecordingDelivery {
    sent: Mutex<Vec<(String, String)>>,
    fail: bool,
}

impl RecordingDelivery {
    fn new(fail: bool) -> Arc<Self> {
        Arc::new(Self {
            sent: Mutex::new(Vec::new()),
            fail,
        })
    }

    fn last_code(&self) -> Option<String> {
        self.sent.lock().unwrap().last().map(|(_, c)| c.clone())
    }
}

impl CodeDelivery for RecordingDelivery {
    fn deliver(&self, address: &str, code: &str) -> Result<()> {
        if self.fail {
            return Err(PassVaultError::CommandFailed("smtp down".into()));
        }
        self.sent
            .lock()
            .unwrap()
            .push((address.to_string(), code.to_string()));
        Ok(())
    }
}

#[test]
fn email_code_login_end_to_end() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);
    let delivery = RecordingDelivery::new(false);
    let mut session = VaultSession::with_kdf_params(
        &store,
        SecondFactorStrategy::EmailCode(delivery.clone()),
        test_params(),
    );
    session.register("a@x.com", "Secret123!").unwrap();

    session.login("a@x.com", "Secret123!").unwrap();
    assert!(session.begin_second_factor().unwrap());

    let code = delivery.last_code().expect("a code was dispatched");
    assert!(session.verify_second_factor(&code).unwrap());
    assert_eq!(session.state(), SessionState::Authenticated);
}

#[test]
fn email_delivery_failure_is_a_rejection_not_an_error() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);
    let delivery = RecordingDelivery::new(true);
    let mut session = VaultSession::with_kdf_params(
        &store,
        SecondFactorStrategy::EmailCode(delivery),
        test_params(),
    );
    session.register("a@x.com", "Secret123!").unwrap();

    session.login("a@x.com", "Secret123!").unwrap();
    assert!(!session.begin_second_factor().unwrap());
    assert!(!session.verify_second_factor("123456").unwrap());
    assert_eq!(session.state(), SessionState::MasterVerified);
}

// ---------------------------------------------------------------------------
// Entry operations and the end-to-end scenario
// ---------------------------------------------------------------------------

#[test]
fn register_login_add_get_scenario() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);
    let mut session = totp_session(&store);

    let registration = session.register("a@x.com", "Secret123!").unwrap();
    assert!(matches!(
        session.register("a@x.com", "Secret123!"),
        Err(PassVaultError::AlreadyExists(_))
    ));

    authenticate(&mut session, "a@x.com", "Secret123!", &registration.totp.secret);

    session.add_entry("github", "alice", "hunter2").unwrap();
    let entry = session.get_entry("github").unwrap();
    assert_eq!(entry.username, "alice");
    assert_eq!(entry.secret, "hunter2");
}

#[test]
fn get_entry_unknown_service_is_not_found() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);
    let mut session = totp_session(&store);
    let registration = session.register("a@x.com", "Secret123!").unwrap();
    authenticate(&mut session, "a@x.com", "Secret123!", &registration.totp.secret);

    assert!(matches!(
        session.get_entry("nowhere"),
        Err(PassVaultError::NotFound(_))
    ));
}

#[test]
fn upsert_updates_in_place_and_list_shows_metadata() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);
    let mut session = totp_session(&store);
    let registration = session.register("a@x.com", "Secret123!").unwrap();
    authenticate(&mut session, "a@x.com", "Secret123!", &registration.totp.secret);

    session.add_entry("github", "alice", "old-pw").unwrap();
    session.add_entry("github", "alice2", "new-pw").unwrap();
    session.add_entry("gitlab", "bob", "x").unwrap();

    let listed = session.list_entries().unwrap();
    assert_eq!(listed.len(), 2);

    let entry = session.get_entry("github").unwrap();
    assert_eq!(entry.username, "alice2");
    assert_eq!(entry.secret, "new-pw");
}

#[test]
fn entries_survive_a_restart() {
    let dir = TempDir::new().unwrap();
    let secret;
    {
        let store = open_store(&dir);
        let mut session = totp_session(&store);
        let registration = session.register("a@x.com", "Secret123!").unwrap();
        secret = registration.totp.secret;
        authenticate(&mut session, "a@x.com", "Secret123!", &secret);
        session.add_entry("github", "alice", "hunter2").unwrap();
    }

    // A fresh process: new store, new session, same database file.
    let store = open_store(&dir);
    let mut session = totp_session(&store);
    authenticate(&mut session, "a@x.com", "Secret123!", &secret);
    assert_eq!(session.get_entry("github").unwrap().secret, "hunter2");
}

#[test]
fn replace_entries_swaps_the_whole_set() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);
    let mut session = totp_session(&store);
    let registration = session.register("a@x.com", "Secret123!").unwrap();
    authenticate(&mut session, "a@x.com", "Secret123!", &registration.totp.secret);

    session.add_entry("github", "alice", "a").unwrap();
    session
        .replace_entries(&[
            PlainEntry {
                service: "gitlab".into(),
                username: "bob".into(),
                password: "b".into(),
            },
            PlainEntry {
                service: "bitbucket".into(),
                username: "carol".into(),
                password: "c".into(),
            },
        ])
        .unwrap();

    let listed = session.list_entries().unwrap();
    assert_eq!(listed.len(), 2);
    assert!(matches!(
        session.get_entry("github"),
        Err(PassVaultError::NotFound(_))
    ));
    assert_eq!(session.get_entry("gitlab").unwrap().secret, "b");
}

#[test]
fn change_master_password_reencrypts_entries() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);
    let mut session = totp_session(&store);
    let registration = session.register("a@x.com", "Secret123!").unwrap();
    let secret = registration.totp.secret;
    authenticate(&mut session, "a@x.com", "Secret123!", &secret);

    session.add_entry("github", "alice", "hunter2").unwrap();
    session
        .change_master_password("Secret123!", "NewSecret456!")
        .unwrap();

    // The current session keeps working under the new key.
    assert_eq!(session.get_entry("github").unwrap().secret, "hunter2");

    // The old password no longer opens the vault.
    session.abandon();
    assert!(matches!(
        session.login("a@x.com", "Secret123!"),
        Err(PassVaultError::InvalidCredential)
    ));

    // The new password does, and entries still decrypt.
    authenticate(&mut session, "a@x.com", "NewSecret456!", &secret);
    assert_eq!(session.get_entry("github").unwrap().secret, "hunter2");
}

#[test]
fn change_master_password_requires_the_current_one() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);
    let mut session = totp_session(&store);
    let registration = session.register("a@x.com", "Secret123!").unwrap();
    authenticate(&mut session, "a@x.com", "Secret123!", &registration.totp.secret);

    assert!(matches!(
        session.change_master_password("wrong", "NewSecret456!"),
        Err(PassVaultError::InvalidCredential)
    ));
}
