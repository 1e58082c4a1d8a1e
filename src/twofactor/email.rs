//! Delivered-code second factor.
//!
//! Every attempt issues a fresh 6-digit code, hands it to an external
//! delivery collaborator, and compares the user's typed value exactly
//! once.  The code is single-use: it is discarded after the comparison
//! whatever the outcome, so a retry always starts with `begin`.

use std::sync::Arc;

use rand::Rng;
use subtle::ConstantTimeEq;
use tracing::warn;

use crate::errors::Result;

use super::SecondFactor;

/// External out-of-band delivery sink (SMTP relay, SMS gateway, ...).
///
/// Delivery is a blocking call: it completes or fails before the
/// verification attempt proceeds.
pub trait CodeDelivery: Send + Sync {
    fn deliver(&self, address: &str, code: &str) -> Result<()>;
}

/// One email-code verification cycle: Idle until `begin` issues a code,
/// then exactly one comparison in `verify`.
pub struct EmailCodeFactor {
    address: String,
    delivery: Arc<dyn CodeDelivery>,
    issued: Option<String>,
}

impl EmailCodeFactor {
    pub fn new(address: String, delivery: Arc<dyn CodeDelivery>) -> Self {
        Self {
            address,
            delivery,
            issued: None,
        }
    }
}

impl SecondFactor for EmailCodeFactor {
    /// Generate and dispatch a fresh code.  A delivery failure leaves
    /// no code issued, so the attempt will verify as false rather than
    /// surfacing an error.
    fn begin(&mut self) -> bool {
        let code = format!("{:06}", rand::rng().random_range(0..1_000_000u32));
        match self.delivery.deliver(&self.address, &code) {
            Ok(()) => {
                self.issued = Some(code);
                true
            }
            Err(e) => {
                warn!(address = %self.address, error = %e, "second-factor code delivery failed");
                self.issued = None;
                false
            }
        }
    }

    fn verify(&mut self, submitted: &str) -> bool {
        // Consume the code up front: one comparison per issued code.
        let Some(expected) = self.issued.take() else {
            return false;
        };
        bool::from(submitted.trim().as_bytes().ct_eq(expected.as_bytes()))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::errors::PassVaultError;

    /// Test sink that records delivered codes and can be switched to
    /// fail on demand.
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
    fn accepts_the_delivered_code_once() {
        let delivery = RecordingDelivery::new(false);
        let mut factor = EmailCodeFactor::new("a@x.com".into(), delivery.clone());

        assert!(factor.begin());
        let code = delivery.last_code().unwrap();
        assert!(factor.verify(&code));

        // The code was consumed; replaying it fails.
        assert!(!factor.verify(&code));
    }

    #[test]
    fn wrong_code_discards_the_issued_code() {
        let delivery = RecordingDelivery::new(false);
        let mut factor = EmailCodeFactor::new("a@x.com".into(), delivery.clone());

        assert!(factor.begin());
        let code = delivery.last_code().unwrap();
        assert!(!factor.verify("000000") || code == "000000");

        // Even the right code fails now: no retry reuses the same code.
        if code != "000000" {
            assert!(!factor.verify(&code));
        }
    }

    #[test]
    fn delivery_failure_is_a_rejection_not_a_crash() {
        let delivery = RecordingDelivery::new(true);
        let mut factor = EmailCodeFactor::new("a@x.com".into(), delivery);

        assert!(!factor.begin());
        assert!(!factor.verify("123456"));
    }

    #[test]
    fn each_cycle_issues_a_fresh_code() {
        let delivery = RecordingDelivery::new(false);
        let mut factor = EmailCodeFactor::new("a@x.com".into(), delivery.clone());

        assert!(factor.begin());
        let first = delivery.last_code().unwrap();
        assert!(!factor.verify("999999") || first == "999999");

        assert!(factor.begin());
        let second = delivery.last_code().unwrap();
        assert!(factor.verify(&second));
        let _ = first;
    }
}
