//! Origin verification for inbound notifications.
//!
//! The shop hands the processor `Hash(transaction_id || secret)` as
//! `CRITERION_SECRET` when a payment is initiated; the processor echoes it
//! back on the notification. Recomputing it here proves the notification was
//! issued for a payment this shop started.

use super::notification::{NotificationResult, RequiredField};
use subtle::ConstantTimeEq;

/// Keyed hash over a message. Implementations own the shared secret.
pub trait KeyedHash: Send + Sync {
    /// Hex-encoded digest of `message` combined with the secret material.
    fn digest(&self, message: &[u8]) -> String;
}

pub type KeyedHashBox = Box<dyn KeyedHash>;

/// Why a notification was refused at the gate.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum IntegrityRejection {
    MissingField(RequiredField),
    /// Carries the hash the shop expected, for the incident trail.
    Mismatch { expected: String },
}

pub struct IntegrityVerifier {
    hash: KeyedHashBox,
}

impl IntegrityVerifier {
    pub fn new(hash: KeyedHashBox) -> Self {
        Self { hash }
    }

    /// The `CRITERION_SECRET` expected for `transaction_ref`.
    pub fn expected(&self, transaction_ref: &str) -> String {
        self.hash.digest(transaction_ref.as_bytes())
    }

    pub fn verify(&self, result: &NotificationResult) -> Result<(), IntegrityRejection> {
        if let Some(field) = result.missing_required() {
            return Err(IntegrityRejection::MissingField(field));
        }

        let expected = self.expected(&result.transaction_ref);
        if constant_time_eq(expected.as_bytes(), result.supplied_secret.as_str().as_bytes()) {
            Ok(())
        } else {
            Err(IntegrityRejection::Mismatch { expected })
        }
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    // ct_eq already returns false on length mismatch
    a.ct_eq(b).into()
}
