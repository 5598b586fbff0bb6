//! Payment Gateway Adapter
//!
//! Turns signed provider callbacks into wallet top-ups. A provider
//! transaction id takes effect at most once; redelivery is answered with
//! `TopupOutcome::Duplicate`.

mod gateway;
mod verifier;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::Amount;
use crate::storage::StoreError;

pub use gateway::PaymentGateway;
pub use verifier::{midtrans_signature, MidtransVerifier, ACCEPTED_STATUSES};

/// Provider notification reporting a completed top-up.
/// Accepts both our field names and the provider's own.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentCallback {
    #[serde(alias = "order_id")]
    pub provider_transaction_id: String,
    pub user_id: Uuid,
    /// Decimal string exactly as the provider signed it
    #[serde(alias = "gross_amount")]
    pub amount: String,
    #[serde(alias = "transaction_status")]
    pub status: String,
    pub status_code: String,
    #[serde(alias = "signature_key")]
    pub signature: String,
}

/// A callback that passed verification
#[derive(Debug, Clone, PartialEq)]
pub struct VerifiedTopup {
    pub user_id: Uuid,
    pub amount: Amount,
    pub external_ref: String,
}

#[derive(Debug, thiserror::Error)]
pub enum PaymentError {
    #[error("Invalid callback: {0}")]
    InvalidCallback(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Authenticity check for provider callbacks
pub trait CallbackVerifier: Send + Sync {
    fn verify(&self, callback: &PaymentCallback) -> Result<VerifiedTopup, PaymentError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_callback_accepts_provider_field_names() {
        let user_id = Uuid::new_v4();
        let json = format!(
            r#"{{
                "order_id": "ORDER-1",
                "user_id": "{}",
                "gross_amount": "50000.00",
                "transaction_status": "settlement",
                "status_code": "200",
                "signature_key": "abc"
            }}"#,
            user_id
        );

        let callback: PaymentCallback = serde_json::from_str(&json).unwrap();
        assert_eq!(callback.provider_transaction_id, "ORDER-1");
        assert_eq!(callback.amount, "50000.00");
        assert_eq!(callback.status, "settlement");
        assert_eq!(callback.signature, "abc");
    }
}
