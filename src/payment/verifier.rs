//! Midtrans-style signature verification

use sha2::{Digest, Sha512};
use subtle::ConstantTimeEq;

use crate::domain::Amount;

use super::{CallbackVerifier, PaymentCallback, PaymentError, VerifiedTopup};

/// Statuses that mean the money has arrived
pub const ACCEPTED_STATUSES: [&str; 2] = ["settlement", "capture"];

/// hex(SHA-512(order_id + status_code + gross_amount + server_key))
pub fn midtrans_signature(
    order_id: &str,
    status_code: &str,
    gross_amount: &str,
    server_key: &str,
) -> String {
    let mut hasher = Sha512::new();
    hasher.update(order_id.as_bytes());
    hasher.update(status_code.as_bytes());
    hasher.update(gross_amount.as_bytes());
    hasher.update(server_key.as_bytes());
    hex::encode(hasher.finalize())
}

/// Compare decoded digests in constant time
fn signature_matches(expected_hex: &str, given_hex: &str) -> bool {
    match (hex::decode(expected_hex), hex::decode(given_hex.trim())) {
        (Ok(expected), Ok(given)) => expected.ct_eq(&given).into(),
        _ => false,
    }
}

#[derive(Clone)]
pub struct MidtransVerifier {
    server_key: String,
}

impl MidtransVerifier {
    pub fn new(server_key: impl Into<String>) -> Self {
        Self {
            server_key: server_key.into(),
        }
    }
}

impl std::fmt::Debug for MidtransVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MidtransVerifier")
            .field("server_key", &"***MASKED***")
            .finish()
    }
}

impl CallbackVerifier for MidtransVerifier {
    fn verify(&self, callback: &PaymentCallback) -> Result<VerifiedTopup, PaymentError> {
        // An empty key makes the signature computable by anyone
        if self.server_key.is_empty() {
            return Err(PaymentError::InvalidCallback(
                "server key not configured".to_string(),
            ));
        }

        if callback.provider_transaction_id.trim().is_empty() {
            return Err(PaymentError::InvalidCallback(
                "missing provider transaction id".to_string(),
            ));
        }

        let expected = midtrans_signature(
            &callback.provider_transaction_id,
            &callback.status_code,
            &callback.amount,
            &self.server_key,
        );
        if !signature_matches(&expected, &callback.signature) {
            return Err(PaymentError::InvalidCallback(
                "signature mismatch".to_string(),
            ));
        }

        if !ACCEPTED_STATUSES.contains(&callback.status.as_str()) {
            return Err(PaymentError::InvalidCallback(format!(
                "status '{}' is not a completed payment",
                callback.status
            )));
        }

        let amount: Amount = callback
            .amount
            .parse()
            .map_err(|e| PaymentError::InvalidCallback(format!("amount: {}", e)))?;

        Ok(VerifiedTopup {
            user_id: callback.user_id,
            amount,
            external_ref: callback.provider_transaction_id.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    const KEY: &str = "SB-Mid-server-test";

    fn signed(status: &str, amount: &str) -> PaymentCallback {
        PaymentCallback {
            provider_transaction_id: "ORDER-42".to_string(),
            user_id: Uuid::new_v4(),
            amount: amount.to_string(),
            status: status.to_string(),
            status_code: "200".to_string(),
            signature: midtrans_signature("ORDER-42", "200", amount, KEY),
        }
    }

    #[test]
    fn test_signature_is_sha512_hex() {
        let sig = midtrans_signature("a", "b", "c", "d");
        assert_eq!(sig.len(), 128);

        let mut hasher = Sha512::new();
        hasher.update(b"abcd");
        assert_eq!(sig, hex::encode(hasher.finalize()));
    }

    #[test]
    fn test_verify_accepts_settlement_and_capture() {
        let verifier = MidtransVerifier::new(KEY);
        for status in ACCEPTED_STATUSES {
            let callback = signed(status, "50000.00");
            let verified = verifier.verify(&callback).unwrap();
            assert_eq!(verified.amount.value(), dec!(50000));
            assert_eq!(verified.external_ref, "ORDER-42");
            assert_eq!(verified.user_id, callback.user_id);
        }
    }

    #[test]
    fn test_verify_rejects_everything_without_server_key() {
        let verifier = MidtransVerifier::new(String::new());
        let mut callback = signed("settlement", "1000000.00");
        callback.provider_transaction_id = "FORGED-1".to_string();
        callback.signature = midtrans_signature("FORGED-1", "200", "1000000.00", "");

        match verifier.verify(&callback) {
            Err(PaymentError::InvalidCallback(msg)) => assert!(msg.contains("server key")),
            other => panic!("expected rejection, got {:?}", other),
        }
    }

    #[test]
    fn test_verify_accepts_uppercase_hex_signature() {
        let verifier = MidtransVerifier::new(KEY);
        let mut callback = signed("settlement", "10.00");
        callback.signature = callback.signature.to_uppercase();
        assert!(verifier.verify(&callback).is_ok());
    }

    #[test]
    fn test_signature_matches() {
        let sig = midtrans_signature("a", "b", "c", "d");
        assert!(signature_matches(&sig, &sig));
        assert!(signature_matches(&sig, &format!(" {} ", sig)));
        assert!(!signature_matches(&sig, &sig[..126]));
        assert!(!signature_matches(&sig, "not-hex"));
        assert!(!signature_matches(&sig, ""));
    }

    #[test]
    fn test_verify_rejects_bad_signature() {
        let verifier = MidtransVerifier::new("other-key");
        let result = verifier.verify(&signed("settlement", "50000.00"));
        assert!(matches!(result, Err(PaymentError::InvalidCallback(_))));
    }

    #[test]
    fn test_verify_rejects_tampered_amount() {
        let verifier = MidtransVerifier::new(KEY);
        let mut callback = signed("settlement", "50000.00");
        callback.amount = "90000.00".to_string();
        assert!(verifier.verify(&callback).is_err());
    }

    #[test]
    fn test_verify_rejects_pending_status() {
        let verifier = MidtransVerifier::new(KEY);
        let result = verifier.verify(&signed("pending", "50000.00"));
        assert!(matches!(result, Err(PaymentError::InvalidCallback(_))));
    }

    #[test]
    fn test_verify_rejects_non_positive_amount() {
        let verifier = MidtransVerifier::new(KEY);
        assert!(verifier.verify(&signed("settlement", "0.00")).is_err());
        assert!(verifier.verify(&signed("settlement", "abc")).is_err());
    }

    #[test]
    fn test_debug_masks_server_key() {
        let debug = format!("{:?}", MidtransVerifier::new(KEY));
        assert!(!debug.contains(KEY));
    }
}
