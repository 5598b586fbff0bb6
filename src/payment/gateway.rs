//! Callback handling

use std::sync::Arc;
use std::time::Duration;

use crate::cache::ExpiringStore;
use crate::domain::TopupOutcome;
use crate::storage::LedgerStore;

use super::{CallbackVerifier, PaymentCallback, PaymentError};

/// Applies verified callbacks as wallet top-ups.
///
/// Recently applied references are remembered locally so redeliveries can
/// be answered without a storage round trip. Correctness does not depend on
/// it: several instances may run at once, and the unique external reference
/// in storage decides.
#[derive(Clone)]
pub struct PaymentGateway {
    store: Arc<dyn LedgerStore>,
    verifier: Arc<dyn CallbackVerifier>,
    recent: ExpiringStore<String, ()>,
    recent_ttl: Duration,
}

impl PaymentGateway {
    pub fn new(
        store: Arc<dyn LedgerStore>,
        verifier: Arc<dyn CallbackVerifier>,
        recent: ExpiringStore<String, ()>,
        recent_ttl: Duration,
    ) -> Self {
        Self {
            store,
            verifier,
            recent,
            recent_ttl,
        }
    }

    /// Cache of applied references, shared with the purge job
    pub fn recent_refs(&self) -> &ExpiringStore<String, ()> {
        &self.recent
    }

    pub async fn handle_callback(
        &self,
        callback: &PaymentCallback,
    ) -> Result<TopupOutcome, PaymentError> {
        let topup = match self.verifier.verify(callback) {
            Ok(topup) => topup,
            Err(e) => {
                tracing::warn!(
                    provider_transaction_id = %callback.provider_transaction_id,
                    error = %e,
                    "Payment callback rejected"
                );
                return Err(e);
            }
        };

        if self.recent.get(&topup.external_ref).await.is_some() {
            tracing::debug!(
                external_ref = %topup.external_ref,
                "Callback already applied (cached)"
            );
            return Ok(TopupOutcome::Duplicate);
        }

        let outcome = self
            .store
            .topup(topup.user_id, &topup.amount, &topup.external_ref)
            .await?;

        self.recent
            .set(topup.external_ref.clone(), (), self.recent_ttl)
            .await;

        match &outcome {
            TopupOutcome::Applied(entry) => tracing::info!(
                transaction_id = %entry.id,
                user_id = %topup.user_id,
                amount = %topup.amount,
                external_ref = %topup.external_ref,
                "Top-up applied"
            ),
            TopupOutcome::Duplicate => tracing::info!(
                external_ref = %topup.external_ref,
                "Duplicate top-up ignored"
            ),
        }

        Ok(outcome)
    }
}
