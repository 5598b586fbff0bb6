//! Production collaborators

use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::Notification;
use crate::storage::NotificationStore;

use super::{Mailer, NotificationSink, NotifyError};

/// Mailer that writes outgoing mail to the log instead of an SMTP relay
#[derive(Debug, Clone)]
pub struct TracingMailer {
    from: String,
}

impl TracingMailer {
    pub fn new(from: impl Into<String>) -> Self {
        Self { from: from.into() }
    }
}

#[async_trait]
impl Mailer for TracingMailer {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), NotifyError> {
        if to.trim().is_empty() {
            return Err(NotifyError::Delivery("empty recipient".to_string()));
        }

        tracing::info!(
            from = %self.from,
            to,
            subject,
            body_len = body.len(),
            "Mail sent"
        );
        Ok(())
    }
}

/// Persists in-app notifications through the ledger store
pub struct StoreNotificationSink<S: ?Sized> {
    store: Arc<S>,
}

impl<S: ?Sized> StoreNotificationSink<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl<S> NotificationSink for StoreNotificationSink<S>
where
    S: NotificationStore + ?Sized,
{
    async fn create(&self, notification: &Notification) -> Result<(), NotifyError> {
        self.store.create_notification(notification).await?;
        Ok(())
    }
}
