//! Best-effort side channel
//!
//! Email and in-app notifications run as detached tasks after a purchase
//! commits. Failures are logged and dropped.

mod dispatcher;
mod mailer;
mod purchase;
mod template;

#[cfg(any(test, feature = "test-support"))]
mod fake;

use async_trait::async_trait;

use crate::domain::Notification;
use crate::storage::StoreError;

pub use dispatcher::Dispatcher;
pub use mailer::{StoreNotificationSink, TracingMailer};
pub use purchase::{PurchaseNotice, PurchaseNotifier, NEW_STUDENT_TITLE};
pub use template::{new_student_detail, render_new_student_email, NewStudentEmail};

#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeMailer, FakeNotificationSink, MailCall};

/// Errors from notification delivery
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("Mail delivery failed: {0}")]
    Delivery(String),

    #[error("Recipient lookup failed: {0}")]
    Lookup(#[from] StoreError),
}

/// Email-sending collaborator
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), NotifyError>;
}

/// In-app notification collaborator
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn create(&self, notification: &Notification) -> Result<(), NotifyError>;
}
