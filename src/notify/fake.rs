//! Recording collaborators for tests

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::domain::Notification;

use super::{Mailer, NotificationSink, NotifyError};

/// Recorded mail
#[derive(Debug, Clone)]
pub struct MailCall {
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Fake mailer that records what it sends
#[derive(Clone, Default)]
pub struct FakeMailer {
    calls: Arc<Mutex<Vec<MailCall>>>,
    fail: Arc<AtomicBool>,
}

impl FakeMailer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every later send fail without recording
    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<MailCall> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl Mailer for FakeMailer {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), NotifyError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(NotifyError::Delivery("fake mailer failure".to_string()));
        }

        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(MailCall {
                to: to.to_string(),
                subject: subject.to_string(),
                body: body.to_string(),
            });
        Ok(())
    }
}

/// Fake notification sink that records what it receives
#[derive(Clone, Default)]
pub struct FakeNotificationSink {
    notifications: Arc<Mutex<Vec<Notification>>>,
}

impl FakeNotificationSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.notifications
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[async_trait]
impl NotificationSink for FakeNotificationSink {
    async fn create(&self, notification: &Notification) -> Result<(), NotifyError> {
        self.notifications
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(notification.clone());
        Ok(())
    }
}
