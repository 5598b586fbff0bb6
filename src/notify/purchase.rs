//! Instructor notifications after a committed purchase

use std::sync::Arc;

use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::domain::Notification;
use crate::storage::LedgerStore;

use super::template::{new_student_detail, render_new_student_email, NewStudentEmail};
use super::{Dispatcher, Mailer, NotificationSink, NotifyError};

/// Subject of the email and title of the in-app notification
pub const NEW_STUDENT_TITLE: &str = "You have a new student!";

/// What the side effects need to know about a purchase
#[derive(Debug, Clone)]
pub struct PurchaseNotice {
    pub instructor_id: Uuid,
    pub course_title: String,
    pub student_id: Uuid,
    /// Taken from the request identity when present, looked up otherwise
    pub student_name: Option<String>,
    pub student_email: Option<String>,
}

struct Student {
    name: String,
    email: String,
}

/// Sends the instructor email and creates the in-app notification
#[derive(Clone)]
pub struct PurchaseNotifier {
    store: Arc<dyn LedgerStore>,
    mailer: Arc<dyn Mailer>,
    sink: Arc<dyn NotificationSink>,
    dispatcher: Dispatcher,
}

impl PurchaseNotifier {
    pub fn new(
        store: Arc<dyn LedgerStore>,
        mailer: Arc<dyn Mailer>,
        sink: Arc<dyn NotificationSink>,
    ) -> Self {
        Self {
            store,
            mailer,
            sink,
            dispatcher: Dispatcher::new(),
        }
    }

    /// Schedule both side effects and return immediately
    pub fn dispatch(&self, notice: PurchaseNotice) -> [JoinHandle<()>; 2] {
        let email = {
            let notifier = self.clone();
            let notice = notice.clone();
            self.dispatcher
                .submit("instructor_email", async move {
                    notifier.send_email(&notice).await
                })
        };

        let in_app = {
            let notifier = self.clone();
            self.dispatcher
                .submit("instructor_notification", async move {
                    notifier.create_notification(&notice).await
                })
        };

        [email, in_app]
    }

    async fn student(&self, notice: &PurchaseNotice) -> Result<Student, NotifyError> {
        if let (Some(name), Some(email)) = (&notice.student_name, &notice.student_email) {
            return Ok(Student {
                name: name.clone(),
                email: email.clone(),
            });
        }

        let contact = self.store.get_user(notice.student_id).await?;
        Ok(Student {
            name: notice.student_name.clone().unwrap_or(contact.name),
            email: notice.student_email.clone().unwrap_or(contact.email),
        })
    }

    async fn send_email(&self, notice: &PurchaseNotice) -> Result<(), NotifyError> {
        let instructor = self.store.get_user(notice.instructor_id).await?;
        let student = self.student(notice).await?;

        let body = render_new_student_email(&NewStudentEmail {
            instructor_name: &instructor.name,
            course_title: &notice.course_title,
            student_name: &student.name,
            student_email: &student.email,
        });

        self.mailer
            .send(&instructor.email, NEW_STUDENT_TITLE, &body)
            .await
    }

    async fn create_notification(&self, notice: &PurchaseNotice) -> Result<(), NotifyError> {
        let student = self.student(notice).await?;
        let notification = Notification::new(
            notice.instructor_id,
            NEW_STUDENT_TITLE,
            new_student_detail(&notice.course_title, &student.name),
        );
        self.sink.create(&notification).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::UserContact;
    use crate::notify::{FakeMailer, FakeNotificationSink};
    use crate::storage::MemoryLedgerStore;

    fn contact(name: &str) -> UserContact {
        UserContact {
            id: Uuid::new_v4(),
            name: name.to_string(),
            email: format!("{}@example.com", name.to_lowercase()),
        }
    }

    async fn setup() -> (PurchaseNotifier, FakeMailer, FakeNotificationSink, UserContact, UserContact) {
        let store = Arc::new(MemoryLedgerStore::new());
        let instructor = contact("Ina");
        let student = contact("Sam");
        store.register_user(instructor.clone()).await;
        store.register_user(student.clone()).await;

        let mailer = FakeMailer::new();
        let sink = FakeNotificationSink::new();
        let notifier = PurchaseNotifier::new(
            store,
            Arc::new(mailer.clone()),
            Arc::new(sink.clone()),
        );
        (notifier, mailer, sink, instructor, student)
    }

    #[tokio::test]
    async fn test_dispatch_sends_email_and_notification() {
        let (notifier, mailer, sink, instructor, student) = setup().await;

        let handles = notifier.dispatch(PurchaseNotice {
            instructor_id: instructor.id,
            course_title: "Rust 101".to_string(),
            student_id: student.id,
            student_name: Some("Sam".to_string()),
            student_email: Some("sam@example.com".to_string()),
        });
        for handle in handles {
            handle.await.unwrap();
        }

        let mails = mailer.calls();
        assert_eq!(mails.len(), 1);
        assert_eq!(mails[0].to, "ina@example.com");
        assert_eq!(mails[0].subject, NEW_STUDENT_TITLE);
        assert!(mails[0].body.contains("Rust 101"));

        let notes = sink.notifications();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].user_id, instructor.id);
        assert_eq!(notes[0].detail, "Rust 101 has been purchased by Sam");
    }

    #[tokio::test]
    async fn test_student_looked_up_when_identity_lacks_profile() {
        let (notifier, mailer, _sink, instructor, student) = setup().await;

        let handles = notifier.dispatch(PurchaseNotice {
            instructor_id: instructor.id,
            course_title: "Rust 101".to_string(),
            student_id: student.id,
            student_name: None,
            student_email: None,
        });
        for handle in handles {
            handle.await.unwrap();
        }

        assert!(mailer.calls()[0].body.contains("Sam (sam@example.com)"));
    }

    #[tokio::test]
    async fn test_mail_failure_does_not_block_notification() {
        let (notifier, mailer, sink, instructor, student) = setup().await;
        mailer.set_fail(true);

        let handles = notifier.dispatch(PurchaseNotice {
            instructor_id: instructor.id,
            course_title: "Rust 101".to_string(),
            student_id: student.id,
            student_name: Some("Sam".to_string()),
            student_email: Some("sam@example.com".to_string()),
        });
        for handle in handles {
            handle.await.unwrap();
        }

        assert!(mailer.calls().is_empty());
        assert_eq!(sink.notifications().len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_instructor_skips_email() {
        let (notifier, mailer, sink, _instructor, student) = setup().await;

        let handles = notifier.dispatch(PurchaseNotice {
            instructor_id: Uuid::new_v4(),
            course_title: "Rust 101".to_string(),
            student_id: student.id,
            student_name: Some("Sam".to_string()),
            student_email: Some("sam@example.com".to_string()),
        });
        for handle in handles {
            handle.await.unwrap();
        }

        assert!(mailer.calls().is_empty());
        assert_eq!(sink.notifications().len(), 1);
    }
}
