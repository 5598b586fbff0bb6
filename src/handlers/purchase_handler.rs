//! Purchase Handler
//!
//! BuyCourse: the atomic charge-and-enroll core, followed by best-effort
//! instructor notifications.

use std::sync::Arc;

use uuid::Uuid;

use crate::domain::{DomainError, OperationContext};
use crate::error::AppError;
use crate::notify::{PurchaseNotice, PurchaseNotifier};
use crate::storage::LedgerStore;

use super::{BuyCourseCommand, PurchaseResult};

/// Handler for course purchases
pub struct PurchaseHandler {
    store: Arc<dyn LedgerStore>,
    notifier: PurchaseNotifier,
}

impl PurchaseHandler {
    pub fn new(store: Arc<dyn LedgerStore>, notifier: PurchaseNotifier) -> Self {
        Self { store, notifier }
    }

    /// Execute the purchase command.
    ///
    /// Errors from the atomic core are returned unchanged; a failed call
    /// leaves balances and enrollments as they were. After a timeout the
    /// outcome is unknown: check enrollment before retrying.
    pub async fn execute(
        &self,
        command: BuyCourseCommand,
        context: &OperationContext,
    ) -> Result<PurchaseResult, AppError> {
        let student_id = require_user(context)?;

        let course = self.store.get_course(command.course_id).await?;

        if course.instructor_id == student_id {
            return Err(DomainError::OwnCourse.into());
        }

        let receipt = self.store.purchase_course(student_id, &course).await?;

        tracing::info!(
            correlation_id = ?context.correlation_id,
            student_id = %student_id,
            course_id = %course.id,
            instructor_id = %course.instructor_id,
            price = %course.price,
            "Course purchased"
        );

        // Detached: the purchase has committed regardless of what happens here
        let _ = self.notifier.dispatch(PurchaseNotice {
            instructor_id: course.instructor_id,
            course_title: course.title.clone(),
            student_id,
            student_name: context.request_user_name.clone(),
            student_email: context.request_user_email.clone(),
        });

        Ok(receipt.into())
    }
}

/// Acting user from the request identity
pub(crate) fn require_user(context: &OperationContext) -> Result<Uuid, AppError> {
    context
        .request_user_id
        .ok_or_else(|| AppError::MissingHeader("X-Request-User-Id".to_string()))
}
