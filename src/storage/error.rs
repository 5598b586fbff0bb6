//! Storage errors

use uuid::Uuid;

use crate::domain::DomainError;

/// Unique constraint guarding one enrollment per (student, course)
pub const ENROLLMENT_UNIQUE: &str = "course_enrollments_user_course_key";

/// Unique constraint guarding one review per (student, course)
pub const REVIEW_UNIQUE: &str = "reviews_user_course_key";

/// Result alias for storage operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Storage layer errors
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Wallet not found for user {0}")]
    WalletNotFound(Uuid),

    #[error("Course not found: {0}")]
    CourseNotFound(Uuid),

    #[error("Review not found: {0}")]
    ReviewNotFound(Uuid),

    #[error("User not found: {0}")]
    UserNotFound(Uuid),

    #[error("Student is already enrolled in this course")]
    AlreadyEnrolled,

    #[error("Course already reviewed by this student")]
    AlreadyReviewed,

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

impl From<crate::domain::AmountError> for StoreError {
    fn from(err: crate::domain::AmountError) -> Self {
        Self::Domain(err.into())
    }
}

/// Name of the unique constraint a Postgres error violated, if any
pub(crate) fn unique_violation(err: &sqlx::Error) -> Option<String> {
    let db_err = err.as_database_error()?;
    if db_err.code().as_deref() != Some("23505") {
        return None;
    }
    Some(db_err.constraint().unwrap_or_default().to_string())
}

/// Whether a Postgres error is a foreign key violation
pub(crate) fn is_foreign_key_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .and_then(|e| e.code())
        .map(|code| code == "23503")
        .unwrap_or(false)
}
