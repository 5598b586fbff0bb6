//! Command definitions
//!
//! Commands represent intentions to change the system state. The acting
//! user always comes from the `OperationContext`, never from a command.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{PurchaseReceipt, RatingAggregate, Review};

// =========================================================================
// BuyCourse
// =========================================================================

/// Command to purchase a course for the requesting student
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuyCourseCommand {
    pub course_id: Uuid,
}

impl BuyCourseCommand {
    pub fn new(course_id: Uuid) -> Self {
        Self { course_id }
    }
}

/// Result of a successful purchase
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurchaseResult {
    pub enrollment_id: Uuid,
    pub course_id: Uuid,
    pub student_id: Uuid,
    pub instructor_id: Uuid,
    pub price: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<Uuid>,
}

impl From<PurchaseReceipt> for PurchaseResult {
    fn from(receipt: PurchaseReceipt) -> Self {
        Self {
            enrollment_id: receipt.enrollment.id,
            course_id: receipt.enrollment.course_id,
            student_id: receipt.enrollment.user_id,
            instructor_id: receipt.instructor_id,
            price: receipt.price,
            transaction_id: receipt.transaction_id,
        }
    }
}

// =========================================================================
// Reviews
// =========================================================================

/// Command to review a course
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateReviewCommand {
    pub course_id: Uuid,
    /// Raw score, validated to 1..=5
    pub rating: i32,
    pub feedback: String,
}

impl CreateReviewCommand {
    pub fn new(course_id: Uuid, rating: i32, feedback: String) -> Self {
        Self {
            course_id,
            rating,
            feedback,
        }
    }
}

/// Command to change an existing review
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateReviewCommand {
    pub review_id: Uuid,
    pub rating: Option<i32>,
    pub feedback: Option<String>,
}

impl UpdateReviewCommand {
    pub fn new(review_id: Uuid) -> Self {
        Self {
            review_id,
            ..Default::default()
        }
    }

    pub fn with_rating(mut self, rating: i32) -> Self {
        self.rating = Some(rating);
        self
    }

    pub fn with_feedback(mut self, feedback: String) -> Self {
        self.feedback = Some(feedback);
        self
    }
}

/// Public view of a course rating aggregate
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RatingSummary {
    pub rating: f64,
    pub rating_count: i64,
}

impl From<RatingAggregate> for RatingSummary {
    fn from(aggregate: RatingAggregate) -> Self {
        Self {
            rating: aggregate.mean(),
            rating_count: aggregate.count(),
        }
    }
}

/// Result of a review write
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewResult {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub review: Option<Review>,
    pub course_id: Uuid,
    pub course_rating: RatingSummary,
}

// =========================================================================
// Wallet
// =========================================================================

/// Command to move funds from the requesting user to another user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferCommand {
    pub to_user_id: Uuid,
    /// Amount as a decimal string
    pub amount: String,
}

impl TransferCommand {
    pub fn new(to_user_id: Uuid, amount: String) -> Self {
        Self { to_user_id, amount }
    }
}

/// Result of a successful transfer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferResult {
    pub transfer_id: Uuid,
    pub from_user_id: Uuid,
    pub to_user_id: Uuid,
    pub amount: Decimal,
    pub status: String,
}

/// Wallet balance view
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalanceResult {
    pub user_id: Uuid,
    pub wallet_id: Uuid,
    pub balance: Decimal,
}
