//! Review Handler
//!
//! Review writes and the course rating aggregate commit together in the
//! store; this layer gates them to enrolled students and to the author.

use std::sync::Arc;

use crate::domain::{OperationContext, Review, Score};
use crate::error::AppError;
use crate::storage::{LedgerStore, ReviewChanges};

use super::purchase_handler::require_user;
use super::{CreateReviewCommand, ReviewResult, UpdateReviewCommand};

/// Handler for review create/update/delete
pub struct ReviewHandler {
    store: Arc<dyn LedgerStore>,
}

impl ReviewHandler {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self { store }
    }

    pub async fn create(
        &self,
        command: CreateReviewCommand,
        context: &OperationContext,
    ) -> Result<ReviewResult, AppError> {
        let user_id = require_user(context)?;
        let score = Score::new(command.rating)?;

        let course = self.store.get_course(command.course_id).await?;
        if !self.store.is_enrolled(user_id, course.id).await? {
            return Err(AppError::NotEnrolled);
        }

        let review = Review::new(user_id, course.id, score, command.feedback);
        let aggregate = self.store.create_review(&review).await?;

        tracing::info!(
            review_id = %review.id,
            course_id = %course.id,
            rating = score.value(),
            rating_count = aggregate.count(),
            "Review created"
        );

        Ok(ReviewResult {
            course_id: review.course_id,
            review: Some(review),
            course_rating: aggregate.into(),
        })
    }

    pub async fn update(
        &self,
        command: UpdateReviewCommand,
        context: &OperationContext,
    ) -> Result<ReviewResult, AppError> {
        let user_id = require_user(context)?;

        let rating = command.rating.map(Score::new).transpose()?;
        if rating.is_none() && command.feedback.is_none() {
            return Err(AppError::InvalidRequest(
                "Nothing to update: provide rating or feedback".to_string(),
            ));
        }

        let existing = self.store.get_review(command.review_id).await?;
        if existing.user_id != user_id {
            return Err(AppError::NotYourResource);
        }

        let (review, aggregate) = self
            .store
            .update_review(
                command.review_id,
                ReviewChanges {
                    rating,
                    feedback: command.feedback,
                },
            )
            .await?;

        tracing::info!(
            review_id = %review.id,
            course_id = %review.course_id,
            old_rating = existing.rating.value(),
            new_rating = review.rating.value(),
            "Review updated"
        );

        Ok(ReviewResult {
            course_id: review.course_id,
            review: Some(review),
            course_rating: aggregate.into(),
        })
    }

    pub async fn delete(
        &self,
        review_id: uuid::Uuid,
        context: &OperationContext,
    ) -> Result<ReviewResult, AppError> {
        let user_id = require_user(context)?;

        let existing = self.store.get_review(review_id).await?;
        if existing.user_id != user_id {
            return Err(AppError::NotYourResource);
        }

        let aggregate = self.store.delete_review(review_id).await?;

        tracing::info!(
            review_id = %review_id,
            course_id = %existing.course_id,
            rating_count = aggregate.count(),
            "Review deleted"
        );

        Ok(ReviewResult {
            review: None,
            course_id: existing.course_id,
            course_rating: aggregate.into(),
        })
    }
}
