//! API Routes
//!
//! HTTP endpoint definitions. Identity comes from the upstream
//! authentication service through the `X-Request-User-*` headers.

use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    routing::{get, patch, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{
    Enrollment, OperationContext, Review, TopupOutcome, TransactionKind, WalletTransaction,
};
use crate::error::AppError;
use crate::handlers::{
    BalanceResult, BuyCourseCommand, CreateReviewCommand, PurchaseHandler, PurchaseResult,
    RatingSummary, ReviewHandler, ReviewResult, TransferCommand, TransferResult,
    UpdateReviewCommand, WalletHandler,
};
use crate::payment::PaymentCallback;

use super::AppState;

// =========================================================================
// Request/Response types
// =========================================================================

#[derive(Debug, Deserialize)]
pub struct TransferRequest {
    pub to_user_id: Uuid,
    pub amount: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateReviewRequest {
    pub course_id: Uuid,
    pub rating: i32,
    #[serde(default)]
    pub feedback: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateReviewRequest {
    #[serde(default)]
    pub rating: Option<i32>,
    #[serde(default)]
    pub feedback: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    #[serde(default)]
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct HistoryEntry {
    pub id: Uuid,
    pub kind: TransactionKind,
    /// "in" when the requesting user received the funds
    pub direction: &'static str,
    pub counterparty_id: Option<Uuid>,
    pub amount: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub course_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_ref: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl HistoryEntry {
    fn for_user(user_id: Uuid, tx: WalletTransaction) -> Self {
        let incoming = tx.to_user_id == user_id;
        Self {
            id: tx.id,
            kind: tx.kind,
            direction: if incoming { "in" } else { "out" },
            counterparty_id: if incoming {
                tx.from_user_id
            } else {
                Some(tx.to_user_id)
            },
            amount: tx.amount,
            course_id: tx.course_id,
            external_ref: tx.external_ref,
            created_at: tx.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub user_id: Uuid,
    pub entries: Vec<HistoryEntry>,
}

#[derive(Debug, Serialize)]
pub struct EnrollmentsResponse {
    pub enrollments: Vec<Enrollment>,
}

#[derive(Debug, Serialize)]
pub struct CourseRatingResponse {
    pub course_id: Uuid,
    #[serde(flatten)]
    pub rating: RatingSummary,
}

#[derive(Debug, Serialize)]
pub struct ReviewsResponse {
    pub course_id: Uuid,
    pub reviews: Vec<Review>,
}

#[derive(Debug, Serialize)]
pub struct CallbackResponse {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<Uuid>,
}

// =========================================================================
// API Router
// =========================================================================

/// Routes under /api/v1
pub fn create_router() -> Router<AppState> {
    Router::new()
        // Purchases and enrollments
        .route("/courses/:course_id/purchase", post(buy_course))
        .route("/courses/:course_id/enrollments", get(course_enrollments))
        .route("/me/enrollments", get(my_enrollments))
        // Ratings and reviews
        .route("/courses/:course_id/rating", get(course_rating))
        .route("/courses/:course_id/reviews", get(course_reviews))
        .route("/reviews", post(create_review))
        .route(
            "/reviews/:review_id",
            patch(update_review).delete(delete_review),
        )
        // Wallet
        .route("/wallet", get(get_balance))
        .route("/wallet/transactions", get(get_history))
        .route("/wallet/transfers", post(transfer))
}

/// Provider-facing routes; signed, not authenticated
pub fn payment_router() -> Router<AppState> {
    Router::new().route("/callback", post(payment_callback))
}

// =========================================================================
// POST /courses/:course_id/purchase
// =========================================================================

async fn buy_course(
    State(state): State<AppState>,
    Path(course_id): Path<Uuid>,
    Extension(context): Extension<OperationContext>,
) -> Result<(StatusCode, Json<PurchaseResult>), AppError> {
    let handler = PurchaseHandler::new(state.store.clone(), state.notifier.clone());

    let result = handler
        .execute(BuyCourseCommand::new(course_id), &context)
        .await?;

    Ok((StatusCode::CREATED, Json(result)))
}

// =========================================================================
// Enrollment reads
// =========================================================================

async fn course_enrollments(
    State(state): State<AppState>,
    Path(course_id): Path<Uuid>,
) -> Result<Json<EnrollmentsResponse>, AppError> {
    // 404 for unknown courses rather than an empty list
    state.store.get_course(course_id).await?;
    let enrollments = state.store.list_by_course(course_id).await?;
    Ok(Json(EnrollmentsResponse { enrollments }))
}

async fn my_enrollments(
    State(state): State<AppState>,
    Extension(context): Extension<OperationContext>,
) -> Result<Json<EnrollmentsResponse>, AppError> {
    let user_id = context
        .request_user_id
        .ok_or_else(|| AppError::MissingHeader("X-Request-User-Id".to_string()))?;

    let enrollments = state.store.list_by_user(user_id).await?;
    Ok(Json(EnrollmentsResponse { enrollments }))
}

// =========================================================================
// Ratings and reviews
// =========================================================================

async fn course_rating(
    State(state): State<AppState>,
    Path(course_id): Path<Uuid>,
) -> Result<Json<CourseRatingResponse>, AppError> {
    let course = state.store.get_course(course_id).await?;
    Ok(Json(CourseRatingResponse {
        course_id,
        rating: course.rating.into(),
    }))
}

async fn course_reviews(
    State(state): State<AppState>,
    Path(course_id): Path<Uuid>,
) -> Result<Json<ReviewsResponse>, AppError> {
    state.store.get_course(course_id).await?;
    let reviews = state.store.list_reviews(course_id).await?;
    Ok(Json(ReviewsResponse { course_id, reviews }))
}

async fn create_review(
    State(state): State<AppState>,
    Extension(context): Extension<OperationContext>,
    Json(request): Json<CreateReviewRequest>,
) -> Result<(StatusCode, Json<ReviewResult>), AppError> {
    let handler = ReviewHandler::new(state.store.clone());

    let command = CreateReviewCommand::new(request.course_id, request.rating, request.feedback);
    let result = handler.create(command, &context).await?;

    Ok((StatusCode::CREATED, Json(result)))
}

async fn update_review(
    State(state): State<AppState>,
    Path(review_id): Path<Uuid>,
    Extension(context): Extension<OperationContext>,
    Json(request): Json<UpdateReviewRequest>,
) -> Result<Json<ReviewResult>, AppError> {
    let handler = ReviewHandler::new(state.store.clone());

    let command = UpdateReviewCommand {
        review_id,
        rating: request.rating,
        feedback: request.feedback,
    };
    Ok(Json(handler.update(command, &context).await?))
}

async fn delete_review(
    State(state): State<AppState>,
    Path(review_id): Path<Uuid>,
    Extension(context): Extension<OperationContext>,
) -> Result<Json<ReviewResult>, AppError> {
    let handler = ReviewHandler::new(state.store.clone());
    Ok(Json(handler.delete(review_id, &context).await?))
}

// =========================================================================
// Wallet
// =========================================================================

async fn get_balance(
    State(state): State<AppState>,
    Extension(context): Extension<OperationContext>,
) -> Result<Json<BalanceResult>, AppError> {
    let handler = WalletHandler::new(state.store.clone());
    Ok(Json(handler.balance(&context).await?))
}

async fn get_history(
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
    Extension(context): Extension<OperationContext>,
) -> Result<Json<HistoryResponse>, AppError> {
    let handler = WalletHandler::new(state.store.clone());
    let transactions = handler.history(query.limit, &context).await?;

    // history() has already rejected anonymous callers
    let user_id = context.request_user_id.unwrap_or_default();
    let entries = transactions
        .into_iter()
        .map(|tx| HistoryEntry::for_user(user_id, tx))
        .collect();

    Ok(Json(HistoryResponse { user_id, entries }))
}

async fn transfer(
    State(state): State<AppState>,
    Extension(context): Extension<OperationContext>,
    Json(request): Json<TransferRequest>,
) -> Result<(StatusCode, Json<TransferResult>), AppError> {
    let handler = WalletHandler::new(state.store.clone());

    let command = TransferCommand::new(request.to_user_id, request.amount);
    let result = handler.transfer(command, &context).await?;

    Ok((StatusCode::CREATED, Json(result)))
}

// =========================================================================
// POST /payments/callback
// =========================================================================

async fn payment_callback(
    State(state): State<AppState>,
    Json(callback): Json<PaymentCallback>,
) -> Result<Json<CallbackResponse>, AppError> {
    let outcome = state.payments.handle_callback(&callback).await?;

    // Duplicates answer 200 as well so the provider stops redelivering
    let response = match outcome {
        TopupOutcome::Applied(entry) => CallbackResponse {
            status: "applied",
            transaction_id: Some(entry.id),
        },
        TopupOutcome::Duplicate => CallbackResponse {
            status: "duplicate",
            transaction_id: None,
        },
    };

    Ok(Json(response))
}
