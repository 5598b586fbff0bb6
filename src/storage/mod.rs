//! Storage module
//!
//! One trait per ledger component. Every method is a single atomic unit:
//! it either commits all of its writes or none of them. `PgLedgerStore` is
//! the production backend; `MemoryLedgerStore` serves tests and local runs.

mod error;
pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::domain::{
    Amount, Course, Enrollment, Notification, PurchaseReceipt, RatingAggregate, Review, Score,
    TopupOutcome, UserContact, Wallet, WalletTransaction,
};

pub use error::{StoreError, StoreResult, ENROLLMENT_UNIQUE, REVIEW_UNIQUE};
pub use memory::MemoryLedgerStore;
pub use postgres::PgLedgerStore;

/// Totals used to reconcile the ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgerTotals {
    /// Sum of all wallet balances
    pub balances: Decimal,
    /// Sum of all applied gateway top-ups
    pub topups: Decimal,
}

impl LedgerTotals {
    /// Purchases and transfers only move money between wallets, so every
    /// unit held in a wallet entered through a top-up.
    pub fn is_balanced(&self) -> bool {
        self.balances == self.topups
    }
}

/// Changes requested for an existing review
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReviewChanges {
    pub rating: Option<Score>,
    pub feedback: Option<String>,
}

/// Wallet Store: owns per-user balances
#[async_trait]
pub trait WalletStore: Send + Sync {
    /// Open a zero-balance wallet; returns the existing one if present
    async fn create_wallet(&self, user_id: Uuid) -> StoreResult<Wallet>;

    async fn get_wallet(&self, user_id: Uuid) -> StoreResult<Wallet>;

    /// Move `amount` from one wallet to another as one atomic unit
    async fn transfer(
        &self,
        from_user_id: Uuid,
        to_user_id: Uuid,
        amount: &Amount,
    ) -> StoreResult<WalletTransaction>;

    /// Credit a wallet at most once per `external_ref`
    async fn topup(
        &self,
        user_id: Uuid,
        amount: &Amount,
        external_ref: &str,
    ) -> StoreResult<TopupOutcome>;

    /// Ledger entries where the user is sender or receiver, newest first
    async fn list_transactions(
        &self,
        user_id: Uuid,
        limit: i64,
    ) -> StoreResult<Vec<WalletTransaction>>;

    async fn ledger_totals(&self) -> StoreResult<LedgerTotals>;
}

/// Enrollment Store: owns the (student, course) relation
#[async_trait]
pub trait EnrollmentStore: Send + Sync {
    /// Fails with `AlreadyEnrolled` when the pair exists
    async fn create_enrollment(&self, user_id: Uuid, course_id: Uuid) -> StoreResult<Enrollment>;

    async fn is_enrolled(&self, user_id: Uuid, course_id: Uuid) -> StoreResult<bool>;

    async fn list_by_course(&self, course_id: Uuid) -> StoreResult<Vec<Enrollment>>;

    async fn list_by_user(&self, user_id: Uuid) -> StoreResult<Vec<Enrollment>>;
}

/// Read access to the course and user collaborators
#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn get_course(&self, course_id: Uuid) -> StoreResult<Course>;

    async fn get_user(&self, user_id: Uuid) -> StoreResult<UserContact>;
}

/// Atomic core of a course purchase
#[async_trait]
pub trait PurchaseStore: Send + Sync {
    /// In one atomic scope: reject an existing enrollment, move the price
    /// from student to instructor, and insert the enrollment.
    async fn purchase_course(&self, student_id: Uuid, course: &Course)
        -> StoreResult<PurchaseReceipt>;
}

/// Reviews and the course rating aggregate they drive
#[async_trait]
pub trait ReviewStore: Send + Sync {
    async fn get_review(&self, review_id: Uuid) -> StoreResult<Review>;

    /// Insert the review and fold its score into the course aggregate
    async fn create_review(&self, review: &Review) -> StoreResult<RatingAggregate>;

    /// Apply changes and adjust the aggregate for a score change
    async fn update_review(
        &self,
        review_id: Uuid,
        changes: ReviewChanges,
    ) -> StoreResult<(Review, RatingAggregate)>;

    /// Remove the review and its score from the aggregate
    async fn delete_review(&self, review_id: Uuid) -> StoreResult<RatingAggregate>;

    async fn list_reviews(&self, course_id: Uuid) -> StoreResult<Vec<Review>>;
}

/// In-app notification records
#[async_trait]
pub trait NotificationStore: Send + Sync {
    async fn create_notification(&self, notification: &Notification) -> StoreResult<()>;

    async fn list_notifications(&self, user_id: Uuid) -> StoreResult<Vec<Notification>>;
}

/// Everything the ledger needs from storage
pub trait LedgerStore:
    WalletStore + EnrollmentStore + CatalogStore + PurchaseStore + ReviewStore + NotificationStore
{
}

impl<T> LedgerStore for T where
    T: WalletStore + EnrollmentStore + CatalogStore + PurchaseStore + ReviewStore + NotificationStore
{
}
