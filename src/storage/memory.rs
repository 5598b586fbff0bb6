//! In-memory ledger store
//!
//! All records live behind a single async mutex, so every trait method runs
//! as one serialized unit. Each method computes its full result before it
//! mutates anything, so a failing call leaves the state untouched.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use crate::domain::ledger::apply_transfer;
use crate::domain::{
    Amount, Balance, Course, DomainError, Enrollment, Notification, PurchaseReceipt,
    RatingAggregate, Review, TopupOutcome, TransactionKind, UserContact, Wallet,
    WalletTransaction,
};

use super::{
    CatalogStore, EnrollmentStore, LedgerTotals, NotificationStore, PurchaseStore, ReviewChanges,
    ReviewStore, StoreError, StoreResult, WalletStore,
};

#[derive(Default)]
struct MemoryState {
    users: HashMap<Uuid, UserContact>,
    /// Keyed by user id
    wallets: HashMap<Uuid, Wallet>,
    transactions: Vec<WalletTransaction>,
    applied_refs: HashSet<String>,
    courses: HashMap<Uuid, Course>,
    enrollments: Vec<Enrollment>,
    reviews: HashMap<Uuid, Review>,
    notifications: Vec<Notification>,
}

impl MemoryState {
    fn wallet(&self, user_id: Uuid) -> StoreResult<&Wallet> {
        self.wallets
            .get(&user_id)
            .ok_or(StoreError::WalletNotFound(user_id))
    }

    fn set_balance(&mut self, user_id: Uuid, balance: Balance) {
        if let Some(wallet) = self.wallets.get_mut(&user_id) {
            wallet.balance = balance;
            wallet.updated_at = Utc::now();
        }
    }

    fn is_enrolled(&self, user_id: Uuid, course_id: Uuid) -> bool {
        self.enrollments
            .iter()
            .any(|e| e.user_id == user_id && e.course_id == course_id)
    }

    fn course_rating(&self, course_id: Uuid) -> StoreResult<RatingAggregate> {
        self.courses
            .get(&course_id)
            .map(|c| c.rating)
            .ok_or(StoreError::CourseNotFound(course_id))
    }

    fn set_course_rating(&mut self, course_id: Uuid, rating: RatingAggregate) {
        if let Some(course) = self.courses.get_mut(&course_id) {
            course.rating = rating;
        }
    }

    /// Balances after a transfer, without applying them
    fn plan_transfer(
        &self,
        from_user_id: Uuid,
        to_user_id: Uuid,
        amount: &Amount,
    ) -> StoreResult<(Balance, Balance)> {
        let from = self.wallet(from_user_id)?.balance;
        let to = self.wallet(to_user_id)?.balance;
        Ok(apply_transfer(from, to, amount)?)
    }
}

/// In-memory implementation of every storage trait
#[derive(Default)]
pub struct MemoryLedgerStore {
    state: Mutex<MemoryState>,
    fail_on_write: RwLock<bool>,
}

impl MemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent write fail with `Unavailable`
    pub async fn set_fail_on_write(&self, fail: bool) {
        *self.fail_on_write.write().await = fail;
    }

    async fn check_writable(&self) -> StoreResult<()> {
        if *self.fail_on_write.read().await {
            return Err(StoreError::Unavailable("memory store is read-only".to_string()));
        }
        Ok(())
    }

    /// Register a user together with their wallet
    pub async fn register_user(&self, user: UserContact) -> Wallet {
        let mut state = self.state.lock().await;
        let wallet = state
            .wallets
            .entry(user.id)
            .or_insert_with(|| Wallet::open(user.id))
            .clone();
        state.users.insert(user.id, user);
        wallet
    }

    /// Register a course owned by an existing instructor
    pub async fn register_course(&self, course: Course) {
        self.state.lock().await.courses.insert(course.id, course);
    }
}

#[async_trait]
impl WalletStore for MemoryLedgerStore {
    async fn create_wallet(&self, user_id: Uuid) -> StoreResult<Wallet> {
        self.check_writable().await?;
        let mut state = self.state.lock().await;
        if !state.users.contains_key(&user_id) {
            return Err(StoreError::UserNotFound(user_id));
        }
        Ok(state
            .wallets
            .entry(user_id)
            .or_insert_with(|| Wallet::open(user_id))
            .clone())
    }

    async fn get_wallet(&self, user_id: Uuid) -> StoreResult<Wallet> {
        self.state.lock().await.wallet(user_id).cloned()
    }

    async fn transfer(
        &self,
        from_user_id: Uuid,
        to_user_id: Uuid,
        amount: &Amount,
    ) -> StoreResult<WalletTransaction> {
        if from_user_id == to_user_id {
            return Err(DomainError::SelfTransfer.into());
        }
        self.check_writable().await?;
        let mut state = self.state.lock().await;

        let (from_after, to_after) = state.plan_transfer(from_user_id, to_user_id, amount)?;
        let entry = WalletTransaction::new(
            Some(from_user_id),
            to_user_id,
            amount.value(),
            TransactionKind::Transfer,
        );

        state.set_balance(from_user_id, from_after);
        state.set_balance(to_user_id, to_after);
        state.transactions.push(entry.clone());
        Ok(entry)
    }

    async fn topup(
        &self,
        user_id: Uuid,
        amount: &Amount,
        external_ref: &str,
    ) -> StoreResult<TopupOutcome> {
        self.check_writable().await?;
        let mut state = self.state.lock().await;

        if state.applied_refs.contains(external_ref) {
            return Ok(TopupOutcome::Duplicate);
        }
        let credited = state.wallet(user_id)?.balance.credit(amount)?;
        let entry = WalletTransaction::new(None, user_id, amount.value(), TransactionKind::Topup)
            .with_external_ref(external_ref.to_string());

        state.set_balance(user_id, credited);
        state.applied_refs.insert(external_ref.to_string());
        state.transactions.push(entry.clone());
        Ok(TopupOutcome::Applied(entry))
    }

    async fn list_transactions(
        &self,
        user_id: Uuid,
        limit: i64,
    ) -> StoreResult<Vec<WalletTransaction>> {
        let state = self.state.lock().await;
        state.wallet(user_id)?;
        let limit = usize::try_from(limit.max(0)).unwrap_or(usize::MAX);
        Ok(state
            .transactions
            .iter()
            .rev()
            .filter(|t| t.to_user_id == user_id || t.from_user_id == Some(user_id))
            .take(limit)
            .cloned()
            .collect())
    }

    async fn ledger_totals(&self) -> StoreResult<LedgerTotals> {
        let state = self.state.lock().await;
        let balances = state.wallets.values().map(|w| w.balance.value()).sum();
        let topups = state
            .transactions
            .iter()
            .filter(|t| t.kind == TransactionKind::Topup)
            .map(|t| t.amount)
            .sum::<Decimal>();
        Ok(LedgerTotals { balances, topups })
    }
}

#[async_trait]
impl EnrollmentStore for MemoryLedgerStore {
    async fn create_enrollment(&self, user_id: Uuid, course_id: Uuid) -> StoreResult<Enrollment> {
        self.check_writable().await?;
        let mut state = self.state.lock().await;
        if state.is_enrolled(user_id, course_id) {
            return Err(StoreError::AlreadyEnrolled);
        }
        let enrollment = Enrollment::new(user_id, course_id);
        state.enrollments.push(enrollment.clone());
        Ok(enrollment)
    }

    async fn is_enrolled(&self, user_id: Uuid, course_id: Uuid) -> StoreResult<bool> {
        Ok(self.state.lock().await.is_enrolled(user_id, course_id))
    }

    async fn list_by_course(&self, course_id: Uuid) -> StoreResult<Vec<Enrollment>> {
        let state = self.state.lock().await;
        Ok(state
            .enrollments
            .iter()
            .filter(|e| e.course_id == course_id)
            .cloned()
            .collect())
    }

    async fn list_by_user(&self, user_id: Uuid) -> StoreResult<Vec<Enrollment>> {
        let state = self.state.lock().await;
        Ok(state
            .enrollments
            .iter()
            .filter(|e| e.user_id == user_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl CatalogStore for MemoryLedgerStore {
    async fn get_course(&self, course_id: Uuid) -> StoreResult<Course> {
        self.state
            .lock()
            .await
            .courses
            .get(&course_id)
            .cloned()
            .ok_or(StoreError::CourseNotFound(course_id))
    }

    async fn get_user(&self, user_id: Uuid) -> StoreResult<UserContact> {
        self.state
            .lock()
            .await
            .users
            .get(&user_id)
            .cloned()
            .ok_or(StoreError::UserNotFound(user_id))
    }
}

#[async_trait]
impl PurchaseStore for MemoryLedgerStore {
    async fn purchase_course(
        &self,
        student_id: Uuid,
        course: &Course,
    ) -> StoreResult<PurchaseReceipt> {
        self.check_writable().await?;
        let mut state = self.state.lock().await;

        if state.is_enrolled(student_id, course.id) {
            return Err(StoreError::AlreadyEnrolled);
        }

        let transfer = if course.price.is_zero() {
            None
        } else {
            let price = Amount::new(course.price)?;
            let balances = state.plan_transfer(student_id, course.instructor_id, &price)?;
            let entry = WalletTransaction::new(
                Some(student_id),
                course.instructor_id,
                price.value(),
                TransactionKind::Purchase,
            )
            .with_course(course.id);
            Some((balances, entry))
        };

        let enrollment = Enrollment::new(student_id, course.id);
        let mut transaction_id = None;
        if let Some(((student_after, instructor_after), entry)) = transfer {
            state.set_balance(student_id, student_after);
            state.set_balance(course.instructor_id, instructor_after);
            transaction_id = Some(entry.id);
            state.transactions.push(entry);
        }
        state.enrollments.push(enrollment.clone());

        Ok(PurchaseReceipt {
            enrollment,
            instructor_id: course.instructor_id,
            price: course.price,
            transaction_id,
        })
    }
}

#[async_trait]
impl ReviewStore for MemoryLedgerStore {
    async fn get_review(&self, review_id: Uuid) -> StoreResult<Review> {
        self.state
            .lock()
            .await
            .reviews
            .get(&review_id)
            .cloned()
            .ok_or(StoreError::ReviewNotFound(review_id))
    }

    async fn create_review(&self, review: &Review) -> StoreResult<RatingAggregate> {
        self.check_writable().await?;
        let mut state = self.state.lock().await;

        let aggregate = state.course_rating(review.course_id)?.insert(review.rating);
        let duplicate = state
            .reviews
            .values()
            .any(|r| r.user_id == review.user_id && r.course_id == review.course_id);
        if duplicate {
            return Err(StoreError::AlreadyReviewed);
        }

        state.reviews.insert(review.id, review.clone());
        state.set_course_rating(review.course_id, aggregate);
        Ok(aggregate)
    }

    async fn update_review(
        &self,
        review_id: Uuid,
        changes: ReviewChanges,
    ) -> StoreResult<(Review, RatingAggregate)> {
        self.check_writable().await?;
        let mut state = self.state.lock().await;

        let mut review = state
            .reviews
            .get(&review_id)
            .cloned()
            .ok_or(StoreError::ReviewNotFound(review_id))?;
        let mut aggregate = state.course_rating(review.course_id)?;

        if let Some(rating) = changes.rating {
            aggregate = aggregate.update(review.rating, rating)?;
            review.rating = rating;
        }
        if let Some(feedback) = changes.feedback {
            review.feedback = feedback;
        }
        review.updated_at = Utc::now();

        state.reviews.insert(review_id, review.clone());
        state.set_course_rating(review.course_id, aggregate);
        Ok((review, aggregate))
    }

    async fn delete_review(&self, review_id: Uuid) -> StoreResult<RatingAggregate> {
        self.check_writable().await?;
        let mut state = self.state.lock().await;

        let review = state
            .reviews
            .get(&review_id)
            .cloned()
            .ok_or(StoreError::ReviewNotFound(review_id))?;
        let aggregate = state.course_rating(review.course_id)?.remove(review.rating)?;

        state.reviews.remove(&review_id);
        state.set_course_rating(review.course_id, aggregate);
        Ok(aggregate)
    }

    async fn list_reviews(&self, course_id: Uuid) -> StoreResult<Vec<Review>> {
        let state = self.state.lock().await;
        let mut reviews: Vec<Review> = state
            .reviews
            .values()
            .filter(|r| r.course_id == course_id)
            .cloned()
            .collect();
        reviews.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(reviews)
    }
}

#[async_trait]
impl NotificationStore for MemoryLedgerStore {
    async fn create_notification(&self, notification: &Notification) -> StoreResult<()> {
        self.check_writable().await?;
        self.state
            .lock()
            .await
            .notifications
            .push(notification.clone());
        Ok(())
    }

    async fn list_notifications(&self, user_id: Uuid) -> StoreResult<Vec<Notification>> {
        let state = self.state.lock().await;
        Ok(state
            .notifications
            .iter()
            .rev()
            .filter(|n| n.user_id == user_id)
            .cloned()
            .collect())
    }
}
