//! Postgres ledger store
//!
//! Every trait method runs in its own transaction at READ COMMITTED with
//! explicit row locks:
//! - wallets are locked with `FOR UPDATE` in ascending user id order
//! - a course row is locked before its rating aggregate is read or written
//! - uniqueness (enrollments, reviews, top-up references) is enforced by
//!   constraints and translated into specific errors

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::domain::ledger::{apply_transfer, lock_order};
use crate::domain::{
    Amount, Balance, Course, DomainError, Enrollment, Notification, PurchaseReceipt,
    RatingAggregate, Review, Score, TopupOutcome, TransactionKind, UserContact, Wallet,
    WalletTransaction,
};

use super::error::{is_foreign_key_violation, unique_violation};
use super::{
    CatalogStore, EnrollmentStore, LedgerTotals, NotificationStore, PurchaseStore, ReviewChanges,
    ReviewStore, StoreError, StoreResult, WalletStore, ENROLLMENT_UNIQUE, REVIEW_UNIQUE,
};

type WalletRow = (Uuid, Uuid, Decimal, DateTime<Utc>, DateTime<Utc>);

type TransactionRow = (
    Uuid,
    Option<Uuid>,
    Uuid,
    Decimal,
    String,
    Option<String>,
    Option<Uuid>,
    DateTime<Utc>,
);

type ReviewRow = (Uuid, Uuid, Uuid, i32, String, DateTime<Utc>, DateTime<Utc>);

fn wallet_from_row(row: WalletRow) -> StoreResult<Wallet> {
    let (id, user_id, balance, created_at, updated_at) = row;
    Ok(Wallet {
        id,
        user_id,
        balance: Balance::new(balance)?,
        created_at,
        updated_at,
    })
}

fn transaction_from_row(row: TransactionRow) -> StoreResult<WalletTransaction> {
    let (id, from_user_id, to_user_id, amount, kind, external_ref, course_id, created_at) = row;
    let kind: TransactionKind = kind
        .parse()
        .map_err(|e: String| StoreError::Unavailable(e))?;
    Ok(WalletTransaction {
        id,
        from_user_id,
        to_user_id,
        amount,
        kind,
        external_ref,
        course_id,
        created_at,
    })
}

fn review_from_row(row: ReviewRow) -> StoreResult<Review> {
    let (id, user_id, course_id, rating, feedback, created_at, updated_at) = row;
    Ok(Review {
        id,
        user_id,
        course_id,
        rating: Score::new(rating)?,
        feedback,
        created_at,
        updated_at,
    })
}

/// Postgres implementation of every storage trait
#[derive(Debug, Clone)]
pub struct PgLedgerStore {
    pool: PgPool,
}

impl PgLedgerStore {
    /// Create a new PgLedgerStore
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Insert a user and open their wallet in the same transaction
    pub async fn register_user(&self, user: &UserContact) -> StoreResult<Wallet> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO users (id, name, email)
            VALUES ($1, $2, $3)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(user.id)
        .bind(&user.name)
        .bind(&user.email)
        .execute(&mut *tx)
        .await?;

        let wallet = self.open_wallet(&mut tx, user.id).await?;
        tx.commit().await?;
        Ok(wallet)
    }

    /// Insert a course row (catalog seeding)
    pub async fn register_course(&self, course: &Course) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO courses (id, title, instructor_id, price, rating, rating_sum, rating_count)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(course.id)
        .bind(&course.title)
        .bind(course.instructor_id)
        .bind(course.price)
        .bind(course.rating.mean())
        .bind(course.rating.sum())
        .bind(course.rating.count())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn open_wallet(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        user_id: Uuid,
    ) -> StoreResult<Wallet> {
        let result = sqlx::query(
            r#"
            INSERT INTO wallets (id, user_id, balance)
            VALUES ($1, $2, 0)
            ON CONFLICT (user_id) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .execute(&mut **tx)
        .await;

        if let Err(e) = result {
            if is_foreign_key_violation(&e) {
                return Err(StoreError::UserNotFound(user_id));
            }
            return Err(e.into());
        }

        let row: WalletRow = sqlx::query_as(
            r#"
            SELECT id, user_id, balance, created_at, updated_at
            FROM wallets
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_one(&mut **tx)
        .await?;

        wallet_from_row(row)
    }

    /// Lock one wallet row and return its balance
    async fn lock_wallet(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        user_id: Uuid,
    ) -> StoreResult<Balance> {
        let balance: Option<Decimal> =
            sqlx::query_scalar("SELECT balance FROM wallets WHERE user_id = $1 FOR UPDATE")
                .bind(user_id)
                .fetch_optional(&mut **tx)
                .await?;

        let balance = balance.ok_or(StoreError::WalletNotFound(user_id))?;
        Ok(Balance::new(balance)?)
    }

    /// Lock both wallets of a transfer in deterministic order.
    /// Returns (from balance, to balance).
    async fn lock_wallet_pair(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        from_user_id: Uuid,
        to_user_id: Uuid,
    ) -> StoreResult<(Balance, Balance)> {
        let (first, second) = lock_order(from_user_id, to_user_id);
        let first_balance = self.lock_wallet(tx, first).await?;
        let second_balance = self.lock_wallet(tx, second).await?;

        if first == from_user_id {
            Ok((first_balance, second_balance))
        } else {
            Ok((second_balance, first_balance))
        }
    }

    async fn set_balance(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        user_id: Uuid,
        balance: Balance,
    ) -> StoreResult<()> {
        sqlx::query(
            r#"
            UPDATE wallets
            SET balance = $2, updated_at = NOW()
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .bind(balance.value())
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    /// Append a ledger entry. Returns false when its external reference
    /// was already recorded.
    async fn insert_transaction(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        entry: &WalletTransaction,
    ) -> StoreResult<bool> {
        let inserted: Option<Uuid> = sqlx::query_scalar(
            r#"
            INSERT INTO wallet_transactions
                (id, from_user_id, to_user_id, amount, kind, external_ref, course_id, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (external_ref) DO NOTHING
            RETURNING id
            "#,
        )
        .bind(entry.id)
        .bind(entry.from_user_id)
        .bind(entry.to_user_id)
        .bind(entry.amount)
        .bind(entry.kind.as_str())
        .bind(&entry.external_ref)
        .bind(entry.course_id)
        .bind(entry.created_at)
        .fetch_optional(&mut **tx)
        .await
        .map_err(|e| {
            if is_foreign_key_violation(&e) {
                StoreError::WalletNotFound(entry.to_user_id)
            } else {
                e.into()
            }
        })?;

        Ok(inserted.is_some())
    }

    async fn enrollment_exists(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        user_id: Uuid,
        course_id: Uuid,
    ) -> StoreResult<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM course_enrollments WHERE user_id = $1 AND course_id = $2)",
        )
        .bind(user_id)
        .bind(course_id)
        .fetch_one(&mut **tx)
        .await?;
        Ok(exists)
    }

    async fn insert_enrollment(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        enrollment: &Enrollment,
    ) -> StoreResult<()> {
        let result = sqlx::query(
            r#"
            INSERT INTO course_enrollments (id, user_id, course_id, created_at)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(enrollment.id)
        .bind(enrollment.user_id)
        .bind(enrollment.course_id)
        .bind(enrollment.created_at)
        .execute(&mut **tx)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(e) if unique_violation(&e).as_deref() == Some(ENROLLMENT_UNIQUE) => {
                Err(StoreError::AlreadyEnrolled)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Lock a course row and read its rating aggregate
    async fn lock_course_rating(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        course_id: Uuid,
    ) -> StoreResult<RatingAggregate> {
        let row: Option<(i64, i64)> = sqlx::query_as(
            "SELECT rating_sum, rating_count FROM courses WHERE id = $1 FOR UPDATE",
        )
        .bind(course_id)
        .fetch_optional(&mut **tx)
        .await?;

        let (sum, count) = row.ok_or(StoreError::CourseNotFound(course_id))?;
        Ok(RatingAggregate::from_parts(sum, count)?)
    }

    async fn save_course_rating(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        course_id: Uuid,
        rating: RatingAggregate,
    ) -> StoreResult<()> {
        sqlx::query(
            r#"
            UPDATE courses
            SET rating = $2, rating_sum = $3, rating_count = $4
            WHERE id = $1
            "#,
        )
        .bind(course_id)
        .bind(rating.mean())
        .bind(rating.sum())
        .bind(rating.count())
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    async fn review_course_id(&self, review_id: Uuid) -> StoreResult<Uuid> {
        let course_id: Option<Uuid> =
            sqlx::query_scalar("SELECT course_id FROM reviews WHERE id = $1")
                .bind(review_id)
                .fetch_optional(&self.pool)
                .await?;
        course_id.ok_or(StoreError::ReviewNotFound(review_id))
    }

    async fn lock_review(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        review_id: Uuid,
    ) -> StoreResult<Review> {
        let row: Option<ReviewRow> = sqlx::query_as(
            r#"
            SELECT id, user_id, course_id, rating, feedback, created_at, updated_at
            FROM reviews
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(review_id)
        .fetch_optional(&mut **tx)
        .await?;

        review_from_row(row.ok_or(StoreError::ReviewNotFound(review_id))?)
    }
}

#[async_trait]
impl WalletStore for PgLedgerStore {
    async fn create_wallet(&self, user_id: Uuid) -> StoreResult<Wallet> {
        let mut tx = self.pool.begin().await?;
        let wallet = self.open_wallet(&mut tx, user_id).await?;
        tx.commit().await?;
        Ok(wallet)
    }

    async fn get_wallet(&self, user_id: Uuid) -> StoreResult<Wallet> {
        let row: Option<WalletRow> = sqlx::query_as(
            r#"
            SELECT id, user_id, balance, created_at, updated_at
            FROM wallets
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        wallet_from_row(row.ok_or(StoreError::WalletNotFound(user_id))?)
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

        let mut tx = self.pool.begin().await?;

        let (from, to) = self.lock_wallet_pair(&mut tx, from_user_id, to_user_id).await?;
        let (from_after, to_after) = apply_transfer(from, to, amount)?;

        self.set_balance(&mut tx, from_user_id, from_after).await?;
        self.set_balance(&mut tx, to_user_id, to_after).await?;

        let entry = WalletTransaction::new(
            Some(from_user_id),
            to_user_id,
            amount.value(),
            TransactionKind::Transfer,
        );
        self.insert_transaction(&mut tx, &entry).await?;

        tx.commit().await?;

        tracing::debug!(
            transfer_id = %entry.id,
            from = %from_user_id,
            to = %to_user_id,
            amount = %amount,
            "Transfer committed"
        );

        Ok(entry)
    }

    async fn topup(
        &self,
        user_id: Uuid,
        amount: &Amount,
        external_ref: &str,
    ) -> StoreResult<TopupOutcome> {
        let mut tx = self.pool.begin().await?;

        // The unique reference is claimed first; a concurrent delivery of the
        // same reference blocks here until this transaction settles.
        let entry = WalletTransaction::new(None, user_id, amount.value(), TransactionKind::Topup)
            .with_external_ref(external_ref.to_string());
        if !self.insert_transaction(&mut tx, &entry).await? {
            return Ok(TopupOutcome::Duplicate);
        }

        let balance = self.lock_wallet(&mut tx, user_id).await?;
        let credited = balance.credit(amount)?;
        self.set_balance(&mut tx, user_id, credited).await?;

        tx.commit().await?;

        tracing::debug!(
            user_id = %user_id,
            external_ref,
            amount = %amount,
            "Top-up committed"
        );

        Ok(TopupOutcome::Applied(entry))
    }

    async fn list_transactions(
        &self,
        user_id: Uuid,
        limit: i64,
    ) -> StoreResult<Vec<WalletTransaction>> {
        self.get_wallet(user_id).await?;

        let rows: Vec<TransactionRow> = sqlx::query_as(
            r#"
            SELECT id, from_user_id, to_user_id, amount, kind, external_ref, course_id, created_at
            FROM wallet_transactions
            WHERE from_user_id = $1 OR to_user_id = $1
            ORDER BY created_at DESC
            LIMIT $2
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(transaction_from_row).collect()
    }

    async fn ledger_totals(&self) -> StoreResult<LedgerTotals> {
        // Both sums from one statement snapshot
        let (balances, topups): (Decimal, Decimal) = sqlx::query_as(
            r#"
            SELECT
                (SELECT COALESCE(SUM(balance), 0) FROM wallets),
                (SELECT COALESCE(SUM(amount), 0) FROM wallet_transactions WHERE kind = 'topup')
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(LedgerTotals { balances, topups })
    }
}

#[async_trait]
impl EnrollmentStore for PgLedgerStore {
    async fn create_enrollment(&self, user_id: Uuid, course_id: Uuid) -> StoreResult<Enrollment> {
        let enrollment = Enrollment::new(user_id, course_id);
        let mut tx = self.pool.begin().await?;
        self.insert_enrollment(&mut tx, &enrollment).await?;
        tx.commit().await?;
        Ok(enrollment)
    }

    async fn is_enrolled(&self, user_id: Uuid, course_id: Uuid) -> StoreResult<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM course_enrollments WHERE user_id = $1 AND course_id = $2)",
        )
        .bind(user_id)
        .bind(course_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn list_by_course(&self, course_id: Uuid) -> StoreResult<Vec<Enrollment>> {
        let rows: Vec<(Uuid, Uuid, Uuid, DateTime<Utc>)> = sqlx::query_as(
            r#"
            SELECT id, user_id, course_id, created_at
            FROM course_enrollments
            WHERE course_id = $1
            ORDER BY created_at
            "#,
        )
        .bind(course_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(id, user_id, course_id, created_at)| Enrollment {
                id,
                user_id,
                course_id,
                created_at,
            })
            .collect())
    }

    async fn list_by_user(&self, user_id: Uuid) -> StoreResult<Vec<Enrollment>> {
        let rows: Vec<(Uuid, Uuid, Uuid, DateTime<Utc>)> = sqlx::query_as(
            r#"
            SELECT id, user_id, course_id, created_at
            FROM course_enrollments
            WHERE user_id = $1
            ORDER BY created_at
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(id, user_id, course_id, created_at)| Enrollment {
                id,
                user_id,
                course_id,
                created_at,
            })
            .collect())
    }
}

#[async_trait]
impl CatalogStore for PgLedgerStore {
    async fn get_course(&self, course_id: Uuid) -> StoreResult<Course> {
        let row: Option<(Uuid, String, Uuid, Decimal, i64, i64)> = sqlx::query_as(
            r#"
            SELECT id, title, instructor_id, price, rating_sum, rating_count
            FROM courses
            WHERE id = $1
            "#,
        )
        .bind(course_id)
        .fetch_optional(&self.pool)
        .await?;

        let (id, title, instructor_id, price, rating_sum, rating_count) =
            row.ok_or(StoreError::CourseNotFound(course_id))?;

        Ok(Course {
            id,
            title,
            instructor_id,
            price,
            rating: RatingAggregate::from_parts(rating_sum, rating_count)?,
        })
    }

    async fn get_user(&self, user_id: Uuid) -> StoreResult<UserContact> {
        let row: Option<(Uuid, String, String)> =
            sqlx::query_as("SELECT id, name, email FROM users WHERE id = $1")
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await?;

        let (id, name, email) = row.ok_or(StoreError::UserNotFound(user_id))?;
        Ok(UserContact { id, name, email })
    }
}

#[async_trait]
impl PurchaseStore for PgLedgerStore {
    async fn purchase_course(
        &self,
        student_id: Uuid,
        course: &Course,
    ) -> StoreResult<PurchaseReceipt> {
        let mut tx = self.pool.begin().await?;
        let mut transaction_id = None;

        if course.price.is_zero() {
            if self.enrollment_exists(&mut tx, student_id, course.id).await? {
                return Err(StoreError::AlreadyEnrolled);
            }
        } else {
            let price = Amount::new(course.price)?;

            // Concurrent purchases by the same student queue on the student's
            // wallet lock, so the enrollment check below sees the winner.
            let (student_balance, instructor_balance) = self
                .lock_wallet_pair(&mut tx, student_id, course.instructor_id)
                .await?;

            if self.enrollment_exists(&mut tx, student_id, course.id).await? {
                return Err(StoreError::AlreadyEnrolled);
            }

            let (student_after, instructor_after) =
                apply_transfer(student_balance, instructor_balance, &price)?;
            self.set_balance(&mut tx, student_id, student_after).await?;
            self.set_balance(&mut tx, course.instructor_id, instructor_after)
                .await?;

            let entry = WalletTransaction::new(
                Some(student_id),
                course.instructor_id,
                price.value(),
                TransactionKind::Purchase,
            )
            .with_course(course.id);
            self.insert_transaction(&mut tx, &entry).await?;
            transaction_id = Some(entry.id);
        }

        // The unique constraint stays the final arbiter; a violation here
        // rolls the transfer back with the insert.
        let enrollment = Enrollment::new(student_id, course.id);
        self.insert_enrollment(&mut tx, &enrollment).await?;

        tx.commit().await?;

        Ok(PurchaseReceipt {
            enrollment,
            instructor_id: course.instructor_id,
            price: course.price,
            transaction_id,
        })
    }
}

#[async_trait]
impl ReviewStore for PgLedgerStore {
    async fn get_review(&self, review_id: Uuid) -> StoreResult<Review> {
        let row: Option<ReviewRow> = sqlx::query_as(
            r#"
            SELECT id, user_id, course_id, rating, feedback, created_at, updated_at
            FROM reviews
            WHERE id = $1
            "#,
        )
        .bind(review_id)
        .fetch_optional(&self.pool)
        .await?;

        review_from_row(row.ok_or(StoreError::ReviewNotFound(review_id))?)
    }

    async fn create_review(&self, review: &Review) -> StoreResult<RatingAggregate> {
        let mut tx = self.pool.begin().await?;

        let aggregate = self
            .lock_course_rating(&mut tx, review.course_id)
            .await?
            .insert(review.rating);

        let result = sqlx::query(
            r#"
            INSERT INTO reviews (id, user_id, course_id, rating, feedback, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(review.id)
        .bind(review.user_id)
        .bind(review.course_id)
        .bind(review.rating.value())
        .bind(&review.feedback)
        .bind(review.created_at)
        .bind(review.updated_at)
        .execute(&mut *tx)
        .await;

        match result {
            Ok(_) => {}
            Err(e) if unique_violation(&e).as_deref() == Some(REVIEW_UNIQUE) => {
                return Err(StoreError::AlreadyReviewed);
            }
            Err(e) => return Err(e.into()),
        }

        self.save_course_rating(&mut tx, review.course_id, aggregate)
            .await?;
        tx.commit().await?;

        Ok(aggregate)
    }

    async fn update_review(
        &self,
        review_id: Uuid,
        changes: ReviewChanges,
    ) -> StoreResult<(Review, RatingAggregate)> {
        // Course row before review row, the same order create_review uses
        let course_id = self.review_course_id(review_id).await?;
        let mut tx = self.pool.begin().await?;

        let mut aggregate = self.lock_course_rating(&mut tx, course_id).await?;
        let mut review = self.lock_review(&mut tx, review_id).await?;

        if let Some(rating) = changes.rating {
            aggregate = aggregate.update(review.rating, rating)?;
            review.rating = rating;
        }
        if let Some(feedback) = changes.feedback {
            review.feedback = feedback;
        }
        review.updated_at = Utc::now();

        sqlx::query(
            r#"
            UPDATE reviews
            SET rating = $2, feedback = $3, updated_at = $4
            WHERE id = $1
            "#,
        )
        .bind(review.id)
        .bind(review.rating.value())
        .bind(&review.feedback)
        .bind(review.updated_at)
        .execute(&mut *tx)
        .await?;

        self.save_course_rating(&mut tx, course_id, aggregate).await?;
        tx.commit().await?;

        Ok((review, aggregate))
    }

    async fn delete_review(&self, review_id: Uuid) -> StoreResult<RatingAggregate> {
        let course_id = self.review_course_id(review_id).await?;
        let mut tx = self.pool.begin().await?;

        let aggregate = self.lock_course_rating(&mut tx, course_id).await?;

        let deleted: Option<i32> =
            sqlx::query_scalar("DELETE FROM reviews WHERE id = $1 RETURNING rating")
                .bind(review_id)
                .fetch_optional(&mut *tx)
                .await?;
        let score = Score::new(deleted.ok_or(StoreError::ReviewNotFound(review_id))?)?;

        let aggregate = aggregate.remove(score)?;
        self.save_course_rating(&mut tx, course_id, aggregate).await?;
        tx.commit().await?;

        Ok(aggregate)
    }

    async fn list_reviews(&self, course_id: Uuid) -> StoreResult<Vec<Review>> {
        let rows: Vec<ReviewRow> = sqlx::query_as(
            r#"
            SELECT id, user_id, course_id, rating, feedback, created_at, updated_at
            FROM reviews
            WHERE course_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(course_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(review_from_row).collect()
    }
}

#[async_trait]
impl NotificationStore for PgLedgerStore {
    async fn create_notification(&self, notification: &Notification) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO notifications (id, user_id, title, detail, is_read, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(notification.id)
        .bind(notification.user_id)
        .bind(&notification.title)
        .bind(&notification.detail)
        .bind(notification.is_read)
        .bind(notification.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_notifications(&self, user_id: Uuid) -> StoreResult<Vec<Notification>> {
        let rows: Vec<(Uuid, Uuid, String, String, bool, DateTime<Utc>)> = sqlx::query_as(
            r#"
            SELECT id, user_id, title, detail, is_read, created_at
            FROM notifications
            WHERE user_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(id, user_id, title, detail, is_read, created_at)| Notification {
                id,
                user_id,
                title,
                detail,
                is_read,
                created_at,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transaction_from_row_rejects_unknown_kind() {
        let row: TransactionRow = (
            Uuid::new_v4(),
            None,
            Uuid::new_v4(),
            Decimal::new(10, 0),
            "refund".to_string(),
            None,
            None,
            Utc::now(),
        );
        assert!(transaction_from_row(row).is_err());
    }

    #[test]
    fn test_review_from_row_validates_score() {
        let now = Utc::now();
        let row: ReviewRow = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4(), 9, String::new(), now, now);
        assert!(matches!(
            review_from_row(row),
            Err(StoreError::Domain(DomainError::InvalidScore(9)))
        ));
    }

    #[test]
    fn test_wallet_from_row_rejects_negative_balance() {
        let now = Utc::now();
        let row: WalletRow = (Uuid::new_v4(), Uuid::new_v4(), Decimal::new(-1, 0), now, now);
        assert!(wallet_from_row(row).is_err());
    }
}
