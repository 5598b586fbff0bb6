//! Ledger records
//!
//! Wallets, ledger entries, enrollments, reviews and the slice of the course
//! and user records the ledger needs.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Balance, RatingAggregate, Score};

/// Per-user balance record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Wallet {
    pub id: Uuid,
    pub user_id: Uuid,
    pub balance: Balance,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Wallet {
    /// A fresh zero-balance wallet for a user
    pub fn open(user_id: Uuid) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            balance: Balance::zero(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// What a ledger entry records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Purchase,
    Topup,
    Transfer,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Purchase => "purchase",
            TransactionKind::Topup => "topup",
            TransactionKind::Transfer => "transfer",
        }
    }
}

impl std::fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TransactionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "purchase" => Ok(TransactionKind::Purchase),
            "topup" => Ok(TransactionKind::Topup),
            "transfer" => Ok(TransactionKind::Transfer),
            other => Err(format!("unknown transaction kind: {other}")),
        }
    }
}

/// Ledger entry appended for every balance movement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalletTransaction {
    pub id: Uuid,
    /// None for top-ups, which originate outside the ledger
    pub from_user_id: Option<Uuid>,
    pub to_user_id: Uuid,
    pub amount: Decimal,
    pub kind: TransactionKind,
    /// Provider transaction id for gateway top-ups (unique)
    pub external_ref: Option<String>,
    pub course_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl WalletTransaction {
    pub fn new(
        from_user_id: Option<Uuid>,
        to_user_id: Uuid,
        amount: Decimal,
        kind: TransactionKind,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            from_user_id,
            to_user_id,
            amount,
            kind,
            external_ref: None,
            course_id: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_external_ref(mut self, external_ref: String) -> Self {
        self.external_ref = Some(external_ref);
        self
    }

    pub fn with_course(mut self, course_id: Uuid) -> Self {
        self.course_id = Some(course_id);
        self
    }
}

/// Result of a gateway-driven credit
#[derive(Debug, Clone, PartialEq)]
pub enum TopupOutcome {
    /// The credit was applied by this call
    Applied(WalletTransaction),
    /// The external reference was already applied; nothing changed
    Duplicate,
}

impl TopupOutcome {
    pub fn is_duplicate(&self) -> bool {
        matches!(self, TopupOutcome::Duplicate)
    }
}

/// Granted access of a student to a purchased course
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Enrollment {
    pub id: Uuid,
    pub user_id: Uuid,
    pub course_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl Enrollment {
    pub fn new(user_id: Uuid, course_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            course_id,
            created_at: Utc::now(),
        }
    }
}

/// The fields of a course the ledger reads and writes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Course {
    pub id: Uuid,
    pub title: String,
    pub instructor_id: Uuid,
    pub price: Decimal,
    pub rating: RatingAggregate,
}

/// A student's review of a course
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    pub id: Uuid,
    pub user_id: Uuid,
    pub course_id: Uuid,
    pub rating: Score,
    pub feedback: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Review {
    pub fn new(user_id: Uuid, course_id: Uuid, rating: Score, feedback: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            course_id,
            rating,
            feedback,
            created_at: now,
            updated_at: now,
        }
    }
}

/// User lookup result used for notifications
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserContact {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}

/// In-app notification record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub detail: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn new(user_id: Uuid, title: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            title: title.into(),
            detail: detail.into(),
            is_read: false,
            created_at: Utc::now(),
        }
    }
}

/// Outcome of a committed course purchase
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PurchaseReceipt {
    pub enrollment: Enrollment,
    pub instructor_id: Uuid,
    pub price: Decimal,
    /// None for free courses
    pub transaction_id: Option<Uuid>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transaction_kind_roundtrip() {
        for kind in [
            TransactionKind::Purchase,
            TransactionKind::Topup,
            TransactionKind::Transfer,
        ] {
            assert_eq!(kind.as_str().parse::<TransactionKind>(), Ok(kind));
        }
        assert!("refund".parse::<TransactionKind>().is_err());
    }

    #[test]
    fn test_transaction_kind_serialization() {
        let json = serde_json::to_string(&TransactionKind::Topup).unwrap();
        assert_eq!(json, r#""topup""#);
    }

    #[test]
    fn test_wallet_opens_empty() {
        let user_id = Uuid::new_v4();
        let wallet = Wallet::open(user_id);
        assert_eq!(wallet.user_id, user_id);
        assert_eq!(wallet.balance, Balance::zero());
    }

    #[test]
    fn test_wallet_transaction_builder() {
        let course_id = Uuid::new_v4();
        let tx = WalletTransaction::new(None, Uuid::new_v4(), Decimal::new(10, 0), TransactionKind::Topup)
            .with_external_ref("order-1".to_string())
            .with_course(course_id);
        assert_eq!(tx.external_ref.as_deref(), Some("order-1"));
        assert_eq!(tx.course_id, Some(course_id));
    }
}
