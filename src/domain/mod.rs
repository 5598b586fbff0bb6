//! Domain module
//!
//! Core domain types and business rules.

pub mod amount;
pub mod context;
pub mod error;
pub mod ledger;
pub mod models;
pub mod rating;

pub use amount::{Amount, AmountError, Balance};
pub use context::OperationContext;
pub use error::DomainError;
pub use models::{
    Course, Enrollment, Notification, PurchaseReceipt, Review, TopupOutcome, TransactionKind,
    UserContact, Wallet, WalletTransaction,
};
pub use rating::{RatingAggregate, Score};
