//! Domain Error Types
//!
//! Pure domain errors that don't depend on infrastructure.

use rust_decimal::Decimal;
use thiserror::Error;

/// Domain-specific errors
///
/// These errors represent business rule violations and domain invariant failures.
/// They are independent of the web/infrastructure layer.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DomainError {
    /// Insufficient balance for a debit
    #[error("Insufficient funds: required {required}, available {available}")]
    InsufficientFunds { required: Decimal, available: Decimal },

    /// Invalid amount (zero, negative, too precise or exceeds limit)
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// Review score outside 1..=5
    #[error("Invalid rating score: {0} (expected 1 to 5)")]
    InvalidScore(i32),

    /// Transfer to the same wallet
    #[error("Cannot transfer to the same wallet")]
    SelfTransfer,

    /// Instructor buying their own course
    #[error("Instructors cannot purchase their own course")]
    OwnCourse,

    /// Update or removal against an aggregate with no reviews
    #[error("Rating aggregate has no reviews")]
    EmptyAggregate,

    /// Stored sum and count cannot come from scores in 1..=5
    #[error("Inconsistent rating aggregate: sum {sum}, count {count}")]
    InconsistentAggregate { sum: i64, count: i64 },
}

impl DomainError {
    /// Create an insufficient funds error
    pub fn insufficient_funds(required: Decimal, available: Decimal) -> Self {
        Self::InsufficientFunds {
            required,
            available,
        }
    }

    /// Check if this is a client error (caller's fault)
    pub fn is_client_error(&self) -> bool {
        !matches!(
            self,
            Self::EmptyAggregate | Self::InconsistentAggregate { .. }
        )
    }
}

impl From<super::AmountError> for DomainError {
    fn from(err: super::AmountError) -> Self {
        Self::InvalidAmount(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::AmountError;

    #[test]
    fn test_insufficient_funds_error() {
        let err = DomainError::insufficient_funds(Decimal::new(40, 0), Decimal::new(10, 0));

        assert!(err.is_client_error());
        assert!(err.to_string().contains("40"));
        assert!(err.to_string().contains("10"));
    }

    #[test]
    fn test_aggregate_errors_are_not_client_errors() {
        assert!(!DomainError::EmptyAggregate.is_client_error());
        assert!(!DomainError::InconsistentAggregate { sum: 9, count: 1 }.is_client_error());
    }

    #[test]
    fn test_from_amount_error() {
        let err: DomainError = AmountError::NotPositive(Decimal::ZERO).into();
        assert!(matches!(err, DomainError::InvalidAmount(_)));
    }
}
