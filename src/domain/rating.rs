//! Course rating aggregate
//!
//! Keeps the (mean, count) pair for a course's reviews. The aggregate stores
//! an exact integer running sum next to the count and derives the mean on
//! read, so repeated updates never accumulate floating-point drift. Each
//! operation is algebraically the incremental-mean formula:
//!
//! - insert: `mean' = (mean * n + x) / (n + 1)`
//! - update: `mean' = mean + (new - old) / n`
//! - remove: `mean' = (mean * n - x) / (n - 1)`, or `(0, 0)` when `n == 1`

use serde::{Deserialize, Serialize};

use super::DomainError;

/// Lowest accepted review score
pub const MIN_SCORE: i32 = 1;

/// Highest accepted review score
pub const MAX_SCORE: i32 = 5;

/// A validated review score (1..=5)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub struct Score(i32);

impl Score {
    pub fn new(value: i32) -> Result<Self, DomainError> {
        if !(MIN_SCORE..=MAX_SCORE).contains(&value) {
            return Err(DomainError::InvalidScore(value));
        }
        Ok(Self(value))
    }

    pub fn value(&self) -> i32 {
        self.0
    }
}

impl TryFrom<i32> for Score {
    type Error = DomainError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        Score::new(value)
    }
}

impl From<Score> for i32 {
    fn from(score: Score) -> Self {
        score.0
    }
}

/// Running rating aggregate for one course.
///
/// # Invariants
/// - `count >= 0`
/// - `count == 0` implies `sum == 0`
/// - `count <= sum <= 5 * count` since every score is in 1..=5
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatingAggregate {
    sum: i64,
    count: i64,
}

impl RatingAggregate {
    /// Aggregate of a course with no reviews
    pub fn empty() -> Self {
        Self::default()
    }

    /// Rebuild an aggregate from persisted columns, checking its invariants
    pub fn from_parts(sum: i64, count: i64) -> Result<Self, DomainError> {
        let consistent = count >= 0
            && sum >= count * i64::from(MIN_SCORE)
            && sum <= count * i64::from(MAX_SCORE);
        if !consistent {
            return Err(DomainError::InconsistentAggregate { sum, count });
        }
        Ok(Self { sum, count })
    }

    pub fn sum(&self) -> i64 {
        self.sum
    }

    pub fn count(&self) -> i64 {
        self.count
    }

    /// Mean score, 0 when there are no reviews
    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum as f64 / self.count as f64
        }
    }

    /// Account for a newly created review
    pub fn insert(self, score: Score) -> Self {
        Self {
            sum: self.sum + i64::from(score.value()),
            count: self.count + 1,
        }
    }

    /// Replace an existing review's score; the count is unchanged
    pub fn update(self, old: Score, new: Score) -> Result<Self, DomainError> {
        if self.count == 0 {
            return Err(DomainError::EmptyAggregate);
        }
        Self::from_parts(
            self.sum + i64::from(new.value()) - i64::from(old.value()),
            self.count,
        )
    }

    /// Account for a deleted review
    pub fn remove(self, score: Score) -> Result<Self, DomainError> {
        match self.count {
            0 => Err(DomainError::EmptyAggregate),
            1 => Ok(Self::empty()),
            _ => Self::from_parts(self.sum - i64::from(score.value()), self.count - 1),
        }
    }
}
