//! course_ledger Library
//!
//! Wallet ledger and course-purchase flow for a course marketplace.
//! Re-exports modules for the server binary, the load tool and
//! integration tests.

pub mod api;
pub mod cache;
pub mod config;
pub mod db;
pub mod domain;
mod error;
pub mod handlers;
pub mod jobs;
pub mod notify;
pub mod payment;
pub mod storage;

pub use config::Config;
pub use domain::{Amount, AmountError, Balance, DomainError, OperationContext};
pub use error::{AppError, AppResult, ErrorResponse};
