//! Command Handlers module
//!
//! Orchestrators that combine storage operations with authorization
//! checks, logging and side effects.

mod commands;
mod purchase_handler;
mod review_handler;
mod wallet_handler;

#[cfg(test)]
mod tests;

pub use commands::*;
pub use purchase_handler::PurchaseHandler;
pub use review_handler::ReviewHandler;
pub use wallet_handler::{WalletHandler, DEFAULT_HISTORY_LIMIT, MAX_HISTORY_LIMIT};
