//! Wallet Handler
//!
//! Balance, history, and peer transfers for the requesting user.

use std::sync::Arc;

use crate::domain::{Amount, OperationContext, WalletTransaction};
use crate::error::AppError;
use crate::storage::LedgerStore;

use super::purchase_handler::require_user;
use super::{BalanceResult, TransferCommand, TransferResult};

/// Default and maximum page size for transaction history
pub const DEFAULT_HISTORY_LIMIT: i64 = 50;
pub const MAX_HISTORY_LIMIT: i64 = 200;

/// Handler for wallet reads and transfers
pub struct WalletHandler {
    store: Arc<dyn LedgerStore>,
}

impl WalletHandler {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self { store }
    }

    pub async fn balance(&self, context: &OperationContext) -> Result<BalanceResult, AppError> {
        let user_id = require_user(context)?;
        let wallet = self.store.get_wallet(user_id).await?;

        Ok(BalanceResult {
            user_id,
            wallet_id: wallet.id,
            balance: wallet.balance.value(),
        })
    }

    pub async fn history(
        &self,
        limit: Option<i64>,
        context: &OperationContext,
    ) -> Result<Vec<WalletTransaction>, AppError> {
        let user_id = require_user(context)?;
        let limit = limit
            .unwrap_or(DEFAULT_HISTORY_LIMIT)
            .clamp(1, MAX_HISTORY_LIMIT);

        Ok(self.store.list_transactions(user_id, limit).await?)
    }

    pub async fn transfer(
        &self,
        command: TransferCommand,
        context: &OperationContext,
    ) -> Result<TransferResult, AppError> {
        let from_user_id = require_user(context)?;
        let amount: Amount = command.amount.parse()?;

        let entry = self
            .store
            .transfer(from_user_id, command.to_user_id, &amount)
            .await?;

        tracing::info!(
            correlation_id = ?context.correlation_id,
            transfer_id = %entry.id,
            from = %from_user_id,
            to = %command.to_user_id,
            amount = %amount,
            "Transfer completed"
        );

        Ok(TransferResult {
            transfer_id: entry.id,
            from_user_id,
            to_user_id: command.to_user_id,
            amount: amount.value(),
            status: "completed".to_string(),
        })
    }
}
