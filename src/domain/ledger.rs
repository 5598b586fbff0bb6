//! Transfer rules shared by every storage backend

use uuid::Uuid;

use super::{Amount, Balance, DomainError};

/// Order in which two wallets must be locked for a transfer.
///
/// Both directions of a transfer between the same pair of users lock in the
/// same (ascending user id) order, so opposite transfers cannot deadlock.
pub fn lock_order(a: Uuid, b: Uuid) -> (Uuid, Uuid) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

/// Compute the post-transfer balances of sender and receiver.
///
/// Fails with `InsufficientFunds` when the sender cannot cover the amount;
/// in that case neither balance changes.
pub fn apply_transfer(
    from: Balance,
    to: Balance,
    amount: &Amount,
) -> Result<(Balance, Balance), DomainError> {
    if !from.is_sufficient_for(amount) {
        return Err(DomainError::insufficient_funds(amount.value(), from.value()));
    }
    let from_after = from.debit(amount)?;
    let to_after = to.credit(amount)?;
    Ok((from_after, to_after))
}
