//! Balance projection.
//!
//! An account's balance is a pure function of the ledger:
//! `balance = initial_balance + Σ income - Σ expense` over surviving entries.
//! The book applies the deltas below incrementally on every mutation;
//! [`project_balance`] recomputes from scratch and serves as the audit oracle.

use rust_decimal::Decimal;
use serde::Serialize;
use fintrack_shared::types::AccountId;

use super::types::{Transaction, TransactionType};

/// Signed effect of an entry: income adds, expense subtracts.
#[must_use]
pub fn signed_delta(transaction_type: TransactionType, amount: Decimal) -> Decimal {
    match transaction_type {
        TransactionType::Income => amount,
        TransactionType::Expense => -amount,
    }
}

/// Balance change needed when an entry's amount is amended in place.
#[must_use]
pub fn amendment_delta(transaction_type: TransactionType, old: Decimal, new: Decimal) -> Decimal {
    signed_delta(transaction_type, new) - signed_delta(transaction_type, old)
}

/// Balance change that undoes an entry.
#[must_use]
pub fn reversal_delta(entry: &Transaction) -> Decimal {
    -entry.signed_amount()
}

/// Recomputes a balance from the opening amount and the account's entries.
pub fn project_balance<'a, I>(initial_balance: Decimal, entries: I) -> Decimal
where
    I: IntoIterator<Item = &'a Transaction>,
{
    entries
        .into_iter()
        .fold(initial_balance, |balance, entry| balance + entry.signed_amount())
}

/// Difference between a stored balance and its projection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BalanceDrift {
    /// The drifting account.
    pub account_id: AccountId,
    /// Balance held on the account.
    pub recorded: Decimal,
    /// Balance implied by the ledger.
    pub projected: Decimal,
}
