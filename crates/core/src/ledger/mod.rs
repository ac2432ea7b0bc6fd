//! Personal ledger logic.
//!
//! This module implements the account/transaction core:
//! - Accounts and income/expense entries
//! - Input validation
//! - The edit/delete window
//! - Balance projection and audit
//! - Per-owner book with all-or-nothing units of work
//! - Transfers as linked expense/income pairs
//! - Period and category summaries

pub mod balance;
pub mod book;
pub mod error;
pub mod summary;
pub mod transfer;
pub mod types;
pub mod validation;
pub mod window;

#[cfg(test)]
mod book_props;

pub use balance::{BalanceDrift, project_balance, signed_delta};
pub use book::{Book, ChangeSet};
pub use error::{ErrorKind, LedgerError};
pub use summary::{CategoryTotal, PeriodWindow, SummaryPeriod, TypeTotal};
pub use transfer::{LegSink, TRANSFER_IN_CATEGORY, TRANSFER_OUT_CATEGORY, TransferCoordinator};
pub use types::{
    Account, Division, EntryDraft, NewTransaction, Transaction, TransactionFilter,
    TransactionPatch, TransactionType, TransferReceipt, TransferRequest,
};
pub use window::{DEFAULT_EDIT_WINDOW_HOURS, EditWindow};
