//! Repository abstractions for data access.
//!
//! Repositories are the storage boundary: callers see owner-scoped async
//! operations and typed errors, never the rows and locks behind them.

pub mod book_store;
pub mod ledger;
pub mod user;

pub use book_store::StoreError;
pub use ledger::{InvalidTimezone, LedgerRepository, LedgerSettings};
pub use user::{UserError, UserRecord, UserRepository};
