//! `SeaORM` entity definitions.
//!
//! Amounts are stored as decimal text so every supported backend
//! round-trips them exactly.

pub mod accounts;
pub mod ledger_books;
pub mod transactions;
pub mod users;
