//! Core business logic for Fintrack.
//!
//! This crate contains pure business logic with ZERO web or database dependencies.
//! All domain types, validation rules, and balance calculations live here.
//!
//! # Modules
//!
//! - `ledger` - Accounts, income/expense entries, transfers and summaries
//! - `auth` - Password hashing and sign-up rules

pub mod auth;
pub mod ledger;
