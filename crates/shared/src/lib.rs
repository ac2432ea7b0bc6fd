//! Shared types, errors, and configuration for Fintrack.
//!
//! This crate provides common types used across all other crates:
//! - Typed IDs for owners, accounts, transactions and transfers
//! - Currency-precision helpers for `Decimal` amounts
//! - Application-wide error types
//! - Configuration management
//! - JWT claims and the token service used for owner sessions

pub mod auth;
pub mod config;
pub mod error;
pub mod jwt;
pub mod types;

pub use auth::Claims;
pub use config::{AppConfig, DatabaseConfig, LedgerConfig};
pub use error::{AppError, AppResult};
pub use jwt::{JwtConfig, JwtError, JwtService};
