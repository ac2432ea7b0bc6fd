//! Authentication rules.
//!
//! This module provides:
//! - Password hashing and verification with Argon2id
//! - Sign-up input validation

mod password;

pub use password::{PasswordError, hash_password, verify_password};

use thiserror::Error;

/// Shortest accepted password, in characters.
pub const MIN_PASSWORD_LEN: usize = 6;

/// Reasons a sign-up request is rejected.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignupError {
    /// Name is blank.
    #[error("Name is required")]
    MissingName,

    /// Email is blank or malformed.
    #[error("A valid email is required")]
    InvalidEmail,

    /// Password is too short.
    #[error("Password must be at least 6 characters")]
    WeakPassword,
}

/// Validated sign-up data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signup {
    /// Trimmed display name.
    pub name: String,
    /// Trimmed, lowercased email; the login key.
    pub email: String,
}

/// Validates sign-up fields and normalises name and email.
///
/// # Errors
///
/// Returns the first failing rule.
pub fn validate_signup(name: &str, email: &str, password: &str) -> Result<Signup, SignupError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(SignupError::MissingName);
    }

    let email = normalize_email(email);
    let well_formed = email
        .split_once('@')
        .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.') && !domain.starts_with('.'));
    if !well_formed {
        return Err(SignupError::InvalidEmail);
    }

    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(SignupError::WeakPassword);
    }

    Ok(Signup {
        name: name.to_string(),
        email,
    })
}

/// Emails compare case-insensitively.
#[must_use]
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
