//! Ledger error types for validation, lookup, edit-window and concurrency errors.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use thiserror::Error;
use fintrack_shared::types::{AccountId, TransactionId};

/// Broad error classes, as reported to API callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad or missing input; user-correctable.
    Validation,
    /// Unknown or foreign account/transaction.
    NotFound,
    /// Mutation attempted after the edit window closed; never retryable.
    EditWindowExpired,
    /// Transient contention; the caller may retry.
    Conflict,
    /// Invariant breach or internal signal.
    Internal,
}

/// Errors that can occur during ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    // ========== Validation Errors ==========
    /// Account name is empty.
    #[error("Account name cannot be empty")]
    EmptyAccountName,

    /// Account name is longer than the accepted maximum.
    #[error("Account name is {len} characters long, at most 100 are allowed")]
    AccountNameTooLong {
        /// Length of the trimmed name, in characters.
        len: usize,
    },

    /// Another account of the same owner already has this name.
    #[error("An account named '{0}' already exists")]
    DuplicateAccountName(String),

    /// Category is empty.
    #[error("Category cannot be empty")]
    EmptyCategory,

    /// Amount is zero or negative.
    #[error("Amount must be greater than zero, got {0}")]
    NonPositiveAmount(Decimal),

    /// Amount has sub-cent precision.
    #[error("Amount {0} has more than 2 decimal places")]
    ExcessPrecision(Decimal),

    /// Unknown transaction type.
    #[error("Invalid transaction type '{0}', expected income or expense")]
    InvalidTransactionType(String),

    /// Unknown division.
    #[error("Invalid division '{0}', expected Personal or Office")]
    InvalidDivision(String),

    /// Unknown summary period.
    #[error("Invalid period '{0}', expected weekly, monthly or yearly")]
    InvalidPeriod(String),

    /// Transfer source and destination are the same account.
    #[error("Cannot transfer from an account to itself")]
    SameAccountTransfer,

    /// A transfer names an account the owner does not have.
    #[error("Transfer account '{0}' does not exist")]
    UnknownTransferAccount(String),

    // ========== Lookup Errors ==========
    /// Account not found for this owner.
    #[error("Account not found: {0}")]
    AccountNotFound(AccountId),

    /// No account of this owner matches the reference.
    #[error("Account not found: {0}")]
    AccountReferenceNotFound(String),

    /// Transaction not found for this owner.
    #[error("Transaction not found: {0}")]
    TransactionNotFound(TransactionId),

    // ========== Edit Window Errors ==========
    /// The transaction is older than the edit window.
    #[error("Transaction {transaction_id} can no longer be changed: edit window closed at {locked_at}")]
    EditWindowExpired {
        /// The locked transaction.
        transaction_id: TransactionId,
        /// Moment the window closed.
        locked_at: DateTime<Utc>,
    },

    // ========== Concurrency Errors ==========
    /// Could not acquire the owner's ledger in time.
    #[error("Concurrent modification detected, please retry")]
    ConcurrentModification,

    /// Second leg of a transfer failed. Resolved to a full rollback before
    /// leaving the book; see [`LedgerError::resolved`].
    #[error("Transfer leg failed: {0}")]
    TransferPartialFailure(Box<LedgerError>),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl LedgerError {
    /// Returns the broad class of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::EmptyAccountName
            | Self::AccountNameTooLong { .. }
            | Self::DuplicateAccountName(_)
            | Self::EmptyCategory
            | Self::NonPositiveAmount(_)
            | Self::ExcessPrecision(_)
            | Self::InvalidTransactionType(_)
            | Self::InvalidDivision(_)
            | Self::InvalidPeriod(_)
            | Self::SameAccountTransfer
            | Self::UnknownTransferAccount(_) => ErrorKind::Validation,
            Self::AccountNotFound(_)
            | Self::AccountReferenceNotFound(_)
            | Self::TransactionNotFound(_) => ErrorKind::NotFound,
            Self::EditWindowExpired { .. } => ErrorKind::EditWindowExpired,
            Self::ConcurrentModification => ErrorKind::Conflict,
            Self::TransferPartialFailure(_) | Self::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::EmptyAccountName => "EMPTY_ACCOUNT_NAME",
            Self::AccountNameTooLong { .. } => "ACCOUNT_NAME_TOO_LONG",
            Self::DuplicateAccountName(_) => "DUPLICATE_ACCOUNT_NAME",
            Self::EmptyCategory => "EMPTY_CATEGORY",
            Self::NonPositiveAmount(_) => "NON_POSITIVE_AMOUNT",
            Self::ExcessPrecision(_) => "EXCESS_PRECISION",
            Self::InvalidTransactionType(_) => "INVALID_TRANSACTION_TYPE",
            Self::InvalidDivision(_) => "INVALID_DIVISION",
            Self::InvalidPeriod(_) => "INVALID_PERIOD",
            Self::SameAccountTransfer => "SAME_ACCOUNT_TRANSFER",
            Self::UnknownTransferAccount(_) => "UNKNOWN_TRANSFER_ACCOUNT",
            Self::AccountNotFound(_) | Self::AccountReferenceNotFound(_) => "ACCOUNT_NOT_FOUND",
            Self::TransactionNotFound(_) => "TRANSACTION_NOT_FOUND",
            Self::EditWindowExpired { .. } => "EDIT_WINDOW_EXPIRED",
            Self::ConcurrentModification => "CONCURRENT_MODIFICATION",
            Self::TransferPartialFailure(_) | Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn http_status_code(&self) -> u16 {
        match self.kind() {
            ErrorKind::Validation => 400,
            ErrorKind::EditWindowExpired => 403,
            ErrorKind::NotFound => 404,
            ErrorKind::Conflict => 409,
            ErrorKind::Internal => 500,
        }
    }

    /// Returns true if this error is retryable.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ConcurrentModification)
    }

    /// Unwraps a transfer-leg failure into the error that caused it.
    ///
    /// Callers apply this once the unit of work has been rolled back, so the
    /// internal signal never reaches the API layer.
    #[must_use]
    pub fn resolved(self) -> Self {
        match self {
            Self::TransferPartialFailure(cause) => cause.resolved(),
            other => other,
        }
    }
}

impl From<fintrack_shared::types::MoneyError> for LedgerError {
    fn from(err: fintrack_shared::types::MoneyError) -> Self {
        match err {
            fintrack_shared::types::MoneyError::TooPrecise { value } => Self::ExcessPrecision(value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(LedgerError::EmptyCategory, 400)]
    #[case(LedgerError::SameAccountTransfer, 400)]
    #[case(LedgerError::UnknownTransferAccount("Bank".into()), 400)]
    #[case(LedgerError::AccountNameTooLong { len: 101 }, 400)]
    #[case(LedgerError::AccountReferenceNotFound("Bank".into()), 404)]
    #[case(LedgerError::TransactionNotFound(TransactionId::new()), 404)]
    #[case(LedgerError::EditWindowExpired { transaction_id: TransactionId::new(), locked_at: Utc::now() }, 403)]
    #[case(LedgerError::ConcurrentModification, 409)]
    #[case(LedgerError::Internal("boom".into()), 500)]
    fn test_http_status_codes(#[case] err: LedgerError, #[case] status: u16) {
        assert_eq!(err.http_status_code(), status);
    }

    #[test]
    fn test_retryable_errors() {
        assert!(LedgerError::ConcurrentModification.is_retryable());
        assert!(
            !LedgerError::EditWindowExpired {
                transaction_id: TransactionId::new(),
                locked_at: Utc::now(),
            }
            .is_retryable()
        );
        assert!(!LedgerError::EmptyCategory.is_retryable());
    }

    #[test]
    fn test_partial_failure_resolves_to_cause() {
        let err = LedgerError::TransferPartialFailure(Box::new(
            LedgerError::AccountNotFound(AccountId::new()),
        ));
        assert_eq!(err.kind(), ErrorKind::Internal);

        let resolved = err.resolved();
        assert_eq!(resolved.kind(), ErrorKind::NotFound);
        assert_eq!(resolved.error_code(), "ACCOUNT_NOT_FOUND");
    }

    #[test]
    fn test_error_display() {
        assert_eq!(
            LedgerError::NonPositiveAmount(Decimal::new(-500, 2)).to_string(),
            "Amount must be greater than zero, got -5.00"
        );
        assert_eq!(
            LedgerError::DuplicateAccountName("Cash".into()).to_string(),
            "An account named 'Cash' already exists"
        );
    }
}
