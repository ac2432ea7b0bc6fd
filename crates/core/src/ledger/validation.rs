//! Input validation for accounts, entries and patches.
//!
//! Everything that reaches the book passes through here first, so the book
//! itself only deals with well-formed, currency-precision values.

use rust_decimal::Decimal;
use fintrack_shared::types::ensure_currency_precision;

use super::error::LedgerError;
use super::types::TransactionPatch;

/// Longest accepted account name, in characters.
pub const MAX_ACCOUNT_NAME_LEN: usize = 100;

/// Trims an account name and checks it is non-empty and not too long.
pub fn validate_account_name(name: &str) -> Result<String, LedgerError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(LedgerError::EmptyAccountName);
    }
    let len = trimmed.chars().count();
    if len > MAX_ACCOUNT_NAME_LEN {
        return Err(LedgerError::AccountNameTooLong { len });
    }
    Ok(trimmed.to_string())
}

/// Opening balances may be negative but must fit currency precision.
pub fn validate_initial_balance(balance: Decimal) -> Result<Decimal, LedgerError> {
    Ok(ensure_currency_precision(balance)?)
}

/// Amounts must be strictly positive and fit currency precision.
pub fn validate_amount(amount: Decimal) -> Result<Decimal, LedgerError> {
    if amount <= Decimal::ZERO {
        return Err(LedgerError::NonPositiveAmount(amount));
    }
    Ok(ensure_currency_precision(amount)?)
}

/// Trims a category and checks it is non-empty.
pub fn validate_category(category: &str) -> Result<String, LedgerError> {
    let trimmed = category.trim();
    if trimmed.is_empty() {
        return Err(LedgerError::EmptyCategory);
    }
    Ok(trimmed.to_string())
}

/// Blank descriptions are stored as absent.
#[must_use]
pub fn normalize_description(description: Option<&str>) -> Option<String> {
    description
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(str::to_string)
}

/// Validates every present field of a patch.
pub fn validate_patch(patch: &TransactionPatch) -> Result<TransactionPatch, LedgerError> {
    Ok(TransactionPatch {
        amount: patch.amount.map(validate_amount).transpose()?,
        category: patch
            .category
            .as_deref()
            .map(validate_category)
            .transpose()?,
        division: patch.division,
        description: patch.description.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    #[rstest]
    #[case(dec!(0))]
    #[case(dec!(-0.01))]
    #[case(dec!(-200))]
    fn test_non_positive_amounts_rejected(#[case] amount: Decimal) {
        assert!(matches!(
            validate_amount(amount),
            Err(LedgerError::NonPositiveAmount(_))
        ));
    }

    #[test]
    fn test_amount_precision() {
        assert_eq!(validate_amount(dec!(200)).unwrap().to_string(), "200.00");
        assert!(matches!(
            validate_amount(dec!(0.005)),
            Err(LedgerError::ExcessPrecision(_))
        ));
    }

    #[test]
    fn test_initial_balance_may_be_negative_or_zero() {
        assert_eq!(validate_initial_balance(dec!(0)).unwrap(), dec!(0));
        assert_eq!(validate_initial_balance(dec!(-150.5)).unwrap(), dec!(-150.50));
    }

    #[test]
    fn test_names_and_categories_trimmed() {
        assert_eq!(validate_account_name("  Cash ").unwrap(), "Cash");
        assert!(matches!(
            validate_account_name("   "),
            Err(LedgerError::EmptyAccountName)
        ));
        assert_eq!(validate_category(" Food").unwrap(), "Food");
        assert!(matches!(validate_category(""), Err(LedgerError::EmptyCategory)));
    }

    #[test]
    fn test_long_account_names_rejected_not_truncated() {
        let longest = "a".repeat(MAX_ACCOUNT_NAME_LEN);
        assert_eq!(validate_account_name(&longest).unwrap(), longest);

        let savings = format!("{longest}-savings");
        assert!(matches!(
            validate_account_name(&savings),
            Err(LedgerError::AccountNameTooLong { len: 108 })
        ));
    }

    #[test]
    fn test_normalize_description() {
        assert_eq!(normalize_description(None), None);
        assert_eq!(normalize_description(Some("  ")), None);
        assert_eq!(normalize_description(Some(" lunch ")), Some("lunch".to_string()));
    }

    #[test]
    fn test_validate_patch_checks_present_fields_only() {
        let patch = TransactionPatch {
            amount: Some(dec!(250)),
            ..TransactionPatch::default()
        };
        assert_eq!(validate_patch(&patch).unwrap().amount, Some(dec!(250.00)));

        let patch = TransactionPatch {
            category: Some(" ".to_string()),
            ..TransactionPatch::default()
        };
        assert!(matches!(validate_patch(&patch), Err(LedgerError::EmptyCategory)));
    }
}
