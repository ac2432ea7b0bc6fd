//! Ledger domain types.
//!
//! Amounts are always stored positive; the direction of a movement is
//! carried by [`TransactionType`] alone.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use fintrack_shared::types::{AccountId, TransactionId, TransferId, UserId};

use super::error::LedgerError;

/// Direction of a ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    /// Money coming into the account.
    Income,
    /// Money leaving the account.
    Expense,
}

impl TransactionType {
    /// Both directions, in the order summaries report them.
    pub const ALL: [Self; 2] = [Self::Income, Self::Expense];

    /// Returns the lowercase wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Income => "income",
            Self::Expense => "expense",
        }
    }
}

impl std::fmt::Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TransactionType {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "income" => Ok(Self::Income),
            "expense" => Ok(Self::Expense),
            _ => Err(LedgerError::InvalidTransactionType(s.to_string())),
        }
    }
}

/// Classification tag with no effect on balances.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Division {
    /// Personal spending and income.
    #[default]
    Personal,
    /// Work related spending and income.
    Office,
}

impl Division {
    /// Returns the wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Personal => "Personal",
            Self::Office => "Office",
        }
    }
}

impl std::fmt::Display for Division {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Division {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "personal" => Ok(Self::Personal),
            "office" => Ok(Self::Office),
            _ => Err(LedgerError::InvalidDivision(s.to_string())),
        }
    }
}

/// A named money account owned by one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Unique identifier.
    pub id: AccountId,
    /// Owning user.
    pub owner_id: UserId,
    /// Name, unique per owner (case-insensitive).
    pub name: String,
    /// Balance the account was opened with.
    pub initial_balance: Decimal,
    /// Current balance, maintained incrementally from the ledger.
    pub balance: Decimal,
    /// When the account was opened.
    pub created_at: DateTime<Utc>,
}

/// A single signed money movement against one account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Unique identifier.
    pub id: TransactionId,
    /// Owning user.
    pub owner_id: UserId,
    /// Direction of the movement. Immutable.
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
    /// Positive amount at currency precision.
    pub amount: Decimal,
    /// Non-empty label.
    pub category: String,
    /// Personal or office.
    pub division: Division,
    /// The account the entry is posted against. Immutable.
    pub account_id: AccountId,
    /// Name of the account at posting time.
    pub account: String,
    /// Optional free text.
    pub description: Option<String>,
    /// Set on both legs of a transfer.
    pub transfer_id: Option<TransferId>,
    /// Creation time. Immutable, drives the edit window.
    pub created_at: DateTime<Utc>,
    /// Last amendment time.
    pub updated_at: Option<DateTime<Utc>>,
    /// Insertion order within the owner's ledger, used as a tie-breaker.
    #[serde(skip)]
    pub sequence: u64,
}

impl Transaction {
    /// Returns the signed effect of this entry on its account's balance.
    #[must_use]
    pub fn signed_amount(&self) -> Decimal {
        super::balance::signed_delta(self.transaction_type, self.amount)
    }
}

/// Request to record a new income or expense.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NewTransaction {
    /// Direction.
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
    /// Positive amount.
    pub amount: Decimal,
    /// Non-empty label.
    pub category: String,
    /// Classification tag.
    #[serde(default)]
    pub division: Division,
    /// Account reference: id or name.
    pub account: String,
    /// Optional free text.
    #[serde(default)]
    pub description: Option<String>,
}

/// Fields that may change on an existing entry.
///
/// Type and account are deliberately absent: changing either would move the
/// balance effect to a different account or flip its sign.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransactionPatch {
    /// New amount.
    pub amount: Option<Decimal>,
    /// New category.
    pub category: Option<String>,
    /// New division.
    pub division: Option<Division>,
    /// New description; an empty string clears it.
    pub description: Option<String>,
}

/// Fully validated, account-resolved entry ready to be posted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryDraft {
    /// Direction.
    pub transaction_type: TransactionType,
    /// Positive amount at currency precision.
    pub amount: Decimal,
    /// Trimmed category.
    pub category: String,
    /// Classification tag.
    pub division: Division,
    /// Resolved account.
    pub account_id: AccountId,
    /// Normalised description.
    pub description: Option<String>,
    /// Transfer link, for transfer legs.
    pub transfer_id: Option<TransferId>,
}

/// Criteria for listing transactions. Every criterion is optional and they
/// combine with AND.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransactionFilter {
    /// Category, compared case-insensitively.
    pub category: Option<String>,
    /// Division.
    pub division: Option<Division>,
    /// Direction.
    pub transaction_type: Option<TransactionType>,
    /// Account reference: id or name.
    pub account: Option<String>,
    /// Inclusive lower bound on `created_at`.
    pub created_after: Option<DateTime<Utc>>,
    /// Inclusive upper bound on `created_at`.
    pub created_before: Option<DateTime<Utc>>,
}

impl TransactionFilter {
    /// Returns true if the entry satisfies every criterion except the account
    /// reference, which the book resolves separately.
    #[must_use]
    pub fn matches(&self, entry: &Transaction) -> bool {
        if let Some(category) = &self.category {
            if entry.category.to_lowercase() != category.trim().to_lowercase() {
                return false;
            }
        }
        if self.division.is_some_and(|d| d != entry.division) {
            return false;
        }
        if self
            .transaction_type
            .is_some_and(|t| t != entry.transaction_type)
        {
            return false;
        }
        if self.created_after.is_some_and(|after| entry.created_at < after) {
            return false;
        }
        if self
            .created_before
            .is_some_and(|before| entry.created_at > before)
        {
            return false;
        }
        true
    }
}

/// Request to move money between two accounts of the same owner.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferRequest {
    /// Source account reference.
    pub from_account: String,
    /// Destination account reference.
    pub to_account: String,
    /// Positive amount.
    pub amount: Decimal,
    /// Optional note appended to both legs.
    #[serde(default)]
    pub description: Option<String>,
}

/// Outcome of a completed transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransferReceipt {
    /// Link shared by both legs.
    pub transfer_id: TransferId,
    /// Expense leg on the source account.
    pub outgoing: Transaction,
    /// Income leg on the destination account.
    pub incoming: Transaction,
}
