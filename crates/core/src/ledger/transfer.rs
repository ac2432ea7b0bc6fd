//! Transfer coordination.
//!
//! A transfer is two ordinary entries sharing a [`TransferId`]: an expense
//! on the source account and an income on the destination. The coordinator
//! posts both through a [`LegSink`]; it does not undo anything itself. The
//! caller runs it inside a unit of work so that a failed second leg takes
//! the first one with it.

use chrono::{DateTime, Utc};
use fintrack_shared::types::TransferId;

use super::error::LedgerError;
use super::types::{
    Account, Division, EntryDraft, Transaction, TransactionType, TransferReceipt, TransferRequest,
};
use super::validation::{normalize_description, validate_amount};

/// Category of the source leg.
pub const TRANSFER_OUT_CATEGORY: &str = "Transfer Out";
/// Category of the destination leg.
pub const TRANSFER_IN_CATEGORY: &str = "Transfer In";

/// Where transfer legs get posted.
pub trait LegSink {
    /// Resolves an account reference (id or name).
    fn resolve_leg_account(&self, reference: &str) -> Result<Account, LedgerError>;

    /// Posts one leg and applies its balance effect.
    fn post_leg(&mut self, draft: EntryDraft, now: DateTime<Utc>) -> Result<Transaction, LedgerError>;
}

/// Resolves a transfer endpoint. An unknown account is a bad request here,
/// not a missing resource.
fn resolve<S: LegSink>(sink: &S, reference: &str) -> Result<Account, LedgerError> {
    sink.resolve_leg_account(reference).map_err(|err| match err {
        LedgerError::AccountReferenceNotFound(reference) => {
            LedgerError::UnknownTransferAccount(reference)
        }
        other => other,
    })
}

/// Builds and posts the two legs of a transfer.
pub struct TransferCoordinator;

impl TransferCoordinator {
    /// Posts both legs of `request`.
    ///
    /// # Errors
    ///
    /// Validation errors, unknown accounts included, are returned before
    /// anything is posted. A failure on the second leg is wrapped in
    /// [`LedgerError::TransferPartialFailure`]; the caller must roll back and
    /// resolve it.
    pub fn execute<S: LegSink>(
        sink: &mut S,
        request: &TransferRequest,
        now: DateTime<Utc>,
    ) -> Result<TransferReceipt, LedgerError> {
        let amount = validate_amount(request.amount)?;
        let from = resolve(sink, &request.from_account)?;
        let to = resolve(sink, &request.to_account)?;
        if from.id == to.id {
            return Err(LedgerError::SameAccountTransfer);
        }

        let transfer_id = TransferId::new();
        let note = normalize_description(request.description.as_deref());
        let describe = |base: String| match &note {
            Some(note) => format!("{base} - {note}"),
            None => base,
        };

        let outgoing = sink.post_leg(
            EntryDraft {
                transaction_type: TransactionType::Expense,
                amount,
                category: TRANSFER_OUT_CATEGORY.to_string(),
                division: Division::Personal,
                account_id: from.id,
                description: Some(describe(format!("Transfer to {}", to.name))),
                transfer_id: Some(transfer_id),
            },
            now,
        )?;

        let incoming = sink
            .post_leg(
                EntryDraft {
                    transaction_type: TransactionType::Income,
                    amount,
                    category: TRANSFER_IN_CATEGORY.to_string(),
                    division: Division::Personal,
                    account_id: to.id,
                    description: Some(describe(format!("Transfer from {}", from.name))),
                    transfer_id: Some(transfer_id),
                },
                now,
            )
            .map_err(|err| LedgerError::TransferPartialFailure(Box::new(err)))?;

        Ok(TransferReceipt {
            transfer_id,
            outgoing,
            incoming,
        })
    }
}
