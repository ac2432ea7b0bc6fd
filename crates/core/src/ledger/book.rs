//! The per-owner ledger book.
//!
//! A [`Book`] holds one owner's accounts and entries and applies every
//! mutation together with its balance effect. Multi-step operations run in
//! a unit of work ([`Book::atomically`]): each step records how to undo
//! itself, and on failure the journal is replayed in reverse, so callers
//! never observe a half-applied change.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use rust_decimal::Decimal;
use fintrack_shared::types::{AccountId, TransactionId, UserId};

use super::balance::{BalanceDrift, amendment_delta, project_balance, reversal_delta};
use super::error::LedgerError;
use super::summary::{CategoryTotal, SummaryPeriod, TypeTotal, totals_by_category, totals_by_type};
use super::transfer::{LegSink, TransferCoordinator};
use super::types::{
    Account, EntryDraft, NewTransaction, Transaction, TransactionFilter, TransactionPatch,
    TransferReceipt, TransferRequest,
};
use super::validation::{
    normalize_description, validate_account_name, validate_amount, validate_category,
    validate_initial_balance, validate_patch,
};
use super::window::EditWindow;

/// How to revert one applied step.
#[derive(Debug)]
enum Undo {
    RemoveAccount(AccountId),
    RemoveEntry(TransactionId),
    RestoreEntry { index: usize, entry: Transaction },
    ReplaceEntry(Transaction),
    AdjustBalance { account_id: AccountId, delta: Decimal },
}

/// Accounts and entries touched by an open unit of work.
///
/// Each id is listed once, in the order it was first touched. An id whose
/// account or entry no longer exists in the book was removed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    /// Touched accounts.
    pub accounts: Vec<AccountId>,
    /// Touched entries.
    pub entries: Vec<TransactionId>,
}

impl ChangeSet {
    /// Returns true if nothing was touched.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty() && self.entries.is_empty()
    }

    fn touch_account(&mut self, id: AccountId) {
        if !self.accounts.contains(&id) {
            self.accounts.push(id);
        }
    }

    fn touch_entry(&mut self, id: TransactionId) {
        if !self.entries.contains(&id) {
            self.entries.push(id);
        }
    }
}

/// One owner's accounts and ledger.
#[derive(Debug)]
pub struct Book {
    owner_id: UserId,
    accounts: Vec<Account>,
    entries: Vec<Transaction>,
    next_sequence: u64,
    window: EditWindow,
    journal: Option<Vec<Undo>>,
}

impl Book {
    /// Creates an empty book.
    #[must_use]
    pub fn new(owner_id: UserId, window: EditWindow) -> Self {
        Self {
            owner_id,
            accounts: Vec::new(),
            entries: Vec::new(),
            next_sequence: 1,
            window,
            journal: None,
        }
    }

    /// Rebuilds a book from stored accounts, in creation order, and entries,
    /// in posting order.
    #[must_use]
    pub fn restore(
        owner_id: UserId,
        window: EditWindow,
        accounts: Vec<Account>,
        entries: Vec<Transaction>,
    ) -> Self {
        let next_sequence = entries.iter().map(|e| e.sequence).max().map_or(1, |last| last + 1);
        Self {
            owner_id,
            accounts,
            entries,
            next_sequence,
            window,
            journal: None,
        }
    }

    /// Returns the owner of this book.
    #[must_use]
    pub const fn owner_id(&self) -> UserId {
        self.owner_id
    }

    /// Returns the edit window applied to mutations.
    #[must_use]
    pub const fn edit_window(&self) -> EditWindow {
        self.window
    }

    /// Runs `f` as a single unit of work.
    ///
    /// If `f` fails, every step it applied is reverted before the error is
    /// returned. Nested calls join the enclosing unit.
    ///
    /// # Errors
    ///
    /// Returns whatever `f` returns.
    pub fn atomically<T, F>(&mut self, f: F) -> Result<T, LedgerError>
    where
        F: FnOnce(&mut Self) -> Result<T, LedgerError>,
    {
        if self.journal.is_some() {
            return f(self);
        }

        self.journal = Some(Vec::new());
        let result = f(self);
        let journal = self.journal.take().unwrap_or_default();
        if result.is_err() {
            self.rollback(journal);
        }
        result
    }

    /// Opens a unit of work that spans several calls. It stays open until
    /// [`Book::commit`] or [`Book::abort`]; [`Book::atomically`] calls made
    /// meanwhile join it.
    pub fn begin(&mut self) {
        if self.journal.is_none() {
            self.journal = Some(Vec::new());
        }
    }

    /// Everything touched since [`Book::begin`].
    #[must_use]
    pub fn pending_changes(&self) -> ChangeSet {
        let mut changes = ChangeSet::default();
        for undo in self.journal.iter().flatten() {
            match undo {
                Undo::RemoveAccount(id) => changes.touch_account(*id),
                Undo::AdjustBalance { account_id, .. } => changes.touch_account(*account_id),
                Undo::RemoveEntry(id) => changes.touch_entry(*id),
                Undo::RestoreEntry { entry, .. } | Undo::ReplaceEntry(entry) => {
                    changes.touch_entry(entry.id);
                }
            }
        }
        changes
    }

    /// Closes the open unit of work and keeps its changes.
    pub fn commit(&mut self) {
        self.journal = None;
    }

    /// Closes the open unit of work and reverts every change made in it.
    pub fn abort(&mut self) {
        if let Some(journal) = self.journal.take() {
            self.rollback(journal);
        }
    }

    fn record(&mut self, undo: Undo) {
        if let Some(journal) = self.journal.as_mut() {
            journal.push(undo);
        }
    }

    fn rollback(&mut self, journal: Vec<Undo>) {
        for undo in journal.into_iter().rev() {
            match undo {
                Undo::RemoveAccount(id) => self.accounts.retain(|a| a.id != id),
                Undo::RemoveEntry(id) => self.entries.retain(|e| e.id != id),
                Undo::RestoreEntry { index, entry } => {
                    let index = index.min(self.entries.len());
                    self.entries.insert(index, entry);
                }
                Undo::ReplaceEntry(previous) => {
                    if let Some(slot) = self.entries.iter_mut().find(|e| e.id == previous.id) {
                        *slot = previous;
                    }
                }
                Undo::AdjustBalance { account_id, delta } => {
                    if let Some(account) = self.accounts.iter_mut().find(|a| a.id == account_id) {
                        account.balance -= delta;
                    }
                }
            }
        }
    }

    // ========== Account Store ==========

    /// Opens a new account.
    ///
    /// # Errors
    ///
    /// Fails on an empty name, a name already used by another account of
    /// this owner (case-insensitive) or an over-precise opening balance.
    pub fn create_account(
        &mut self,
        name: &str,
        initial_balance: Decimal,
        now: DateTime<Utc>,
    ) -> Result<Account, LedgerError> {
        let name = validate_account_name(name)?;
        let initial_balance = validate_initial_balance(initial_balance)?;
        if self.find_by_name(&name).is_some() {
            return Err(LedgerError::DuplicateAccountName(name));
        }

        let account = Account {
            id: AccountId::new(),
            owner_id: self.owner_id,
            name,
            initial_balance,
            balance: initial_balance,
            created_at: now,
        };
        self.accounts.push(account.clone());
        self.record(Undo::RemoveAccount(account.id));
        Ok(account)
    }

    /// Returns every account in creation order.
    #[must_use]
    pub fn accounts(&self) -> &[Account] {
        &self.accounts
    }

    /// Looks up an account by id.
    ///
    /// # Errors
    ///
    /// Returns `AccountNotFound` if this owner has no such account.
    pub fn account(&self, id: AccountId) -> Result<&Account, LedgerError> {
        self.accounts
            .iter()
            .find(|a| a.id == id)
            .ok_or(LedgerError::AccountNotFound(id))
    }

    /// Resolves an account reference: an account id first, then a name.
    ///
    /// # Errors
    ///
    /// Returns `AccountReferenceNotFound` if nothing matches.
    pub fn resolve_account(&self, reference: &str) -> Result<&Account, LedgerError> {
        let reference = reference.trim();
        reference
            .parse::<AccountId>()
            .ok()
            .and_then(|id| self.accounts.iter().find(|a| a.id == id))
            .or_else(|| self.find_by_name(reference))
            .ok_or_else(|| LedgerError::AccountReferenceNotFound(reference.to_string()))
    }

    fn find_by_name(&self, name: &str) -> Option<&Account> {
        let name = name.to_lowercase();
        self.accounts.iter().find(|a| a.name.to_lowercase() == name)
    }

    /// Applies a signed delta to an account's balance.
    ///
    /// # Errors
    ///
    /// Returns `AccountNotFound` if this owner has no such account.
    pub fn adjust_balance(&mut self, account_id: AccountId, delta: Decimal) -> Result<Decimal, LedgerError> {
        let account = self
            .accounts
            .iter_mut()
            .find(|a| a.id == account_id)
            .ok_or(LedgerError::AccountNotFound(account_id))?;
        account.balance += delta;
        let balance = account.balance;
        self.record(Undo::AdjustBalance { account_id, delta });
        Ok(balance)
    }

    // ========== Transaction Ledger ==========

    /// Records a new income or expense and applies it to the account balance.
    ///
    /// # Errors
    ///
    /// Fails on invalid input or an unknown account reference. Nothing is
    /// recorded on failure.
    pub fn create_transaction(
        &mut self,
        input: &NewTransaction,
        now: DateTime<Utc>,
    ) -> Result<Transaction, LedgerError> {
        let amount = validate_amount(input.amount)?;
        let category = validate_category(&input.category)?;
        let account_id = self.resolve_account(&input.account)?.id;

        let draft = EntryDraft {
            transaction_type: input.transaction_type,
            amount,
            category,
            division: input.division,
            account_id,
            description: normalize_description(input.description.as_deref()),
            transfer_id: None,
        };
        self.atomically(|book| book.post(draft, now))
    }

    /// Inserts a validated entry and applies its balance effect.
    ///
    /// If the balance adjustment fails the insertion is undone with it,
    /// provided the call runs inside [`Book::atomically`].
    ///
    /// # Errors
    ///
    /// Returns `AccountNotFound` if the draft's account does not exist.
    pub fn post(&mut self, draft: EntryDraft, now: DateTime<Utc>) -> Result<Transaction, LedgerError> {
        let account = self.account(draft.account_id)?.name.clone();
        let sequence = self.next_sequence;
        self.next_sequence += 1;

        let entry = Transaction {
            id: TransactionId::new(),
            owner_id: self.owner_id,
            transaction_type: draft.transaction_type,
            amount: draft.amount,
            category: draft.category,
            division: draft.division,
            account_id: draft.account_id,
            account,
            description: draft.description,
            transfer_id: draft.transfer_id,
            created_at: now,
            updated_at: None,
            sequence,
        };
        self.entries.push(entry.clone());
        self.record(Undo::RemoveEntry(entry.id));

        self.adjust_balance(entry.account_id, entry.signed_amount())?;
        Ok(entry)
    }

    /// Looks up a transaction by id.
    ///
    /// # Errors
    ///
    /// Returns `TransactionNotFound` if this owner has no such entry.
    pub fn transaction(&self, id: TransactionId) -> Result<&Transaction, LedgerError> {
        self.entries
            .iter()
            .find(|e| e.id == id)
            .ok_or(LedgerError::TransactionNotFound(id))
    }

    /// The other leg of a transfer entry, if any.
    fn counterpart(&self, entry: &Transaction) -> Option<&Transaction> {
        let transfer_id = entry.transfer_id?;
        self.entries
            .iter()
            .find(|e| e.transfer_id == Some(transfer_id) && e.id != entry.id)
    }

    /// Amends amount, category, division or description of an entry.
    ///
    /// An amount change adjusts the balance by the difference. On a transfer
    /// leg the new amount is mirrored on the counterpart.
    ///
    /// # Errors
    ///
    /// Returns `TransactionNotFound`, `EditWindowExpired` once the entry (or
    /// its counterpart) is locked, or a validation error. Nothing changes on
    /// failure.
    pub fn update_transaction(
        &mut self,
        id: TransactionId,
        patch: &TransactionPatch,
        now: DateTime<Utc>,
    ) -> Result<Transaction, LedgerError> {
        let current = self.transaction(id)?.clone();
        self.window.ensure_editable(&current, now)?;
        let patch = validate_patch(patch)?;

        let counterpart = match patch.amount {
            Some(amount) if amount != current.amount => self.counterpart(&current).cloned(),
            _ => None,
        };
        if let Some(other) = &counterpart {
            self.window.ensure_editable(other, now)?;
        }

        self.atomically(|book| {
            let updated = book.amend(&current, &patch, now)?;
            if let Some(other) = &counterpart {
                let mirror = TransactionPatch {
                    amount: patch.amount,
                    ..TransactionPatch::default()
                };
                book.amend(other, &mirror, now)?;
            }
            Ok(updated)
        })
    }

    fn amend(
        &mut self,
        current: &Transaction,
        patch: &TransactionPatch,
        now: DateTime<Utc>,
    ) -> Result<Transaction, LedgerError> {
        let mut updated = current.clone();
        if let Some(amount) = patch.amount {
            updated.amount = amount;
        }
        if let Some(category) = &patch.category {
            updated.category.clone_from(category);
        }
        if let Some(division) = patch.division {
            updated.division = division;
        }
        if let Some(description) = &patch.description {
            updated.description = normalize_description(Some(description));
        }
        updated.updated_at = Some(now);

        let slot = self
            .entries
            .iter_mut()
            .find(|e| e.id == current.id)
            .ok_or(LedgerError::TransactionNotFound(current.id))?;
        *slot = updated.clone();
        self.record(Undo::ReplaceEntry(current.clone()));

        let delta = amendment_delta(current.transaction_type, current.amount, updated.amount);
        if !delta.is_zero() {
            self.adjust_balance(updated.account_id, delta)?;
        }
        Ok(updated)
    }

    /// Removes an entry and reverses its balance effect.
    ///
    /// Deleting a transfer leg removes both legs. Returns every removed entry.
    ///
    /// # Errors
    ///
    /// Returns `TransactionNotFound` or `EditWindowExpired`. Nothing changes
    /// on failure.
    pub fn delete_transaction(
        &mut self,
        id: TransactionId,
        now: DateTime<Utc>,
    ) -> Result<Vec<Transaction>, LedgerError> {
        let entry = self.transaction(id)?.clone();
        self.window.ensure_editable(&entry, now)?;
        let counterpart = self.counterpart(&entry).cloned();
        if let Some(other) = &counterpart {
            self.window.ensure_editable(other, now)?;
        }

        self.atomically(|book| {
            let mut removed = vec![book.remove(entry.id)?];
            if let Some(other) = counterpart {
                removed.push(book.remove(other.id)?);
            }
            Ok(removed)
        })
    }

    fn remove(&mut self, id: TransactionId) -> Result<Transaction, LedgerError> {
        let index = self
            .entries
            .iter()
            .position(|e| e.id == id)
            .ok_or(LedgerError::TransactionNotFound(id))?;
        let entry = self.entries.remove(index);
        self.record(Undo::RestoreEntry {
            index,
            entry: entry.clone(),
        });
        self.adjust_balance(entry.account_id, reversal_delta(&entry))?;
        Ok(entry)
    }

    /// Lists entries matching `filter`, most recent first.
    ///
    /// Entries created at the same instant come out in reverse insertion order.
    ///
    /// # Errors
    ///
    /// Returns `AccountReferenceNotFound` if the filter names an unknown account.
    pub fn list_transactions(&self, filter: &TransactionFilter) -> Result<Vec<Transaction>, LedgerError> {
        let account_id = filter
            .account
            .as_deref()
            .map(|reference| self.resolve_account(reference).map(|a| a.id))
            .transpose()?;

        let mut matching: Vec<Transaction> = self
            .entries
            .iter()
            .filter(|e| account_id.is_none_or(|id| e.account_id == id))
            .filter(|e| filter.matches(e))
            .cloned()
            .collect();
        matching.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.sequence.cmp(&a.sequence))
        });
        Ok(matching)
    }

    // ========== Transfers ==========

    /// Moves `amount` between two accounts of this owner as one unit.
    ///
    /// # Errors
    ///
    /// Fails on invalid input, unknown accounts or identical source and
    /// destination. On failure neither leg exists.
    pub fn transfer(&mut self, request: &TransferRequest, now: DateTime<Utc>) -> Result<TransferReceipt, LedgerError> {
        self.atomically(|book| TransferCoordinator::execute(book, request, now))
            .map_err(LedgerError::resolved)
    }

    // ========== Summaries ==========

    /// Income and expense totals for the calendar period around `now`.
    ///
    /// # Errors
    ///
    /// Returns `Internal` if the period window cannot be computed.
    pub fn summarize(&self, period: SummaryPeriod, now: DateTime<Utc>, tz: Tz) -> Result<Vec<TypeTotal>, LedgerError> {
        let window = period.window_containing(now, tz)?;
        Ok(totals_by_type(&self.entries, &window))
    }

    /// All-time expense totals per category.
    #[must_use]
    pub fn summarize_by_category(&self) -> Vec<CategoryTotal> {
        totals_by_category(&self.entries)
    }

    // ========== Audit ==========

    /// Recomputes every balance from the ledger and reports accounts whose
    /// stored balance differs.
    #[must_use]
    pub fn verify_balances(&self) -> Vec<BalanceDrift> {
        self.accounts
            .iter()
            .filter_map(|account| {
                let projected = project_balance(
                    account.initial_balance,
                    self.entries.iter().filter(|e| e.account_id == account.id),
                );
                (projected != account.balance).then(|| BalanceDrift {
                    account_id: account.id,
                    recorded: account.balance,
                    projected,
                })
            })
            .collect()
    }
}

impl LegSink for Book {
    fn resolve_leg_account(&self, reference: &str) -> Result<Account, LedgerError> {
        self.resolve_account(reference).cloned()
    }

    fn post_leg(&mut self, draft: EntryDraft, now: DateTime<Utc>) -> Result<Transaction, LedgerError> {
        self.post(draft, now)
    }
}
