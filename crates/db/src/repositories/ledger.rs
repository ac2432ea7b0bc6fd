//! Ledger repository: one book per owner behind a bounded lock, stored in
//! the database.
//!
//! Each owner's book is loaded once and kept in memory. Every operation
//! takes the owner's lock, runs against the [`Book`] and, for writes, saves
//! what changed in one database transaction before releasing. If the save
//! fails the book is rolled back, so memory and storage never disagree.
//! Owners never contend with each other. Within one owner, acquisition is
//! retried a bounded number of times with doubling backoff and then fails
//! with [`LedgerError::ConcurrentModification`] instead of waiting forever.
//! The same error is returned when another process committed to the owner's
//! ledger first; the cached book is then dropped and reloaded on next use.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use dashmap::DashMap;
use rust_decimal::Decimal;
use sea_orm::DatabaseConnection;
use thiserror::Error;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info, warn};

use fintrack_core::ledger::{
    Account, BalanceDrift, Book, CategoryTotal, EditWindow, LedgerError, NewTransaction,
    SummaryPeriod, Transaction, TransactionFilter, TransactionPatch, TransferReceipt,
    TransferRequest, TypeTotal,
};
use fintrack_shared::LedgerConfig;
use fintrack_shared::types::{TransactionId, UserId};

use super::book_store;
use crate::clock::Clock;

/// The configured reference timezone is not an IANA name.
#[derive(Debug, Error)]
#[error("unknown timezone '{0}'")]
pub struct InvalidTimezone(pub String);

/// Lock discipline and ledger rules for the repository.
#[derive(Debug, Clone, Copy)]
pub struct LedgerSettings {
    /// How long one acquisition attempt may wait.
    pub lock_timeout: Duration,
    /// Attempts before giving up.
    pub lock_max_attempts: u32,
    /// Pause after the first failed attempt; doubled after each one.
    pub lock_backoff: Duration,
    /// Edit/delete window.
    pub edit_window: EditWindow,
    /// Reference timezone for calendar periods.
    pub timezone: Tz,
}

impl Default for LedgerSettings {
    fn default() -> Self {
        Self {
            lock_timeout: Duration::from_millis(250),
            lock_max_attempts: 3,
            lock_backoff: Duration::from_millis(10),
            edit_window: EditWindow::default(),
            timezone: Tz::UTC,
        }
    }
}

impl LedgerSettings {
    /// Builds settings from the `ledger` configuration section.
    ///
    /// # Errors
    ///
    /// Returns `InvalidTimezone` if the timezone is not recognised.
    pub fn from_config(config: &LedgerConfig) -> Result<Self, InvalidTimezone> {
        let timezone = config
            .timezone
            .parse::<Tz>()
            .map_err(|_| InvalidTimezone(config.timezone.clone()))?;

        Ok(Self {
            lock_timeout: Duration::from_millis(config.lock_timeout_ms),
            lock_max_attempts: config.lock_max_attempts.max(1),
            lock_backoff: Duration::from_millis(config.lock_backoff_ms),
            edit_window: EditWindow::hours(config.edit_window_hours),
            timezone,
        })
    }
}

/// An owner's cached book and the stored version it reflects. Empty until
/// first use and after a lost write race.
#[derive(Debug, Default)]
pub struct BookSlot {
    book: Option<Book>,
    version: i64,
}

/// Per-owner ledger storage.
#[derive(Debug, Clone)]
pub struct LedgerRepository {
    db: DatabaseConnection,
    books: Arc<DashMap<UserId, Arc<Mutex<BookSlot>>>>,
    clock: Arc<dyn Clock>,
    settings: LedgerSettings,
}

impl LedgerRepository {
    /// Creates a repository over `db`. Books are loaded lazily.
    #[must_use]
    pub fn new(db: DatabaseConnection, settings: LedgerSettings, clock: Arc<dyn Clock>) -> Self {
        Self {
            db,
            books: Arc::new(DashMap::new()),
            clock,
            settings,
        }
    }

    /// Returns the reference timezone.
    #[must_use]
    pub const fn timezone(&self) -> Tz {
        self.settings.timezone
    }

    /// Returns the repository's clock.
    #[must_use]
    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    fn slot(&self, owner_id: UserId) -> Arc<Mutex<BookSlot>> {
        Arc::clone(self.books.entry(owner_id).or_default().value())
    }

    /// Acquires the owner's book slot.
    ///
    /// # Errors
    ///
    /// Returns `ConcurrentModification` once every attempt has timed out.
    pub async fn lock(&self, owner_id: UserId) -> Result<OwnedMutexGuard<BookSlot>, LedgerError> {
        let slot = self.slot(owner_id);
        let attempts = self.settings.lock_max_attempts.max(1);
        let mut backoff = self.settings.lock_backoff;

        for attempt in 1..=attempts {
            if let Ok(guard) =
                tokio::time::timeout(self.settings.lock_timeout, Arc::clone(&slot).lock_owned()).await
            {
                return Ok(guard);
            }

            warn!(owner_id = %owner_id, attempt, "Ledger busy");
            if attempt < attempts {
                tokio::time::sleep(backoff).await;
                backoff = backoff.saturating_mul(2);
            }
        }

        warn!(owner_id = %owner_id, attempts, "Giving up on ledger lock");
        Err(LedgerError::ConcurrentModification)
    }

    async fn hydrate<'a>(&self, owner_id: UserId, slot: &'a mut BookSlot) -> Result<&'a mut Book, LedgerError> {
        if slot.book.is_none() {
            let (book, version) = book_store::load(&self.db, owner_id, self.settings.edit_window).await?;
            debug!(
                owner_id = %owner_id,
                version,
                accounts = book.accounts().len(),
                "Ledger loaded"
            );
            slot.version = version;
            slot.book = Some(book);
        }
        slot.book
            .as_mut()
            .ok_or_else(|| LedgerError::Internal("ledger not loaded".to_string()))
    }

    /// Runs a read against the owner's book.
    async fn read<T, F>(&self, owner_id: UserId, f: F) -> Result<T, LedgerError>
    where
        F: FnOnce(&Book, DateTime<Utc>) -> Result<T, LedgerError> + Send,
    {
        let mut slot = self.lock(owner_id).await?;
        let book = self.hydrate(owner_id, &mut slot).await?;
        f(book, self.clock.now())
    }

    /// Runs a mutation against the owner's book and saves what it touched.
    async fn write<T, F>(&self, owner_id: UserId, f: F) -> Result<T, LedgerError>
    where
        T: Send,
        F: FnOnce(&mut Book, DateTime<Utc>) -> Result<T, LedgerError> + Send,
    {
        let mut slot = self.lock(owner_id).await?;
        self.hydrate(owner_id, &mut slot).await?;
        let result = self.apply(&mut slot, f).await;
        if matches!(result, Err(LedgerError::ConcurrentModification)) {
            warn!(owner_id = %owner_id, "Ledger changed elsewhere, reloading on next use");
            slot.book = None;
        }
        result
    }

    async fn apply<T, F>(&self, slot: &mut BookSlot, f: F) -> Result<T, LedgerError>
    where
        T: Send,
        F: FnOnce(&mut Book, DateTime<Utc>) -> Result<T, LedgerError> + Send,
    {
        let version = slot.version;
        let book = slot
            .book
            .as_mut()
            .ok_or_else(|| LedgerError::Internal("ledger not loaded".to_string()))?;

        book.begin();
        let value = match f(book, self.clock.now()) {
            Ok(value) => value,
            Err(err) => {
                book.abort();
                return Err(err);
            }
        };

        let changes = book.pending_changes();
        if changes.is_empty() {
            book.commit();
            return Ok(value);
        }

        match book_store::save(&self.db, book, version, &changes).await {
            Ok(next) => {
                book.commit();
                slot.version = next;
                Ok(value)
            }
            Err(err) => {
                book.abort();
                warn!(owner_id = %book.owner_id(), error = %err, "Ledger save failed, changes reverted");
                Err(err.into())
            }
        }
    }

    // ========== Accounts ==========

    /// Opens an account for `owner_id`.
    pub async fn create_account(
        &self,
        owner_id: UserId,
        name: &str,
        initial_balance: Decimal,
    ) -> Result<Account, LedgerError> {
        let account = self
            .write(owner_id, |book, now| book.create_account(name, initial_balance, now))
            .await?;
        info!(
            owner_id = %owner_id,
            account_id = %account.id,
            initial_balance = %account.initial_balance,
            "Account created"
        );
        Ok(account)
    }

    /// Lists the owner's accounts in creation order.
    pub async fn list_accounts(&self, owner_id: UserId) -> Result<Vec<Account>, LedgerError> {
        self.read(owner_id, |book, _| Ok(book.accounts().to_vec())).await
    }

    // ========== Transactions ==========

    /// Records an income or expense.
    pub async fn create_transaction(
        &self,
        owner_id: UserId,
        input: &NewTransaction,
    ) -> Result<Transaction, LedgerError> {
        let entry = self
            .write(owner_id, |book, now| book.create_transaction(input, now))
            .await?;
        info!(
            owner_id = %owner_id,
            transaction_id = %entry.id,
            account_id = %entry.account_id,
            amount = %entry.amount,
            transaction_type = %entry.transaction_type,
            "Transaction created"
        );
        Ok(entry)
    }

    /// Amends an entry inside its edit window.
    pub async fn update_transaction(
        &self,
        owner_id: UserId,
        id: TransactionId,
        patch: &TransactionPatch,
    ) -> Result<Transaction, LedgerError> {
        let entry = self
            .write(owner_id, |book, now| book.update_transaction(id, patch, now))
            .await?;
        info!(
            owner_id = %owner_id,
            transaction_id = %entry.id,
            amount = %entry.amount,
            "Transaction updated"
        );
        Ok(entry)
    }

    /// Removes an entry, and its transfer counterpart, inside the edit window.
    pub async fn delete_transaction(
        &self,
        owner_id: UserId,
        id: TransactionId,
    ) -> Result<Vec<Transaction>, LedgerError> {
        let removed = self
            .write(owner_id, |book, now| book.delete_transaction(id, now))
            .await?;
        info!(
            owner_id = %owner_id,
            transaction_id = %id,
            removed = removed.len(),
            "Transaction deleted"
        );
        Ok(removed)
    }

    /// Lists entries matching `filter`, most recent first.
    pub async fn list_transactions(
        &self,
        owner_id: UserId,
        filter: &TransactionFilter,
    ) -> Result<Vec<Transaction>, LedgerError> {
        let entries = self
            .read(owner_id, |book, _| book.list_transactions(filter))
            .await?;
        debug!(owner_id = %owner_id, count = entries.len(), "Transactions listed");
        Ok(entries)
    }

    // ========== Transfers ==========

    /// Moves money between two of the owner's accounts as one unit.
    pub async fn transfer(
        &self,
        owner_id: UserId,
        request: &TransferRequest,
    ) -> Result<TransferReceipt, LedgerError> {
        let receipt = self
            .write(owner_id, |book, now| book.transfer(request, now))
            .await?;
        info!(
            owner_id = %owner_id,
            transfer_id = %receipt.transfer_id,
            from_account = %receipt.outgoing.account_id,
            to_account = %receipt.incoming.account_id,
            amount = %receipt.outgoing.amount,
            "Transfer completed"
        );
        Ok(receipt)
    }

    // ========== Summaries ==========

    /// Income and expense totals for the current calendar period.
    pub async fn summarize(
        &self,
        owner_id: UserId,
        period: SummaryPeriod,
    ) -> Result<Vec<TypeTotal>, LedgerError> {
        let timezone = self.settings.timezone;
        self.read(owner_id, |book, now| book.summarize(period, now, timezone))
            .await
    }

    /// All-time expense totals per category.
    pub async fn summarize_by_category(&self, owner_id: UserId) -> Result<Vec<CategoryTotal>, LedgerError> {
        self.read(owner_id, |book, _| Ok(book.summarize_by_category()))
            .await
    }

    /// Recomputes every balance of the owner and reports drift.
    pub async fn verify_balances(&self, owner_id: UserId) -> Result<Vec<BalanceDrift>, LedgerError> {
        let drift = self.read(owner_id, |book, _| Ok(book.verify_balances())).await?;
        if !drift.is_empty() {
            warn!(owner_id = %owner_id, accounts = drift.len(), "Balance drift detected");
        }
        Ok(drift)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SystemClock;
    use crate::test_database;
    use fintrack_core::ledger::{Division, TransactionType};
    use rust_decimal_macros::dec;

    async fn repository(settings: LedgerSettings) -> LedgerRepository {
        LedgerRepository::new(test_database().await, settings, Arc::new(SystemClock))
    }

    fn expense(account: &Account, amount: Decimal) -> NewTransaction {
        NewTransaction {
            transaction_type: TransactionType::Expense,
            amount,
            category: "Food".to_string(),
            division: Division::Personal,
            account: account.id.to_string(),
            description: None,
        }
    }

    #[test]
    fn test_settings_from_config() {
        let config = LedgerConfig {
            timezone: "Asia/Kolkata".to_string(),
            lock_max_attempts: 0,
            ..LedgerConfig::default()
        };
        let settings = LedgerSettings::from_config(&config).unwrap();
        assert_eq!(settings.timezone, Tz::Asia__Kolkata);
        assert_eq!(settings.lock_max_attempts, 1);
        assert_eq!(settings.lock_timeout, Duration::from_millis(250));
    }

    #[test]
    fn test_unknown_timezone_rejected() {
        let config = LedgerConfig {
            timezone: "Mars/Olympus".to_string(),
            ..LedgerConfig::default()
        };
        assert!(LedgerSettings::from_config(&config).is_err());
    }

    #[tokio::test]
    async fn test_held_lock_yields_conflict() {
        let repo = repository(LedgerSettings {
            lock_timeout: Duration::from_millis(20),
            lock_backoff: Duration::from_millis(1),
            ..LedgerSettings::default()
        })
        .await;
        let owner = UserId::new();
        repo.create_account(owner, "Cash", dec!(1000)).await.unwrap();

        let guard = repo.lock(owner).await.unwrap();
        let err = repo.list_accounts(owner).await.unwrap_err();
        assert!(matches!(err, LedgerError::ConcurrentModification));
        assert!(err.is_retryable());
        drop(guard);

        assert_eq!(repo.list_accounts(owner).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_huge_backoff_saturates_instead_of_overflowing() {
        let repo = repository(LedgerSettings {
            lock_timeout: Duration::from_millis(5),
            lock_max_attempts: 4,
            lock_backoff: Duration::MAX,
            ..LedgerSettings::default()
        })
        .await;
        let owner = UserId::new();
        let _guard = repo.lock(owner).await.unwrap();

        // Paused time lets the sleeps elapse instantly.
        tokio::time::pause();
        assert!(matches!(
            repo.lock(owner).await,
            Err(LedgerError::ConcurrentModification)
        ));
    }

    #[tokio::test]
    async fn test_owners_do_not_contend() {
        let repo = repository(LedgerSettings {
            lock_timeout: Duration::from_millis(20),
            ..LedgerSettings::default()
        })
        .await;
        let busy = UserId::new();
        let other = UserId::new();

        let _guard = repo.lock(busy).await.unwrap();
        let account = repo.create_account(other, "Cash", dec!(5)).await.unwrap();
        assert_eq!(account.balance, dec!(5));
    }

    #[tokio::test]
    async fn test_owners_are_isolated() {
        let repo = repository(LedgerSettings::default()).await;
        let alice = UserId::new();
        let bob = UserId::new();
        let cash = repo.create_account(alice, "Cash", dec!(100)).await.unwrap();

        let input = expense(&cash, dec!(10));
        assert!(matches!(
            repo.create_transaction(bob, &input).await,
            Err(LedgerError::AccountReferenceNotFound(_))
        ));

        let entry = repo.create_transaction(alice, &input).await.unwrap();
        assert!(matches!(
            repo.delete_transaction(bob, entry.id).await,
            Err(LedgerError::TransactionNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_stale_book_conflicts_then_reloads() {
        let db = test_database().await;
        let first = LedgerRepository::new(db.clone(), LedgerSettings::default(), Arc::new(SystemClock));
        let second = LedgerRepository::new(db, LedgerSettings::default(), Arc::new(SystemClock));
        let owner = UserId::new();

        first.create_account(owner, "Cash", dec!(10)).await.unwrap();
        assert_eq!(second.list_accounts(owner).await.unwrap().len(), 1);
        first.create_account(owner, "Bank", dec!(20)).await.unwrap();

        // `second` still holds the book from before "Bank" was added.
        let err = second.create_account(owner, "Wallet", dec!(5)).await.unwrap_err();
        assert!(matches!(err, LedgerError::ConcurrentModification));

        second.create_account(owner, "Wallet", dec!(5)).await.unwrap();
        let names: Vec<_> = second
            .list_accounts(owner)
            .await
            .unwrap()
            .into_iter()
            .map(|a| a.name)
            .collect();
        assert_eq!(names, ["Cash", "Bank", "Wallet"]);
    }

    #[tokio::test]
    async fn test_failed_operation_writes_nothing() {
        let db = test_database().await;
        let repo = LedgerRepository::new(db.clone(), LedgerSettings::default(), Arc::new(SystemClock));
        let owner = UserId::new();
        let cash = repo.create_account(owner, "Cash", dec!(100)).await.unwrap();

        assert!(repo.create_transaction(owner, &expense(&cash, dec!(-5))).await.is_err());
        let request = TransferRequest {
            from_account: "Cash".to_string(),
            to_account: "Nowhere".to_string(),
            amount: dec!(40),
            description: None,
        };
        assert!(repo.transfer(owner, &request).await.is_err());

        let fresh = LedgerRepository::new(db, LedgerSettings::default(), Arc::new(SystemClock));
        let accounts = fresh.list_accounts(owner).await.unwrap();
        assert_eq!(accounts[0].balance, dec!(100));
        let entries = fresh
            .list_transactions(owner, &TransactionFilter::default())
            .await
            .unwrap();
        assert!(entries.is_empty());
    }
}
