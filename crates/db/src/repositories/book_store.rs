//! Loading and saving ledger books.
//!
//! A book is stored as its owner's `ledger_books` row plus account and
//! transaction rows. Saving writes only what a unit of work touched, inside
//! one database transaction, and only if the owner's row still carries the
//! version the book was loaded at. A writer that lost that race gets
//! [`StoreError::Stale`] and must reload.

use rust_decimal::Decimal;
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, QueryOrder,
    Set, SqlErr, TransactionTrait,
};
use thiserror::Error;

use fintrack_core::ledger::{Account, Book, ChangeSet, EditWindow, LedgerError, Transaction};
use fintrack_shared::types::{AccountId, TransactionId, TransferId, UserId};

use crate::entities::{accounts, ledger_books, transactions};

/// Errors from loading or saving a book.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Another writer committed since the book was loaded.
    #[error("ledger of owner {0} was changed by another writer")]
    Stale(UserId),

    /// The database rejected a statement.
    #[error("database error: {0}")]
    Database(#[from] DbErr),

    /// A stored row cannot be turned back into a domain value.
    #[error("corrupt ledger row: {0}")]
    Corrupt(String),
}

impl From<StoreError> for LedgerError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Stale(_) => Self::ConcurrentModification,
            other => Self::Internal(other.to_string()),
        }
    }
}

/// Loads the owner's book and the version it was stored at. An owner seen
/// for the first time gets an empty book at version 0.
///
/// # Errors
///
/// Returns `Stale` if another writer registered the owner concurrently.
/// Unreadable rows give `Corrupt`.
pub async fn load(
    db: &DatabaseConnection,
    owner_id: UserId,
    window: EditWindow,
) -> Result<(Book, i64), StoreError> {
    let owner = owner_id.into_inner();
    let version = match ledger_books::Entity::find_by_id(owner).one(db).await? {
        Some(row) => row.version,
        None => {
            let row = ledger_books::ActiveModel {
                owner_id: Set(owner),
                version: Set(0),
            };
            ledger_books::Entity::insert(row)
                .exec_without_returning(db)
                .await
                .map_err(|err| match err.sql_err() {
                    Some(SqlErr::UniqueConstraintViolation(_)) => StoreError::Stale(owner_id),
                    _ => StoreError::Database(err),
                })?;
            0
        }
    };

    let accounts = accounts::Entity::find()
        .filter(accounts::Column::OwnerId.eq(owner))
        .order_by_asc(accounts::Column::Position)
        .all(db)
        .await?
        .into_iter()
        .map(account_from_row)
        .collect::<Result<Vec<_>, _>>()?;

    let entries = transactions::Entity::find()
        .filter(transactions::Column::OwnerId.eq(owner))
        .order_by_asc(transactions::Column::Sequence)
        .all(db)
        .await?
        .into_iter()
        .map(entry_from_row)
        .collect::<Result<Vec<_>, _>>()?;

    Ok((Book::restore(owner_id, window, accounts, entries), version))
}

/// Writes the rows named in `changes` as they now stand in `book` and
/// returns the new version.
///
/// # Errors
///
/// Returns `Stale` if the stored version moved past `loaded_version`; no
/// row is written in that case.
pub async fn save(
    db: &DatabaseConnection,
    book: &Book,
    loaded_version: i64,
    changes: &ChangeSet,
) -> Result<i64, StoreError> {
    let owner_id = book.owner_id();
    let txn = db.begin().await?;

    let bumped = ledger_books::Entity::update_many()
        .col_expr(
            ledger_books::Column::Version,
            Expr::col(ledger_books::Column::Version).add(1),
        )
        .filter(ledger_books::Column::OwnerId.eq(owner_id.into_inner()))
        .filter(ledger_books::Column::Version.eq(loaded_version))
        .exec(&txn)
        .await?;
    if bumped.rows_affected == 0 {
        txn.rollback().await?;
        return Err(StoreError::Stale(owner_id));
    }

    for id in &changes.accounts {
        match book.accounts().iter().position(|a| a.id == *id) {
            Some(position) => upsert_account(&txn, &book.accounts()[position], position).await?,
            None => {
                accounts::Entity::delete_by_id(id.into_inner()).exec(&txn).await?;
            }
        }
    }

    for id in &changes.entries {
        match book.transaction(*id) {
            Ok(entry) => upsert_entry(&txn, entry).await?,
            Err(_) => {
                transactions::Entity::delete_by_id(id.into_inner()).exec(&txn).await?;
            }
        }
    }

    txn.commit().await?;
    Ok(loaded_version + 1)
}

async fn upsert_account<C: ConnectionTrait>(
    db: &C,
    account: &Account,
    position: usize,
) -> Result<(), StoreError> {
    let position = i64::try_from(position)
        .map_err(|_| StoreError::Corrupt(format!("account position {position} out of range")))?;
    let row = accounts::ActiveModel {
        id: Set(account.id.into_inner()),
        owner_id: Set(account.owner_id.into_inner()),
        name: Set(account.name.clone()),
        initial_balance: Set(account.initial_balance.to_string()),
        balance: Set(account.balance.to_string()),
        position: Set(position),
        created_at: Set(account.created_at),
    };

    accounts::Entity::insert(row)
        .on_conflict(
            OnConflict::column(accounts::Column::Id)
                .update_columns([accounts::Column::Name, accounts::Column::Balance])
                .to_owned(),
        )
        .exec_without_returning(db)
        .await?;
    Ok(())
}

async fn upsert_entry<C: ConnectionTrait>(db: &C, entry: &Transaction) -> Result<(), StoreError> {
    let sequence = i64::try_from(entry.sequence)
        .map_err(|_| StoreError::Corrupt(format!("sequence {} out of range", entry.sequence)))?;
    let row = transactions::ActiveModel {
        id: Set(entry.id.into_inner()),
        owner_id: Set(entry.owner_id.into_inner()),
        transaction_type: Set(entry.transaction_type.as_str().to_string()),
        amount: Set(entry.amount.to_string()),
        category: Set(entry.category.clone()),
        division: Set(entry.division.as_str().to_string()),
        account_id: Set(entry.account_id.into_inner()),
        account_name: Set(entry.account.clone()),
        description: Set(entry.description.clone()),
        transfer_id: Set(entry.transfer_id.map(TransferId::into_inner)),
        sequence: Set(sequence),
        created_at: Set(entry.created_at),
        updated_at: Set(entry.updated_at),
    };

    transactions::Entity::insert(row)
        .on_conflict(
            OnConflict::column(transactions::Column::Id)
                .update_columns([
                    transactions::Column::Amount,
                    transactions::Column::Category,
                    transactions::Column::Division,
                    transactions::Column::Description,
                    transactions::Column::UpdatedAt,
                ])
                .to_owned(),
        )
        .exec_without_returning(db)
        .await?;
    Ok(())
}

fn decimal(raw: &str) -> Result<Decimal, StoreError> {
    raw.parse()
        .map_err(|_| StoreError::Corrupt(format!("'{raw}' is not a decimal amount")))
}

fn account_from_row(row: accounts::Model) -> Result<Account, StoreError> {
    Ok(Account {
        id: AccountId::from_uuid(row.id),
        owner_id: UserId::from_uuid(row.owner_id),
        initial_balance: decimal(&row.initial_balance)?,
        balance: decimal(&row.balance)?,
        name: row.name,
        created_at: row.created_at,
    })
}

fn entry_from_row(row: transactions::Model) -> Result<Transaction, StoreError> {
    let corrupt = |err: LedgerError| StoreError::Corrupt(err.to_string());
    Ok(Transaction {
        id: TransactionId::from_uuid(row.id),
        owner_id: UserId::from_uuid(row.owner_id),
        transaction_type: row.transaction_type.parse().map_err(corrupt)?,
        amount: decimal(&row.amount)?,
        division: row.division.parse().map_err(corrupt)?,
        account_id: AccountId::from_uuid(row.account_id),
        sequence: u64::try_from(row.sequence)
            .map_err(|_| StoreError::Corrupt(format!("negative sequence {}", row.sequence)))?,
        category: row.category,
        account: row.account_name,
        description: row.description,
        transfer_id: row.transfer_id.map(TransferId::from_uuid),
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}
