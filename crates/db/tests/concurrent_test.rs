//! Concurrent access tests for the ledger repository.
//!
//! These tests verify that:
//! - Many simultaneous postings on one account lose no update
//! - Transfers racing edits never leave one leg applied
//! - A saturated owner yields a retryable conflict instead of blocking
//! - Two repositories sharing one database never overwrite each other

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tokio::sync::Barrier;

use fintrack_core::ledger::{
    Division, LedgerError, NewTransaction, TransactionFilter, TransactionType, TransferRequest,
};
use fintrack_db::{LedgerRepository, LedgerSettings, SystemClock};
use fintrack_shared::types::UserId;

mod common;

async fn repository(settings: LedgerSettings) -> LedgerRepository {
    LedgerRepository::new(common::database().await, settings, Arc::new(SystemClock))
}

/// Generous lock budget so contention alone never produces a conflict.
fn patient() -> LedgerSettings {
    LedgerSettings {
        lock_timeout: Duration::from_secs(10),
        lock_max_attempts: 5,
        ..LedgerSettings::default()
    }
}

fn posting(transaction_type: TransactionType, amount: Decimal, account: &str) -> NewTransaction {
    NewTransaction {
        transaction_type,
        amount,
        category: "Load".to_string(),
        division: Division::Personal,
        account: account.to_string(),
        description: None,
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_postings_on_same_account() {
    let repo = repository(patient()).await;
    let owner = UserId::new();
    repo.create_account(owner, "Cash", dec!(1000)).await.unwrap();

    let tasks = 100;
    let barrier = Arc::new(Barrier::new(tasks));
    let handles = (0..tasks).map(|i| {
        let repo = repo.clone();
        let barrier = Arc::clone(&barrier);
        tokio::spawn(async move {
            barrier.wait().await;
            let transaction_type = if i % 2 == 0 {
                TransactionType::Income
            } else {
                TransactionType::Expense
            };
            repo.create_transaction(owner, &posting(transaction_type, dec!(1.25), "Cash"))
                .await
        })
    });

    let results = join_all(handles).await;
    assert!(results.iter().all(|r| matches!(r, Ok(Ok(_)))));

    let accounts = repo.list_accounts(owner).await.unwrap();
    assert_eq!(accounts[0].balance, dec!(1000));
    let entries = repo
        .list_transactions(owner, &TransactionFilter::default())
        .await
        .unwrap();
    assert_eq!(entries.len(), tasks);
    assert!(repo.verify_balances(owner).await.unwrap().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_transfers_race_postings() {
    let repo = repository(patient()).await;
    let owner = UserId::new();
    repo.create_account(owner, "Cash", dec!(500)).await.unwrap();
    repo.create_account(owner, "Bank", dec!(500)).await.unwrap();

    let tasks = 100;
    let barrier = Arc::new(Barrier::new(tasks));
    let handles = (0..tasks).map(|i| {
        let repo = repo.clone();
        let barrier = Arc::clone(&barrier);
        tokio::spawn(async move {
            barrier.wait().await;
            if i % 2 == 0 {
                let (from, to) = if i % 4 == 0 { ("Cash", "Bank") } else { ("Bank", "Cash") };
                repo.transfer(
                    owner,
                    &TransferRequest {
                        from_account: from.to_string(),
                        to_account: to.to_string(),
                        amount: dec!(7),
                        description: None,
                    },
                )
                .await
                .map(|_| ())
            } else {
                repo.create_transaction(owner, &posting(TransactionType::Expense, dec!(1), "Bank"))
                    .await
                    .map(|_| ())
            }
        })
    });

    let results = join_all(handles).await;
    assert!(results.iter().all(|r| matches!(r, Ok(Ok(())))));

    // Transfers net to zero across both accounts; only the 50 expenses remain.
    let accounts = repo.list_accounts(owner).await.unwrap();
    let total: Decimal = accounts.iter().map(|a| a.balance).sum();
    assert_eq!(total, dec!(950));
    assert!(repo.verify_balances(owner).await.unwrap().is_empty());

    let entries = repo
        .list_transactions(owner, &TransactionFilter::default())
        .await
        .unwrap();
    assert_eq!(entries.iter().filter(|e| e.transfer_id.is_some()).count(), 100);
}

#[tokio::test]
async fn test_saturated_owner_gets_conflict() {
    let repo = repository(LedgerSettings {
        lock_timeout: Duration::from_millis(10),
        lock_max_attempts: 2,
        lock_backoff: Duration::from_millis(1),
        ..LedgerSettings::default()
    })
    .await;
    let owner = UserId::new();
    repo.create_account(owner, "Cash", dec!(1000)).await.unwrap();

    let input = posting(TransactionType::Expense, dec!(10), "Cash");
    let held = repo.lock(owner).await.unwrap();
    let attempts = join_all((0..5).map(|_| repo.create_transaction(owner, &input))).await;
    drop(held);

    for result in attempts {
        let err = result.unwrap_err();
        assert!(matches!(err, LedgerError::ConcurrentModification));
        assert_eq!(err.http_status_code(), 409);
    }

    let accounts = repo.list_accounts(owner).await.unwrap();
    assert_eq!(accounts[0].balance, dec!(1000));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_repositories_sharing_a_database_lose_no_update() {
    let db = common::database().await;
    let first = LedgerRepository::new(db.clone(), patient(), Arc::new(SystemClock));
    let second = LedgerRepository::new(db.clone(), patient(), Arc::new(SystemClock));
    let owner = UserId::new();
    first.create_account(owner, "Cash", dec!(100)).await.unwrap();

    let tasks = 40;
    let barrier = Arc::new(Barrier::new(tasks));
    let handles = (0..tasks).map(|i| {
        let repo = if i % 2 == 0 { first.clone() } else { second.clone() };
        let barrier = Arc::clone(&barrier);
        tokio::spawn(async move {
            barrier.wait().await;
            let input = posting(TransactionType::Expense, dec!(1), "Cash");
            let mut conflicts = 0_u32;
            loop {
                match repo.create_transaction(owner, &input).await {
                    Ok(_) => return Ok(conflicts),
                    Err(LedgerError::ConcurrentModification) => conflicts += 1,
                    Err(other) => return Err(other),
                }
            }
        })
    });

    let results = join_all(handles).await;
    assert!(results.iter().all(|r| matches!(r, Ok(Ok(_)))));

    let fresh = LedgerRepository::new(db, patient(), Arc::new(SystemClock));
    let accounts = fresh.list_accounts(owner).await.unwrap();
    assert_eq!(accounts[0].balance, dec!(60));
    let entries = fresh
        .list_transactions(owner, &TransactionFilter::default())
        .await
        .unwrap();
    assert_eq!(entries.len(), tasks);
    assert!(fresh.verify_balances(owner).await.unwrap().is_empty());
}
