//! Property-based tests for the ledger book.
//!
//! - Balance consistency: after any sequence of creates, updates, deletes and
//!   transfers, every balance equals its projection from the ledger.
//! - Failed operations leave the book exactly as it was.

use chrono::{DateTime, Duration, Utc};
use proptest::prelude::*;
use rust_decimal::Decimal;
use fintrack_shared::types::UserId;

use super::book::Book;
use super::types::{
    Division, NewTransaction, TransactionFilter, TransactionPatch, TransactionType, TransferRequest,
};
use super::window::EditWindow;

const ACCOUNTS: [&str; 3] = ["Cash", "Bank", "Card"];

/// Strategy to generate positive amounts (0.01 to 10,000.00).
fn positive_amount() -> impl Strategy<Value = Decimal> {
    (1i64..1_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

/// Strategy to generate opening balances, negative ones included.
fn opening_balance() -> impl Strategy<Value = Decimal> {
    (-100_000i64..1_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

/// Strategy to generate transaction types.
fn type_strategy() -> impl Strategy<Value = TransactionType> {
    prop_oneof![Just(TransactionType::Income), Just(TransactionType::Expense)]
}

#[derive(Debug, Clone)]
enum Op {
    Create { account: usize, transaction_type: TransactionType, amount: Decimal },
    Update { pick: usize, amount: Decimal },
    Delete { pick: usize },
    Transfer { from: usize, to: usize, amount: Decimal },
    Advance { hours: i64 },
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (0..ACCOUNTS.len(), type_strategy(), positive_amount())
            .prop_map(|(account, transaction_type, amount)| Op::Create { account, transaction_type, amount }),
        2 => (any::<usize>(), positive_amount()).prop_map(|(pick, amount)| Op::Update { pick, amount }),
        2 => any::<usize>().prop_map(|pick| Op::Delete { pick }),
        2 => (0..ACCOUNTS.len(), 0..ACCOUNTS.len(), positive_amount())
            .prop_map(|(from, to, amount)| Op::Transfer { from, to, amount }),
        1 => (1i64..8).prop_map(|hours| Op::Advance { hours }),
    ]
}

fn start() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2024-05-01T08:00:00Z")
        .map(|t| t.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

fn seeded_book(openings: &[Decimal]) -> Book {
    let mut book = Book::new(UserId::new(), EditWindow::default());
    for (name, opening) in ACCOUNTS.iter().zip(openings) {
        book.create_account(name, *opening, start()).unwrap();
    }
    book
}

fn apply(book: &mut Book, op: &Op, now: &mut DateTime<Utc>) -> bool {
    let entries = book.list_transactions(&TransactionFilter::default()).unwrap();
    match op {
        Op::Create { account, transaction_type, amount } => book
            .create_transaction(
                &NewTransaction {
                    transaction_type: *transaction_type,
                    amount: *amount,
                    category: "Prop".to_string(),
                    division: Division::Personal,
                    account: ACCOUNTS[*account].to_string(),
                    description: None,
                },
                *now,
            )
            .is_ok(),
        Op::Update { pick, amount } if !entries.is_empty() => {
            let id = entries[pick % entries.len()].id;
            let patch = TransactionPatch {
                amount: Some(*amount),
                ..TransactionPatch::default()
            };
            book.update_transaction(id, &patch, *now).is_ok()
        }
        Op::Delete { pick } if !entries.is_empty() => {
            let id = entries[pick % entries.len()].id;
            book.delete_transaction(id, *now).is_ok()
        }
        Op::Transfer { from, to, amount } => book
            .transfer(
                &TransferRequest {
                    from_account: ACCOUNTS[*from].to_string(),
                    to_account: ACCOUNTS[*to].to_string(),
                    amount: *amount,
                    description: None,
                },
                *now,
            )
            .is_ok(),
        Op::Advance { hours } => {
            *now += Duration::hours(*hours);
            true
        }
        Op::Update { .. } | Op::Delete { .. } => false,
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Balance consistency holds after every operation, successful or not.
    #[test]
    fn prop_balances_match_projection(
        openings in prop::collection::vec(opening_balance(), ACCOUNTS.len()),
        ops in prop::collection::vec(op_strategy(), 1..40),
    ) {
        let mut book = seeded_book(&openings);
        let mut now = start();

        for op in &ops {
            apply(&mut book, op, &mut now);
            let drift = book.verify_balances();
            prop_assert!(drift.is_empty(), "drift after {:?}: {:?}", op, drift);
        }
    }

    /// Transfers never leave an unpaired leg.
    #[test]
    fn prop_transfer_legs_always_paired(
        ops in prop::collection::vec(op_strategy(), 1..40),
    ) {
        let mut book = seeded_book(&[Decimal::ZERO; 3]);
        let mut now = start();
        for op in &ops {
            apply(&mut book, op, &mut now);
        }

        let entries = book.list_transactions(&TransactionFilter::default()).unwrap();
        for entry in entries.iter().filter(|e| e.transfer_id.is_some()) {
            let legs: Vec<_> = entries
                .iter()
                .filter(|e| e.transfer_id == entry.transfer_id)
                .collect();
            prop_assert_eq!(legs.len(), 2);
            prop_assert_eq!(legs[0].amount, legs[1].amount);
            prop_assert_ne!(legs[0].transaction_type, legs[1].transaction_type);
        }
    }

    /// A rejected operation changes nothing.
    #[test]
    fn prop_failed_operation_is_noop(
        ops in prop::collection::vec(op_strategy(), 1..30),
        amount in positive_amount(),
    ) {
        let mut book = seeded_book(&[Decimal::ONE_HUNDRED; 3]);
        let mut now = start();
        for op in &ops {
            apply(&mut book, op, &mut now);
        }

        let before_entries = book.list_transactions(&TransactionFilter::default()).unwrap();
        let before_accounts = book.accounts().to_vec();

        let same_account = TransferRequest {
            from_account: "Cash".to_string(),
            to_account: "cash".to_string(),
            amount,
            description: None,
        };
        prop_assert!(book.transfer(&same_account, now).is_err());

        let locked_out = now + Duration::hours(13);
        if let Some(entry) = before_entries.first() {
            prop_assert!(book.delete_transaction(entry.id, locked_out).is_err());
        }

        prop_assert_eq!(book.list_transactions(&TransactionFilter::default()).unwrap(), before_entries);
        prop_assert_eq!(book.accounts().to_vec(), before_accounts);
    }
}
