//! Account, transaction, transfer and summary routes.
//!
//! Every handler is scoped to the authenticated owner; ids belonging to
//! another owner are indistinguishable from unknown ones.

use axum::{
    Json, Router,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
};
use chrono::{DateTime, Days, Duration, NaiveDate, Utc};
use chrono_tz::Tz;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::ApiResult;
use crate::{AppState, middleware::AuthUser};
use fintrack_core::ledger::summary::local_midnight;
use fintrack_core::ledger::{
    Account, CategoryTotal, Division, NewTransaction, SummaryPeriod, Transaction,
    TransactionFilter, TransactionPatch, TransactionType, TransferReceipt, TransferRequest,
    TypeTotal,
};
use fintrack_shared::AppError;
use fintrack_shared::types::TransactionId;

/// Creates the transaction routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/transactions", get(list_transactions).post(create_transaction))
        .route("/transactions/filter", get(filter_transactions))
        .route("/transactions/accounts", get(list_accounts).post(create_account))
        .route("/transactions/transfer", post(transfer))
        .route("/transactions/summary/category", get(summary_by_category))
        .route("/transactions/summary/{period}", get(summary_by_period))
        .route(
            "/transactions/{transaction_id}",
            put(update_transaction).delete(delete_transaction),
        )
}

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request body for opening an account.
#[derive(Debug, Deserialize)]
pub struct CreateAccountRequest {
    /// Account name.
    pub name: String,
    /// Opening balance.
    #[serde(default)]
    pub balance: Decimal,
}

/// Request body for amending a transaction. `type` and `account` are
/// accepted and ignored.
#[derive(Debug, Deserialize)]
pub struct UpdateTransactionRequest {
    /// New amount.
    pub amount: Option<Decimal>,
    /// New category.
    pub category: Option<String>,
    /// New division.
    pub division: Option<Division>,
    /// New description; empty clears it.
    pub description: Option<String>,
}

impl From<UpdateTransactionRequest> for TransactionPatch {
    fn from(request: UpdateTransactionRequest) -> Self {
        Self {
            amount: request.amount,
            category: request.category,
            division: request.division,
            description: request.description,
        }
    }
}

/// Query parameters for filtering. Empty values are ignored so that a
/// blank form field means "any".
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterQuery {
    /// Category, case-insensitive.
    pub category: Option<String>,
    /// `Personal` or `Office`.
    pub division: Option<String>,
    /// `income` or `expense`.
    #[serde(rename = "type")]
    pub transaction_type: Option<String>,
    /// Account id or name.
    pub account: Option<String>,
    /// First day (YYYY-MM-DD) in the reference timezone, inclusive.
    pub from: Option<String>,
    /// Last day (YYYY-MM-DD) in the reference timezone, inclusive.
    pub to: Option<String>,
    /// Lower bound instant (RFC 3339), inclusive.
    pub created_after: Option<String>,
    /// Upper bound instant (RFC 3339), inclusive.
    pub created_before: Option<String>,
}

fn present(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn parse_date(field: &str, value: &str) -> Result<NaiveDate, AppError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| AppError::Validation(format!("{field} must be a date (YYYY-MM-DD), got '{value}'")))
}

fn parse_instant(field: &str, value: &str) -> Result<DateTime<Utc>, AppError> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|_| AppError::Validation(format!("{field} must be an RFC 3339 timestamp, got '{value}'")))
}

fn day_start(field: &str, date: NaiveDate, tz: Tz) -> Result<DateTime<Utc>, AppError> {
    local_midnight(date, tz).ok_or_else(|| AppError::Validation(format!("{field} is out of range")))
}

/// Later of two optional lower bounds.
fn tighter_after(a: Option<DateTime<Utc>>, b: Option<DateTime<Utc>>) -> Option<DateTime<Utc>> {
    a.into_iter().chain(b).max()
}

/// Earlier of two optional upper bounds.
fn tighter_before(a: Option<DateTime<Utc>>, b: Option<DateTime<Utc>>) -> Option<DateTime<Utc>> {
    a.into_iter().chain(b).min()
}

impl FilterQuery {
    /// Converts query parameters into a ledger filter. Date-only bounds
    /// cover whole days in `tz`.
    pub fn into_filter(self, tz: Tz) -> ApiResult<TransactionFilter> {
        let division = present(self.division)
            .map(|d| d.parse::<Division>())
            .transpose()?;
        let transaction_type = present(self.transaction_type)
            .map(|t| t.parse::<TransactionType>())
            .transpose()?;

        let from = present(self.from)
            .map(|v| parse_date("from", &v).and_then(|d| day_start("from", d, tz)))
            .transpose()?;
        let to = present(self.to)
            .map(|v| {
                let day = parse_date("to", &v)?;
                let next = day
                    .checked_add_days(Days::new(1))
                    .ok_or_else(|| AppError::Validation("to is out of range".to_string()))?;
                Ok::<_, AppError>(day_start("to", next, tz)? - Duration::nanoseconds(1))
            })
            .transpose()?;
        let created_after = present(self.created_after)
            .map(|v| parse_instant("createdAfter", &v))
            .transpose()?;
        let created_before = present(self.created_before)
            .map(|v| parse_instant("createdBefore", &v))
            .transpose()?;

        Ok(TransactionFilter {
            category: present(self.category),
            division,
            transaction_type,
            account: present(self.account),
            created_after: tighter_after(from, created_after),
            created_before: tighter_before(to, created_before),
        })
    }
}

/// Response body for a delete.
#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    /// Human-readable outcome.
    pub message: &'static str,
    /// Every removed entry; two for a transfer leg.
    pub deleted: Vec<TransactionId>,
}

// ============================================================================
// Accounts
// ============================================================================

/// GET /transactions/accounts - List the owner's accounts.
async fn list_accounts(State(state): State<AppState>, user: AuthUser) -> ApiResult<Json<Vec<Account>>> {
    Ok(Json(state.ledger.list_accounts(user.user_id()).await?))
}

/// POST /transactions/accounts - Open an account.
async fn create_account(
    State(state): State<AppState>,
    user: AuthUser,
    payload: Result<Json<CreateAccountRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(payload) = payload?;
    let account = state
        .ledger
        .create_account(user.user_id(), &payload.name, payload.balance)
        .await?;
    Ok((StatusCode::CREATED, Json(account)))
}

// ============================================================================
// Transactions
// ============================================================================

/// GET /transactions - Every entry of the owner, most recent first.
async fn list_transactions(State(state): State<AppState>, user: AuthUser) -> ApiResult<Json<Vec<Transaction>>> {
    let entries = state
        .ledger
        .list_transactions(user.user_id(), &TransactionFilter::default())
        .await?;
    Ok(Json(entries))
}

/// GET /transactions/filter - Entries matching the query, most recent first.
async fn filter_transactions(
    State(state): State<AppState>,
    user: AuthUser,
    query: Result<Query<FilterQuery>, QueryRejection>,
) -> ApiResult<Json<Vec<Transaction>>> {
    let Query(query) = query?;
    let filter = query.into_filter(state.ledger.timezone())?;
    Ok(Json(state.ledger.list_transactions(user.user_id(), &filter).await?))
}

/// POST /transactions - Record an income or expense.
async fn create_transaction(
    State(state): State<AppState>,
    user: AuthUser,
    payload: Result<Json<NewTransaction>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(payload) = payload?;
    let entry = state.ledger.create_transaction(user.user_id(), &payload).await?;
    Ok((StatusCode::CREATED, Json(entry)))
}

/// Ids that are not UUIDs cannot exist, so they are reported as not found.
fn parse_transaction_id(raw: &str) -> Result<TransactionId, AppError> {
    raw.parse::<TransactionId>()
        .map_err(|_| AppError::NotFound(format!("Transaction not found: {raw}")))
}

/// PUT /transactions/{transaction_id} - Amend an entry inside its edit window.
async fn update_transaction(
    State(state): State<AppState>,
    user: AuthUser,
    Path(transaction_id): Path<String>,
    payload: Result<Json<UpdateTransactionRequest>, JsonRejection>,
) -> ApiResult<Json<Transaction>> {
    let id = parse_transaction_id(&transaction_id)?;
    let Json(payload) = payload?;
    let patch = TransactionPatch::from(payload);
    let entry = state.ledger.update_transaction(user.user_id(), id, &patch).await?;
    Ok(Json(entry))
}

/// DELETE /transactions/{transaction_id} - Remove an entry inside its edit window.
async fn delete_transaction(
    State(state): State<AppState>,
    user: AuthUser,
    Path(transaction_id): Path<String>,
) -> ApiResult<Json<DeleteResponse>> {
    let id = parse_transaction_id(&transaction_id)?;
    let removed = state.ledger.delete_transaction(user.user_id(), id).await?;
    Ok(Json(DeleteResponse {
        message: "Transaction deleted",
        deleted: removed.into_iter().map(|e| e.id).collect(),
    }))
}

// ============================================================================
// Transfers
// ============================================================================

/// POST /transactions/transfer - Move money between two accounts.
async fn transfer(
    State(state): State<AppState>,
    user: AuthUser,
    payload: Result<Json<TransferRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(payload) = payload?;
    let receipt: TransferReceipt = state.ledger.transfer(user.user_id(), &payload).await?;
    Ok((StatusCode::CREATED, Json(receipt)))
}

// ============================================================================
// Summaries
// ============================================================================

/// GET /transactions/summary/{period} - Totals per type for the current period.
async fn summary_by_period(
    State(state): State<AppState>,
    user: AuthUser,
    Path(period): Path<String>,
) -> ApiResult<Json<Vec<TypeTotal>>> {
    let period = period.parse::<SummaryPeriod>()?;
    Ok(Json(state.ledger.summarize(user.user_id(), period).await?))
}

/// GET /transactions/summary/category - All-time expense totals per category.
async fn summary_by_category(
    State(state): State<AppState>,
    user: AuthUser,
) -> ApiResult<Json<Vec<CategoryTotal>>> {
    Ok(Json(state.ledger.summarize_by_category(user.user_id()).await?))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn test_blank_query_fields_are_ignored() {
        let query = FilterQuery {
            category: Some(String::new()),
            division: Some("  ".to_string()),
            from: Some(String::new()),
            ..FilterQuery::default()
        };
        assert_eq!(query.into_filter(Tz::UTC).unwrap(), TransactionFilter::default());
    }

    #[test]
    fn test_date_bounds_cover_whole_days() {
        let query = FilterQuery {
            from: Some("2024-05-01".to_string()),
            to: Some("2024-05-31".to_string()),
            ..FilterQuery::default()
        };
        let filter = query.into_filter(Tz::Asia__Kolkata).unwrap();
        assert_eq!(filter.created_after, Some(at("2024-04-30T18:30:00Z")));
        assert_eq!(
            filter.created_before,
            Some(at("2024-05-31T18:30:00Z") - Duration::nanoseconds(1))
        );
    }

    #[test]
    fn test_tightest_bound_wins() {
        let query = FilterQuery {
            from: Some("2024-05-01".to_string()),
            created_after: Some("2024-05-10T00:00:00Z".to_string()),
            ..FilterQuery::default()
        };
        let filter = query.into_filter(Tz::UTC).unwrap();
        assert_eq!(filter.created_after, Some(at("2024-05-10T00:00:00Z")));
    }

    #[test]
    fn test_bad_query_values_rejected() {
        let bad_date = FilterQuery {
            from: Some("01/05/2024".to_string()),
            ..FilterQuery::default()
        };
        assert!(bad_date.into_filter(Tz::UTC).is_err());

        let bad_division = FilterQuery {
            division: Some("home".to_string()),
            ..FilterQuery::default()
        };
        assert!(bad_division.into_filter(Tz::UTC).is_err());
    }
}
