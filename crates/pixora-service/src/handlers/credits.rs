//! Credit balance and history handlers.
//!
//! This is the ledger's read-only surface: no write path is exposed here.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use pixora_core::CreditTransaction;
use pixora_store::Store;

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::state::AppState;

/// Balance response.
#[derive(Debug, Serialize)]
pub struct BalanceResponse {
    /// Current spendable credits.
    pub credits: i64,
}

/// Get the current credit balance.
///
/// A user who has never generated or purchased anything simply has zero
/// credits; reads never create customer records.
pub async fn get_balance(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<Json<BalanceResponse>, ApiError> {
    let credits = state
        .store
        .find_customer_by_user(&auth.user_id)?
        .map_or(0, |customer| customer.credits);

    Ok(Json(BalanceResponse { credits }))
}

/// History query parameters.
#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    /// Maximum number of transactions to return (default: 50, max: 100).
    #[serde(default = "default_limit")]
    pub limit: usize,
    /// Offset for pagination (default: 0).
    #[serde(default)]
    pub offset: usize,
}

fn default_limit() -> usize {
    50
}

/// One transaction in the history response.
#[derive(Debug, Serialize)]
pub struct TransactionResponse {
    /// Transaction id.
    pub id: String,
    /// Signed amount (positive = add, negative = subtract).
    pub amount: i64,
    /// Transaction kind ("add" or "subtract").
    pub kind: pixora_core::TransactionKind,
    /// Description.
    pub description: String,
    /// External order/event reference, when the credit came from the
    /// payment provider.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_ref: Option<String>,
    /// Timestamp (RFC 3339).
    pub created_at: String,
}

impl From<&CreditTransaction> for TransactionResponse {
    fn from(tx: &CreditTransaction) -> Self {
        Self {
            id: tx.id.to_string(),
            amount: tx.amount,
            kind: tx.kind,
            description: tx.description.clone(),
            external_ref: tx.external_ref.clone(),
            created_at: tx.created_at.to_rfc3339(),
        }
    }
}

/// History response.
#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    /// Transactions, newest first.
    pub transactions: Vec<TransactionResponse>,
    /// Whether more transactions exist past this page.
    pub has_more: bool,
}

/// List the transaction history, newest first.
pub async fn list_history(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let Some(customer) = state.store.find_customer_by_user(&auth.user_id)? else {
        return Ok(Json(HistoryResponse {
            transactions: Vec::new(),
            has_more: false,
        }));
    };

    // Fetch one more than requested to determine has_more.
    let limit = query.limit.min(100);
    let transactions = state
        .store
        .list_transactions(&customer.id, limit + 1, query.offset)?;

    let has_more = transactions.len() > limit;
    let transactions: Vec<_> = transactions
        .iter()
        .take(limit)
        .map(TransactionResponse::from)
        .collect();

    Ok(Json(HistoryResponse {
        transactions,
        has_more,
    }))
}
