//! `GET /{contentType}/transactions`

use crate::WebResult;
use crate::state::AppState;
use crate::validation::TransactionsParams;
use axum::{
    Json,
    extract::{Path, Query, State},
};
use event_reader_core::TransactionEvent;

/// Open publish transactions for a content type.
///
/// Query parameters: repeated `uuid`, `earliestTime`, `latestTime`.
/// `uuid` may repeat, so the query string is read as raw pairs.
///
/// # Errors
///
/// 400 for invalid parameters, 500 when the search fails.
pub async fn transactions(
    State(state): State<AppState>,
    Path(content_type): Path<String>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> WebResult<Json<Vec<TransactionEvent>>> {
    let query = TransactionsParams::from_pairs(pairs).into_query(&content_type)?;
    let transactions = state.reader.get_transactions(&query).await?;
    Ok(Json(transactions))
}
