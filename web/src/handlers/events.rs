//! `GET /{contentType}/events`

use crate::WebResult;
use crate::state::AppState;
use crate::validation::EventsParams;
use axum::{
    Json,
    extract::{Path, Query, State},
};
use event_reader_core::PublishEvent;

/// The most recent completed publish for a content type.
///
/// Requires `lastEvent=true`; `earliestTime` is optional.
///
/// # Errors
///
/// 400 for invalid parameters, 404 when nothing matched, 500 when the
/// search fails.
pub async fn last_event(
    State(state): State<AppState>,
    Path(content_type): Path<String>,
    Query(params): Query<EventsParams>,
) -> WebResult<Json<PublishEvent>> {
    let query = params.into_query(&content_type)?;
    let event = state.reader.get_last_event(&query).await?;
    Ok(Json(event))
}
