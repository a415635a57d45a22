//! Server-Sent Events for store change notifications

use axum::{
    extract::State,
    response::sse::{Event, Sse},
};
use futures::stream::Stream;
use std::convert::Infallible;

use crate::AppState;

/// GET /events
///
/// Streams every `ModerationEvent` so reviewer views can refresh.
pub async fn event_stream(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    vellum_common::sse::create_event_sse_stream("vellum-mq", &state.event_bus)
}
