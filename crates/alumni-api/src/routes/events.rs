//! Server-Sent Events stream of mentorship activity for the caller.

use alumni_common::auth::Identity;
use axum::{
    Router,
    extract::{Extension, State},
    response::sse::{Event, KeepAlive, Sse},
    routing::get,
};
use futures_util::{Stream, StreamExt};
use std::{convert::Infallible, sync::Arc};
use tokio_stream::wrappers::{BroadcastStream, errors::BroadcastStreamRecvError};

use crate::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/events", get(stream_events))
}

/// GET /api/v1/events — events addressed to the caller, as they happen.
///
/// A subscriber that falls too far behind skips what it missed and carries on.
async fn stream_events(
    Extension(identity): Extension<Identity>,
    State(state): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let user_id = identity.user_id;
    tracing::debug!(user_id = %user_id, "Event stream opened");

    let stream = BroadcastStream::new(state.events.subscribe()).filter_map(move |item| async move {
        match item {
            Ok(event) if event.is_for(user_id) => Event::default()
                .event(&event.event_type)
                .json_data(&event)
                .ok()
                .map(Ok),
            Ok(_) => None,
            Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                tracing::debug!(user_id = %user_id, skipped, "Event stream lagged");
                None
            }
        }
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}
