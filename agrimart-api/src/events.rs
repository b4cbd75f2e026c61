use std::convert::Infallible;
use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
    routing::get,
    Extension, Router,
};
use futures_util::Stream;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;
use agrimart_core::Actor;

use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/v1/events", get(stream_events))
}

/// GET /v1/events
/// Committed domain events as server-sent events. Admins see everything,
/// everyone else only events that name them.
async fn stream_events(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.events.subscribe();
    tracing::debug!(user_id = %actor.user_id, "Event stream opened");

    let stream = BroadcastStream::new(rx).filter_map(move |msg| {
        let event = match msg {
            Ok(event) => event,
            Err(e) => {
                tracing::warn!(user_id = %actor.user_id, "Event stream lagging: {}", e);
                return None;
            }
        };
        if !actor.is_admin() && !event.involves(actor.user_id) {
            return None;
        }
        match Event::default().event(event.name()).json_data(&event) {
            Ok(sse) => Some(Ok(sse)),
            Err(e) => {
                tracing::error!("Failed to serialize {}: {}", event.name(), e);
                None
            }
        }
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}
