//! Server-Sent Events channel endpoint
//!
//! Streams channel messages to one subscriber. The subscription is
//! registered on connect (which also queues the `initial` snapshot) and
//! torn down when the client goes away and the stream drops.

use axum::{
    extract::{Path, State},
    response::sse::{Event, KeepAlive, Sse},
};
use futures::stream::Stream;
use std::convert::Infallible;
use std::time::Duration;
use tracing::{debug, warn};
use uuid::Uuid;

use super::{error_response, ErrorBody};
use crate::state::AppState;

/// GET /matches/:match_id/events - SSE channel stream
pub async fn event_stream(
    State(state): State<AppState>,
    Path(match_id): Path<Uuid>,
) -> Result<
    Sse<impl Stream<Item = Result<Event, Infallible>>>,
    (axum::http::StatusCode, axum::Json<ErrorBody>),
> {
    let record = state
        .orchestrator
        .get(match_id)
        .await
        .map_err(|e| error_response(&e))?;

    let client_id = Uuid::new_v4();
    let mut subscription = state
        .channel
        .connect(&record, client_id)
        .await
        .map_err(|e| error_response(&e))?;

    debug!("SSE client {} attached to match {}", client_id, match_id);

    let stream = async_stream::stream! {
        // The stream owns the subscription; dropping it on client
        // disconnect unregisters the subscriber
        while let Some(message) = subscription.recv().await {
            match Event::default()
                .event(message.event_type())
                .json_data(&message)
            {
                Ok(event) => yield Ok(event),
                Err(e) => warn!("Failed to serialize channel message: {}", e),
            }
        }
    };

    Ok(Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    ))
}
