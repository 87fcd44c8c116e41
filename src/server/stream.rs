use axum::extract::State;
use axum::response::sse::{Event, Sse};
use futures_util::stream::{self, Stream};
use std::convert::Infallible;

use super::AppState;
use crate::hub::{HubMessage, Subscription};
use crate::protocol::{SSE_HEARTBEAT_EVENT, SSE_MESSAGE_EVENT};

/// `GET /voice/stream`: one SSE frame per hub message. The subscription is
/// dropped, and so unregistered, when the client disconnects.
pub(super) async fn voice_stream(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let subscription = state.hub.subscribe();
    tracing::debug!(subscriber = subscription.id(), "stream client connected");
    Sse::new(event_stream(subscription))
}

fn event_stream(subscription: Subscription) -> impl Stream<Item = Result<Event, Infallible>> {
    stream::unfold(subscription, |mut subscription| async move {
        let message = subscription.next().await?;
        Some((Ok(to_sse(message)), subscription))
    })
}

fn to_sse(message: HubMessage) -> Event {
    match message {
        HubMessage::Event(event) => Event::default()
            .event(SSE_MESSAGE_EVENT)
            .data(event.to_json()),
        HubMessage::Heartbeat => Event::default().event(SSE_HEARTBEAT_EVENT).data("{}"),
    }
}
