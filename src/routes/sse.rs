use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
};
use futures_util::stream::{Stream, StreamExt};
use std::time::Duration;
use tokio_stream::wrappers::WatchStream;

use crate::AppState;

/// Streams the full snapshot on connect and after every slot or status write.
pub async fn handle_events(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, axum::Error>>> {
    let orch = state.orchestrator.clone();

    let stream = WatchStream::new(orch.subscribe()).then(move |_| {
        let orch = orch.clone();
        async move {
            let snap = orch.snapshot().await;
            Event::default().event("state").json_data(&snap)
        }
    });

    Sse::new(stream).keep_alive(KeepAlive::default().interval(Duration::from_secs(15)))
}
