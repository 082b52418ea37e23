use axum::{
    body::{Body, Bytes},
    extract::{rejection::JsonRejection, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use futures::StreamExt;
use postgen_llm::{ChatRequest, DeltaStream};
use postgen_types::{encode_event, Fragment, GenerateRequest, RelayPayload};
use std::convert::Infallible;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::Instrument;

use super::validate_request;
use crate::{error::ApiResult, state::AppState};

/// Message of the terminal event sent when the upstream breaks off mid-stream
pub const INTERRUPTED: &str = "Generation interrupted";

type EventSender = mpsc::Sender<Result<Bytes, Infallible>>;

/// Relay an upstream token stream to the caller as server-sent events
///
/// Headers are held back until the upstream yields its first text (or ends),
/// so failures before that point still produce a plain JSON error response.
pub async fn generate_stream(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<GenerateRequest>, JsonRejection>,
) -> ApiResult<Response> {
    let request = validate_request(payload)?;
    let request_id = uuid::Uuid::new_v4();
    let span = tracing::info_span!("relay", %request_id);

    let chat_request = ChatRequest::single_user(&state.config.llm.model, request.message);
    let mut upstream = state
        .llm_client
        .chat_stream(chat_request)
        .instrument(span.clone())
        .await?;

    let first = next_fragment(&mut upstream).instrument(span.clone()).await?;

    let (tx, rx) = mpsc::channel(state.config.llm.channel_capacity.max(1));
    tokio::spawn(relay(first, upstream, tx).instrument(span));

    let headers = [
        (header::CONTENT_TYPE, "text/event-stream"),
        (header::CACHE_CONTROL, "no-cache"),
        (header::CONNECTION, "keep-alive"),
    ];

    Ok((headers, Body::from_stream(ReceiverStream::new(rx))).into_response())
}

/// Pull deltas until one carries text. `Ok(None)` means the upstream is exhausted.
async fn next_fragment(upstream: &mut DeltaStream) -> anyhow::Result<Option<Fragment>> {
    while let Some(item) = upstream.next().await {
        let delta = item?;
        if let Some(text) = delta.non_empty_text() {
            return Ok(Some(Fragment::new(text)));
        }
    }
    Ok(None)
}

async fn relay(first: Option<Fragment>, mut upstream: DeltaStream, tx: EventSender) {
    let mut emitted = 0usize;
    let mut pending = first;

    loop {
        let fragment = match pending.take() {
            Some(fragment) => fragment,
            None => {
                // A stalled upstream must not keep the session open after the client left
                let next = tokio::select! {
                    biased;
                    _ = tx.closed() => None,
                    next = next_fragment(&mut upstream) => Some(next),
                };

                match next {
                    None => {
                        tracing::info!(emitted, "Client went away while waiting on upstream");
                        return;
                    }
                    Some(Ok(Some(fragment))) => fragment,
                    Some(Ok(None)) => break,
                    Some(Err(e)) => {
                        tracing::error!(emitted, "Upstream failed mid-stream: {:#}", e);
                        send(&tx, &RelayPayload::failure(INTERRUPTED)).await;
                        return;
                    }
                }
            }
        };

        if !send(&tx, &fragment.into()).await {
            tracing::info!(emitted, "Client went away, dropping upstream session");
            return;
        }
        emitted += 1;
    }

    tracing::info!(emitted, "Relay completed");
}

/// Frame and enqueue one event. Returns false once the receiver is gone.
async fn send(tx: &EventSender, payload: &RelayPayload) -> bool {
    let event = match encode_event(payload) {
        Ok(event) => event,
        Err(e) => {
            tracing::error!("Failed to encode relay event: {}", e);
            return false;
        }
    };

    tx.send(Ok(Bytes::from(event))).await.is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use postgen_llm::{ChatClient, ScriptedClient, Step};
    use std::time::Duration;

    async fn open(client: &ScriptedClient) -> DeltaStream {
        client
            .chat_stream(ChatRequest::single_user("m", "p"))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_next_fragment_skips_empty_deltas() {
        let client = ScriptedClient::new(vec![
            Step::Empty,
            Step::Text(String::new()),
            Step::Text("Grow".into()),
        ]);
        let mut upstream = open(&client).await;

        let first = next_fragment(&mut upstream).await.unwrap();
        assert_eq!(first, Some(Fragment::new("Grow")));
        assert_eq!(next_fragment(&mut upstream).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_relay_stops_when_receiver_dropped() {
        let client = ScriptedClient::from_texts(&["a", "b", "c"]);
        let upstream = open(&client).await;
        let (tx, rx) = mpsc::channel(1);
        drop(rx);

        // Returns instead of looping over the remaining upstream deltas
        relay(Some(Fragment::new("first")), upstream, tx).await;
    }

    #[tokio::test]
    async fn test_relay_drops_stalled_upstream_when_client_leaves() {
        let client =
            ScriptedClient::from_texts(&["b", "c", "d"]).with_delay(Duration::from_secs(10));
        let upstream = open(&client).await;
        let (tx, mut rx) = mpsc::channel(8);

        let task = tokio::spawn(relay(Some(Fragment::new("a")), upstream, tx));

        let first = rx.recv().await.unwrap().unwrap();
        assert_eq!(&first[..], b"data:{\"content\":\"a\"}\n\n");
        drop(rx);

        // The upstream would need 30s to finish its script
        tokio::time::timeout(Duration::from_secs(2), task)
            .await
            .expect("relay kept waiting on the upstream after the client left")
            .unwrap();
    }

    #[tokio::test]
    async fn test_relay_emits_failure_event_mid_stream() {
        let client = ScriptedClient::new(vec![
            Step::Text(" your".into()),
            Step::Fail("connection reset".into()),
            Step::Text("never".into()),
        ]);
        let upstream = open(&client).await;
        let (tx, rx) = mpsc::channel(8);

        relay(Some(Fragment::new("Grow")), upstream, tx).await;

        let events: Vec<String> = ReceiverStream::new(rx)
            .map(|item| String::from_utf8(item.unwrap().to_vec()).unwrap())
            .collect()
            .await;
        assert_eq!(
            events,
            vec![
                "data:{\"content\":\"Grow\"}\n\n".to_string(),
                "data:{\"content\":\" your\"}\n\n".to_string(),
                "data:{\"error\":\"Generation interrupted\"}\n\n".to_string(),
            ]
        );
    }
}
