//! Pump that moves upstream deltas into a server-sent event body.
//!
//! A spawned task drains the upstream [`LlmStream`] and pushes framed events
//! into a bounded channel; the response body is the receiving end. The body
//! ends with a `[DONE]` event on success and with an error item when the
//! upstream fails mid-stream, so a truncated reply never looks complete.

use std::time::Instant;

use axum::response::sse::Event;
use folio_core::FolioError;
use folio_llm::{LlmStream, StreamChunk};
use futures::StreamExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{error, info};

use crate::dto::ContentFrame;

/// Events buffered between the pump and a slow client.
const RELAY_BUFFER: usize = 32;

/// Terminal marker sent after the last content frame.
pub const DONE_MARKER: &str = "[DONE]";

pub type EventStream = ReceiverStream<Result<Event, FolioError>>;

/// How a relay ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayOutcome {
    Completed { fragments: usize },
    UpstreamFailed { fragments: usize },
    ClientGone { fragments: usize },
}

#[derive(Debug, Default)]
struct UsageTally {
    input_tokens: u32,
    output_tokens: u32,
}

impl UsageTally {
    // Providers report usage piecemeal (Anthropic) or cumulatively (Gemini);
    // the latest non-zero figure wins in both cases.
    fn record(&mut self, input_tokens: u32, output_tokens: u32) {
        if input_tokens > 0 {
            self.input_tokens = input_tokens;
        }
        if output_tokens > 0 {
            self.output_tokens = output_tokens;
        }
    }
}

/// Spawns the pump for `upstream`, returning the event stream for the response body.
pub fn spawn_pump(upstream: LlmStream) -> (EventStream, JoinHandle<RelayOutcome>) {
    let (tx, rx) = mpsc::channel(RELAY_BUFFER);
    let handle = tokio::spawn(pump(upstream, tx));
    (ReceiverStream::new(rx), handle)
}

async fn pump(mut upstream: LlmStream, tx: mpsc::Sender<Result<Event, FolioError>>) -> RelayOutcome {
    let started = Instant::now();
    let mut fragments = 0usize;
    let mut usage = UsageTally::default();

    let outcome = loop {
        let next = tokio::select! {
            _ = tx.closed() => break RelayOutcome::ClientGone { fragments },
            next = upstream.next() => next,
        };

        match next {
            Some(Ok(StreamChunk::Content(delta))) => {
                let event = match content_event(&delta) {
                    Ok(event) => event,
                    Err(e) => {
                        let _ = tx.send(Err(e)).await;
                        break RelayOutcome::UpstreamFailed { fragments };
                    }
                };
                if tx.send(Ok(event)).await.is_err() {
                    break RelayOutcome::ClientGone { fragments };
                }
                fragments += 1;
            }
            Some(Ok(StreamChunk::Usage { input_tokens, output_tokens })) => {
                usage.record(input_tokens, output_tokens);
            }
            Some(Err(e)) => {
                error!("Upstream failed mid-stream after {} fragments: {}", fragments, e);
                let _ = tx.send(Err(e)).await;
                break RelayOutcome::UpstreamFailed { fragments };
            }
            None => {
                if tx.send(Ok(Event::default().data(DONE_MARKER))).await.is_err() {
                    break RelayOutcome::ClientGone { fragments };
                }
                break RelayOutcome::Completed { fragments };
            }
        }
    };

    info!(
        outcome = ?outcome,
        elapsed_ms = started.elapsed().as_millis() as u64,
        input_tokens = usage.input_tokens,
        output_tokens = usage.output_tokens,
        "relay finished"
    );

    outcome
}

fn content_event(delta: &str) -> Result<Event, FolioError> {
    Event::default()
        .json_data(ContentFrame { content: delta })
        .map_err(|e| FolioError::Internal(format!("failed to frame delta: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn upstream(items: Vec<Result<StreamChunk, FolioError>>) -> LlmStream {
        Box::pin(stream::iter(items))
    }

    #[tokio::test]
    async fn test_completes_with_done() {
        let (events, handle) = spawn_pump(upstream(vec![
            Ok(StreamChunk::Content("Hel".into())),
            Ok(StreamChunk::Usage { input_tokens: 10, output_tokens: 2 }),
            Ok(StreamChunk::Content("lo".into())),
        ]));

        let items: Vec<_> = events.collect().await;
        assert_eq!(items.len(), 3);
        assert!(items.iter().all(Result::is_ok));
        assert_eq!(handle.await.unwrap(), RelayOutcome::Completed { fragments: 2 });
    }

    #[tokio::test]
    async fn test_failure_ends_with_error_item() {
        let (events, handle) = spawn_pump(upstream(vec![
            Ok(StreamChunk::Content("partial".into())),
            Err(FolioError::UpstreamFailure("connection reset".into())),
            Ok(StreamChunk::Content("never".into())),
        ]));

        let items: Vec<_> = events.collect().await;
        assert_eq!(items.len(), 2);
        assert!(items[0].is_ok());
        assert_eq!(items[1].as_ref().err(), Some(&FolioError::UpstreamFailure("connection reset".into())));
        assert_eq!(handle.await.unwrap(), RelayOutcome::UpstreamFailed { fragments: 1 });
    }

    #[tokio::test]
    async fn test_stops_when_client_leaves() {
        let polled = Arc::new(AtomicUsize::new(0));
        let counter = polled.clone();
        let endless: LlmStream = Box::pin(stream::repeat_with(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(StreamChunk::Content("x".into()))
        }));

        let (mut events, handle) = spawn_pump(endless);
        assert!(events.next().await.is_some());
        drop(events);

        assert!(matches!(handle.await.unwrap(), RelayOutcome::ClientGone { .. }));
        let after_exit = polled.load(Ordering::SeqCst);
        tokio::task::yield_now().await;
        assert_eq!(polled.load(Ordering::SeqCst), after_exit);
    }

    #[test]
    fn test_usage_keeps_latest_nonzero() {
        let mut tally = UsageTally::default();
        tally.record(25, 0);
        tally.record(0, 15);
        tally.record(25, 40);
        assert_eq!((tally.input_tokens, tally.output_tokens), (25, 40));
    }
}
