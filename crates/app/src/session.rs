//! The streaming session worker.
//!
//! One `std::thread` per request. The worker owns the accumulating response
//! text and the blocking pull loop; the UI thread owns every widget and
//! buffer. They communicate only through channels: the provider task pushes
//! [`StreamChunk`]s into one, the worker posts [`SessionEvent`]s into another,
//! and the UI drains those once per frame in posted order. Cancellation is a
//! shared atomic flag polled before each chunk is processed — cooperative, so
//! a chunk in flight is never interrupted and the underlying stream is simply
//! abandoned.

use providers::ChatStream;
use shared::agent_api::{ChatMessage, StreamChunk};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Posted by the worker, drained by the UI loop.
#[derive(Debug)]
pub enum SessionEvent {
    /// One incremental text fragment — never the whole accumulated text.
    Chunk(String),
    /// Terminal event; exactly one per session.
    Ended(SessionEnd),
}

#[derive(Debug)]
pub struct SessionEnd {
    pub outcome: SessionOutcome,
    /// Full accumulated text at the moment the session ended.
    pub response: String,
    pub elapsed: Duration,
}

#[derive(Debug)]
pub enum SessionOutcome {
    Completed,
    Cancelled,
    Failed(String),
}

/// Run one request/response cycle to completion. Blocks the calling thread.
pub fn run_streaming_session(
    source: Arc<dyn ChatStream>,
    messages: Vec<ChatMessage>,
    active: Arc<AtomicBool>,
    events: Sender<SessionEvent>,
) {
    let started = Instant::now();

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            let _ = events.send(SessionEvent::Ended(SessionEnd {
                outcome: SessionOutcome::Failed(format!("Failed to start async runtime: {}", e)),
                response: String::new(),
                elapsed: started.elapsed(),
            }));
            return;
        }
    };

    let (chunk_tx, chunk_rx) = channel::<StreamChunk>();
    let _producer = rt.spawn(async move {
        if let Err(e) = source.stream_chat(messages, chunk_tx.clone()).await {
            let _ = chunk_tx.send(StreamChunk::Error(e.to_string()));
        }
    });

    let (response, outcome) = consume_chunks(&chunk_rx, &active, &events);
    let _ = events.send(SessionEvent::Ended(SessionEnd {
        outcome,
        response,
        elapsed: started.elapsed(),
    }));
    // Dropping the runtime abandons a still-streaming provider task.
}

/// Pull chunks until the stream ends or the flag is lowered.
///
/// The flag is checked once per chunk boundary, before processing, matching
/// the cancellation contract: the chunk being handled is never interrupted,
/// and nothing after it is consumed.
fn consume_chunks(
    chunks: &Receiver<StreamChunk>,
    active: &AtomicBool,
    events: &Sender<SessionEvent>,
) -> (String, SessionOutcome) {
    let mut accumulated = String::new();
    while let Ok(chunk) = chunks.recv() {
        if !active.load(Ordering::SeqCst) {
            return (accumulated, SessionOutcome::Cancelled);
        }
        match chunk {
            StreamChunk::Text(text) => {
                accumulated.push_str(&text);
                let _ = events.send(SessionEvent::Chunk(text));
            }
            StreamChunk::Done => return (accumulated, SessionOutcome::Completed),
            StreamChunk::Error(e) => return (accumulated, SessionOutcome::Failed(e)),
        }
    }
    // Producer hung up without a Done marker; treat as a natural end.
    (accumulated, SessionOutcome::Completed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct ScriptedSource {
        chunks: Vec<StreamChunk>,
        fail_after: bool,
    }

    #[async_trait]
    impl ChatStream for ScriptedSource {
        async fn stream_chat(
            &self,
            _messages: Vec<ChatMessage>,
            tx: std::sync::mpsc::Sender<StreamChunk>,
        ) -> anyhow::Result<()> {
            for chunk in self.chunks.clone() {
                let _ = tx.send(chunk);
            }
            if self.fail_after {
                anyhow::bail!("connection reset");
            }
            Ok(())
        }
    }

    fn drain(rx: &Receiver<SessionEvent>) -> (Vec<String>, Option<SessionEnd>) {
        let mut chunks = Vec::new();
        let mut ended = None;
        while let Ok(event) = rx.try_recv() {
            match event {
                SessionEvent::Chunk(c) => chunks.push(c),
                SessionEvent::Ended(e) => ended = Some(e),
            }
        }
        (chunks, ended)
    }

    #[test]
    fn two_chunks_arrive_as_two_incremental_events() {
        let source = Arc::new(ScriptedSource {
            chunks: vec![
                StreamChunk::Text("Hello".into()),
                StreamChunk::Text(" world".into()),
                StreamChunk::Done,
            ],
            fail_after: false,
        });
        let (tx, rx) = channel();
        run_streaming_session(source, Vec::new(), Arc::new(AtomicBool::new(true)), tx);

        let (chunks, ended) = drain(&rx);
        assert_eq!(chunks, ["Hello", " world"]);
        let ended = ended.expect("session must post a terminal event");
        assert!(matches!(ended.outcome, SessionOutcome::Completed));
        assert_eq!(ended.response, "Hello world");
    }

    #[test]
    fn provider_error_ends_the_session_as_failed() {
        let source = Arc::new(ScriptedSource {
            chunks: vec![StreamChunk::Text("partial".into())],
            fail_after: true,
        });
        let (tx, rx) = channel();
        run_streaming_session(source, Vec::new(), Arc::new(AtomicBool::new(true)), tx);

        let (chunks, ended) = drain(&rx);
        assert_eq!(chunks, ["partial"]);
        let ended = ended.unwrap();
        match ended.outcome {
            SessionOutcome::Failed(e) => assert!(e.contains("connection reset")),
            other => panic!("expected Failed, got {:?}", other),
        }
        assert_eq!(ended.response, "partial");
    }

    #[test]
    fn cancel_after_first_chunk_consumes_no_more() {
        let (chunk_tx, chunk_rx) = channel();
        let (event_tx, event_rx) = channel();
        let active = Arc::new(AtomicBool::new(true));

        let flag = active.clone();
        let worker =
            std::thread::spawn(move || consume_chunks(&chunk_rx, &flag, &event_tx));

        chunk_tx.send(StreamChunk::Text("one".into())).unwrap();
        // Receiving the event proves the worker finished processing chunk one.
        match event_rx.recv().unwrap() {
            SessionEvent::Chunk(c) => assert_eq!(c, "one"),
            other => panic!("expected a chunk event, got {:?}", other),
        }

        active.store(false, Ordering::SeqCst);
        chunk_tx.send(StreamChunk::Text("two".into())).unwrap();
        chunk_tx.send(StreamChunk::Text("three".into())).unwrap();

        let (accumulated, outcome) = worker.join().unwrap();
        assert_eq!(accumulated, "one");
        assert!(matches!(outcome, SessionOutcome::Cancelled));
        // No further chunk events were emitted after the cancel point.
        assert!(event_rx.try_recv().is_err());
    }

    #[test]
    fn producer_hangup_without_done_counts_as_completed() {
        let (chunk_tx, chunk_rx) = channel();
        let (event_tx, event_rx) = channel();
        chunk_tx.send(StreamChunk::Text("tail".into())).unwrap();
        drop(chunk_tx);

        let (accumulated, outcome) =
            consume_chunks(&chunk_rx, &AtomicBool::new(true), &event_tx);
        assert_eq!(accumulated, "tail");
        assert!(matches!(outcome, SessionOutcome::Completed));
        assert!(matches!(event_rx.try_recv(), Ok(SessionEvent::Chunk(_))));
    }
}
