//! Chat providers. The app talks to models through the [`ChatStream`] seam;
//! Ollama is the only backend, streaming line-delimited JSON.

pub mod ollama;

pub use ollama::OllamaClient;

use async_trait::async_trait;
use shared::agent_api::{ChatMessage, StreamChunk};
use std::sync::mpsc::Sender;

/// A source of streamed chat responses.
///
/// Implementations push [`StreamChunk::Text`] fragments as they arrive,
/// followed by exactly one `Done` or `Error`. A transport failure before any
/// chunk can be reported either as an `Err` return or an `Error` chunk; the
/// session worker treats both the same way. Send failures on `tx` mean the
/// consumer walked away and must be ignored, not propagated.
#[async_trait]
pub trait ChatStream: Send + Sync {
    async fn stream_chat(
        &self,
        messages: Vec<ChatMessage>,
        tx: Sender<StreamChunk>,
    ) -> anyhow::Result<()>;
}
