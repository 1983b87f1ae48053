use anyhow::{anyhow, Result};
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use shared::agent_api::{ChatMessage, StreamChunk};
use std::env;
use std::sync::mpsc::Sender;
use std::sync::LazyLock;
use std::time::Duration;

use crate::ChatStream;

static SHARED_HTTP: LazyLock<Client> = LazyLock::new(|| {
    Client::builder()
        .pool_max_idle_per_host(2)
        .build()
        .expect("failed to build HTTP client")
});

#[derive(Debug, Serialize)]
struct OllamaChatRequest<'a> {
    model: &'a str,
    messages: Vec<OllamaMessage>,
    stream: bool,
}

/// Streaming response: each line is one of these JSON objects.
#[derive(Debug, Deserialize)]
struct OllamaStreamChunk {
    message: Option<OllamaMessage>,
    #[serde(default)]
    done: bool,
}

#[derive(Debug, Serialize, Deserialize)]
struct OllamaMessage {
    role: String,
    content: String,
}

pub struct OllamaClient {
    http: Client,
    base: String,
    model: String,
}

impl OllamaClient {
    pub fn new(model: String, base_url: Option<String>) -> Self {
        let base = base_url
            .or_else(|| env::var("OLLAMA_BASE_URL").ok())
            .unwrap_or_else(|| "http://127.0.0.1:11434".to_string());
        Self {
            http: SHARED_HTTP.clone(),
            base,
            model,
        }
    }
}

#[async_trait]
impl ChatStream for OllamaClient {
    async fn stream_chat(
        &self,
        messages: Vec<ChatMessage>,
        tx: Sender<StreamChunk>,
    ) -> Result<()> {
        let conversation: Vec<OllamaMessage> = messages
            .into_iter()
            .map(|m| OllamaMessage {
                role: m.role.as_str().to_string(),
                content: m.content,
            })
            .collect();
        let url = format!("{}/api/chat", self.base);
        let req = OllamaChatRequest {
            model: &self.model,
            messages: conversation,
            stream: true,
        };
        let resp = self
            .http
            .post(url)
            .timeout(Duration::from_secs(600))
            .json(&req)
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(anyhow!("ollama error: {}", resp.status()));
        }

        // Ollama streams line-delimited JSON
        let mut stream = resp.bytes_stream();
        let mut buf = String::new();

        while let Some(chunk) = stream.next().await {
            let bytes = chunk.map_err(|e| anyhow!("stream read error: {}", e))?;
            buf.push_str(&String::from_utf8_lossy(&bytes));

            // Process complete lines
            while let Some(pos) = buf.find('\n') {
                let line = buf[..pos].trim().to_string();
                buf = buf[pos + 1..].to_string();

                if line.is_empty() {
                    continue;
                }

                match serde_json::from_str::<OllamaStreamChunk>(&line) {
                    Ok(chunk_data) => {
                        if let Some(msg) = &chunk_data.message {
                            if !msg.content.is_empty() {
                                let _ = tx.send(StreamChunk::Text(msg.content.clone()));
                            }
                        }
                        if chunk_data.done {
                            let _ = tx.send(StreamChunk::Done);
                            return Ok(());
                        }
                    }
                    Err(e) => {
                        tracing::warn!("unparseable ollama stream line: {}", e);
                        let _ = tx.send(StreamChunk::Error(format!(
                            "Failed to parse Ollama stream: {}",
                            e
                        )));
                        return Ok(());
                    }
                }
            }
        }

        let _ = tx.send(StreamChunk::Done);
        Ok(())
    }
}
