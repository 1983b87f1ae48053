//! Core application state.
//!
//! `AppState` owns the conversation log, the visible transcript, the editor
//! panel, and at most one active streaming session. Every mutation here runs
//! on the UI thread; the session worker only talks to us through the event
//! channel drained by [`AppState::poll_session_events`].

use crate::editor::EditorPanel;
use crate::session::{run_streaming_session, SessionEnd, SessionEvent, SessionOutcome};
use providers::{ChatStream, OllamaClient};
use services::code_blocks::{extract_code_blocks, unique_fragments};
use services::transcript::TranscriptWriter;
use shared::agent_api::ChatMessage;
use shared::settings::AppSettings;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{channel, Receiver};
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Request sent, no chunk received yet.
    Requesting,
    /// At least one chunk has arrived.
    Streaming,
}

/// UI-side handle to the in-flight session. The worker owns the accumulating
/// text; `streamed` mirrors it chunk by chunk for live code extraction.
pub struct ActiveSession {
    pub active: Arc<AtomicBool>,
    pub started_at: Instant,
    pub phase: SessionPhase,
    pub user_input: String,
    pub streamed: String,
    pub events_rx: Receiver<SessionEvent>,
}

pub struct AppState {
    pub settings: AppSettings,
    /// Append-only conversation log, replayed verbatim to the provider.
    pub chat_log: Vec<ChatMessage>,
    /// Visible transcript; only ever appended to.
    pub conversation_view: String,
    pub input_text: String,
    pub editors: EditorPanel,
    pub session: Option<ActiveSession>,
    pub show_settings: bool,
    pub settings_status: Option<String>,
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(crate::utils::load_settings_or_default())
    }
}

impl AppState {
    pub fn new(settings: AppSettings) -> Self {
        let debounce = Duration::from_millis(settings.highlight_debounce_ms);
        Self {
            settings,
            chat_log: Vec::new(),
            conversation_view: String::new(),
            input_text: String::new(),
            editors: EditorPanel::new(debounce),
            session: None,
            show_settings: false,
            settings_status: None,
        }
    }

    pub fn is_streaming(&self) -> bool {
        self.session.is_some()
    }

    /// Submit the input field. No-op on blank input or while a session is
    /// already active — one session at a time, enforced here.
    pub fn submit_message(&mut self) {
        if self.session.is_some() {
            return;
        }
        let user_input = self.input_text.trim().to_string();
        if user_input.is_empty() {
            return;
        }

        let code = self.editors.current_code().trim().to_string();
        let mut combined = user_input.clone();
        if !code.is_empty() {
            combined.push_str(&format!("\n\nCurrent code:\n```python\n{}\n```", code));
        }

        self.chat_log.push(ChatMessage::user(combined.clone()));
        self.conversation_view
            .push_str(&format!("You: {}\n\nAssistant: ", combined));
        self.input_text.clear();

        let source: Arc<dyn ChatStream> = Arc::new(OllamaClient::new(
            self.settings.model.clone(),
            self.settings.ollama_base_url.clone(),
        ));
        self.start_session(source, user_input);
    }

    pub fn start_session(&mut self, source: Arc<dyn ChatStream>, user_input: String) {
        let (event_tx, events_rx) = channel();
        let active = Arc::new(AtomicBool::new(true));
        let messages = self.chat_log.clone();

        let flag = active.clone();
        std::thread::spawn(move || run_streaming_session(source, messages, flag, event_tx));

        self.session = Some(ActiveSession {
            active,
            started_at: Instant::now(),
            phase: SessionPhase::Requesting,
            user_input,
            streamed: String::new(),
            events_rx,
        });
    }

    /// Lower the flag; the worker notices at the next chunk boundary and
    /// posts the terminal event, which finishes the teardown.
    pub fn cancel_session(&mut self) {
        if let Some(session) = &self.session {
            session.active.store(false, Ordering::SeqCst);
        }
    }

    /// Drain worker events, in posted order. Called once per frame.
    pub fn poll_session_events(&mut self) {
        let Some(session) = self.session.as_mut() else {
            return;
        };

        let mut ended = None;
        while let Ok(event) = session.events_rx.try_recv() {
            match event {
                SessionEvent::Chunk(text) => {
                    session.phase = SessionPhase::Streaming;
                    session.streamed.push_str(&text);
                    self.conversation_view.push_str(&text);
                    if self.settings.live_code_updates {
                        let fragments = extract_code_blocks(&session.streamed);
                        if let Some(last) = fragments.last() {
                            self.editors.set_current_text(&last.text);
                        }
                    }
                }
                SessionEvent::Ended(end) => {
                    ended = Some(end);
                    break;
                }
            }
        }

        if let Some(end) = ended {
            self.finalize_session(end);
        }
    }

    fn finalize_session(&mut self, end: SessionEnd) {
        let Some(session) = self.session.take() else {
            return;
        };
        let secs = end.elapsed.as_secs_f64();

        match end.outcome {
            SessionOutcome::Completed => {
                self.chat_log.push(ChatMessage::assistant(end.response.clone()));
                self.conversation_view
                    .push_str(&format!("\nElapsed time: {:.2}s\n\n", secs));
                self.open_code_tabs(&end.response);
                if let Some(path) = &self.settings.transcript_path {
                    let writer = TranscriptWriter::new(path);
                    if let Err(e) =
                        writer.append_turn(&session.user_input, &end.response, end.elapsed)
                    {
                        tracing::warn!("failed to append transcript: {}", e);
                    }
                }
            }
            SessionOutcome::Cancelled => {
                // Partial text still counts as a turn.
                if !end.response.is_empty() {
                    self.chat_log.push(ChatMessage::assistant(end.response.clone()));
                }
                self.conversation_view.push_str(&format!(
                    "\n[stream cancelled] Elapsed time: {:.2}s\n\n",
                    secs
                ));
                self.open_code_tabs(&end.response);
            }
            SessionOutcome::Failed(error) => {
                // No assistant message is committed on transport failure.
                tracing::warn!("stream failed: {}", error);
                self.conversation_view
                    .push_str(&format!("\nError: {}\n\n", error));
            }
        }
    }

    /// One new tab per unique extracted fragment.
    fn open_code_tabs(&mut self, response: &str) {
        let fragments = unique_fragments(extract_code_blocks(response));
        if !fragments.is_empty() {
            self.editors.open_fragments(&fragments);
        }
    }
}
