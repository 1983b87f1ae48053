pub mod agent_api {
    use serde::{Deserialize, Serialize};

    /// Who authored a message. The conversation log is replayed verbatim
    /// to the provider, so serialization must match the chat API wire names.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "lowercase")]
    pub enum Role {
        User,
        Assistant,
    }

    impl Role {
        pub fn as_str(&self) -> &'static str {
            match self {
                Role::User => "user",
                Role::Assistant => "assistant",
            }
        }
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct ChatMessage {
        pub role: Role,
        pub content: String,
    }

    impl ChatMessage {
        pub fn user(content: impl Into<String>) -> Self {
            Self {
                role: Role::User,
                content: content.into(),
            }
        }

        pub fn assistant(content: impl Into<String>) -> Self {
            Self {
                role: Role::Assistant,
                content: content.into(),
            }
        }
    }

    /// One step of a streaming chat response.
    #[derive(Debug, Clone)]
    pub enum StreamChunk {
        /// Incremental text fragment.
        Text(String),
        /// Natural end of stream.
        Done,
        /// The stream broke; no further chunks will arrive.
        Error(String),
    }
}

pub mod settings {
    use serde::{Deserialize, Serialize};

    fn default_debounce_ms() -> u64 {
        500
    }

    fn default_model() -> String {
        "deepseek-r1:14b".to_string()
    }

    fn default_true() -> bool {
        true
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct AppSettings {
        /// Ollama model tag, e.g. "deepseek-r1:14b"
        #[serde(default = "default_model")]
        pub model: String,
        /// Overrides the OLLAMA_BASE_URL env var when set
        pub ollama_base_url: Option<String>,
        /// Push the latest extracted code block into the current tab while streaming
        #[serde(default = "default_true")]
        pub live_code_updates: bool,
        /// Quiet period before re-highlighting an edited code tab
        #[serde(default = "default_debounce_ms")]
        pub highlight_debounce_ms: u64,
        /// Flat transcript file appended to after each completed turn
        pub transcript_path: Option<String>,
    }

    impl Default for AppSettings {
        fn default() -> Self {
            Self {
                model: default_model(),
                ollama_base_url: None,
                live_code_updates: true,
                highlight_debounce_ms: default_debounce_ms(),
                transcript_path: Some("model_responses.txt".to_string()),
            }
        }
    }

}
