//! Chat-completion access for extraction and writing assistance.
//!
//! Callers depend on [`LanguageModel`] so the ingestion pipeline and the assist
//! service can run against the hosted endpoint in production and a scripted
//! double in tests.

mod client;
mod reply;

use std::future::Future;

pub use client::ChatCompletionsClient;
pub use reply::{extract_json_array, extract_json_object, strip_code_fences, ReplyError};

/// One prompt round-trip. `temperature`/`max_tokens` override the client defaults.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompletionRequest {
    pub system: Option<String>,
    pub user: String,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl CompletionRequest {
    pub fn new(user: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            ..Self::default()
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

pub trait LanguageModel: Send + Sync {
    /// Returns the assistant message text.
    fn complete(
        &self,
        request: &CompletionRequest,
    ) -> impl Future<Output = Result<String, LlmError>> + Send;
}

#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("language model API key is not configured")]
    MissingApiKey,
    #[error("language model request failed: {0}")]
    Transport(String),
    #[error("language model returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("language model still rate limited after {attempts} attempts")]
    RateLimited { attempts: usize },
    #[error("language model response could not be decoded: {0}")]
    Decode(String),
    #[error("language model returned an empty reply")]
    EmptyReply,
}

impl From<reqwest::Error> for LlmError {
    fn from(value: reqwest::Error) -> Self {
        Self::Transport(value.to_string())
    }
}
