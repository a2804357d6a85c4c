pub mod gemini;

use async_trait::async_trait;
use std::sync::Arc;
use url::Url;

use crate::models::analysis::AnalysisResponse;
use crate::models::chat::Message;
use crate::models::frame::CapturedFrame;
use self::gemini::GeminiClient;

#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: Url,
}

/// Outcome of an inference call. Failures never cross the client boundary;
/// they collapse into `NoOp` so callers can degrade without inspecting errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InferenceOutcome<T> {
    Success(T),
    NoOp,
}

impl<T> InferenceOutcome<T> {
    pub fn is_noop(&self) -> bool {
        matches!(self, InferenceOutcome::NoOp)
    }

    pub fn success(self) -> Option<T> {
        match self {
            InferenceOutcome::Success(value) => Some(value),
            InferenceOutcome::NoOp => None,
        }
    }

    pub fn unwrap_or(self, fallback: T) -> T {
        self.success().unwrap_or(fallback)
    }
}

impl<T> From<Option<T>> for InferenceOutcome<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => InferenceOutcome::Success(v),
            None => InferenceOutcome::NoOp,
        }
    }
}

#[async_trait]
pub trait InferenceClient: Send + Sync {
    /// Analyzes one frame in the given game context.
    async fn analyze_frame(
        &self,
        frame: &CapturedFrame,
        game_context: &str
    ) -> InferenceOutcome<AnalysisResponse>;

    /// Produces the assistant reply for `transcript`, whose last entry is the
    /// pending user message. An empty reply is reported as `NoOp`.
    async fn chat_with_ai(
        &self,
        transcript: &[Message],
        frame: Option<&CapturedFrame>
    ) -> InferenceOutcome<String>;
}

pub fn new_client(config: &LlmConfig) -> crate::error::Result<Arc<dyn InferenceClient>> {
    let client = GeminiClient::from_config(config)?;
    Ok(Arc::new(client))
}
