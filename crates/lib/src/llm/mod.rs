//! Model abstraction and the Gemini REST client.
//!
//! Two capabilities are consumed: conversational text generation and single-image description.

mod gemini;

use async_trait::async_trait;

pub use gemini::GeminiClient;

/// Who produced a turn of conversation history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Model,
}

/// One prior turn sent along with a new prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatTurn {
    pub role: Role,
    pub text: String,
}

impl ChatTurn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
        }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: Role::Model,
            text: text.into(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("model request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("model api error: {0}")]
    Api(String),
    #[error("model returned no text")]
    EmptyResponse,
}

/// Conversational model: history (oldest first) plus a new user prompt in, reply text out.
#[async_trait]
pub trait TextModel: Send + Sync {
    async fn generate(&self, history: &[ChatTurn], prompt: &str) -> Result<String, LlmError>;
}

/// Image-analysis model: an instruction and raw image bytes in, description out.
#[async_trait]
pub trait ImageModel: Send + Sync {
    async fn describe(
        &self,
        instruction: &str,
        image: &[u8],
        mime_type: &str,
    ) -> Result<String, LlmError>;
}
