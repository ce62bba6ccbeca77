//! Conversational replies: persona + "Human: " + the user's text, sent to the text model.

use crate::llm::TextModel;
use crate::session::ConversationStore;
use std::sync::Arc;

pub const TEXT_ERROR_REPLY: &str = "😔 Sorry, I encountered an error processing your message.";

/// Built-in persona block prepended to every user turn.
pub const DEFAULT_PERSONA: &str = "*System Name:* Your Name is KORA AI, an AI Assistant created by Kolawole Suleiman.
You are running on Sman V1.0, the latest version built with high programming techniques.
You should assist with all topics.";

pub struct TextReplyGenerator {
    model: Arc<dyn TextModel>,
    persona: String,
    memory: Option<ConversationStore>,
}

impl TextReplyGenerator {
    /// Stateless generator: every call starts from an empty history.
    pub fn new(model: Arc<dyn TextModel>, persona: impl Into<String>) -> Self {
        Self {
            model,
            persona: persona.into(),
            memory: None,
        }
    }

    /// Keep per-chat history in `store` for events that carry a chat id.
    pub fn with_memory(mut self, store: ConversationStore) -> Self {
        self.memory = Some(store);
        self
    }

    pub fn prompt(&self, user_text: &str) -> String {
        format!("{}\n\nHuman: {}", self.persona, user_text)
    }

    /// Model reply, or the fixed fallback on any failure. Never fails.
    pub async fn generate(&self, chat_id: Option<&str>, user_text: &str) -> String {
        log::info!("processing text message: {}", user_text);
        let memory = self.memory.as_ref().zip(chat_id);
        let history = match memory {
            Some((store, id)) => store.history(id).await,
            None => Vec::new(),
        };
        match self.model.generate(&history, &self.prompt(user_text)).await {
            Ok(reply) => {
                if let Some((store, id)) = memory {
                    store.record(id, user_text, &reply).await;
                }
                reply
            }
            Err(e) => {
                log::error!("error processing text message: {}", e);
                TEXT_ERROR_REPLY.to_string()
            }
        }
    }
}
