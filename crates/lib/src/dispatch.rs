//! Dispatcher: classify an inbound event by kind and hand it to exactly one component.
//!
//! Every branch ends in user-presentable text; internal failures only reach the log.

use crate::buttons::button_reply;
use crate::commands::CommandRegistry;
use crate::config::{self, ApiKeys, Config};
use crate::event::{InboundEvent, OutboundReply};
use crate::extract::{DocumentReader, ExtractorRegistry};
use crate::http;
use crate::image::{ImagePipeline, ImgeClient};
use crate::llm::GeminiClient;
use crate::media::MediaFetcher;
use crate::reply::{TextReplyGenerator, DEFAULT_PERSONA};
use crate::session::ConversationStore;
use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;

pub const UNSUPPORTED_ATTACHMENT_REPLY: &str =
    "🚫 Unsupported attachment type. Please send an image or document file.";
pub const COMMAND_ERROR_REPLY: &str = "🚨 Error running the command. Please try again later.";

pub struct Dispatcher {
    replies: TextReplyGenerator,
    images: ImagePipeline,
    documents: DocumentReader,
    commands: CommandRegistry,
}

impl Dispatcher {
    pub fn new(
        replies: TextReplyGenerator,
        images: ImagePipeline,
        documents: DocumentReader,
        commands: CommandRegistry,
    ) -> Self {
        Self {
            replies,
            images,
            documents,
            commands,
        }
    }

    /// Wire the Gemini models, image host and extractors from config.
    pub fn from_config(config: &Config, keys: &ApiKeys) -> Result<Self> {
        let client = http::build_client(&config.http).context("building http client")?;
        let host_client = http::build_client_for_host(
            &config.http,
            &config.image_host.base_url,
            config.image_host.accept_invalid_certs,
        )
        .context("building image host client")?;
        let media = Arc::new(MediaFetcher::new(client.clone()));

        let text_model = GeminiClient::new(
            client.clone(),
            &config.models.base_url,
            config.models.text_model.clone(),
            keys.text_model.clone(),
        )
        .with_generation(config.models.generation);
        let image_model = GeminiClient::new(
            client.clone(),
            &config.models.base_url,
            config.models.image_model.clone(),
            keys.image_model.clone(),
        );
        log::info!(
            "models: text={} image={}",
            text_model.model(),
            image_model.model()
        );

        let persona = config
            .models
            .persona
            .clone()
            .filter(|p| !p.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_PERSONA.to_string());
        let mut replies = TextReplyGenerator::new(Arc::new(text_model), persona);
        if config.conversation.memory {
            log::info!(
                "conversation memory on: {} exchange(s), {}s idle expiry",
                config.conversation.max_turns,
                config.conversation.idle_ttl_secs
            );
            let idle_ttl = Duration::from_secs(config.conversation.idle_ttl_secs);
            let store = ConversationStore::new(config.conversation.max_turns, idle_ttl);
            if tokio::runtime::Handle::try_current().is_ok() {
                store.spawn_sweeper(idle_ttl.max(Duration::from_secs(1)));
            } else {
                log::warn!("no tokio runtime; idle conversations are only dropped when read");
            }
            replies = replies.with_memory(store);
        }

        let images = ImagePipeline::new(
            media.clone(),
            Arc::new(
                ImgeClient::new(
                    client,
                    &config.image_host.base_url,
                    keys.image_host.clone(),
                )
                .with_host_client(host_client),
            ),
            Arc::new(image_model),
        );
        let documents = DocumentReader::new(
            media,
            ExtractorRegistry::with_defaults(),
            &config.documents,
        );
        Ok(Self::new(
            replies,
            images,
            documents,
            CommandRegistry::with_builtins(),
        ))
    }

    /// Resolve keys (failing fast on the first missing one), then [`from_config`](Self::from_config).
    pub fn from_config_env(config: &Config) -> Result<Self> {
        let keys = config::resolve_keys(config)?;
        Self::from_config(config, &keys)
    }

    /// Reply for one event. `None` only for a button id that is not on the menu.
    pub async fn route(&self, event: InboundEvent) -> Option<OutboundReply> {
        log::debug!("routing {} event", event.kind());
        let reply = match event {
            InboundEvent::Text { chat_id, text } => {
                if let Some(ref id) = chat_id {
                    log::info!("received message from {}: {}", id, text);
                }
                OutboundReply::text(self.replies.generate(chat_id.as_deref(), &text).await)
            }
            InboundEvent::Image { media } => {
                log::info!("processing image attachment");
                OutboundReply::text(self.images.analyze_media(&media).await)
            }
            InboundEvent::File {
                media,
                declared_format,
            } => {
                log::info!(
                    "processing file attachment with extension: {}",
                    declared_format
                );
                OutboundReply::text(self.documents.read(&media, &declared_format).await)
            }
            InboundEvent::Command { name, args } => {
                match self.commands.resolve(&name, &args).await {
                    Ok(reply) => reply,
                    Err(e) => {
                        log::error!("{}", e);
                        OutboundReply::text(COMMAND_ERROR_REPLY)
                    }
                }
            }
            InboundEvent::Button { id } => match button_reply(&id) {
                Some(text) => OutboundReply::text(text),
                None => {
                    log::debug!("ignoring unknown button {}", id);
                    return None;
                }
            },
            InboundEvent::Other { kind } => {
                log::info!("unsupported attachment type: {}", kind);
                OutboundReply::text(UNSUPPORTED_ATTACHMENT_REPLY)
            }
        };
        Some(reply)
    }
}
