//! Inbound chat events and outbound replies.
//!
//! The transport hands over a loosely typed JSON event ([`TransportEvent`]); it is converted
//! once into an [`InboundEvent`] whose variant carries exactly the fields its kind needs.

use base64::Engine;
use serde::{Deserialize, Serialize};

/// Opaque handle to attachment bytes: either delivered inline or fetchable from a URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaRef {
    Inline(Vec<u8>),
    Url(String),
}

/// One inbound event, classified by kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundEvent {
    Text {
        chat_id: Option<String>,
        text: String,
    },
    Image {
        media: MediaRef,
    },
    File {
        media: MediaRef,
        /// Declared extension, e.g. "pdf". Never sniffed from content.
        declared_format: String,
    },
    Command {
        name: String,
        args: String,
    },
    Button {
        id: String,
    },
    /// Any other declared kind (sticker, audio, ...).
    Other {
        kind: String,
    },
}

impl InboundEvent {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text {
            chat_id: None,
            text: text.into(),
        }
    }

    /// Short label for logs.
    pub fn kind(&self) -> &str {
        match self {
            Self::Text { .. } => "text",
            Self::Image { .. } => "image",
            Self::File { .. } => "file",
            Self::Command { .. } => "command",
            Self::Button { .. } => "button",
            Self::Other { kind } => kind,
        }
    }
}

/// A menu button attached to a reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Button {
    pub id: String,
    #[serde(rename = "title")]
    pub label: String,
}

impl Button {
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
        }
    }
}

/// Text sent back to the chat, optionally with buttons.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundReply {
    pub text: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub buttons: Vec<Button>,
}

impl OutboundReply {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            buttons: Vec::new(),
        }
    }

    pub fn with_buttons(text: impl Into<String>, buttons: Vec<Button>) -> Self {
        Self {
            text: text.into(),
            buttons,
        }
    }
}

impl From<String> for OutboundReply {
    fn from(text: String) -> Self {
        Self::text(text)
    }
}

/// Event payload as posted by the chat transport.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TransportEvent {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub chat_id: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub media_url: Option<String>,
    /// Attachment bytes, base64 (standard alphabet). Takes precedence over media_url.
    #[serde(default)]
    pub media_base64: Option<String>,
    #[serde(default)]
    pub file_extension: Option<String>,
    #[serde(default)]
    pub command: Option<String>,
    #[serde(default)]
    pub args: Option<String>,
    #[serde(default)]
    pub button_id: Option<String>,
}

/// The transport event lacks a field its kind requires.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum EventError {
    #[error("{kind} event is missing `{field}`")]
    MissingField {
        kind: &'static str,
        field: &'static str,
    },
    #[error("media_base64 is not valid base64: {0}")]
    InvalidMedia(String),
}

impl TransportEvent {
    fn media(&self, kind: &'static str) -> Result<MediaRef, EventError> {
        if let Some(ref b64) = self.media_base64 {
            return base64::engine::general_purpose::STANDARD
                .decode(b64.trim())
                .map(MediaRef::Inline)
                .map_err(|e| EventError::InvalidMedia(e.to_string()));
        }
        self.media_url
            .clone()
            .map(MediaRef::Url)
            .ok_or(EventError::MissingField {
                kind,
                field: "media_url",
            })
    }

    /// Classify by `type`. Unknown types become [`InboundEvent::Other`].
    pub fn into_event(self) -> Result<InboundEvent, EventError> {
        let event = match self.kind.trim() {
            "text" => InboundEvent::Text {
                chat_id: self.chat_id.clone(),
                text: self.text.clone().ok_or(EventError::MissingField {
                    kind: "text",
                    field: "text",
                })?,
            },
            "image" => InboundEvent::Image {
                media: self.media("image")?,
            },
            "file" => InboundEvent::File {
                media: self.media("file")?,
                declared_format: self.file_extension.clone().unwrap_or_default(),
            },
            "command" => InboundEvent::Command {
                name: self.command.clone().ok_or(EventError::MissingField {
                    kind: "command",
                    field: "command",
                })?,
                args: self.args.clone().unwrap_or_default(),
            },
            "button" => InboundEvent::Button {
                id: self.button_id.clone().ok_or(EventError::MissingField {
                    kind: "button",
                    field: "button_id",
                })?,
            },
            other => InboundEvent::Other {
                kind: other.to_string(),
            },
        };
        Ok(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> Result<InboundEvent, EventError> {
        serde_json::from_str::<TransportEvent>(json)
            .unwrap()
            .into_event()
    }

    #[test]
    fn text_event_keeps_chat_id() {
        let e = parse(r#"{"type":"text","chat_id":"42","text":"hello"}"#).unwrap();
        assert_eq!(
            e,
            InboundEvent::Text {
                chat_id: Some("42".into()),
                text: "hello".into()
            }
        );
    }

    #[test]
    fn file_event_prefers_inline_bytes() {
        let e = parse(
            r#"{"type":"file","media_url":"https://x/y","media_base64":"aGk=","file_extension":"txt"}"#,
        )
        .unwrap();
        assert_eq!(
            e,
            InboundEvent::File {
                media: MediaRef::Inline(b"hi".to_vec()),
                declared_format: "txt".into()
            }
        );
    }

    #[test]
    fn image_without_media_is_rejected() {
        assert_eq!(
            parse(r#"{"type":"image"}"#),
            Err(EventError::MissingField {
                kind: "image",
                field: "media_url"
            })
        );
    }

    #[test]
    fn bad_base64_is_rejected() {
        assert!(matches!(
            parse(r#"{"type":"image","media_base64":"!!!"}"#),
            Err(EventError::InvalidMedia(_))
        ));
    }

    #[test]
    fn unknown_type_is_other() {
        let e = parse(r#"{"type":"sticker"}"#).unwrap();
        assert_eq!(e.kind(), "sticker");
        assert!(matches!(e, InboundEvent::Other { .. }));
    }

    #[test]
    fn command_args_default_to_empty() {
        let e = parse(r#"{"type":"command","command":"help"}"#).unwrap();
        assert_eq!(
            e,
            InboundEvent::Command {
                name: "help".into(),
                args: String::new()
            }
        );
    }

    #[test]
    fn reply_serializes_buttons_with_title() {
        let r = OutboundReply::with_buttons("Pick", vec![Button::new("b1", "One")]);
        let v = serde_json::to_value(&r).unwrap();
        assert_eq!(v["buttons"][0]["title"], "One");
        let plain = serde_json::to_value(OutboundReply::text("x")).unwrap();
        assert!(plain.get("buttons").is_none());
    }
}
