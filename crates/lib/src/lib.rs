//! Kora core library: classify inbound chat events and turn each into one bounded text reply
//! via the text model, the image pipeline, the document extractors or a slash command.

pub mod buttons;
pub mod commands;
pub mod config;
pub mod dispatch;
pub mod event;
pub mod extract;
pub mod gateway;
pub mod http;
pub mod image;
pub mod init;
pub mod llm;
pub mod media;
pub mod reply;
pub mod session;
