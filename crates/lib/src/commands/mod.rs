//! Slash commands: an explicit name -> handler registry populated at startup.

mod builtin;

use crate::event::OutboundReply;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

pub use builtin::{HelpCommand, MenuCommand};

pub const UNKNOWN_COMMAND_REPLY: &str =
    "🚫 The command you are using does not exist. Type /help to view available commands.";

/// A handler failed while executing.
#[derive(Debug, thiserror::Error)]
#[error("command /{command} failed: {message}")]
pub struct CommandError {
    pub command: String,
    pub message: String,
}

impl CommandError {
    pub fn new(command: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            message: message.into(),
        }
    }
}

/// No handler is registered under a name.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("command {0:?} not found")]
pub struct UnknownCommandError(pub String);

/// One command handler.
#[async_trait]
pub trait Command: Send + Sync {
    /// Name without the leading slash, e.g. "help".
    fn name(&self) -> &str;
    /// One line for /help.
    fn description(&self) -> &str;
    async fn execute(&self, args: &str) -> Result<OutboundReply, CommandError>;
}

/// Registered commands by name.
#[derive(Clone, Default)]
pub struct CommandRegistry {
    commands: HashMap<String, Arc<dyn Command>>,
}

/// "/help " -> "help"
fn normalize_name(name: &str) -> &str {
    let n = name.trim();
    n.strip_prefix('/').unwrap_or(n)
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with `menu` and `help`.
    pub fn with_builtins() -> Self {
        Self::new().with_builtins_over(Vec::new())
    }

    /// Builtins plus `extra`; `help` lists all of them.
    pub fn with_builtins_over(mut self, extra: Vec<Arc<dyn Command>>) -> Self {
        self.register(Arc::new(MenuCommand));
        for c in extra {
            self.register(c);
        }
        let listing = self.listing();
        self.register(Arc::new(HelpCommand::new(listing)));
        self
    }

    /// Add a handler; a later registration under the same name replaces the earlier one.
    pub fn register(&mut self, command: Arc<dyn Command>) {
        let name = normalize_name(command.name()).to_string();
        if self.commands.insert(name.clone(), command).is_some() {
            log::debug!("command /{} re-registered", name);
        }
    }

    pub fn get(&self, name: &str) -> Result<Arc<dyn Command>, UnknownCommandError> {
        let n = normalize_name(name);
        self.commands
            .get(n)
            .cloned()
            .ok_or_else(|| UnknownCommandError(n.to_string()))
    }

    /// Sorted (name, description) pairs, "help" included once registered.
    pub fn listing(&self) -> Vec<(String, String)> {
        let mut v: Vec<(String, String)> = self
            .commands
            .iter()
            .map(|(n, c)| (n.clone(), c.description().to_string()))
            .collect();
        v.sort();
        v
    }

    /// Run the handler for `name`. Unknown names get the fixed reply; handler errors are
    /// returned to the caller.
    pub async fn resolve(&self, name: &str, args: &str) -> Result<OutboundReply, CommandError> {
        log::info!("received command: /{} {}", normalize_name(name), args);
        match self.get(name) {
            Ok(command) => command.execute(args).await,
            Err(e) => {
                log::warn!("{}", e);
                Ok(OutboundReply::text(UNKNOWN_COMMAND_REPLY))
            }
        }
    }
}
