//! Built-in commands: the button menu and the command listing.

use super::{Command, CommandError};
use crate::buttons::menu_buttons;
use crate::event::OutboundReply;
use async_trait::async_trait;

const HELP_DESCRIPTION: &str = "List available commands";

/// `/menu`: the button menu.
pub struct MenuCommand;

#[async_trait]
impl Command for MenuCommand {
    fn name(&self) -> &str {
        "menu"
    }

    fn description(&self) -> &str {
        "Show the options menu"
    }

    async fn execute(&self, _args: &str) -> Result<OutboundReply, CommandError> {
        Ok(OutboundReply::with_buttons("Select an option:", menu_buttons()))
    }
}

/// `/help`: every command registered at startup.
pub struct HelpCommand {
    text: String,
}

impl HelpCommand {
    pub fn new(mut listing: Vec<(String, String)>) -> Self {
        if !listing.iter().any(|(n, _)| n == "help") {
            listing.push(("help".to_string(), HELP_DESCRIPTION.to_string()));
        }
        listing.sort();
        let mut text = String::from("📋 Available commands:");
        for (name, description) in &listing {
            text.push_str(&format!("\n/{} - {}", name, description));
        }
        Self { text }
    }
}

#[async_trait]
impl Command for HelpCommand {
    fn name(&self) -> &str {
        "help"
    }

    fn description(&self) -> &str {
        HELP_DESCRIPTION
    }

    async fn execute(&self, _args: &str) -> Result<OutboundReply, CommandError> {
        Ok(OutboundReply::text(self.text.clone()))
    }
}
