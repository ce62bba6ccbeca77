use anyhow::Context;
use clap::{Parser, Subcommand};
use lib::event::{InboundEvent, MediaRef, OutboundReply};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "kora")]
#[command(about = "Kora chat-bot", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show version
    Version,

    /// Create the configuration directory and a default config file (no API keys are written).
    Init {
        /// Config file path (default: KORA_CONFIG_PATH or ~/.kora/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<PathBuf>,
    },

    /// Run the HTTP gateway the chat transport posts events to. Requires GEMINI_TEXT_API_KEY, GEMINI_IMAGE_API_KEY and IMGE_API_KEY (or the matching config keys).
    Serve {
        /// Config file path (default: KORA_CONFIG_PATH or ~/.kora/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<PathBuf>,

        /// HTTP port (default from config or 8000)
        #[arg(long, short)]
        port: Option<u16>,
    },

    /// Talk to the bot from the terminal. `/name args` runs a command, `#id` presses a button.
    Chat {
        /// Config file path (default: KORA_CONFIG_PATH or ~/.kora/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<PathBuf>,
    },

    /// Print the reply the bot would give for a local document (pdf, docx, txt, py).
    Extract {
        /// Document to read; the format comes from the file extension.
        path: PathBuf,

        /// Config file path (default: KORA_CONFIG_PATH or ~/.kora/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let result = match cli.command {
        Some(Commands::Version) => {
            println!("kora {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        Some(Commands::Init { config }) => run_init(config),
        Some(Commands::Serve { config, port }) => run_serve(config, port).await,
        Some(Commands::Chat { config }) => run_chat(config).await,
        Some(Commands::Extract { path, config }) => run_extract(path, config).await,
        None => {
            println!("Run with --help for usage");
            Ok(())
        }
    };
    if let Err(e) = result {
        log::error!("{:#}", e);
        std::process::exit(1);
    }
}

fn run_init(config_path: Option<PathBuf>) -> anyhow::Result<()> {
    let path = config_path.unwrap_or_else(lib::config::default_config_path);
    let dir = lib::init::init_config_dir(&path)?;
    println!("initialized configuration at {}", dir.display());
    Ok(())
}

async fn run_serve(config_path: Option<PathBuf>, port: Option<u16>) -> anyhow::Result<()> {
    let (mut config, _) = lib::config::load_config(config_path)?;
    if let Some(p) = port {
        config.gateway.port = p;
    }
    log::info!("KORA AI bot starting on {}:{}", config.gateway.bind, config.gateway.port);
    lib::gateway::run_gateway(config).await
}

/// `/name args` -> command, `#id` -> button, anything else -> text.
fn parse_line(line: &str) -> InboundEvent {
    if let Some(rest) = line.strip_prefix('/') {
        let (name, args) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
        return InboundEvent::Command {
            name: name.to_string(),
            args: args.trim().to_string(),
        };
    }
    if let Some(id) = line.strip_prefix('#') {
        return InboundEvent::Button {
            id: id.trim().to_string(),
        };
    }
    InboundEvent::Text {
        chat_id: Some("terminal".to_string()),
        text: line.to_string(),
    }
}

fn print_reply(reply: &OutboundReply) {
    println!("< {}", reply.text.trim());
    for b in &reply.buttons {
        println!("  [#{}] {}", b.id, b.label);
    }
}

async fn run_chat(config_path: Option<PathBuf>) -> anyhow::Result<()> {
    use std::io::{self, Write};

    let (config, _) = lib::config::load_config(config_path)?;
    let dispatcher = lib::dispatch::Dispatcher::from_config_env(&config)?;
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        write!(stdout, "> ")?;
        stdout.flush()?;
        let mut line = String::new();
        if stdin.read_line(&mut line)? == 0 {
            break;
        }
        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if input.eq_ignore_ascii_case("/exit") || input.eq_ignore_ascii_case("/quit") {
            break;
        }
        match dispatcher.route(parse_line(input)).await {
            Some(reply) => print_reply(&reply),
            None => println!("(no reply)"),
        }
    }

    Ok(())
}

async fn run_extract(path: PathBuf, config_path: Option<PathBuf>) -> anyhow::Result<()> {
    let (config, _) = lib::config::load_config(config_path)?;
    let format = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default()
        .to_string();
    let bytes = std::fs::read(&path).with_context(|| format!("reading {}", path.display()))?;
    let client = lib::http::build_client(&config.http)?;
    let reader = lib::extract::DocumentReader::new(
        Arc::new(lib::media::MediaFetcher::new(client)),
        lib::extract::ExtractorRegistry::with_defaults(),
        &config.documents,
    );
    let reply = reader.read(&MediaRef::Inline(bytes), &format).await;
    println!("{}", reply);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slash_lines_are_commands() {
        assert_eq!(
            parse_line("/translate hola  amigo"),
            InboundEvent::Command {
                name: "translate".into(),
                args: "hola  amigo".into()
            }
        );
        assert_eq!(
            parse_line("/help"),
            InboundEvent::Command {
                name: "help".into(),
                args: String::new()
            }
        );
    }

    #[test]
    fn hash_lines_are_buttons() {
        assert_eq!(
            parse_line("#button1"),
            InboundEvent::Button {
                id: "button1".into()
            }
        );
    }

    #[test]
    fn other_lines_are_text() {
        assert!(matches!(parse_line("hello"), InboundEvent::Text { .. }));
    }
}
