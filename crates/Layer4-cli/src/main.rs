//! nanobot - Main entry point

mod bot;

use clap::Parser;
use nanobot_foundation::{expand_home, BotConfig, JsonStore, TelegramSettings, DEFAULT_API_BASE};
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const BANNER: &str = r"
 _ __   __ _ _ __   ___  | __ )  ___ | |_
| '_ \ / _` | '_ \ / _ \ |  _ \ / _ \| __|
| | | | (_| | | | | (_) || |_) | (_) | |_
|_| |_|\__,_|_| |_|\___/ |____/ \___/ \__|
─────────────────────────────────────────
  Telegram · Claude Code  ·  /help to start
";

/// nanobot - drive Claude Code and a shell from a Telegram chat
#[derive(Parser, Debug)]
#[command(name = "nanobot")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Telegram bot token
    #[arg(long, env = "TELEGRAM_BOT_TOKEN", hide_env_values = true)]
    token: String,

    /// The only chat allowed to send commands (omit to discover it)
    #[arg(long, env = "TELEGRAM_CHAT_ID", allow_negative_numbers = true)]
    chat_id: Option<i64>,

    /// Directory for state.json, history.jsonl and config.json
    #[arg(long, env = "NANOBOT_MEMORY_DIR")]
    memory_dir: Option<String>,

    /// Working directory when none is saved
    #[arg(long, env = "CLAUDE_WORK_DIR", default_value = "~/Dev")]
    work_dir: String,

    /// Claude Code CLI program
    #[arg(long, env = "NANOBOT_CLAUDE_BIN", default_value = "claude")]
    claude_bin: String,

    /// Bot API base URL
    #[arg(long, env = "TELEGRAM_API_BASE", default_value = DEFAULT_API_BASE)]
    api_base: String,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

impl Args {
    fn into_config(self) -> anyhow::Result<BotConfig> {
        let memory_dir = match self.memory_dir.as_deref() {
            Some(dir) => expand_home(dir),
            None => JsonStore::default_memory()?.base_dir().to_path_buf(),
        };
        let telegram = TelegramSettings {
            token: self.token,
            chat_id: self.chat_id,
            api_base: self.api_base,
        };
        Ok(BotConfig::new(telegram, memory_dir, expand_home(&self.work_dir))
            .with_claude_program(self.claude_bin))
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.debug { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    println!("{}", BANNER);

    let mut config = args.into_config()?;
    if let Err(e) = config.memory_store().ensure_dir() {
        warn!("Memory dir unavailable: {}", e);
    }
    match config.apply_file_overrides() {
        Ok(true) => info!("Loaded overrides from {}", config.memory_dir.display()),
        Ok(false) => {}
        Err(e) => warn!("Ignoring config.json: {}", e),
    }
    check_program(&config.claude.program);

    bot::run(config).await
}

/// Warn early when the CLI cannot be resolved; `/task` reports it again
fn check_program(program: &str) {
    match which::which(program) {
        Ok(path) => info!("Using {}", path.display()),
        Err(_) => warn!("`{}` not found in PATH; /task will fail until it is installed", program),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_defaults() {
        let args = Args::try_parse_from(["nanobot", "--token", "123:abc"]).unwrap();
        assert_eq!(args.work_dir, "~/Dev");
        assert_eq!(args.claude_bin, "claude");
        assert_eq!(args.api_base, DEFAULT_API_BASE);
        assert!(!args.debug);
    }

    #[test]
    fn test_args_into_config() {
        let args = Args::try_parse_from([
            "nanobot",
            "--token",
            "123:abc",
            "--chat-id",
            "-10042",
            "--memory-dir",
            "/tmp/nb",
            "--work-dir",
            "/srv/code",
            "--claude-bin",
            "/opt/claude",
        ])
        .unwrap();
        let config = args.into_config().unwrap();
        assert_eq!(config.telegram.chat_id, Some(-10042));
        assert_eq!(config.memory_dir, PathBuf::from("/tmp/nb"));
        assert_eq!(config.default_work_dir, PathBuf::from("/srv/code"));
        assert_eq!(config.claude.program, "/opt/claude");
    }
}
