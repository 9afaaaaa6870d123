mod config;
mod pipeline;
mod platform;
mod store;

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::store::users::{TELEGRAM_BOT_TOKEN_SETTING, TELEGRAM_USER_ID_KEY};
use crate::store::Store;

const USAGE: &str = "usage: notebot [config.toml]
       notebot link <username> <telegram-user-id> [config.toml]
       notebot set-token <bot-token> [config.toml]";

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,notebot=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();

    match args.first().map(String::as_str) {
        Some("link") => {
            let (Some(username), Some(telegram_id)) = (args.get(1), args.get(2)) else {
                bail!(USAGE);
            };
            let config = load_config(args.get(3))?;
            link(&config, username, telegram_id).await
        }
        Some("set-token") => {
            let Some(token) = args.get(1) else {
                bail!(USAGE);
            };
            let config = load_config(args.get(2))?;
            set_token(&config, token).await
        }
        Some("-h") | Some("--help") => {
            info!("{}", USAGE);
            Ok(())
        }
        other => {
            let config = load_config(other.map(String::from).as_ref())?;
            serve(config).await
        }
    }
}

fn load_config(path: Option<&String>) -> Result<Config> {
    let config_path = path
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("config.toml"));

    info!("Loading configuration from: {}", config_path.display());
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    info!("  Database: {}", config.storage.database_path.display());
    Ok(config)
}

async fn serve(config: Config) -> Result<()> {
    let store = Store::open(&config.storage.database_path)?;

    let token = match config.bot_token() {
        Some(token) => token.to_string(),
        None => {
            store
                .system_setting_or_default(TELEGRAM_BOT_TOKEN_SETTING, "")
                .await?
        }
    };
    if token.is_empty() {
        bail!(
            "No bot token: set [telegram] bot_token or the {} system setting",
            TELEGRAM_BOT_TOKEN_SETTING
        );
    }

    info!("Bot is starting...");
    let bot = teloxide::Bot::new(token);
    platform::telegram::run(bot, store).await
}

/// Link a Telegram account to a user so their messages become notes.
async fn link(config: &Config, username: &str, telegram_id: &str) -> Result<()> {
    let telegram_id: u64 = telegram_id
        .parse()
        .with_context(|| format!("Invalid telegram user id: {}", telegram_id))?;

    let store = Store::open(&config.storage.database_path)?;
    let user_id = store.ensure_user(username).await?;

    let value = serde_json::to_string(&telegram_id.to_string())?;
    store
        .upsert_user_setting(user_id, TELEGRAM_USER_ID_KEY, &value)
        .await?;

    info!(
        "Linked telegram user {} to {} (user {})",
        telegram_id, username, user_id
    );
    Ok(())
}

/// Store the bot token as a system setting, used when the config has none.
async fn set_token(config: &Config, token: &str) -> Result<()> {
    let token = token.trim();
    if token.is_empty() {
        bail!("Bot token must not be empty");
    }

    let store = Store::open(&config.storage.database_path)?;
    let value = serde_json::to_string(token)?;
    store
        .upsert_system_setting(TELEGRAM_BOT_TOKEN_SETTING, &value)
        .await?;

    info!("Stored bot token in the {} system setting", TELEGRAM_BOT_TOKEN_SETTING);
    Ok(())
}
