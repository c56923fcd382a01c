use anyhow::{Context, Result};
use dotenvy::dotenv;
use log::{error, info};
use teloxide::prelude::*;

use fluffcoin_bot::reply::Links;
use fluffcoin_bot::telegram::{self, AppState};
use fluffcoin_bot::{Config, ReferralStore};

#[tokio::main]
async fn main() {
    dotenv().ok();
    pretty_env_logger::formatted_timed_builder()
        .parse_filters(&std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()))
        .init();

    if let Err(e) = run().await {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let config = Config::from_env()?;
    info!("Starting Fluffcoin bot: {:?}", config);

    let store = ReferralStore::open(&config.db_path)
        .with_context(|| format!("Could not open database {}", config.db_path.display()))?;

    let bot = Bot::new(config.token.clone());
    let bot_username = match config.bot_username.clone() {
        Some(name) => name,
        None => bot.get_me().await.context("getMe failed")?.username().to_string(),
    };
    info!("Bot username: @{}", bot_username);

    let links = Links {
        bot_username,
        webapp_url: config.webapp_url.clone(),
    };
    telegram::run(bot, AppState::new(store, links)).await;
    Ok(())
}
