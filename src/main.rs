//! Nebulabot CLI entry point.

use anyhow::Context as _;
use clap::Parser;
use serenity::all::GatewayIntents;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "nebulabot")]
#[command(about = "A Discord bot relaying commands to generative and search backends")]
struct Cli {
    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    tracing::info!("starting nebulabot");

    let config = nebulabot::config::Config::load()
        .context("failed to load configuration from environment")?;
    let token = config.discord_token.clone();

    let state = Arc::new(nebulabot::BotState::new(config)?);
    tracing::info!(
        chat_hosts = state.config.chat_hosts.len(),
        image_hosts = state.config.image_hosts.len(),
        gemini_keys = state.config.gemini.keys.len(),
        shodan = state.config.shodan_key.is_some(),
        "backends configured"
    );

    let intents = GatewayIntents::GUILDS
        | GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::DIRECT_MESSAGES
        | GatewayIntents::MESSAGE_CONTENT;

    let handler = nebulabot::discord::handler::Handler::new(state.clone());
    let mut client = serenity::Client::builder(&token, intents)
        .event_handler(handler)
        .await
        .context("failed to create discord client")?;

    let shard_manager = client.shard_manager.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("shutdown signal received");
            shard_manager.shutdown_all().await;
        }
    });

    client.start().await.context("discord client error")?;

    state.teardown();
    tracing::info!("nebulabot stopped");
    Ok(())
}
