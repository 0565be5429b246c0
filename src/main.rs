use anyhow::Result;
use std::sync::Arc;
use teloxide::dispatching::UpdateHandler;
use teloxide::prelude::*;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use mahalla_contacts::bot::{self, message_handler::bot_commands, MenuController};
use mahalla_contacts::config::Config;
use mahalla_contacts::db::{self, PgContactStore};

fn schema() -> UpdateHandler<anyhow::Error> {
    dptree::entry()
        .branch(Update::filter_message().endpoint(bot::message_handler))
        .branch(Update::filter_callback_query().endpoint(bot::callback_handler))
        .branch(Update::filter_my_chat_member().endpoint(bot::membership_handler))
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting Mahalla contacts bot");

    let config = Config::load()?;
    config.log_summary();

    let pool = db::connect(
        &config.database_url,
        config.db_min_connections,
        config.db_max_connections,
    )
    .await?;
    db::init_database_schema(&pool).await?;

    let store = Arc::new(PgContactStore::new(pool));
    let controller = Arc::new(MenuController::new(store, config.settings.clone()));

    let bot = Bot::new(&config.bot_token);

    if let Err(e) = bot.set_my_commands(bot_commands()).await {
        warn!(error = %e, "Failed to register bot commands");
    }

    info!("Bot initialized, starting dispatcher");

    Dispatcher::builder(bot, schema())
        .dependencies(dptree::deps![controller])
        .error_handler(LoggingErrorHandler::with_custom_text("Dispatcher error"))
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    Ok(())
}
