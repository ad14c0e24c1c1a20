use std::borrow::Cow;
use std::error::Error;
use std::net::SocketAddr;
use std::sync::Arc;

use chrono::Utc;
use dailyquotebot::broadcast::Broadcaster;
use dailyquotebot::commands::Command;
use dailyquotebot::config::Config;
use dailyquotebot::database::connection::Connection;
use dailyquotebot::quote::ZenQuotes;
use dailyquotebot::scheduler::DeliveryTime;
use dailyquotebot::schema::schema;
use dailyquotebot::state::OnboardingStorage;
use dailyquotebot::{health, scheduler};
use teloxide::error_handlers::LoggingErrorHandler;
use teloxide::prelude::*;
use teloxide::update_listeners::webhooks::{self, Options};
use teloxide::utils::command::BotCommands;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing::Level;
use tracing_subscriber::fmt::format::FmtSpan;

#[tokio::main]
async fn main() {
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid configuration: {e}");
            std::process::exit(1);
        }
    };

    init_tracing(config.log_level);

    if let Err(e) = run(config).await {
        tracing::error!("Bot stopped: {e}");
        std::process::exit(1);
    }
}

fn init_tracing(level: Level) {
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(LevelFilter::from_level(level))
        .json()
        .with_span_events(FmtSpan::ENTER)
        .log_internal_errors(true)
        .with_line_number(true)
        .with_target(false)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to install tracing subscriber: {e}");
    }
    // teloxide and sqlx log through the `log` facade.
    if let Err(e) = tracing_log::LogTracer::init() {
        eprintln!("Failed to forward log records: {e}");
    }
}

async fn run(config: Config) -> Result<(), Box<dyn Error + Send + Sync>> {
    let connection = Arc::new(Connection::connect(Cow::Owned(config.database_url.clone())).await?);
    connection.perform_migrations().await?;

    let quotes = Arc::new(ZenQuotes::new(config.quote_api_url.clone())?);

    let bot = Bot::new(config.teloxide_token.clone());
    tracing::info!("Starting bot...");
    bot.set_my_commands(Command::bot_commands()).await?;

    let broadcaster = Arc::new(Broadcaster::new(
        Arc::clone(&connection),
        bot.clone(),
        Arc::clone(&quotes),
        config.broadcast_pacing,
    ));
    tokio::spawn(scheduler::run(
        broadcaster,
        config.broadcast_schedule.clone(),
        config.broadcast_offset,
    ));

    let delivery = DeliveryTime::new(&config.broadcast_schedule, config.broadcast_offset, Utc::now());

    let mut dispatcher = Dispatcher::builder(bot.clone(), schema())
        .dependencies(dptree::deps![OnboardingStorage::new(), connection, quotes, delivery])
        .default_handler(|_| async {})
        .error_handler(LoggingErrorHandler::with_custom_text(
            "An error has occurred in the dispatcher",
        ))
        .enable_ctrlc_handler()
        .build();

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));

    match config.webhook_url {
        Some(url) => {
            tracing::info!("Receiving updates by webhook at {url}");
            let (listener, stop_flag, router) =
                webhooks::axum_to_router(bot, Options::new(addr, url)).await?;
            let app = router.merge(health::router());
            let tcp = TcpListener::bind(addr).await?;

            tokio::spawn(async move {
                if let Err(e) = axum::serve(tcp, app).with_graceful_shutdown(stop_flag).await {
                    tracing::error!("Webhook server failed: {e}");
                }
            });

            dispatcher
                .dispatch_with_listener(
                    listener,
                    LoggingErrorHandler::with_custom_text("An error from the update listener"),
                )
                .await;
        }
        None => {
            tokio::spawn(async move {
                if let Err(e) = health::serve(addr).await {
                    tracing::error!("Health check server failed: {e}");
                }
            });

            // A webhook left over from an earlier deployment blocks long polling.
            bot.delete_webhook().await?;
            tracing::info!("Receiving updates by long polling");
            dispatcher.dispatch().await;
        }
    }

    Ok(())
}
