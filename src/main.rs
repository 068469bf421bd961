//! # NutriBot Main Entry Point
//!
//! Initializes logging, loads configuration, sets up the database,
//! starts the reminder scheduler and the health server, and runs the Telegram bot.

use anyhow::{Context, Result};
use teloxide::prelude::*;
use teloxide::dispatching::dialogue::InMemStorage;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use std::sync::Arc;

use nutribot::bot::handlers::BotHandler;
use nutribot::bot::{BotContext, State};
use nutribot::config::Config;
use nutribot::database::connection::DatabaseManager;
use nutribot::services::health::HealthService;
use nutribot::services::plans::PlanCatalog;
use nutribot::services::reminder::ReminderService;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "nutribot=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    dotenvy::dotenv().ok();
    let config = Arc::new(Config::from_env()?);

    info!("Starting NutriBot v{}", env!("CARGO_PKG_VERSION"));
    info!(
        "Configuration loaded - Database: {}, HTTP Port: {}, Plans: {}, Payments: {}",
        config.database_url,
        config.http_port,
        config.plans_dir.display(),
        if config.payments_enabled() { "enabled" } else { "disabled" }
    );

    info!("Initializing database connection...");
    let db_manager = DatabaseManager::new(&config.database_url).await?;
    db_manager.run_migrations().await?;
    let db = Arc::new(db_manager);
    info!("Database initialized successfully");

    let plans = PlanCatalog::new(config.plans_dir.clone());
    for (category, count) in plans.inventory().await {
        if count == 0 {
            tracing::warn!("No plans found for category {}", category.slug());
        } else {
            info!("{} plans available for category {}", count, category.slug());
        }
    }

    let bot = Bot::new(&config.telegram_bot_token);

    info!("Initializing reminder service...");
    let reminders = ReminderService::new(bot.clone(), db.clone())
        .await
        .context("Failed to create reminder service")?;
    if let Err(e) = reminders.start().await {
        tracing::error!("Failed to start reminder service: {}", e);
    }

    let handler = BotHandler::new(BotContext {
        db: db.clone(),
        reminders: reminders.clone(),
        plans,
        config: config.clone(),
    });

    let health_service = HealthService::new(db.clone(), Some(reminders.clone()));
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.http_port))
        .await
        .with_context(|| format!("Failed to bind to port {}", config.http_port))?;

    info!("Health check server starting on port {}", config.http_port);

    let bot_task = tokio::spawn(async move {
        Dispatcher::builder(bot, handler.schema())
            .dependencies(dptree::deps![InMemStorage::<State>::new()])
            .enable_ctrlc_handler()
            .build()
            .dispatch()
            .await;
    });

    let health_task = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, health_service.router).await {
            tracing::error!("Health server error: {}", e);
        }
    });

    tokio::select! {
        result = bot_task => {
            if let Err(e) = result {
                tracing::error!("Bot task error: {}", e);
            }
        }
        result = health_task => {
            if let Err(e) = result {
                tracing::error!("Health task error: {}", e);
            }
        }
    }

    if let Err(e) = reminders.stop().await {
        tracing::warn!("Error stopping reminder service: {}", e);
    }

    info!("Application stopped");
    Ok(())
}
