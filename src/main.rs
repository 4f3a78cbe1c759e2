//! # Tutor Bot Main Entry Point
//!
//! Initializes logging, loads configuration, sets up the database, starts
//! the reminder service and the health server, and runs the Telegram bot.

use anyhow::Result;
use std::sync::Arc;
use teloxide::dispatching::dialogue::InMemStorage;
use teloxide::prelude::*;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tutor_bot::bot::context::AppContext;
use tutor_bot::bot::dialogue::State;
use tutor_bot::bot::handlers::BotHandler;
use tutor_bot::config::Config;
use tutor_bot::database::connection::DatabaseManager;
use tutor_bot::services::health::HealthService;
use tutor_bot::services::notifications::{NotificationService, TelegramNotifier};
use tutor_bot::services::reminder::ReminderService;
use tutor_bot::services::roles::RoleResolver;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tutor_bot=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    dotenvy::dotenv().ok();
    let config = Config::from_env()?;

    info!("Starting Tutor Bot v{}", env!("CARGO_PKG_VERSION"));
    info!(
        "Configuration loaded - Database: {}, HTTP Port: {}, superadmins: {}, special users: {}",
        config.database_url,
        config.http_port,
        config.superadmin_ids.len(),
        config.special_users.len()
    );

    info!("Initializing database connection...");
    let db_manager = DatabaseManager::new(&config.database_url).await?;
    info!("Running database migrations...");
    db_manager.run_migrations().await?;
    let db_arc = Arc::new(db_manager);
    info!("Database initialized successfully");

    let bot = Bot::new(&config.telegram_bot_token);
    let notifications = NotificationService::new(Arc::new(TelegramNotifier::new(bot.clone())));
    let roles = Arc::new(RoleResolver::new(
        config.superadmin_ids.iter().copied(),
        config.special_users.clone(),
    ));
    let ctx = AppContext::new(
        db_arc.as_ref().clone(),
        roles,
        notifications.clone(),
        config.utc_offset_hours,
    );
    let handler = BotHandler::new(ctx);
    info!("Telegram bot initialized successfully");

    let mut reminder_service = match ReminderService::new(
        notifications,
        db_arc.clone(),
        config.reminder_interval_minutes,
        config.utc_offset_hours,
    )
    .await
    {
        Ok(service) => service,
        Err(e) => {
            tracing::error!("Failed to create reminder service: {}", e);
            return Err(anyhow::anyhow!("Failed to create reminder service: {}", e));
        }
    };

    if let Err(e) = reminder_service.start().await {
        tracing::error!("Failed to start reminder service: {}", e);
    }

    let health_service = HealthService::new(db_arc.clone());
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.http_port))
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind to port {}: {}", config.http_port, e))?;

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

    if let Err(e) = reminder_service.stop().await {
        tracing::warn!("Error stopping reminder service: {}", e);
    }

    info!("Application stopped");
    Ok(())
}
