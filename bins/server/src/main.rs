//! Leavemark API Server
//!
//! Main entry point for the leave lifecycle service.

use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use leavemark_api::{AppState, EmailNotifier, create_router};
use leavemark_core::engine::{LeaveEngine, LogNotifier, NotificationOutbox, Notifier};
use leavemark_db::{LeaveRepository, SubscriptionRepository, connect_with_pool};
use leavemark_shared::{AppConfig, EmailService, JwtConfig, JwtService};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "leavemark=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::load().context("Failed to load configuration")?;

    let db = connect_with_pool(
        &config.database.url,
        config.database.max_connections,
        config.database.min_connections,
    )
    .await?;
    info!("Connected to database");

    let jwt_config = JwtConfig {
        secret: config.jwt.secret.clone(),
        #[allow(clippy::cast_possible_wrap)]
        access_token_expires_minutes: (config.jwt.access_token_expiry_secs / 60) as i64,
    };
    let jwt_service = JwtService::new(jwt_config);

    // Notifications go through a bounded outbox drained by one worker task
    let outbox = if config.leave.notifications_enabled {
        let notifier: Arc<dyn Notifier> = if config.email.smtp_username.is_empty() {
            info!("SMTP credentials not set, notifications are logged only");
            Arc::new(LogNotifier)
        } else {
            info!(
                smtp_host = %config.email.smtp_host,
                smtp_port = %config.email.smtp_port,
                "Email notifications configured"
            );
            Arc::new(EmailNotifier::new(Arc::new(EmailService::new(
                config.email.clone(),
            ))))
        };
        let (outbox, _worker) = NotificationOutbox::spawn(notifier, config.leave.outbox_capacity);
        outbox
    } else {
        info!("Leave notifications disabled");
        NotificationOutbox::disabled()
    };

    let engine = LeaveEngine::new(
        Arc::new(LeaveRepository::new(db.clone())),
        Arc::new(SubscriptionRepository::new(db)),
        outbox,
    );

    let state = AppState {
        engine,
        jwt_service: Arc::new(jwt_service),
    };

    let app = create_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
