mod config;

use std::sync::Arc;

use tracing::{info, warn};

use sacred_ai::HttpCompletionClient;
use sacred_api::generate::{DevotionalGenerator, GenerationSettings};
use sacred_api::{AppStateInner, build_router};
use sacred_db::Database;
use sacred_notify::Notifier;
use sacred_notify::delivery::Delivery;

use crate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sacred=debug,tower_http=debug".into()),
        )
        .init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("FATAL: {}", e);
            eprintln!("       Set it in your .env file and restart.");
            std::process::exit(1);
        }
    };

    // Init database
    let db = Arc::new(Database::open(&config.db_path)?);
    if !config.admin_emails.is_empty() {
        let promoted = db.promote_admins(&config.admin_emails)?;
        if promoted > 0 {
            info!("Promoted {} existing accounts to admin", promoted);
        }
    }

    let delivery = match &config.notify {
        Some(notify) => Delivery::http(notify.url.clone(), notify.token.clone())?,
        None => {
            warn!("SACRED_NOTIFY_URL not set, notifications will be dropped");
            Delivery::Disabled
        }
    };
    let notifier = Notifier::spawn(delivery);

    let generator = match &config.ai {
        Some(ai) => {
            let client = HttpCompletionClient::new(ai.url.clone(), ai.api_key.clone())?;
            let mut settings = GenerationSettings::new(ai.model.clone(), ai.temperature);
            settings.batch_delay = ai.generation_delay;
            info!("Devotional generation enabled with model {}", ai.model);
            Some(DevotionalGenerator::new(Arc::new(client), settings))
        }
        None => {
            warn!("SACRED_AI_URL/SACRED_AI_KEY not set, devotional generation disabled");
            None
        }
    };

    if config.admin_secret.is_none() {
        info!("SACRED_ADMIN_SECRET not set, admin routes accept admin accounts only");
    }

    let state = Arc::new(AppStateInner {
        db,
        jwt_secret: config.jwt_secret.clone(),
        admin_secret: config.admin_secret.clone(),
        admin_emails: config.admin_emails.clone(),
        notifier,
        generator,
    });

    let app = build_router(state);

    let addr = config.addr()?;
    info!("Sacred Greeks server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        let mut sigterm =
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(sigterm) => sigterm,
                Err(e) => {
                    warn!("Failed to install SIGTERM handler: {}", e);
                    ctrl_c.await.ok();
                    info!("Received Ctrl+C, shutting down...");
                    return;
                }
            };
        tokio::select! {
            _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
            _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
}
