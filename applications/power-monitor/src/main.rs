use power_monitor::{
    api::{create_router, AppState},
    clock::SystemClock,
    config::Config,
    keepalive::KeepAlive,
    notify::Notifier,
    outage::PowerMonitor,
    telegram::{ChatBot, TelegramClient},
};
use std::{sync::Arc, time::Duration};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// How long pending notifications may take to flush on shutdown.
const NOTIFIER_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing, LOG_FORMAT=json switches to structured output
    let registry = tracing_subscriber::registry().with(
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "info,power_monitor=debug,tower_http=debug".into()),
    );
    if std::env::var("LOG_FORMAT").is_ok_and(|format| format == "json") {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    info!("Starting power-monitor service");

    // Load configuration: YAML file when APP_CONFIG is set, environment otherwise
    let config = match std::env::var("APP_CONFIG") {
        Ok(path) => {
            let config = Config::load(&path)?;
            info!("Configuration loaded from: {}", path);
            config
        }
        Err(_) => {
            let config = Config::from_env()?;
            info!("Configuration loaded from environment");
            config
        }
    };
    info!(
        bot_token = %config.masked_bot_token(),
        chat_id = %config.telegram.chat_id,
        group = %config.monitor.group_label,
        "Telegram configured"
    );

    let telegram = TelegramClient::new(&config.telegram)?;
    let (notifier, notifier_task) = Notifier::spawn(
        Arc::new(telegram.clone()),
        config.notifier.queue_capacity,
    );
    let monitor = PowerMonitor::new(Arc::new(SystemClock));

    // Spawn chat command loop
    let bot = ChatBot::new(
        telegram,
        monitor.clone(),
        config.monitor.group_label.clone(),
        config.telegram.poll_timeout_secs,
    );
    let bot_task = tokio::spawn(bot.run());

    // Spawn keep-alive pinger
    let keep_alive_task = if config.keep_alive.enabled {
        let keep_alive = KeepAlive::from_config(&config)?;
        Some(tokio::spawn(async move { keep_alive.run().await }))
    } else {
        info!("Keep-alive disabled");
        None
    };

    let state = AppState {
        monitor,
        notifier,
        group_label: config.monitor.group_label.clone(),
    };
    let app = create_router(state);

    // Start HTTP server
    let addr = config.bind_address();
    info!("Starting HTTP server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    bot_task.abort();
    if let Some(task) = keep_alive_task {
        task.abort();
    }

    // The router (and with it the last Notifier) is gone, so the queue closes
    // once drained.
    match tokio::time::timeout(NOTIFIER_DRAIN_TIMEOUT, notifier_task).await {
        Ok(Ok(())) => info!("Pending notifications flushed"),
        Ok(Err(e)) => error!("Notifier task failed: {}", e),
        Err(_) => warn!("Timed out flushing pending notifications"),
    }

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down gracefully");
        },
        _ = terminate => {
            info!("Received SIGTERM, shutting down gracefully");
        },
    }
}
