use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, ValueEnum};

use videodog_common::config::AppConfig;
use videodog_daemon::scheduler;
use videodog_engine::{AppContext, Spool};
use videodog_feed::YouTubeFeed;
use videodog_notifier::DiscordWebhookNotifier;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogFormat {
    Json,
    Text,
}

/// Announce new YouTube uploads to Discord webhooks.
#[derive(Debug, Parser)]
#[command(name = "videodog", version)]
struct Args {
    /// Path of the JSON configuration file.
    #[arg(long, env = "VIDEODOG_CONFIG", default_value = "config.json")]
    config: PathBuf,

    /// Track new videos without posting anything.
    #[arg(long)]
    noannounce: bool,

    #[arg(long, value_enum, default_value = "json")]
    log_format: LogFormat,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize tracing
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        "videodog_daemon=info,videodog_engine=info,videodog_feed=info,videodog_notifier=info"
            .into()
    });
    match args.log_format {
        LogFormat::Json => tracing_subscriber::fmt().with_env_filter(filter).json().init(),
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }

    tracing::info!(announce = !args.noannounce, "Videodog starting...");

    let config = AppConfig::load(&args.config)?;

    let feed = Arc::new(YouTubeFeed::new()?);
    let notifier = Arc::new(DiscordWebhookNotifier::new()?);
    let spool = Arc::new(Spool::open(&config.spool_path, config.db_max_connections).await?);

    let ctx = Arc::new(AppContext::new(
        config,
        feed,
        notifier,
        spool.clone(),
        !args.noannounce,
    ));

    if let Err(e) = scheduler::serve(ctx, &spool, shutdown_signal()).await {
        tracing::error!(error = %e, "Videodog exited with error");
        return Err(e.into());
    }

    tracing::info!("Videodog stopped.");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Cannot listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    tracing::info!("Received shutdown signal, stopping after the current tick...");
}
