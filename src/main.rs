use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand};
use repo_stats::config::AppConfig;
use repo_stats::github::GitHubSource;
use repo_stats::report::ContributorReport;
use repo_stats::types::RepoId;
use repo_stats::{create_app, AppState};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::watch;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Per-contributor pull request and review activity for a GitHub repository.
#[derive(Parser, Debug)]
#[command(name = "repo-stats", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print a contributor report for one repository.
    ///
    /// Example: repo-stats report azure aro-rp 90
    Report {
        /// Repository owner (user or organization).
        owner: String,
        /// Repository name.
        repo: String,
        /// Only count pull requests opened in the last N days.
        days: i64,
        /// Emit JSON instead of a table.
        #[arg(long)]
        json: bool,
    },
    /// Serve contributor reports over HTTP.
    Serve,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize tracing (logging)
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "repo_stats=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = AppConfig::from_env().context("failed to load configuration from environment")?;

    match cli.command {
        Command::Report {
            owner,
            repo,
            days,
            json,
        } => report(config, RepoId::new(owner, repo), days, json).await,
        Command::Serve => serve(config).await,
    }
}

async fn report(config: AppConfig, repo_id: RepoId, days: i64, json: bool) -> anyhow::Result<()> {
    let source = GitHubSource::new(config.github_token())?;
    let aggregator = config.aggregator(repo_id.clone(), days, Utc::now())?;

    let (cancel_tx, cancel_rx) = watch::channel(false);
    tokio::spawn(async move {
        shutdown_signal().await;
        let _ = cancel_tx.send(true);
    });

    let table = aggregator
        .run_until_cancelled(&source, cancel_rx)
        .await
        .with_context(|| format!("failed to collect activity for {repo_id}"))?;

    let report =
        ContributorReport::from_snapshot(repo_id, aggregator.options().cutoff, table.snapshot());
    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", report.render_table());
    }

    Ok(())
}

async fn serve(config: AppConfig) -> anyhow::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let state = Arc::new(AppState::new(config)?);
    let app = create_app(state);

    tracing::info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("failed to bind TCP listener")?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("failed to start server")?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to install Ctrl+C handler: {}", e);
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
                tracing::error!("failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("signal received, shutting down");
}
