//! # Alumni Connect server
//!
//! Single binary serving the REST API, the event stream and, in lite mode,
//! locally stored uploads.

use alumni_api::{AppState, build_router};
use alumni_db::{Database, storage::FileStore};
use clap::Parser;
use std::net::SocketAddr;

#[derive(Parser, Debug)]
#[command(name = "alumni", version, about = "Alumni Connect mentorship server")]
struct Cli {
    /// Run database migrations and exit
    #[arg(long)]
    migrate_only: bool,

    /// Log as JSON lines instead of human-readable text
    #[arg(long, env = "ALUMNI_LOG_JSON")]
    log_json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = alumni_common::config::init()?;

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "alumni=debug,tower_http=debug".into());
    if cli.log_json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_thread_ids(true)
            .init();
    }

    tracing::info!("Starting Alumni Connect v{}", env!("CARGO_PKG_VERSION"));

    let db = Database::connect(config).await?;
    db.migrate().await?;
    if cli.migrate_only {
        tracing::info!("Migrations applied, exiting");
        return Ok(());
    }

    let storage = FileStore::from_config(&config.storage)?;
    storage.ensure_ready().await?;

    let state = AppState::new(
        db,
        storage,
        config.limits.clone(),
        config.auth.jwt_secret.clone(),
    );
    let router = build_router(state);

    let addr = SocketAddr::new(config.server.host.parse()?, config.server.port);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("REST API listening on http://{addr}");

    axum::serve(listener, router).await?;
    Ok(())
}
