//! # alumni-db
//!
//! Persistence layer for Alumni Connect:
//! - **SQL store** via `sqlx::AnyPool` — SQLite in lite mode and tests, PostgreSQL in production.
//!   Each mentorship row is a document (conversation, notes and flags embedded as JSON)
//!   written with optimistic version checks.
//! - **File storage** — S3/MinIO, or a local directory in lite mode.

pub mod any_compat;
pub mod repository;
pub mod storage;

use anyhow::Result;
use sqlx::AnyPool;
use sqlx::any::AnyPoolOptions;

/// Shared database state passed through Axum extractors.
#[derive(Clone)]
pub struct Database {
    pub pool: AnyPool,
}

impl Database {
    /// Connect using the application config.
    pub async fn connect(config: &alumni_common::config::AppConfig) -> Result<Self> {
        Self::connect_url(
            &config.database.url,
            config.database.max_connections,
            config.database.min_connections,
        )
        .await
    }

    /// Connect to an explicit URL (`sqlite://…` or `postgres://…`).
    pub async fn connect_url(url: &str, max_connections: u32, min_connections: u32) -> Result<Self> {
        sqlx::any::install_default_drivers();

        tracing::info!("Connecting to database...");
        let pool = AnyPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .connect(url)
            .await?;
        tracing::info!("Connected to database");

        Ok(Self { pool })
    }

    /// A private in-memory SQLite database, migrated and ready.
    ///
    /// Uses a single connection that is never recycled, since each in-memory
    /// SQLite connection is its own database.
    pub async fn in_memory() -> Result<Self> {
        sqlx::any::install_default_drivers();

        let pool = AnyPoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;

        let db = Self { pool };
        db.migrate().await?;
        Ok(db)
    }

    /// Run database migrations.
    pub async fn migrate(&self) -> Result<()> {
        tracing::info!("Running database migrations...");
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        tracing::info!("Migrations complete");
        Ok(())
    }

    /// Health check — verify the database is reachable.
    pub async fn health_check(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }
}
