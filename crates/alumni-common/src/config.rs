//! Application configuration loaded from environment variables and config files.
//!
//! Supports `.env` files for development and environment variables for production.
//! Config precedence: env vars > .env file > config.toml > defaults

use serde::Deserialize;
use std::sync::OnceLock;

static CONFIG: OnceLock<AppConfig> = OnceLock::new();

/// Initialize the global configuration from environment.
///
/// Should be called once at application startup. Later calls return the first config.
pub fn init() -> Result<&'static AppConfig, config::ConfigError> {
    // Load .env file if present (development)
    let _ = dotenvy::dotenv();

    let defaults = LimitsConfig::default();
    let cfg = config::Config::builder()
        // Defaults
        .set_default("server.host", "0.0.0.0")?
        .set_default("server.port", 8080)?
        .set_default("database.url", "sqlite://data/alumni.db?mode=rwc")?
        .set_default("database.max_connections", 20)?
        .set_default("database.min_connections", 1)?
        .set_default("storage.endpoint", "")?
        .set_default("storage.bucket", "alumni")?
        .set_default("storage.access_key", "")?
        .set_default("storage.secret_key", "")?
        .set_default("storage.region", "us-east-1")?
        .set_default("storage.data_dir", "./data/uploads")?
        .set_default("limits.max_message_length", defaults.max_message_length as i64)?
        .set_default("limits.max_note_length", defaults.max_note_length as i64)?
        .set_default("limits.max_request_length", defaults.max_request_length as i64)?
        .set_default("limits.max_file_size_bytes", defaults.max_file_size_bytes as i64)?
        .set_default(
            "limits.max_mentorship_capacity",
            defaults.max_mentorship_capacity,
        )?
        // Optional config file
        .add_source(config::File::with_name("config").required(false))
        // Environment variables (ALUMNI__SERVER__HOST, ALUMNI__AUTH__JWT_SECRET, etc.)
        .add_source(
            config::Environment::with_prefix("ALUMNI")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    let app_config: AppConfig = cfg.try_deserialize()?;
    Ok(CONFIG.get_or_init(|| app_config))
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub storage: StorageConfig,
    pub limits: LimitsConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// `sqlite://…` for lite mode, `postgres://…` in production
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    /// HS256 secret shared with the identity provider that issues bearer tokens
    pub jwt_secret: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    /// S3 endpoint URL (e.g., http://localhost:9000 for MinIO).
    /// Leave empty to keep uploads on local disk under `data_dir`.
    pub endpoint: String,
    pub bucket: String,
    pub access_key: String,
    pub secret_key: String,
    pub region: String,
    pub data_dir: String,
    /// Base URL objects are publicly reachable at, if different from the endpoint.
    pub public_url: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LimitsConfig {
    pub max_message_length: usize,
    pub max_note_length: usize,
    /// Applies to both the request message and the topic.
    pub max_request_length: usize,
    pub max_file_size_bytes: usize,
    pub max_mentorship_capacity: i64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_message_length: 4000,
            max_note_length: 2000,
            max_request_length: 1000,
            max_file_size_bytes: 25 * 1024 * 1024,
            max_mentorship_capacity: 20,
        }
    }
}
