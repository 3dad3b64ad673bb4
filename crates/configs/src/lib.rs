//! # configs
//!
//! Layered application configuration:
//! built-in defaults → `config/default.toml` → `config/{FORUM_ENV}.toml` →
//! environment variables of the form `FORUM__SECTION__KEY`.

use config::{Config, Environment, File, Map};
use secrecy::SecretString;
use serde::Deserialize;

pub const ENV_PREFIX: &str = "FORUM";
pub const ENV_SELECTOR: &str = "FORUM_ENV";
pub const DEFAULT_ENV: &str = "development";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Deserialize)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub pagination: PaginationConfig,
    pub logging: LoggingConfig,
    pub seed: SeedConfig,
}

#[derive(Debug, Deserialize)]
pub struct DatabaseConfig {
    /// Connection string. Without it the in-memory store is used.
    pub url: Option<SecretString>,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct PaginationConfig {
    pub posts_per_page: u64,
    pub threads_per_page: u64,
    pub max_page_size: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive; `RUST_LOG` wins when set.
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeedConfig {
    pub category: String,
    pub threads: u32,
    pub posts_per_thread: u32,
}

impl AppConfig {
    /// Loads `.env`, then every layer for the environment named by `FORUM_ENV`.
    pub fn load() -> Result<Self, ConfigError> {
        if let Err(err) = dotenvy::dotenv() {
            tracing::debug!(%err, "no .env file loaded");
        }
        let env = std::env::var(ENV_SELECTOR).unwrap_or_else(|_| DEFAULT_ENV.to_string());
        Self::load_from(&env, None)
    }

    /// Same layering as [`AppConfig::load`], with an explicit variable set
    /// instead of the process environment when `vars` is given.
    pub fn load_from(env: &str, vars: Option<Map<String, String>>) -> Result<Self, ConfigError> {
        let config = Config::builder()
            .set_default("database.max_connections", 5)?
            .set_default("pagination.posts_per_page", 10)?
            .set_default("pagination.threads_per_page", 10)?
            .set_default("pagination.max_page_size", 100)?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "pretty")?
            .set_default("seed.category", "general")?
            .set_default("seed.threads", 3)?
            .set_default("seed.posts_per_thread", 30)?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true)
                    .source(vars),
            )
            .build()?;

        let app: AppConfig = config.try_deserialize()?;
        app.validate()?;
        Ok(app)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let p = &self.pagination;
        if p.posts_per_page == 0 || p.threads_per_page == 0 || p.max_page_size == 0 {
            return Err(ConfigError::Invalid(
                "page sizes must be greater than zero".to_string(),
            ));
        }
        if p.posts_per_page > p.max_page_size || p.threads_per_page > p.max_page_size {
            return Err(ConfigError::Invalid(format!(
                "default page sizes must not exceed max_page_size ({})",
                p.max_page_size
            )));
        }
        if self.database.max_connections == 0 {
            return Err(ConfigError::Invalid(
                "database.max_connections must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}
