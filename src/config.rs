use std::{str::FromStr, time::Duration};

use bytesize::ByteSize;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{name} has an invalid value {value:?}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub address: String,
    pub read_timeout: Duration,
    pub write_timeout: Duration,
    pub idle_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_conns: u32,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct LoggerConfig {
    pub level: String,
    pub file: Option<String>,
}

#[derive(Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub expiration: Duration,
}

// the secret must never end up in a log line
impl std::fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtConfig")
            .field("secret", &"<redacted>")
            .field("expiration", &self.expiration)
            .finish()
    }
}

#[derive(Clone)]
pub struct StorageConfig {
    pub account_id: String,
    pub access_key: String,
    pub secret_key: String,
    pub bucket: String,
    pub endpoint: String,
    pub public_url: String,
    pub max_upload_size: ByteSize,
}

impl std::fmt::Debug for StorageConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageConfig")
            .field("account_id", &self.account_id)
            .field("bucket", &self.bucket)
            .field("endpoint", &self.endpoint)
            .field("public_url", &self.public_url)
            .field("max_upload_size", &self.max_upload_size)
            .finish_non_exhaustive()
    }
}

/// Process configuration, read once at startup and handed to every component
/// that needs a piece of it.
#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub logger: LoggerConfig,
    pub jwt: JwtConfig,
    pub storage: StorageConfig,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let account_id = required("R2_ACCOUNT_ID")?;

        let endpoint = optional("R2_ENDPOINT")
            .unwrap_or_else(|| format!("https://{account_id}.r2.cloudflarestorage.com"));

        Ok(Self {
            server: ServerConfig {
                address: or_default("SERVER_ADDRESS", "0.0.0.0:8000"),
                read_timeout: seconds("SERVER_READ_TIMEOUT", 10)?,
                write_timeout: seconds("SERVER_WRITE_TIMEOUT", 10)?,
                idle_timeout: seconds("SERVER_IDLE_TIMEOUT", 120)?,
            },
            database: DatabaseConfig {
                url: or_default("DATABASE_URL", "sqlite://db.sqlite?mode=rwc"),
                max_conns: parsed("DATABASE_MAX_CONNS", 20)?,
                timeout: seconds("DATABASE_TIMEOUT", 5)?,
            },
            logger: LoggerConfig {
                level: or_default("LOG_LEVEL", "info"),
                file: optional("LOG_FILE"),
            },
            jwt: JwtConfig {
                secret: required("JWT_SECRET")?,
                expiration: seconds("JWT_EXPIRATION", 60 * 60 * 24)?,
            },
            storage: StorageConfig {
                account_id,
                access_key: required("R2_ACCESS_KEY")?,
                secret_key: required("R2_SECRET_KEY")?,
                bucket: or_default("R2_BUCKET", "ember-imgupper"),
                endpoint,
                public_url: or_default("PUBLIC_URL", "https://cdn.imgupper.web.id"),
                max_upload_size: parsed("MAX_UPLOAD_SIZE", ByteSize::mib(300))?,
            },
        })
    }
}

fn optional(name: &'static str) -> Option<String> {
    std::env::var(name).ok().filter(|x| !x.trim().is_empty())
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    optional(name).ok_or(ConfigError::Missing(name))
}

fn or_default(name: &'static str, default: &str) -> String {
    optional(name).unwrap_or_else(|| default.to_owned())
}

fn parsed<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match optional(name) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
    }
}

fn seconds(name: &'static str, default: u64) -> Result<Duration, ConfigError> {
    parsed(name, default).map(Duration::from_secs)
}
