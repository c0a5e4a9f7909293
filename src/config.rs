// src/config.rs
use crate::error::{AppError, AppResult};
use std::{net::SocketAddr, path::PathBuf, str::FromStr, time::Duration};

// --- Defaults ---
const DEFAULT_DATABASE_URL: &str = "sqlite://healthwallet.db";
const DEFAULT_MAX_CONNECTIONS: u32 = 5;
const DEFAULT_JWT_EXPIRY_HOURS: u64 = 24 * 7; // 7 days
const DEFAULT_UPLOAD_DIR: &str = "uploads";
const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024; // 10 MB
const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 5000;

/// Below this length the signing secret is accepted but flagged in the logs.
pub const RECOMMENDED_SECRET_LEN: usize = 32;

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub jwt_expiry: Duration,
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub upload_dir: PathBuf,
    pub max_upload_bytes: usize,
}

/// Full application configuration, read once at start-up.
#[derive(Debug, Clone)]
pub struct Config {
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub storage: StorageConfig,
    pub host: String,
    pub port: u16,
    /// Empty means "mirror whatever origin the browser sends".
    pub cors_origins: Vec<String>,
    pub frontend_dir: Option<PathBuf>,
}

impl Config {
    /// Reads the configuration from the process environment (after `.env`).
    pub fn from_env() -> AppResult<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Values set but empty count as unset
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        // No insecure fallback: refuse to start without a secret
        let jwt_secret = get("JWT_SECRET")
            .ok_or_else(|| AppError::Config("JWT_SECRET must be set".to_string()))?;

        let expiry_hours: u64 = parse_or(get("JWT_EXPIRY_HOURS"), "JWT_EXPIRY_HOURS", DEFAULT_JWT_EXPIRY_HOURS)?;
        if expiry_hours == 0 {
            return Err(AppError::Config("JWT_EXPIRY_HOURS must be greater than zero".to_string()));
        }
        // Token `exp` is an i64 of seconds
        let expiry_secs = expiry_hours
            .checked_mul(60 * 60)
            .filter(|secs| i64::try_from(*secs).is_ok())
            .ok_or_else(|| AppError::Config("JWT_EXPIRY_HOURS is too large".to_string()))?;

        let cors_origins = get("CORS_ORIGINS")
            .map(|raw| {
                raw.split(',')
                    .map(|o| o.trim().to_string())
                    .filter(|o| !o.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        Ok(Config {
            database: DatabaseConfig {
                url: get("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
                max_connections: parse_or(get("DATABASE_MAX_CONNECTIONS"), "DATABASE_MAX_CONNECTIONS", DEFAULT_MAX_CONNECTIONS)?,
            },
            auth: AuthConfig {
                jwt_secret,
                jwt_expiry: Duration::from_secs(expiry_secs),
            },
            storage: StorageConfig {
                upload_dir: get("UPLOAD_DIR")
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from(DEFAULT_UPLOAD_DIR)),
                max_upload_bytes: parse_or(get("MAX_UPLOAD_BYTES"), "MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES)?,
            },
            host: get("HOST").unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: parse_or(get("PORT"), "PORT", DEFAULT_PORT)?,
            cors_origins,
            frontend_dir: get("FRONTEND_DIR").map(PathBuf::from),
        })
    }

    pub fn socket_addr(&self) -> AppResult<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| AppError::Config(format!("invalid HOST/PORT: {}", e)))
    }
}

fn parse_or<T: FromStr>(raw: Option<String>, key: &str, default: T) -> AppResult<T> {
    match raw {
        Some(value) => value
            .parse()
            .map_err(|_| AppError::Config(format!("{} has an invalid value: {}", key, value))),
        None => Ok(default),
    }
}
