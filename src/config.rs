// Runtime configuration loaded from environment variables (optionally via .env)

use chrono::Duration;
use std::path::PathBuf;

const DEFAULT_ACCESS_TOKEN_TTL_SECS: i64 = 900; // 15 minutes
const DEFAULT_REFRESH_TOKEN_TTL_SECS: i64 = 604_800; // 7 days
const DEFAULT_ADMIN_EMAIL: &str = "admin@eventhub.local";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set in environment")]
    Missing(&'static str),

    #[error("{var} is invalid: {reason}")]
    Invalid { var: &'static str, reason: String },
}

/// Signing key and lifetimes for the two-token session credential
#[derive(Debug, Clone)]
pub struct TokenConfig {
    pub secret: String,
    pub access_token_ttl: Duration,
    pub refresh_token_ttl: Duration,
}

/// Credentials of the administrator account seeded at startup
#[derive(Debug, Clone)]
pub struct AdminSeed {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub tokens: TokenConfig,
    pub storage_base_path: PathBuf,
    pub admin: Option<AdminSeed>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;

        let secret = lookup("JWT_SECRET")
            .filter(|s| !s.trim().is_empty())
            .ok_or(ConfigError::Missing("JWT_SECRET"))?;

        let host = lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let port = parse_or("PORT", lookup("PORT"), 8080u16)?;

        let access_secs = parse_or(
            "ACCESS_TOKEN_TTL_SECS",
            lookup("ACCESS_TOKEN_TTL_SECS"),
            DEFAULT_ACCESS_TOKEN_TTL_SECS,
        )?;
        let refresh_secs = parse_or(
            "REFRESH_TOKEN_TTL_SECS",
            lookup("REFRESH_TOKEN_TTL_SECS"),
            DEFAULT_REFRESH_TOKEN_TTL_SECS,
        )?;
        if access_secs <= 0 || refresh_secs <= 0 {
            return Err(ConfigError::Invalid {
                var: "ACCESS_TOKEN_TTL_SECS/REFRESH_TOKEN_TTL_SECS",
                reason: "token lifetimes must be positive".to_string(),
            });
        }

        let storage_base_path = lookup("STORAGE_BASE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("./storage"));

        let admin = lookup("ADMIN_PASSWORD")
            .filter(|p| !p.is_empty())
            .map(|password| AdminSeed {
                email: lookup("ADMIN_EMAIL").unwrap_or_else(|| DEFAULT_ADMIN_EMAIL.to_string()),
                password,
            });

        Ok(Self {
            database_url,
            host,
            port,
            tokens: TokenConfig {
                secret,
                access_token_ttl: Duration::seconds(access_secs),
                refresh_token_ttl: Duration::seconds(refresh_secs),
            },
            storage_base_path,
            admin,
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_or<T>(var: &'static str, raw: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match raw {
        None => Ok(default),
        Some(value) => value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            var,
            reason: e.to_string(),
        }),
    }
}
