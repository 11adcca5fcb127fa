use std::{env, path::PathBuf, str::FromStr};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{name} has an invalid value: {value}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Secret used to sign session tokens
    pub jwt_secret: String,
    /// Address the server listens on
    pub bind_addr: String,
    pub posts_per_page: usize,
    pub session_hours: i64,
    pub bcrypt_cost: u32,
    pub login_rate_per_minute: u32,
    pub max_concurrent_requests: usize,
    /// Optional JSON file with categories and locations to load at startup
    pub fixtures_path: Option<PathBuf>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let jwt_secret = env::var("JWT_SECRET").map_err(|_| ConfigError::Missing("JWT_SECRET"))?;

        Ok(Self {
            jwt_secret,
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string()),
            posts_per_page: parse_var("POSTS_PER_PAGE", 10)?,
            session_hours: parse_var("SESSION_HOURS", 24)?,
            bcrypt_cost: parse_var("BCRYPT_COST", bcrypt::DEFAULT_COST)?,
            login_rate_per_minute: parse_var("LOGIN_RATE_PER_MINUTE", 30)?,
            max_concurrent_requests: parse_var("MAX_CONCURRENT_REQUESTS", 512)?,
            fixtures_path: env::var("FIXTURES_PATH").ok().map(PathBuf::from),
        })
    }

    /// Settings for tests and local experiments: cheap hashing, no fixtures.
    pub fn for_tests() -> Self {
        Self {
            jwt_secret: "test-secret".to_string(),
            bind_addr: "127.0.0.1:0".to_string(),
            posts_per_page: 10,
            session_hours: 1,
            bcrypt_cost: 4,
            login_rate_per_minute: 1000,
            max_concurrent_requests: 64,
            fixtures_path: None,
        }
    }
}

fn parse_var<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
        Err(_) => Ok(default),
    }
}
