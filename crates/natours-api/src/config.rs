use std::{env, fmt::Display, str::FromStr};

use tracing::{info, warn};

const DEV_JWT_SECRET: &str = "natours-development-secret-do-not-use-in-production";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => f.write_str("development"),
            Environment::Production => f.write_str("production"),
        }
    }
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "production" | "prod" => Ok(Environment::Production),
            other => Err(format!("unknown environment '{other}'")),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("JWT_SECRET must be set in production")]
    MissingJwtSecret,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub addr: String,
    pub env: Environment,
    pub jwt_secret: String,
    pub jwt_expires_in_secs: i64,
    pub jwt_cookie_expires_in_days: i64,
    pub page_limit_max: usize,
    /// Requests one client may make to `/api` per window.
    pub rate_limit_max: usize,
    pub rate_limit_window_secs: u64,
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from any key lookup; `load` uses the process
    /// environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let env: Environment = try_load(&lookup, "NATOURS_ENV", Environment::Development);
        let jwt_secret = match lookup("JWT_SECRET") {
            Some(secret) if !secret.is_empty() => secret,
            _ if env == Environment::Production => return Err(ConfigError::MissingJwtSecret),
            _ => {
                warn!("JWT_SECRET not set, using the development secret");
                DEV_JWT_SECRET.to_string()
            }
        };

        Ok(Self {
            addr: try_load(&lookup, "NATOURS_ADDR", "0.0.0.0:3000".to_string()),
            env,
            jwt_secret,
            jwt_expires_in_secs: try_load(&lookup, "JWT_EXPIRES_IN_SECS", 90 * 24 * 60 * 60),
            jwt_cookie_expires_in_days: try_load(&lookup, "JWT_COOKIE_EXPIRES_IN_DAYS", 90),
            page_limit_max: try_load(&lookup, "NATOURS_PAGE_LIMIT_MAX", 100),
            rate_limit_max: try_load(&lookup, "NATOURS_RATE_LIMIT_MAX", 100),
            rate_limit_window_secs: try_load(&lookup, "NATOURS_RATE_LIMIT_WINDOW_SECS", 60 * 60),
        })
    }

    pub fn is_production(&self) -> bool {
        self.env == Environment::Production
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            addr: "0.0.0.0:3000".to_string(),
            env: Environment::Development,
            jwt_secret: DEV_JWT_SECRET.to_string(),
            jwt_expires_in_secs: 90 * 24 * 60 * 60,
            jwt_cookie_expires_in_days: 90,
            page_limit_max: 100,
            rate_limit_max: 100,
            rate_limit_window_secs: 60 * 60,
        }
    }
}

fn try_load<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T
where
    T: FromStr + Display,
    T::Err: Display,
{
    let Some(raw) = lookup(key) else {
        info!("{key} not set, using default: {default}");
        return default;
    };
    raw.trim().parse().unwrap_or_else(|e| {
        warn!("Invalid {key} value '{raw}': {e}, using default: {default}");
        default
    })
}
