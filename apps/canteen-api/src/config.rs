//! API configuration module.
//!
//! Configuration is loaded from environment variables with fallback to defaults.
//!
//! | Variable                      | Default               |
//! |-------------------------------|-----------------------|
//! | `PORT`                        | `5500`                |
//! | `HOST`                        | `0.0.0.0`             |
//! | `DATABASE_URL`                | `sqlite://canteen.db` |
//! | `DATABASE_MAX_CONNECTIONS`    | `5`                   |
//! | `JWT_SECRET`                  | dev secret (warned)   |
//! | `RAZORPAY_KEY_ID`             | empty                 |
//! | `RAZORPAY_KEY_SECRET`         | empty (rejects all)   |
//! | `BUSINESS_UTC_OFFSET_MINUTES` | `330`                 |
//! | `CORS_ALLOWED_ORIGINS`        | `*`                   |

use std::env;
use std::str::FromStr;

use canteen_db::DEFAULT_UTC_OFFSET_MINUTES;
use tracing::warn;

const DEV_JWT_SECRET: &str = "canteen-dev-secret-change-in-production";

/// API configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// HTTP listen port
    pub port: u16,

    /// Bind address
    pub host: String,

    /// SQLite URL or file path
    pub database_url: String,

    /// Pool size
    pub database_max_connections: u32,

    /// HMAC secret for bearer tokens
    pub jwt_secret: String,

    /// Public gateway key id handed to customers
    pub razorpay_key_id: String,

    /// Gateway secret for signature verification
    pub razorpay_key_secret: String,

    /// Offset deriving the business day for quota rows and delivery dates
    pub business_utc_offset_minutes: i32,

    /// Allowed CORS origins; `["*"]` allows any
    pub cors_allowed_origins: Vec<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        ApiConfig {
            port: 5500,
            host: "0.0.0.0".to_string(),
            database_url: "sqlite://canteen.db".to_string(),
            database_max_connections: 5,
            jwt_secret: DEV_JWT_SECRET.to_string(),
            razorpay_key_id: String::new(),
            razorpay_key_secret: String::new(),
            business_utc_offset_minutes: DEFAULT_UTC_OFFSET_MINUTES,
            cors_allowed_origins: vec!["*".to_string()],
        }
    }
}

impl ApiConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds a configuration from any variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = ApiConfig::default();

        let jwt_secret = match lookup("JWT_SECRET").filter(|s| !s.is_empty()) {
            Some(secret) => secret,
            None => {
                warn!("JWT_SECRET not set, using the development secret");
                defaults.jwt_secret
            }
        };

        let razorpay_key_secret = lookup("RAZORPAY_KEY_SECRET").unwrap_or_default();
        if razorpay_key_secret.is_empty() {
            warn!("RAZORPAY_KEY_SECRET not set, every online payment will be rejected");
        }

        let business_utc_offset_minutes: i32 = parse_or(&lookup, "BUSINESS_UTC_OFFSET_MINUTES", defaults.business_utc_offset_minutes)?;
        // UTC-12:00 .. UTC+14:00
        if !(-720..=840).contains(&business_utc_offset_minutes) {
            return Err(ConfigError::InvalidValue("BUSINESS_UTC_OFFSET_MINUTES".to_string()));
        }

        let database_max_connections: u32 = parse_or(&lookup, "DATABASE_MAX_CONNECTIONS", defaults.database_max_connections)?;
        if database_max_connections == 0 {
            return Err(ConfigError::InvalidValue("DATABASE_MAX_CONNECTIONS".to_string()));
        }

        let cors_allowed_origins = match lookup("CORS_ALLOWED_ORIGINS") {
            Some(raw) => {
                let origins: Vec<String> = raw
                    .split(',')
                    .map(str::trim)
                    .filter(|o| !o.is_empty())
                    .map(String::from)
                    .collect();
                if origins.is_empty() {
                    defaults.cors_allowed_origins
                } else {
                    origins
                }
            }
            None => defaults.cors_allowed_origins,
        };

        Ok(ApiConfig {
            port: parse_or(&lookup, "PORT", defaults.port)?,
            host: lookup("HOST").unwrap_or(defaults.host),
            database_url: lookup("DATABASE_URL").unwrap_or(defaults.database_url),
            database_max_connections,
            jwt_secret,
            razorpay_key_id: lookup("RAZORPAY_KEY_ID").unwrap_or_default(),
            razorpay_key_secret,
            business_utc_offset_minutes,
            cors_allowed_origins,
        })
    }

    /// `host:port` for the listener.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn allows_any_origin(&self) -> bool {
        self.cors_allowed_origins.iter().any(|o| o == "*")
    }
}

fn parse_or<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, name: &str, default: T) -> Result<T, ConfigError> {
    match lookup(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue(name.to_string())),
        None => Ok(default),
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),
}
