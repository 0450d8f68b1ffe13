//! Server configuration
//!
//! Sources, later ones winning:
//! 1. Built-in defaults
//! 2. Optional TOML file (`ehr-server.toml` unless `--config` says otherwise)
//! 3. `EHR__*` environment variables, `__` separating nested keys
//!    (`EHR__IDENTITY__JWT_SECRET`, `EHR__PORT`)
//! 4. The conventional `JWT_SECRET` and `DATABASE_URL` variables

use auth_identity::IdentityConfig;
use config::{Config, Environment as EnvSource, File};
use logger_redacted::LoggerConfig;
use serde::{Deserialize, Serialize};

/// Ten years. Longer lifetimes are refused at startup.
pub const MAX_TOKEN_TTL_HOURS: i64 = 24 * 365 * 10;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub environment: Environment,
    /// PostgreSQL URL. Unset means in-memory stores.
    #[serde(default)]
    pub database_url: Option<String>,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,
    #[serde(default)]
    pub identity: IdentityConfig,
    #[serde(default)]
    pub logging: LoggerConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            environment: Environment::default(),
            database_url: None,
            max_connections: default_max_connections(),
            cors_origins: default_cors_origins(),
            identity: IdentityConfig::default(),
            logging: LoggerConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn load(path: &str) -> Result<Self, config::ConfigError> {
        let mut loaded: ServerConfig = Config::builder()
            .add_source(File::with_name(path).required(false))
            .add_source(
                EnvSource::with_prefix("EHR")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("cors_origins"),
            )
            .build()?
            .try_deserialize()?;

        if let Ok(secret) = std::env::var("JWT_SECRET") {
            loaded.identity.jwt_secret = secret;
        }
        if let Ok(url) = std::env::var("DATABASE_URL") {
            loaded.database_url = Some(url);
        }

        Ok(loaded)
    }

    /// Reject settings that must never reach production
    pub fn validate(&self) -> Result<(), String> {
        if self.environment == Environment::Production && self.identity.uses_default_secret() {
            return Err("refusing to start in production with the default JWT secret; set JWT_SECRET".to_string());
        }
        if self.identity.jwt_secret.is_empty() {
            return Err("JWT secret must not be empty".to_string());
        }
        if self.identity.token_ttl_hours <= 0 {
            return Err("identity.token_ttl_hours must be positive".to_string());
        }
        if self.identity.token_ttl_hours > MAX_TOKEN_TTL_HOURS {
            return Err(format!(
                "identity.token_ttl_hours must be at most {MAX_TOKEN_TTL_HOURS}"
            ));
        }
        if !(4..=31).contains(&self.identity.bcrypt_cost) {
            return Err("identity.bcrypt_cost must be between 4 and 31".to_string());
        }
        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn is_production(&self) -> bool {
        self.environment == Environment::Production
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_max_connections() -> u32 {
    10
}

fn default_cors_origins() -> Vec<String> {
    vec![
        "http://localhost:3000".to_string(),
        "http://127.0.0.1:3000".to_string(),
    ]
}
