use serde::{Deserialize, Serialize};

/// Placeholder secret shipped for local development only
pub const DEFAULT_JWT_SECRET: &str = "change-me-in-production";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityConfig {
    /// HS256 signing secret, held server-side only
    #[serde(default = "default_jwt_secret")]
    pub jwt_secret: String,
    /// Token lifetime; 168 hours = 7 days
    #[serde(default = "default_token_ttl_hours")]
    pub token_ttl_hours: i64,
    #[serde(default = "default_bcrypt_cost")]
    pub bcrypt_cost: u32,
    #[serde(default = "default_password_min_length")]
    pub password_min_length: usize,
    /// Optional cap on identifier allocation attempts. Unset means retry forever.
    #[serde(default)]
    pub max_id_attempts: Option<u32>,
}

impl IdentityConfig {
    pub fn uses_default_secret(&self) -> bool {
        self.jwt_secret == DEFAULT_JWT_SECRET
    }
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            jwt_secret: default_jwt_secret(),
            token_ttl_hours: default_token_ttl_hours(),
            bcrypt_cost: default_bcrypt_cost(),
            password_min_length: default_password_min_length(),
            max_id_attempts: None,
        }
    }
}

fn default_jwt_secret() -> String {
    DEFAULT_JWT_SECRET.to_string()
}

fn default_token_ttl_hours() -> i64 {
    168
}

fn default_bcrypt_cost() -> u32 {
    10
}

fn default_password_min_length() -> usize {
    6
}
