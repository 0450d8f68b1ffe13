// Logger configuration
use crate::redactor::RedactionConfig;
use serde::{Deserialize, Serialize};

/// Logging settings shared by binaries
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggerConfig {
    /// Route caller-supplied identifiers through the redactor
    #[serde(default = "default_true")]
    pub redaction_enabled: bool,
    /// Replace redacted values with a correlation hash instead of a mask
    #[serde(default = "default_true")]
    pub hash_for_correlation: bool,
    /// Default `EnvFilter` directive when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Emit JSON lines instead of human-readable output
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            redaction_enabled: true,
            hash_for_correlation: true,
            log_level: default_log_level(),
            json: false,
        }
    }
}

impl From<&LoggerConfig> for RedactionConfig {
    fn from(config: &LoggerConfig) -> Self {
        Self {
            redact_emails: config.redaction_enabled,
            redact_phones: config.redaction_enabled,
            hash_for_correlation: config.hash_for_correlation,
            custom_patterns: Vec::new(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}
