// Standardized error codes for the EHR Engine.
// Codes are part of the public API surface; never renumber an existing code.

use serde::Serialize;
use std::fmt;

pub mod validation {
    pub const INVALID_INPUT: &str = "VALIDATION_1001";
    pub const MALFORMED_BODY: &str = "VALIDATION_1003";
}

pub mod authentication {
    pub const INVALID_CREDENTIALS: &str = "AUTH_2001";
    pub const TOKEN_INVALID: &str = "AUTH_2002";
    pub const TOKEN_MISSING: &str = "AUTH_2003";
    pub const PRINCIPAL_NOT_FOUND: &str = "AUTH_2004";
}

pub mod authorization {
    pub const ROLE_NOT_ALLOWED: &str = "AUTHZ_3001";
}

pub mod registration {
    pub const DUPLICATE_PRINCIPAL: &str = "REG_4001";
    pub const IDENTIFIER_COLLISION: &str = "REG_4002";
    pub const IDENTIFIER_EXHAUSTED: &str = "REG_4003";
}

pub mod resource {
    pub const NOT_FOUND: &str = "RES_5001";
}

pub mod system {
    pub const INTERNAL: &str = "SYS_9001";
    pub const STORAGE: &str = "SYS_9002";
}

/// A code from one of the tables above
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ErrorCode(&'static str);

impl ErrorCode {
    pub const fn new(code: &'static str) -> Self {
        Self(code)
    }

    pub fn as_str(&self) -> &'static str {
        self.0
    }

    /// Category prefix, e.g. `AUTH` for `AUTH_2001`
    pub fn category(&self) -> &'static str {
        self.0.split('_').next().unwrap_or(self.0)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}
