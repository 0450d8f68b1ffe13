//! PII redaction for EHR Engine logs
//!
//! Patients sign in with their mobile number and doctors with an email address
//! or phone number, so raw login identifiers must never reach a log sink.
//! Everything that logs a caller-supplied identifier routes it through
//! [`redact`] (or the [`redacted_info!`]/[`redacted_warn!`] macros) first.
//!
//! # Detected Data Types
//!
//! - **Email Addresses**: `asha@example.com` → `a***@e***` or `EMAIL[hash]`
//! - **Mobile Numbers**: `9999999999` → `******9999` or `PHONE[hash]`
//! - **Formatted Phone Numbers**: `(555) 123-4567` → `(***) ***-****`
//! - **Custom Patterns**: configurable per deployment
//!
//! With `hash_for_correlation` enabled, redacted values are replaced by a short
//! SHA-256 prefix so the same caller can be followed across log lines without
//! the value itself being recorded.
//!
//! # Example
//!
//! ```rust
//! use logger_redacted::redact;
//!
//! let line = redact("login failed for 9999999999");
//! assert!(!line.contains("9999999999"));
//! ```

pub mod config;
pub mod macros;
pub mod redactor;

pub use config::*;
pub use redactor::*;

use lazy_static::lazy_static;
use std::sync::RwLock;

lazy_static! {
    static ref DEFAULT_REDACTOR: RwLock<PiiRedactor> =
        RwLock::new(PiiRedactor::new(RedactionConfig::default()));
}

/// Apply deployment logging settings to the process-wide redactor
pub fn configure(config: &LoggerConfig) {
    let redactor = PiiRedactor::new(RedactionConfig::from(config));
    match DEFAULT_REDACTOR.write() {
        Ok(mut current) => *current = redactor,
        Err(poisoned) => *poisoned.into_inner() = redactor,
    }
}

/// Redact a value with the process-wide configuration
pub fn redact(text: &str) -> String {
    match DEFAULT_REDACTOR.read() {
        Ok(redactor) => redactor.redact(text),
        Err(poisoned) => poisoned.into_inner().redact(text),
    }
}
