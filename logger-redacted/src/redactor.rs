#![allow(clippy::expect_used)]

use base64::{engine::general_purpose, Engine as _};
use lazy_static::lazy_static;
use regex::Regex;
use sha2::{Digest, Sha256};

lazy_static! {
    static ref EMAIL_REGEX: Regex =
        Regex::new(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b").expect("email pattern");
    static ref MOBILE_REGEX: Regex =
        Regex::new(r"(?:\+\d{1,3}[-\s]?)?\b\d{10}\b").expect("mobile pattern");
    static ref PHONE_REGEX: Regex =
        Regex::new(r"\(?\b\d{3}\)?[-.\s]\d{3}[-.\s]\d{4}\b").expect("phone pattern");
}

/// PII redaction configuration
#[derive(Debug, Clone)]
pub struct RedactionConfig {
    pub redact_emails: bool,
    pub redact_phones: bool,
    pub hash_for_correlation: bool,
    pub custom_patterns: Vec<(Regex, String)>,
}

impl Default for RedactionConfig {
    fn default() -> Self {
        Self {
            redact_emails: true,
            redact_phones: true,
            hash_for_correlation: true,
            custom_patterns: Vec::new(),
        }
    }
}

/// PII redactor for log messages
#[derive(Debug, Clone)]
pub struct PiiRedactor {
    config: RedactionConfig,
}

impl PiiRedactor {
    pub fn new(config: RedactionConfig) -> Self {
        Self { config }
    }

    pub fn redact(&self, text: &str) -> String {
        let mut result = text.to_string();

        if self.config.redact_emails {
            result = self.redact_emails(&result);
        }

        if self.config.redact_phones {
            result = self.redact_mobiles(&result);
            result = self.redact_phones(&result);
        }

        for (pattern, replacement) in &self.config.custom_patterns {
            result = pattern.replace_all(&result, replacement.as_str()).to_string();
        }

        result
    }

    fn redact_emails(&self, text: &str) -> String {
        EMAIL_REGEX
            .replace_all(text, |caps: &regex::Captures| {
                let email = caps.get(0).map_or("", |m| m.as_str());
                if self.config.hash_for_correlation {
                    return format!("EMAIL[{}]", self.hash_value(email));
                }
                match email.split_once('@') {
                    Some((local, domain)) => format!(
                        "{}***@{}***",
                        first_char(local),
                        first_char(domain)
                    ),
                    None => "***@***".to_string(),
                }
            })
            .to_string()
    }

    fn redact_mobiles(&self, text: &str) -> String {
        MOBILE_REGEX
            .replace_all(text, |caps: &regex::Captures| {
                let number = caps.get(0).map_or("", |m| m.as_str());
                if self.config.hash_for_correlation {
                    return format!("PHONE[{}]", self.hash_value(number));
                }
                let digits: Vec<char> = number.chars().filter(char::is_ascii_digit).collect();
                let tail: String = digits.iter().rev().take(4).rev().collect();
                format!("******{tail}")
            })
            .to_string()
    }

    fn redact_phones(&self, text: &str) -> String {
        PHONE_REGEX
            .replace_all(text, |caps: &regex::Captures| {
                if self.config.hash_for_correlation {
                    format!("PHONE[{}]", self.hash_value(caps.get(0).map_or("", |m| m.as_str())))
                } else {
                    "(***) ***-****".to_string()
                }
            })
            .to_string()
    }

    fn hash_value(&self, value: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(value.as_bytes());
        let result = hasher.finalize();
        // first 8 bytes are enough for correlation
        general_purpose::STANDARD_NO_PAD.encode(result.get(..8).unwrap_or_default())
    }
}

fn first_char(s: &str) -> String {
    s.chars().next().map(String::from).unwrap_or_default()
}
