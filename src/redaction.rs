//! Pattern-based masking of secrets and private addresses.

use crate::error::Result;
use regex::Regex;

pub const REDACTED_IP: &str = "[REDACTED_IP]";
pub const REDACTED_SECRET: &str = "[REDACTED_SECRET]";

const PRIVATE_IP_PATTERN: &str = concat!(
    r"\b(",
    r"10\.(?:\d{1,3}\.){2}\d{1,3}|",
    r"192\.168\.(?:\d{1,3}\.)\d{1,3}|",
    r"172\.(?:1[6-9]|2\d|3[0-1])\.(?:\d{1,3}\.)\d{1,3}",
    r")\b"
);

const SECRET_PATTERNS: &[&str] = &[
    r"AKIA[0-9A-Z]{16}",
    r"ASIA[0-9A-Z]{16}",
    r#"(?i)(api[_-]?key|token|secret)\s*[:=]\s*['"]?[A-Za-z0-9_\-/+=]{12,}['"]?"#,
];

/// Masks cloud access keys, `key/token/secret=value` assignments and RFC1918
/// addresses. Applying it twice yields the same text as applying it once.
#[derive(Debug, Clone)]
pub struct Redactor {
    enabled: bool,
    private_ip: Regex,
    secrets: Vec<Regex>,
}

impl Redactor {
    pub fn new(enabled: bool) -> Result<Self> {
        let private_ip = Regex::new(PRIVATE_IP_PATTERN)?;
        let secrets = SECRET_PATTERNS
            .iter()
            .map(|pattern| Regex::new(pattern))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(Self {
            enabled,
            private_ip,
            secrets,
        })
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn redact(&self, text: &str) -> String {
        if !self.enabled || text.is_empty() {
            return text.to_string();
        }

        let mut out = self.private_ip.replace_all(text, REDACTED_IP).into_owned();
        for pattern in &self.secrets {
            out = pattern.replace_all(&out, REDACTED_SECRET).into_owned();
        }
        out
    }
}
