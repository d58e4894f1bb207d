use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

pub mod logging;

// ============================================================================
// Severity levels
// ============================================================================

/// Syslog severity, EMERGENCY (most severe) through DEBUG (least severe).
///
/// Ordinals and names match RFC 5424 / the GELF spec exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(i64)]
pub enum Level {
    Emergency = 0,
    Alert = 1,
    Critical = 2,
    Error = 3,
    Warning = 4,
    Notice = 5,
    Info = 6,
    Debug = 7,
}

pub const LEVEL_NAMES: [&str; 8] = [
    "EMERGENCY", "ALERT", "CRITICAL", "ERROR", "WARNING", "NOTICE", "INFO", "DEBUG",
];

impl Level {
    /// Map a raw GELF level integer onto a `Level`, defaulting out-of-range
    /// values to `Debug` (least severe) rather than panicking on ingest.
    pub fn from_i64(v: i64) -> Self {
        match v {
            0 => Level::Emergency,
            1 => Level::Alert,
            2 => Level::Critical,
            3 => Level::Error,
            4 => Level::Warning,
            5 => Level::Notice,
            6 => Level::Info,
            _ => Level::Debug,
        }
    }

    pub fn as_i64(self) -> i64 {
        self as i64
    }

    pub fn name(self) -> &'static str {
        LEVEL_NAMES[self as usize]
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

// ============================================================================
// Message
// ============================================================================

/// A GELF 1.x message, the unit of work flowing through the relay.
///
/// `short`/`full` carry the wire names `short_message`/`full_message`; every
/// JSON key outside the core field set — including `_`-prefixed user
/// extensions — lands in `extra` under its original key, leading underscore
/// and all, so re-serializing a `Message` reproduces a well-formed GELF body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default)]
    pub host: String,
    #[serde(default, rename = "short_message")]
    pub short: String,
    #[serde(default, rename = "full_message")]
    pub full: String,
    pub timestamp: i64,
    #[serde(default = "default_level")]
    pub level: i64,
    #[serde(default)]
    pub facility: String,
    #[serde(default)]
    pub file: String,
    #[serde(default)]
    pub line: i64,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

fn default_version() -> String {
    "1.1".to_string()
}

fn default_level() -> i64 {
    Level::Alert as i64
}

impl Default for Message {
    fn default() -> Self {
        Self {
            version: default_version(),
            host: String::new(),
            short: String::new(),
            full: String::new(),
            timestamp: 0,
            level: default_level(),
            facility: String::new(),
            file: String::new(),
            line: 0,
            extra: BTreeMap::new(),
        }
    }
}

impl Message {
    /// Move `extra["_full_message"]` into `full` when `full` is empty (the
    /// GELF wire format sometimes carries the long body as an extension
    /// field instead of the standard `full_message`).
    ///
    /// A literal `''` or `""` string is treated as "no value" and left in
    /// place rather than migrated.
    pub fn fix(&mut self) {
        if !self.full.is_empty() {
            return;
        }
        let Some(v) = self.extra.get("_full_message") else {
            return;
        };
        let Value::String(s) = v else { return };
        if s.is_empty() || s == "''" || s == "\"\"" {
            return;
        }
        self.full = s.clone();
        self.extra.remove("_full_message");
    }

    pub fn level(&self) -> Level {
        Level::from_i64(self.level)
    }

    /// `"<LEVELNAME> <facility>@<host>: <short>"`.
    pub fn short_string(&self) -> String {
        format!(
            "{} {}@{}: {}",
            self.level().name(),
            self.facility,
            self.host,
            self.short
        )
    }

    /// `short_string + "\n" + RFC3339(timestamp) + "\n" + file + ":" + line + "\n\n" + full`.
    pub fn long_string(&self) -> String {
        let ts = chrono::DateTime::from_timestamp(self.timestamp, 0)
            .unwrap_or_default()
            .to_rfc3339();
        format!(
            "{}\n{}\n{}:{}\n\n{}",
            self.short_string(),
            ts,
            self.file,
            self.line,
            self.full
        )
    }
}

// ============================================================================
// Error types
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("codec error: {0}")]
    Codec(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("sender error: {0}")]
    Sender(String),

    #[error("rule engine error: {0}")]
    Rule(String),
}

pub type Result<T> = std::result::Result<T, RelayError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_roundtrips_through_ordinal() {
        for i in 0..8i64 {
            assert_eq!(Level::from_i64(i).as_i64(), i);
        }
    }

    #[test]
    fn level_out_of_range_defaults_to_debug() {
        assert_eq!(Level::from_i64(42).as_i64(), Level::Debug as i64);
    }

    #[test]
    fn fix_migrates_full_message_extension() {
        let mut m = Message {
            extra: BTreeMap::from([(
                "_full_message".to_string(),
                Value::String("boom".to_string()),
            )]),
            ..Default::default()
        };
        m.fix();
        assert_eq!(m.full, "boom");
        assert!(!m.extra.contains_key("_full_message"));
    }

    #[test]
    fn fix_ignores_literal_quote_placeholders() {
        let mut m = Message {
            extra: BTreeMap::from([(
                "_full_message".to_string(),
                Value::String("''".to_string()),
            )]),
            ..Default::default()
        };
        m.fix();
        assert!(m.full.is_empty());
        assert!(m.extra.contains_key("_full_message"));
    }

    #[test]
    fn fix_does_not_overwrite_existing_full() {
        let mut m = Message {
            full: "already set".to_string(),
            extra: BTreeMap::from([(
                "_full_message".to_string(),
                Value::String("ignored".to_string()),
            )]),
            ..Default::default()
        };
        m.fix();
        assert_eq!(m.full, "already set");
        assert!(m.extra.contains_key("_full_message"));
    }

    #[test]
    fn short_string_matches_format() {
        let m = Message {
            host: "db-01".to_string(),
            facility: "proba".to_string(),
            short: "oom".to_string(),
            level: Level::Error as i64,
            ..Default::default()
        };
        assert_eq!(m.short_string(), "ERROR proba@db-01: oom");
    }

    #[test]
    fn deserializes_real_gelf_wire_shape() {
        let json = r#"{"host":"h","short_message":"oom","full_message":"trace","timestamp":1700000000,"level":3,"_user_id":42}"#;
        let m: Message = serde_json::from_str(json).unwrap();
        assert_eq!(m.host, "h");
        assert_eq!(m.short, "oom");
        assert_eq!(m.full, "trace");
        assert_eq!(m.extra.get("_user_id"), Some(&Value::from(42)));
    }

    #[test]
    fn serializes_back_to_real_gelf_wire_shape() {
        let m = Message {
            host: "h".to_string(),
            short: "oom".to_string(),
            extra: BTreeMap::from([("_user_id".to_string(), Value::from(42))]),
            ..Default::default()
        };
        let json: Value = serde_json::to_value(&m).unwrap();
        assert_eq!(json["short_message"], "oom");
        assert_eq!(json["_user_id"], 42);
        assert!(json.get("short").is_none());
        assert!(json.get("extra").is_none());
    }
}
