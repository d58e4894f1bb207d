//! Relay configuration system with TOML support
//!
//! This crate parses the *transports* document described in the relay's
//! external interfaces: listener ports, sender credentials, rate periods
//! and the indexer endpoint. The second configuration document — the
//! nested `filters`/`destinations`/`rules` tree — is intentionally generic
//! (it is arbitrary user-declared structure) and is compiled by
//! `gelf_router::rules::build` directly from a parsed `toml::Value`.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

mod loader;

pub use loader::ConfigLoader;

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("invalid configuration: {0}")]
    ValidationError(String),
}

/// Root transports configuration (spec's enumerated external settings).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportsConfig {
    /// Envelope "from" address used by email/SMS senders.
    pub from: String,
    pub gelf: GelfListenersConfig,
    pub twilio: TwilioConfig,
    pub smtp: SmtpConfig,
    pub mantis: MantisConfig,
    pub elasticsearch: ElasticsearchConfig,
}

impl Default for TransportsConfig {
    fn default() -> Self {
        Self {
            from: String::new(),
            gelf: GelfListenersConfig::default(),
            twilio: TwilioConfig::default(),
            smtp: SmtpConfig::default(),
            mantis: MantisConfig::default(),
            elasticsearch: ElasticsearchConfig::default(),
        }
    }
}

/// Listener ports; 0 disables the corresponding listener.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GelfListenersConfig {
    pub udp: u16,
    pub tcp: u16,
    pub http: u16,
}

impl Default for GelfListenersConfig {
    fn default() -> Self {
        Self { udp: 12201, tcp: 0, http: 0 }
    }
}

/// Twilio-style SMS sender credentials.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TwilioConfig {
    pub sid: String,
    pub token: String,
    /// Per-recipient rate limit period, seconds.
    pub rate: u64,
}

impl Default for TwilioConfig {
    fn default() -> Self {
        Self { sid: String::new(), token: String::new(), rate: 1800 }
    }
}

/// SMTP submission settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SmtpConfig {
    pub hostport: String,
    /// `user/password`, empty disables auth.
    pub auth: String,
    pub rate: u64,
}

impl Default for SmtpConfig {
    fn default() -> Self {
        Self { hostport: ":25".to_string(), auth: String::new(), rate: 600 }
    }
}

/// Issue-tracker (XML-RPC) settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MantisConfig {
    /// Path appended to the target host when non-empty (e.g. "api/xmlrpc.php").
    pub xmlrpc: String,
    pub rate: u64,
}

impl Default for MantisConfig {
    fn default() -> Self {
        Self { xmlrpc: String::new(), rate: 3600 }
    }
}

/// Search/indexing back-end settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ElasticsearchConfig {
    pub url: String,
    /// TTL in days, appended to the store URL as `?ttl=Nd`.
    pub ttl: u32,
}

impl Default for ElasticsearchConfig {
    fn default() -> Self {
        Self { url: String::new(), ttl: 90 }
    }
}

impl TransportsConfig {
    /// Load configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: TransportsConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load configuration with environment variable override.
    pub fn load() -> Result<Self, ConfigError> {
        let loader = ConfigLoader::new();
        loader.load()
    }

    /// Generate an example TOML configuration.
    pub fn example_toml() -> String {
        r#"# gelf-relay transports configuration
# Environment variables override these settings

from = "alerts@example.com"

[gelf]
udp = 12201
tcp = 12202
http = 12203

[twilio]
sid = ""
token = ""
rate = 1800

[smtp]
hostport = "localhost:25"
auth = ""
rate = 600

[mantis]
xmlrpc = ""
rate = 3600

[elasticsearch]
url = ""
ttl = 90
"#
        .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec() {
        let cfg = TransportsConfig::default();
        assert_eq!(cfg.gelf.udp, 12201);
        assert_eq!(cfg.gelf.tcp, 0);
        assert_eq!(cfg.gelf.http, 0);
        assert_eq!(cfg.twilio.rate, 1800);
        assert_eq!(cfg.smtp.hostport, ":25");
        assert_eq!(cfg.smtp.rate, 600);
        assert_eq!(cfg.mantis.rate, 3600);
        assert_eq!(cfg.elasticsearch.ttl, 90);
    }

    #[test]
    fn parses_partial_toml_with_defaults() {
        let toml = r#"
from = "ops@example.com"

[gelf]
tcp = 9999
"#;
        let cfg: TransportsConfig = toml::from_str(toml).unwrap();
        assert_eq!(cfg.from, "ops@example.com");
        assert_eq!(cfg.gelf.tcp, 9999);
        assert_eq!(cfg.gelf.udp, 12201);
    }

    #[test]
    fn example_toml_round_trips() {
        let parsed: Result<TransportsConfig, _> = toml::from_str(&TransportsConfig::example_toml());
        assert!(parsed.is_ok());
    }
}
