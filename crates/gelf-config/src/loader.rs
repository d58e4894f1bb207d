//! Configuration loader with file and environment variable support

use crate::{ConfigError, TransportsConfig};
use std::env;
use std::path::PathBuf;
use tracing::info;

/// Standard config file search paths.
const CONFIG_PATHS: &[&str] = &[
    "transports.toml",
    "config.toml",
    "gelf-relay.toml",
    "./config/transports.toml",
    "/etc/gelf-relay/transports.toml",
];

/// Configuration loader.
pub struct ConfigLoader {
    config_path: Option<PathBuf>,
}

impl ConfigLoader {
    /// Create a new configuration loader.
    pub fn new() -> Self {
        Self { config_path: None }
    }

    /// Create a loader with a specific config file path.
    pub fn with_path<P: Into<PathBuf>>(path: P) -> Self {
        Self { config_path: Some(path.into()) }
    }

    /// Load configuration from file (if found) with environment variable overrides.
    pub fn load(&self) -> Result<TransportsConfig, ConfigError> {
        let mut config = TransportsConfig::default();

        if let Some(path) = self.find_config_file() {
            info!(?path, "loading configuration from file");
            config = TransportsConfig::from_file(&path)?;
        }

        self.apply_env_overrides(&mut config);

        Ok(config)
    }

    /// Find the configuration file to use.
    fn find_config_file(&self) -> Option<PathBuf> {
        if let Some(path) = &self.config_path {
            if path.exists() {
                return Some(path.clone());
            }
        }

        if let Ok(path) = env::var("GELF_RELAY_CONFIG") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        for path in CONFIG_PATHS {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        None
    }

    /// Apply environment variable overrides.
    fn apply_env_overrides(&self, config: &mut TransportsConfig) {
        if let Ok(val) = env::var("GELF_RELAY_FROM") {
            config.from = val;
        }

        if let Ok(val) = env::var("GELF_RELAY_GELF_UDP") {
            if let Ok(port) = val.parse() {
                config.gelf.udp = port;
            }
        }
        if let Ok(val) = env::var("GELF_RELAY_GELF_TCP") {
            if let Ok(port) = val.parse() {
                config.gelf.tcp = port;
            }
        }
        if let Ok(val) = env::var("GELF_RELAY_GELF_HTTP") {
            if let Ok(port) = val.parse() {
                config.gelf.http = port;
            }
        }

        if let Ok(val) = env::var("GELF_RELAY_TWILIO_SID") {
            config.twilio.sid = val;
        }
        if let Ok(val) = env::var("GELF_RELAY_TWILIO_TOKEN") {
            config.twilio.token = val;
        }
        if let Ok(val) = env::var("GELF_RELAY_TWILIO_RATE") {
            if let Ok(rate) = val.parse() {
                config.twilio.rate = rate;
            }
        }

        if let Ok(val) = env::var("GELF_RELAY_SMTP_HOSTPORT") {
            config.smtp.hostport = val;
        }
        if let Ok(val) = env::var("GELF_RELAY_SMTP_AUTH") {
            config.smtp.auth = val;
        }
        if let Ok(val) = env::var("GELF_RELAY_SMTP_RATE") {
            if let Ok(rate) = val.parse() {
                config.smtp.rate = rate;
            }
        }

        if let Ok(val) = env::var("GELF_RELAY_MANTIS_XMLRPC") {
            config.mantis.xmlrpc = val;
        }
        if let Ok(val) = env::var("GELF_RELAY_MANTIS_RATE") {
            if let Ok(rate) = val.parse() {
                config.mantis.rate = rate;
            }
        }

        if let Ok(val) = env::var("GELF_RELAY_ELASTICSEARCH_URL") {
            config.elasticsearch.url = val;
        }
        if let Ok(val) = env::var("GELF_RELAY_ELASTICSEARCH_TTL") {
            if let Ok(ttl) = val.parse() {
                config.elasticsearch.ttl = ttl;
            }
        }
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn loads_from_explicit_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "from = \"alerts@example.com\"\n[gelf]\nudp = 5555").unwrap();
        let loader = ConfigLoader::with_path(file.path());
        let config = loader.load().unwrap();
        assert_eq!(config.from, "alerts@example.com");
        assert_eq!(config.gelf.udp, 5555);
    }

    #[test]
    fn falls_back_to_defaults_when_no_file_found() {
        let loader = ConfigLoader::with_path("/nonexistent/path/transports.toml");
        let config = loader.load().unwrap();
        assert_eq!(config.gelf.udp, 12201);
    }

    #[test]
    fn env_override_wins_over_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[gelf]\nudp = 1111").unwrap();
        env::set_var("GELF_RELAY_GELF_UDP", "9090");
        let loader = ConfigLoader::with_path(file.path());
        let config = loader.load().unwrap();
        env::remove_var("GELF_RELAY_GELF_UDP");
        assert_eq!(config.gelf.udp, 9090);
    }
}
