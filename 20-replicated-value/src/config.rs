//! Node configuration read from a `key=value` file.
//!
//! ```text
//! port=8080
//! host=127.0.0.1
//! cluster_mode=yes
//! replication_timeout_ms=2000
//! ```

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use thiserror::Error;
use tracing::warn;

pub const DEFAULT_CONFIG_PATH: &str = "server.config";
pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_REPLICATION_TIMEOUT: Duration = Duration::from_millis(2000);

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("missing required key `{0}`")]
    MissingKey(&'static str),

    #[error("invalid value for `{key}`: {value}")]
    InvalidValue { key: &'static str, value: String },
}

/// Raw entries of a config file, before interpretation.
#[derive(Debug, Default, Clone)]
pub struct ConfigFile {
    entries: HashMap<String, String>,
}

impl ConfigFile {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let body = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Ok(Self::parse(&body))
    }

    /// Parses `key=value` lines. Blank lines and `#` comments are skipped, and
    /// malformed lines are logged and dropped.
    pub fn parse(body: &str) -> Self {
        let mut entries = HashMap::new();
        for line in body.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let parts: Vec<&str> = line.split('=').collect();
            if parts.len() != 2 {
                warn!(line, "invalid line in config file");
                continue;
            }
            entries.insert(parts[0].trim().to_string(), parts[1].trim().to_string());
        }
        Self { entries }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(key.into(), value.into());
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeConfig {
    pub host: String,
    pub port: u16,
    /// Outside cluster mode the node is always ready and always accepts writes.
    pub cluster_mode: bool,
    /// Upper bound on each replication attempt.
    pub replication_timeout: Duration,
}

impl NodeConfig {
    pub fn new(host: impl Into<String>, port: u16, cluster_mode: bool) -> Self {
        Self {
            host: host.into(),
            port,
            cluster_mode,
            replication_timeout: DEFAULT_REPLICATION_TIMEOUT,
        }
    }

    pub fn from_file(file: &ConfigFile) -> Result<Self, ConfigError> {
        let port = file.get("port").ok_or(ConfigError::MissingKey("port"))?;
        let port = parse_port(port)?;
        let host = file.get("host").unwrap_or(DEFAULT_HOST);
        let cluster_mode = file.get("cluster_mode").map(parse_cluster_mode).unwrap_or(false);
        let replication_timeout = match file.get("replication_timeout_ms") {
            Some(raw) => parse_timeout_ms(raw)?,
            None => DEFAULT_REPLICATION_TIMEOUT,
        };

        Ok(Self {
            host: host.to_string(),
            port,
            cluster_mode,
            replication_timeout,
        })
    }

    pub fn with_replication_timeout(mut self, timeout: Duration) -> Self {
        self.replication_timeout = timeout;
        self
    }

    /// Address peers use to reach this node; also how it recognizes itself in
    /// a membership push.
    pub fn self_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

pub fn parse_cluster_mode(raw: &str) -> bool {
    raw == "yes"
}

pub fn parse_port(raw: &str) -> Result<u16, ConfigError> {
    raw.parse().map_err(|_| ConfigError::InvalidValue {
        key: "port",
        value: raw.to_string(),
    })
}

/// A zero timeout would abandon every delivery before it starts, so it is
/// refused along with non-numeric input.
fn parse_timeout_ms(raw: &str) -> Result<Duration, ConfigError> {
    match raw.parse::<u64>() {
        Ok(ms) if ms > 0 => Ok(Duration::from_millis(ms)),
        _ => Err(ConfigError::InvalidValue {
            key: "replication_timeout_ms",
            value: raw.to_string(),
        }),
    }
}
