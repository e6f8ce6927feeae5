use std::path::PathBuf;

use clap::Parser;
use tracing::warn;

use crate::config::{ConfigError, ConfigFile, NodeConfig, DEFAULT_CONFIG_PATH};

#[derive(Parser, Debug)]
#[command(author, version, about = "Run one node of a replicated value cluster")]
pub struct Cli {
    /// Path to the `key=value` config file.
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// Host peers use to reach this node. Overrides `host` from the file.
    #[arg(long)]
    pub host: Option<String>,

    /// Port to listen on. Overrides `port` from the file.
    #[arg(long)]
    pub port: Option<u16>,

    /// Run in cluster mode regardless of the file's `cluster_mode`.
    #[arg(long)]
    pub cluster_mode: bool,

    /// Upper bound on each replication attempt, in milliseconds.
    #[arg(long)]
    pub replication_timeout_ms: Option<u64>,
}

impl Cli {
    /// Merges the config file with command-line overrides.
    ///
    /// The file may be missing when `--port` is given.
    pub fn node_config(&self) -> Result<NodeConfig, ConfigError> {
        let mut file = match ConfigFile::load(&self.config) {
            Ok(file) => file,
            Err(err) if self.port.is_some() => {
                warn!(error = %err, "config file unavailable, using command-line settings");
                ConfigFile::default()
            }
            Err(err) => return Err(err),
        };

        if let Some(host) = &self.host {
            file.insert("host", host.clone());
        }
        if let Some(port) = self.port {
            file.insert("port", port.to_string());
        }
        if self.cluster_mode {
            file.insert("cluster_mode", "yes");
        }
        if let Some(ms) = self.replication_timeout_ms {
            file.insert("replication_timeout_ms", ms.to_string());
        }
        NodeConfig::from_file(&file)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn flags_alone_are_enough_without_a_file() {
        let cli = Cli::parse_from([
            "replicated-value",
            "--config",
            "/no/such/file.config",
            "--port",
            "9100",
            "--cluster-mode",
            "--replication-timeout-ms",
            "250",
        ]);
        let config = cli.node_config().unwrap();

        assert_eq!(config.self_address(), "127.0.0.1:9100");
        assert!(config.cluster_mode);
        assert_eq!(config.replication_timeout, Duration::from_millis(250));
    }

    #[test]
    fn missing_file_without_port_fails() {
        let cli = Cli::parse_from(["replicated-value", "--config", "/no/such/file.config"]);
        assert!(matches!(cli.node_config(), Err(ConfigError::Io { .. })));
    }

    #[test]
    fn defaults_to_server_config() {
        let cli = Cli::parse_from(["replicated-value"]);
        assert_eq!(cli.config, PathBuf::from("server.config"));
        assert!(!cli.cluster_mode);
    }
}
