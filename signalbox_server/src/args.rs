//! Command line / environment configuration

use crate::error::ConfigError;
use clap::Parser;
use std::net::SocketAddr;

/// Path the original deployment served WebSocket upgrades on
pub const DEFAULT_PATH: &str = "/signalingserver";

/// Length of generated peer IDs unless configured otherwise
pub const DEFAULT_ID_LENGTH: usize = 20;

#[derive(Parser, Debug)]
#[clap(
    name = "signalbox-server",
    rename_all = "kebab-case",
    rename_all_env = "screaming-snake"
)]
pub struct Args {
    /// Address to listen on
    #[clap(default_value = "0.0.0.0:8090", env)]
    pub host: SocketAddr,

    /// Path accepting WebSocket upgrades
    #[clap(long, default_value = DEFAULT_PATH, env = "SIGNALING_PATH")]
    pub path: String,

    /// Length of generated peer IDs
    #[clap(long, default_value_t = DEFAULT_ID_LENGTH, env)]
    pub id_length: usize,

    /// Fill in the `sender` field of relayed envelopes
    #[clap(long, env)]
    pub identify_sender: bool,

    /// Include the requesting peer in `GetAllPeerIDs` replies
    #[clap(long, env)]
    pub include_self: bool,

    /// Tell remaining peers when someone disconnects
    #[clap(long, env)]
    pub notify_departures: bool,
}

impl Args {
    pub fn config(&self) -> Config {
        Config {
            path: self.path.clone(),
            id_length: self.id_length,
            identify_sender: self.identify_sender,
            include_self: self.include_self,
            notify_departures: self.notify_departures,
        }
    }
}

/// Behaviour of a signaling server, fixed for its lifetime
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub path: String,
    pub id_length: usize,
    /// When false, `sender` is always left empty
    pub identify_sender: bool,
    pub include_self: bool,
    /// Broadcast a `DisconnectionNotification` whenever a peer leaves,
    /// not only when its `Disconnect` asked for it
    pub notify_departures: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            path: DEFAULT_PATH.to_string(),
            id_length: DEFAULT_ID_LENGTH,
            identify_sender: false,
            include_self: false,
            notify_departures: false,
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.id_length == 0 {
            return Err(ConfigError::ZeroIdLength);
        }
        if !self.path.starts_with('/') || self.path == "/health" {
            return Err(ConfigError::InvalidPath(self.path.clone()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_cli_defaults() {
        let args = Args::parse_from(["signalbox-server"]);
        assert_eq!(args.host, "0.0.0.0:8090".parse().unwrap());
        assert_eq!(args.config(), Config::default());
    }

    #[test]
    fn flags_are_independent() {
        let args = Args::parse_from([
            "signalbox-server",
            "127.0.0.1:9000",
            "--id-length",
            "8",
            "--include-self",
        ]);
        let config = args.config();
        assert_eq!(config.id_length, 8);
        assert!(config.include_self);
        assert!(!config.identify_sender);
        assert!(!config.notify_departures);
    }

    #[test]
    fn rejects_invalid_config() {
        let zero = Config {
            id_length: 0,
            ..Config::default()
        };
        assert_eq!(zero.validate(), Err(ConfigError::ZeroIdLength));

        let relative = Config {
            path: "ws".to_string(),
            ..Config::default()
        };
        assert!(matches!(relative.validate(), Err(ConfigError::InvalidPath(_))));

        assert!(Config::default().validate().is_ok());
    }
}
