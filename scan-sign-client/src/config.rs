use scan_sign::{constants::DEFAULT_QR_SIZE, ss58::Ss58Address, ExchangePolicy};
use serde::{Deserialize, Serialize};
use std::{path::Path, str::FromStr, time::Duration};

use crate::{dev_chain::DevOutcome, ScanSignClientError};

/// Client configuration with all fields ready to use.
#[derive(Clone, Debug)]
pub struct Config {
    pub endpoint: String,
    pub sender: Ss58Address,
    pub receiver: Ss58Address,
    pub amount: u64,
    pub exchange_policy: ExchangePolicy,
    pub qr_size: u32,
    pub dev_chain: DevChainConfig,
}

impl Config {
    pub fn from_file(config_path: impl AsRef<Path>) -> Result<Self, ScanSignClientError> {
        let config_string = std::fs::read_to_string(&config_path)?;
        let config_file = ConfigFile::from_str(&config_string)?;
        Self::from_config_file(config_file)
    }

    pub fn from_config_file(config: ConfigFile) -> Result<Self, ScanSignClientError> {
        if config.qr_size == 0 {
            return Err(ScanSignClientError::InvalidConfig(
                "qr_size must be positive".to_string(),
            ));
        }

        let exchange_policy = match config.signature_timeout {
            Some(timeout) if timeout.is_zero() => {
                return Err(ScanSignClientError::InvalidConfig(
                    "signature_timeout must be positive; leave it out to wait forever"
                        .to_string(),
                ))
            }
            Some(timeout) => ExchangePolicy::with_timeout(timeout),
            None => ExchangePolicy::wait_forever(),
        };

        Ok(Self {
            sender: Ss58Address::from_str(&config.sender)?,
            receiver: Ss58Address::from_str(&config.receiver)?,
            endpoint: config.endpoint,
            amount: config.amount,
            exchange_policy,
            qr_size: config.qr_size,
            dev_chain: config.dev_chain,
        })
    }
}

/// Client configuration file format.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "snake_case")]
pub struct ConfigFile {
    pub endpoint: String,
    pub sender: String,
    pub receiver: String,
    pub amount: u64,
    /// Leave unset to wait for a scan indefinitely.
    #[serde(with = "humantime_serde", default)]
    pub signature_timeout: Option<Duration>,
    #[serde(default = "defaults::qr_size")]
    pub qr_size: u32,
    #[serde(default)]
    pub dev_chain: DevChainConfig,
}

/// Behaviour of the in-process chain used in place of a real node.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "snake_case")]
pub struct DevChainConfig {
    #[serde(default)]
    pub outcome: DevOutcome,
    /// Account nonce used for the first submitted transaction.
    #[serde(default)]
    pub nonce: u64,
}

impl FromStr for ConfigFile {
    type Err = ScanSignClientError;

    fn from_str(config_string: &str) -> Result<Self, Self::Err> {
        Ok(toml::from_str(config_string)?)
    }
}

mod defaults {
    use super::*;

    pub(super) fn qr_size() -> u32 {
        DEFAULT_QR_SIZE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG: &str = r#"
        endpoint = "wss://kusama-rpc.polkadot.io"
        sender = "J7LbEaKaDuPwnNS9BT4xmscBn7GwzvCRwKbQuC82KdQRHxW"
        receiver = "HqfMqd2sod4pN5L1HfUD1h9VLiaKfekeGcesnSz7dKDXJdg"
        amount = 1000000000
        signature_timeout = "5m"

        [dev_chain]
        outcome = "module-error"
        nonce = 7
    "#;

    #[test]
    fn config_from_str() {
        // Destructure so the test breaks when fields are added
        let ConfigFile {
            endpoint,
            sender,
            receiver,
            amount,
            signature_timeout,
            qr_size,
            dev_chain,
        } = ConfigFile::from_str(CONFIG).unwrap();

        assert_eq!(endpoint, "wss://kusama-rpc.polkadot.io");
        assert_eq!(sender, "J7LbEaKaDuPwnNS9BT4xmscBn7GwzvCRwKbQuC82KdQRHxW");
        assert_eq!(receiver, "HqfMqd2sod4pN5L1HfUD1h9VLiaKfekeGcesnSz7dKDXJdg");
        assert_eq!(amount, 1_000_000_000);
        assert_eq!(signature_timeout, Some(Duration::from_secs(300)));
        assert_eq!(qr_size, DEFAULT_QR_SIZE);
        assert_eq!(
            dev_chain,
            DevChainConfig {
                outcome: DevOutcome::ModuleError,
                nonce: 7
            }
        );
    }

    #[test]
    fn config_parses_addresses_and_policy() {
        let config = Config::from_config_file(ConfigFile::from_str(CONFIG).unwrap()).unwrap();
        assert_eq!(config.sender.prefix(), scan_sign::ss58::KUSAMA_PREFIX);
        assert_eq!(
            config.exchange_policy,
            ExchangePolicy::with_timeout(Duration::from_secs(300))
        );
    }

    #[test]
    fn missing_timeout_waits_forever() {
        let config_str = r#"
        endpoint = "ws://127.0.0.1:9944"
        sender = "J7LbEaKaDuPwnNS9BT4xmscBn7GwzvCRwKbQuC82KdQRHxW"
        receiver = "HqfMqd2sod4pN5L1HfUD1h9VLiaKfekeGcesnSz7dKDXJdg"
        amount = 1
        "#;
        let config = Config::from_config_file(ConfigFile::from_str(config_str).unwrap()).unwrap();
        assert_eq!(config.exchange_policy, ExchangePolicy::wait_forever());
        assert_eq!(config.dev_chain, DevChainConfig::default());
    }

    #[test]
    fn bad_configs_are_rejected() {
        let unknown_field = format!("{CONFIG}\nextra = true");
        assert!(ConfigFile::from_str(&unknown_field).is_err());

        let bad_address = CONFIG.replace("HqfMqd2sod4pN5L1HfUD1h9VLiaKfekeGcesnSz7dKDXJdg", "nope");
        assert!(matches!(
            Config::from_config_file(ConfigFile::from_str(&bad_address).unwrap()),
            Err(ScanSignClientError::ScanSign(_))
        ));

        let zero_timeout = CONFIG.replace("\"5m\"", "\"0s\"");
        assert!(matches!(
            Config::from_config_file(ConfigFile::from_str(&zero_timeout).unwrap()),
            Err(ScanSignClientError::InvalidConfig(_))
        ));
    }
}
