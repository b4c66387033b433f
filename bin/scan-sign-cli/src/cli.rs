//! Command-line arguments

use anyhow::anyhow;
use clap::Parser;
use scan_sign_client::{
    config::{ConfigFile, DevChainConfig},
    dev_chain::DevOutcome,
    Config,
};
use std::{path::PathBuf, str::FromStr};

use crate::scripting::Script;

#[derive(Debug, Parser)]
pub struct Cli {
    /// Location of client config file.
    /// If this arg is not provided, the `sender` and `receiver` args must be
    /// provided.
    #[clap(long)]
    pub config: Option<PathBuf>,

    /// SS58 address of the account that signs and pays.
    #[clap(long, conflicts_with = "config", requires = "receiver")]
    pub sender: Option<String>,
    /// SS58 address of the account receiving the transfer.
    #[clap(long, conflicts_with = "config", requires = "sender")]
    pub receiver: Option<String>,
    /// Amount to transfer, in the chain's smallest unit.
    #[clap(long, default_value_t = 1_000_000_000)]
    pub amount: u64,
    /// How long to wait for a scanned signature, e.g. "5m". Waits forever if
    /// not provided.
    #[clap(long, conflicts_with = "config")]
    pub timeout: Option<humantime::Duration>,
    /// How transfers submitted to the dev chain end.
    #[clap(long, default_value = "success")]
    pub outcome: DevOutcome,

    /// Path to a script file containing a sequence of CLI commands
    #[clap(long = "script-file", conflicts_with = "script")]
    pub script_file: Option<PathBuf>,
    /// Sequence of CLI commands separated by a semicolon or newline
    #[clap(long, conflicts_with = "script-file")]
    pub script: Option<String>,
}

impl Cli {
    pub fn client_config(&self) -> anyhow::Result<Config> {
        if let Some(config) = &self.config {
            return Ok(Config::from_file(config)?);
        }

        let sender = self.sender.as_ref().ok_or(anyhow!(
            "If `config` argument is not provided, `sender` must be provided"
        ))?;
        let receiver = self.receiver.as_ref().ok_or(anyhow!(
            "If `config` argument is not provided, `receiver` must be provided"
        ))?;

        let config_file = ConfigFile {
            endpoint: "dev".to_string(),
            sender: sender.clone(),
            receiver: receiver.clone(),
            amount: self.amount,
            signature_timeout: self.timeout.map(Into::into),
            qr_size: scan_sign::constants::DEFAULT_QR_SIZE,
            dev_chain: DevChainConfig {
                outcome: self.outcome,
                nonce: 0,
            },
        };
        Ok(Config::from_config_file(config_file)?)
    }

    pub fn script(&self) -> anyhow::Result<Option<Script>> {
        match (&self.script, &self.script_file) {
            (Some(script), _) => Ok(Some(Script::from_str(script)?)),
            (None, Some(path)) => Ok(Some(Script::from_file(path)?)),
            (None, None) => Ok(None),
        }
    }
}
