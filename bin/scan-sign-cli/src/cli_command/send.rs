use std::time::Duration;

use crate::{cli_command::CliCommand, state::State};
use anyhow::{bail, Error};
use async_trait::async_trait;
use scan_sign::ExchangeStatus;

/// How long to wait for the signing request to show up before handing the
/// prompt back.
const DISPLAY_WAIT: Duration = Duration::from_secs(2);
const POLL_INTERVAL: Duration = Duration::from_millis(10);

#[derive(Debug)]
pub struct SendTransfer;

#[async_trait]
impl CliCommand for SendTransfer {
    async fn execute(self: Box<Self>, state: &mut State) -> Result<(), Error> {
        if state.transfer_running() {
            bail!("A transfer is already waiting. Scan a signature or cancel it first.");
        }
        state.collect_transfer(Duration::ZERO).await?;

        let config = state.client.config();
        println!(
            "Sending {} from {} to {}",
            config.amount, config.sender, config.receiver
        );
        let client = state.client.clone();
        state.transfer = Some(tokio::spawn(
            async move { client.submit_transfer().await },
        ));

        // Hand the prompt back once the request is displayed, or once the
        // transfer has already ended.
        let mut waited = Duration::ZERO;
        while waited < DISPLAY_WAIT {
            let awaiting = matches!(
                state.client.exchange().status().await,
                ExchangeStatus::AwaitingSignature { .. }
            );
            if awaiting || !state.transfer_running() {
                break;
            }
            tokio::time::sleep(POLL_INTERVAL).await;
            waited += POLL_INTERVAL;
        }
        if !state.transfer_running() {
            state.collect_transfer(Duration::ZERO).await?;
        }
        Ok(())
    }

    fn parse_command_args(slice: &[&str]) -> Option<Self> {
        match slice {
            [] => Some(SendTransfer),
            _ => None,
        }
    }

    fn format() -> &'static str {
        "send"
    }

    fn aliases() -> Vec<&'static str> {
        vec!["send", "transfer"]
    }

    fn description() -> &'static str {
        "Starts the configured transfer and prints the QR frames to sign."
    }
}
