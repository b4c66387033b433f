use colored::Colorize;
use scan_sign::lifecycle::LifecycleReport;
use scan_sign_client::{client::check_outcome, dev_chain::DevChain, Config, ScanSignClient};
use std::{sync::Arc, time::Duration};
use tokio::task::JoinHandle;

use crate::display::TerminalDisplay;

/// How long `shutdown` waits for a background transfer to finish.
const SHUTDOWN_WAIT: Duration = Duration::from_secs(1);

type TransferTask = JoinHandle<scan_sign_client::Result<LifecycleReport>>;

/// Everything the commands share between invocations.
#[derive(Debug)]
pub struct State {
    pub client: Arc<ScanSignClient>,
    pub chain: Arc<DevChain>,
    /// Transfer running in the background, if any.
    pub transfer: Option<TransferTask>,
    pub last_report: Option<LifecycleReport>,
}

impl State {
    pub fn new(config: Config) -> Self {
        let chain = Arc::new(DevChain::new(&config.dev_chain));
        let display = Arc::new(TerminalDisplay);
        let client = Arc::new(ScanSignClient::new(config, chain.clone(), display));

        Self {
            client,
            chain,
            transfer: None,
            last_report: None,
        }
    }

    pub fn transfer_running(&self) -> bool {
        self.transfer
            .as_ref()
            .map_or(false, |transfer| !transfer.is_finished())
    }

    /// Wait up to `limit` for the background transfer to finish and report
    /// how it went. Leaves a still-running transfer in place.
    pub async fn collect_transfer(&mut self, limit: Duration) -> anyhow::Result<()> {
        let mut transfer = match self.transfer.take() {
            Some(transfer) => transfer,
            None => return Ok(()),
        };

        match tokio::time::timeout(limit, &mut transfer).await {
            Err(_) => {
                self.transfer = Some(transfer);
                Ok(())
            }
            Ok(joined) => match joined? {
                Ok(report) => {
                    print_report(&report);
                    self.last_report = Some(report);
                    Ok(())
                }
                Err(e) => {
                    println!("{} {e}", "Transfer failed:".red());
                    Ok(())
                }
            },
        }
    }

    /// Cancel a pending signature request and give its transfer a moment to
    /// wind down. Anything still running after that is aborted.
    pub async fn shutdown(&mut self) -> anyhow::Result<()> {
        if self.client.exchange().cancel().await.is_ok() {
            println!("Cancelled the pending signature request");
        }
        self.collect_transfer(SHUTDOWN_WAIT).await?;
        if let Some(transfer) = self.transfer.take() {
            println!("{}", "Abandoning a transfer that is still running".yellow());
            transfer.abort();
        }
        Ok(())
    }
}

pub fn print_report(report: &LifecycleReport) {
    println!("Statuses: {}", report.statuses.join(" -> "));
    match check_outcome(&report.outcome) {
        Ok(()) => println!("{} {:?}", "Transfer succeeded:".green(), report.outcome),
        Err(e) => println!("{} {e}", "Transfer failed:".red()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scan_sign::ExchangeStatus;
    use scan_sign_client::config::ConfigFile;
    use std::str::FromStr;

    fn state() -> State {
        let config = ConfigFile::from_str(
            r#"
            endpoint = "wss://kusama-rpc.polkadot.io"
            sender = "J7LbEaKaDuPwnNS9BT4xmscBn7GwzvCRwKbQuC82KdQRHxW"
            receiver = "HqfMqd2sod4pN5L1HfUD1h9VLiaKfekeGcesnSz7dKDXJdg"
            amount = 1
            "#,
        )
        .unwrap();
        State::new(Config::from_config_file(config).unwrap())
    }

    #[tokio::test]
    async fn shutdown_cancels_waiting_transfer() {
        let mut state = state();
        let client = state.client.clone();
        state.transfer = Some(tokio::spawn(async move { client.submit_transfer().await }));
        while state.client.exchange().status().await == ExchangeStatus::Idle {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        state.shutdown().await.unwrap();
        assert!(state.transfer.is_none());
        assert!(!state.transfer_running());
        assert_eq!(state.client.exchange().status().await, ExchangeStatus::Idle);
    }

    #[tokio::test]
    async fn shutdown_with_nothing_running() {
        let mut state = state();
        state.shutdown().await.unwrap();
        assert!(state.last_report.is_none());
    }
}
