use std::time::Duration;

use crate::{cli_command::CliCommand, state::State};
use anyhow::Error;
use async_trait::async_trait;
use scan_sign::RequestId;

/// How long to follow the transfer once its signature has been delivered.
const LIFECYCLE_WAIT: Duration = Duration::from_secs(30);

#[derive(Debug)]
pub struct Scan {
    signature: String,
    id: RequestId,
}

#[async_trait]
impl CliCommand for Scan {
    async fn execute(self: Box<Self>, state: &mut State) -> Result<(), Error> {
        state
            .client
            .scan_handle()
            .on_scan(self.id, &self.signature)
            .await?;
        println!("Signature accepted for request {}", self.id);

        state.collect_transfer(LIFECYCLE_WAIT).await?;
        if state.transfer_running() {
            println!("Transfer still running; check back with `status`.");
        }
        Ok(())
    }

    fn parse_command_args(slice: &[&str]) -> Option<Self> {
        match slice {
            [signature] => Some(Scan {
                signature: signature.to_string(),
                id: RequestId::default(),
            }),
            [signature, id] => Some(Scan {
                signature: signature.to_string(),
                id: id.parse().ok()?,
            }),
            _ => None,
        }
    }

    fn format() -> &'static str {
        "scan [signature hex] [id (Optional)]"
    }

    fn aliases() -> Vec<&'static str> {
        vec!["scan", "sig"]
    }

    fn description() -> &'static str {
        "Delivers a scanned signature to the waiting transfer. The id defaults to 1."
    }
}
