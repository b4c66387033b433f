use std::time::Duration;

use crate::{
    cli_command::CliCommand,
    state::{print_report, State},
};
use anyhow::Error;
use async_trait::async_trait;
use scan_sign::ExchangeStatus;

#[derive(Debug)]
pub struct Status;

#[async_trait]
impl CliCommand for Status {
    async fn execute(self: Box<Self>, state: &mut State) -> Result<(), Error> {
        state.collect_transfer(Duration::ZERO).await?;

        match state.client.exchange().status().await {
            ExchangeStatus::Idle => println!("Exchange: idle"),
            ExchangeStatus::AwaitingSignature { payload_len } => {
                println!("Exchange: waiting for a signature over {payload_len} bytes")
            }
        }
        println!("Transfer running: {}", state.transfer_running());
        println!(
            "Dev chain: next nonce {}, transfers end as {}",
            state.chain.next_nonce(),
            state.chain.outcome()
        );

        match &state.last_report {
            Some(report) => print_report(report),
            None => println!("No transfer has finished yet."),
        }
        Ok(())
    }

    fn parse_command_args(slice: &[&str]) -> Option<Self> {
        match slice {
            [] => Some(Status),
            _ => None,
        }
    }

    fn format() -> &'static str {
        "status"
    }

    fn aliases() -> Vec<&'static str> {
        vec!["status", "st"]
    }

    fn description() -> &'static str {
        "Prints the signature exchange status and the result of the last transfer."
    }
}
