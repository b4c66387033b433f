use std::time::Duration;

use crate::{cli_command::CliCommand, state::State};
use anyhow::Error;
use async_trait::async_trait;

#[derive(Debug)]
pub struct Cancel;

#[async_trait]
impl CliCommand for Cancel {
    async fn execute(self: Box<Self>, state: &mut State) -> Result<(), Error> {
        state.client.exchange().cancel().await?;
        println!("Signature request cancelled");

        state.collect_transfer(Duration::from_secs(1)).await?;
        Ok(())
    }

    fn parse_command_args(slice: &[&str]) -> Option<Self> {
        match slice {
            [] => Some(Cancel),
            _ => None,
        }
    }

    fn format() -> &'static str {
        "cancel"
    }

    fn aliases() -> Vec<&'static str> {
        vec!["cancel"]
    }

    fn description() -> &'static str {
        "Cancels the signature request the current transfer is waiting on."
    }
}
