use crate::{cli_command::CliCommand, state::State};
use anyhow::Error;
use async_trait::async_trait;

#[derive(Debug)]
pub struct Quit;

#[async_trait]
impl CliCommand for Quit {
    async fn execute(self: Box<Self>, state: &mut State) -> Result<(), Error> {
        state.shutdown().await?;
        std::process::exit(0)
    }

    fn parse_command_args(slice: &[&str]) -> Option<Self> {
        match slice {
            [] => Some(Quit),
            _ => None,
        }
    }

    fn format() -> &'static str {
        "quit"
    }

    fn aliases() -> Vec<&'static str> {
        vec!["quit", "q", "exit"]
    }

    fn description() -> &'static str {
        "Cancels any pending signature request, reports an unfinished transfer, and exits."
    }
}
