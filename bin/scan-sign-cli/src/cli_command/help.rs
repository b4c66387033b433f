use crate::{cli_command::CliCommand, state::State};
use anyhow::Error;
use async_trait::async_trait;
use colored::Colorize;

use crate::cli_command::{get_cmd_functions, GetCmdFunction};

/// Printed after the command list.
const WORKFLOW: &str = "\
A transfer needs a signature from the signing device:
  1. `send` shows the signing request as QR frames.
  2. Scan the frames with the device and approve the transfer.
  3. `scan 0x<signature>` delivers what the device's QR decodes to.
`status` shows what the exchange is waiting for; `cancel` gives up on a
request that will never be scanned.";

#[derive(Debug)]
pub struct Help {
    text: String,
}

#[async_trait]
impl CliCommand for Help {
    async fn execute(self: Box<Self>, _state: &mut State) -> Result<(), Error> {
        println!("{}", self.text);
        Ok(())
    }

    fn parse_command_args(args: &[&str]) -> Option<Self> {
        match args {
            [] => {
                let mut text = String::from("Commands:\n");
                for usage in usages() {
                    text.push_str(&usage.summary());
                    text.push('\n');
                }
                text.push('\n');
                text.push_str(WORKFLOW);
                Some(Help { text })
            }
            [command] => usages()
                .into_iter()
                .find(|usage| usage.aliases.contains(command))
                .map(|usage| Help {
                    text: usage.detail(),
                }),
            _ => None,
        }
    }

    fn format() -> &'static str {
        "help [command (Optional)]"
    }

    fn aliases() -> Vec<&'static str> {
        vec!["help", "h"]
    }

    fn description() -> &'static str {
        "Lists the commands and how a transfer gets signed, or details one command."
    }
}

struct CommandUsage {
    format: &'static str,
    aliases: Vec<&'static str>,
    description: &'static str,
}

impl CommandUsage {
    fn summary(&self) -> String {
        format!("  {}  {}", self.format.bold(), self.description)
    }

    fn detail(&self) -> String {
        format!(
            "{}\n  aliases: {}\n  {}",
            self.format.bold(),
            self.aliases.join(", "),
            self.description
        )
    }
}

fn usages() -> Vec<CommandUsage> {
    get_cmd_functions::<Usage>()
        .into_iter()
        .map(|usage| usage())
        .collect()
}

/// Collects the usage of every registered command.
struct Usage;

impl GetCmdFunction for Usage {
    type FunctionSignature = fn() -> CommandUsage;

    fn get_function<T: CliCommand + 'static>() -> Self::FunctionSignature {
        || CommandUsage {
            format: T::format(),
            aliases: T::aliases(),
            description: T::description(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lists_every_command_and_the_signing_steps() {
        let help = Help::parse_command_args(&[]).unwrap();
        for format in ["send", "scan [signature hex] [id (Optional)]", "cancel", "quit"] {
            assert!(help.text.contains(format), "missing {format}");
        }
        assert!(help.text.ends_with(WORKFLOW));
    }

    #[test]
    fn details_a_command_by_alias() {
        let help = Help::parse_command_args(&["sig"]).unwrap();
        assert!(help.text.contains("aliases: scan, sig"));

        assert!(Help::parse_command_args(&["launch"]).is_none());
        assert!(Help::parse_command_args(&["send", "scan"]).is_none());
    }
}
