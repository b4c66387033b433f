use scan_sign_client::Config;

use std::{
    io::{self, Write},
    time::SystemTime,
};

use crate::{
    cli_command::{parse_cli_command, CliCommand},
    scripting::Script,
    state::State,
};

/// Runs the interactive client
pub async fn run(config: Config) -> anyhow::Result<()> {
    let mut state = State::new(config);
    println!("Type \"help\" to view list of commands.");

    loop {
        match parse_input(&state).await {
            Ok(command) => {
                if let Err(e) = command.execute(&mut state).await {
                    println!("Error: {e}");
                }
            }
            Err(e) => {
                println!("Unable to parse command: {e}");
            }
        };
    }
}

/// Runs a script of commands without user input
pub async fn run_script(config: Config, script: Script) -> anyhow::Result<()> {
    let mut state = State::new(config);
    println!("Running {} command(s)", script.len());

    let now = SystemTime::now();
    script.execute(&mut state).await?;
    let total_script_time = now.elapsed()?;

    println!();
    println!("Script completed successfully");
    println!(
        "Total script execution completed in {} ms",
        total_script_time.as_millis()
    );

    Ok(())
}

/// Reads next command from standard input.
///
/// Returns a dynamic trait representing the parsed command or an error if no
/// such command exist.
async fn parse_input(state: &State) -> anyhow::Result<Box<dyn CliCommand>> {
    if matches!(
        state.client.exchange().status().await,
        scan_sign::ExchangeStatus::AwaitingSignature { .. }
    ) {
        print!("awaiting signature> ");
    } else {
        print!("> ");
    }
    // Flush stdout so the prompt actually get printed
    io::stdout().flush()?;

    let mut input = String::new();
    let _ = io::stdin().read_line(&mut input)?;

    let command = parse_cli_command(&input)?;

    Ok(command)
}
