//! ABOP Command Line Interface
//!
//! This is the main entry point for the ABOP CLI application.

mod cli;
mod commands;
mod constants;
mod error;
mod output;
mod utils;

#[cfg(test)]
mod tests;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    match cli::run().await {
        Ok(output) => {
            println!("{}", output.to_json()?);
            Ok(())
        }
        Err(err) => {
            let output = output::CliOutput::error(err.to_string(), "CliError".to_string());
            eprintln!("{}", output.to_json()?);
            std::process::exit(1);
        }
    }
}
