//! Interactive command-line front end for the weather & time agent

#![allow(clippy::print_stdout)] // CLI program intentionally uses stdout

use anyhow::Result;
use clap::Parser;
use meteo_agent::config::API_KEY_ENV;
use meteo_agent::{Agent, AgentConfig, logging};
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info};

/// Chat with an assistant that knows the weather, the time and the web
#[derive(Parser)]
#[command(name = "meteo-agent")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "METEO_AGENT_CONFIG")]
    config: Option<PathBuf>,

    /// Model to use (overrides config)
    #[arg(short, long)]
    model: Option<String>,

    /// Log debug output to stderr
    #[arg(short, long)]
    verbose: bool,

    /// Answer a single prompt and exit instead of starting the interactive loop
    prompt: Option<String>,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let mut config = AgentConfig::load_from_path(cli.config)?;
    if let Some(model) = cli.model {
        config.llm.model = model;
    }
    logging::init(&config.logging, cli.verbose);

    if config.warn_if_missing_api_key() {
        println!("Please set {API_KEY_ENV} environment variable.");
        return Ok(ExitCode::FAILURE);
    }

    let mut agent = match Agent::from_config(&config) {
        Ok(agent) => agent,
        Err(e) => {
            error!("Failed to initialize agent: {}", e);
            eprintln!("{}", e.user_message());
            return Ok(ExitCode::FAILURE);
        }
    };
    info!("Using model {}", config.llm.model);

    if let Some(prompt) = cli.prompt {
        println!("Agent: {}", agent.query(&prompt).await);
        return Ok(ExitCode::SUCCESS);
    }

    println!("Initializing Weather & Time Agent...");
    println!("Agent ready! (Type 'quit' to exit)");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("\nYou: ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let input = line.trim();
        if is_exit_command(input) {
            break;
        }
        if input.is_empty() {
            continue;
        }

        println!("Agent: {}", agent.query(input).await);
    }

    Ok(ExitCode::SUCCESS)
}

fn is_exit_command(input: &str) -> bool {
    input.eq_ignore_ascii_case("quit") || input.eq_ignore_ascii_case("exit")
}
