//! # DataChat - conversational analytics transcript pipeline
//!
//! Turns the response stream of a conversational analytics service into a clean,
//! renderable transcript: text, SQL, tables and renderer-ready charts.
//!
//! ## Features
//! - Replay of recorded response streams (`replay`)
//! - Chart spec sanitizing and extraction from text (`sanitize`, `extract`)
//! - Request preview per conversation mode (`request`)
//! - Configuration from the environment or `.env`

mod cli;
mod core;
mod run;

use clap::Parser;
use dotenv::dotenv;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables from .env file
    dotenv().ok();

    let args = cli::Args::parse();
    run::init_logger(&args);

    // Print user-facing errors with Display, not Debug
    if let Err(e) = run::dispatch(args).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
    Ok(())
}
