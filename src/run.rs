//! Application run modes: logger init, command dispatch, stream replay.

use std::io::{self, Write};
use std::sync::Mutex;

use clap::CommandFactory;
use tokio_util::sync::CancellationToken;

use crate::cli::{self, Args, Commands};
use crate::core;
use crate::core::config::Config;
use crate::core::stream::{ChatError, Normalizer};
use crate::core::transcript::{AssembleOptions, TranscriptEntry, assemble, assemble_partial};

/// Initialize env_logger. Logs go to stderr so stdout stays clean for output.
pub fn init_logger(args: &Args) {
    let log_level = args.log_level();
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .try_init();
}

/// Load configuration, exiting with a readable message when it is invalid.
fn load_config() -> Config {
    core::config::load().unwrap_or_else(|e| {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    })
}

/// Run the selected subcommand.
pub async fn dispatch(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    match args.command {
        Commands::Replay {
            source,
            question,
            json,
            width,
        } => {
            let config = load_config();
            run_replay(&config, &source, &question, json, width).await
        }
        Commands::Sanitize { source } => core::cli::run_sanitize(&source),
        Commands::Extract { source } => core::cli::run_extract(&source),
        Commands::Request {
            question,
            mode,
            history,
        } => {
            let config = load_config();
            core::cli::run_request(&config, &question, mode, history.as_deref())
        }
        Commands::Config => {
            core::cli::run_config(&load_config());
            Ok(())
        }
        Commands::Completions { shell } => {
            let mut cmd = Args::command();
            cli::generate(shell, &mut cmd, core::app::NAME, &mut io::stdout());
            Ok(())
        }
    }
}

/// Replay a recorded stream: normalize, assemble, print. Ctrl-C cancels the turn and
/// prints what was produced so far.
pub async fn run_replay(
    config: &Config,
    source: &str,
    question: &str,
    json: bool,
    width: usize,
) -> Result<(), Box<dyn std::error::Error>> {
    let stream = core::stream::open(source).await?;

    let cancel_token = CancellationToken::new();
    let ctrl_c_token = cancel_token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c_token.cancel();
        }
    });

    let produced = Mutex::new(Vec::new());
    let on_entry = |entry: &TranscriptEntry| {
        log::debug!("Entry {}: {}", entry.sequence, entry.entry_type());
        if let Ok(mut entries) = produced.lock() {
            entries.push(entry.clone());
        }
    };

    let options = AssembleOptions {
        fallback_charts: config.enable_chart_rendering,
    };
    let result = Normalizer::new()
        .consume(stream, Some(&cancel_token), Some(&on_entry))
        .await;
    let turn = match result {
        Ok(normalized) => assemble(question, normalized, options),
        Err(ChatError::Cancelled) => {
            let entries = produced.into_inner().unwrap_or_else(|e| e.into_inner());
            assemble_partial(question, entries)
        }
        Err(e) => return Err(e.into()),
    };

    let output = if json {
        core::render::render_json(&turn)?
    } else {
        core::render::render_turn(&turn, width)
    };
    let mut stdout = io::stdout();
    writeln!(stdout, "{}", output.trim_end())?;
    stdout.flush()?;
    Ok(())
}
