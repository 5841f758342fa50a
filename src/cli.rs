//! CLI definitions: argument parsing, subcommands, and help text.

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};
use clap_complete::Shell;

use crate::core::config::ConversationMode;

pub use clap_complete::generate;

const AFTER_HELP: &str = "\
EXAMPLES:
  datachat replay turn.jsonl --question \"revenue trend\"
                                                   Normalize a recorded response stream
  datachat replay - --json < turn.jsonl            Read the stream from stdin, print JSON
  datachat extract answer.txt                      Pull a chart spec out of an answer
  datachat sanitize chart.json                     Print the renderer-ready chart spec
  datachat request --question \"top 5 products\"   Show the request for a question
  datachat config                                  Show effective configuration
  datachat completions bash                        Generate bash completions
";

/// Command-line arguments for the application.
#[derive(Parser)]
#[command(
    author,
    version,
    about = "Normalize conversational analytics response streams into renderable transcripts",
    after_help = AFTER_HELP
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase log verbosity (use multiple times for debug)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Reduce log output (errors only)
    #[arg(short = 'q', long = "quiet", global = true)]
    pub quiet: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a recorded response stream (JSON Lines) through the pipeline and print the turn
    Replay {
        /// Stream file, or '-' for stdin
        source: String,
        /// The question the stream answers (drives fallback chart selection)
        #[arg(long, default_value = "")]
        question: String,
        /// Print the turn as JSON instead of text
        #[arg(long)]
        json: bool,
        /// Wrap width for text output
        #[arg(long, default_value_t = crate::core::render::DEFAULT_WIDTH)]
        width: usize,
    },
    /// Print the sanitized form of a chart spec
    Sanitize {
        /// JSON file, or '-' for stdin (default)
        #[arg(default_value = "-")]
        source: String,
    },
    /// Split an answer into prose and any embedded chart spec
    Extract {
        /// Text file, or '-' for stdin (default)
        #[arg(default_value = "-")]
        source: String,
    },
    /// Print the chat request the service would receive for a question
    Request {
        #[arg(long)]
        question: String,
        /// Conversation mode (overrides CONVERSATION_MODE)
        #[arg(long)]
        mode: Option<ConversationMode>,
        /// Previous turns as JSON (one turn or a list), as printed by `replay --json`
        #[arg(long)]
        history: Option<PathBuf>,
    },
    /// Show effective configuration
    Config,
    /// Generate shell completion script
    Completions {
        /// Shell to generate completions for (bash, zsh, fish, powershell, elvish)
        #[arg(value_parser = clap::value_parser!(Shell))]
        shell: Shell,
    },
}

impl Args {
    /// Log level based on -v/-q flags: error, warn, info, or debug.
    pub fn log_level(&self) -> &'static str {
        if self.quiet {
            "error"
        } else if self.verbose >= 2 {
            "debug"
        } else if self.verbose >= 1 {
            "info"
        } else {
            "warn"
        }
    }
}
