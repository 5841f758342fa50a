//! CLI-only commands: config info, chart sanitizing and extraction, request preview.
//!
//! These run synchronously and produce plain text or JSON output.

use std::fs;
use std::io;
use std::path::Path;

use serde::Deserialize;

use crate::core::app;
use crate::core::chart::{self, ChartDescription};
use crate::core::config::{Config, ConversationMode};
use crate::core::scrub;
use crate::core::session::Session;
use crate::core::stream;
use crate::core::transcript::ConversationTurn;

/// Read a file, or stdin for `-`.
fn read_source(source: &str) -> io::Result<String> {
    if source == "-" {
        io::read_to_string(io::stdin())
    } else {
        fs::read_to_string(source)
    }
}

/// Saved history: one turn or a list of turns.
#[derive(Deserialize)]
#[serde(untagged)]
enum HistoryFile {
    Many(Vec<ConversationTurn>),
    One(ConversationTurn),
}

fn load_history(path: &Path) -> Result<Vec<ConversationTurn>, Box<dyn std::error::Error>> {
    let raw = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read history {}: {}", path.display(), e))?;
    let turns = match serde_json::from_str::<HistoryFile>(&raw)
        .map_err(|e| format!("Invalid history {}: {}", path.display(), e))?
    {
        HistoryFile::Many(turns) => turns,
        HistoryFile::One(turn) => vec![turn],
    };
    log::info!("Loaded {} previous turn(s)", turns.len());
    Ok(turns)
}

/// Run the `config` command: display effective settings.
pub fn run_config(config: &Config) {
    let project = if config.project_id.is_empty() {
        "not set".to_string()
    } else {
        config.project_id.clone()
    };
    let charts = if config.enable_chart_rendering {
        "enabled"
    } else {
        "disabled"
    };

    println!("{} {}", app::NAME, app::VERSION);
    println!("Project:      {}", project);
    println!("Location:     {}", config.location);
    println!("Agent:        {}", config.agent_id);
    println!("Conversation: {}", config.conversation_id);
    println!("Mode:         {}", config.mode);
    println!("Charts:       {}", charts);
    println!("History:      {} turn(s)", config.max_message_history);

    let missing = config.validate_required();
    if !missing.is_empty() {
        println!("\nMissing (needed for requests): {}", missing.join(", "));
    }
}

/// Run the `sanitize` command: print the renderer-ready form of a chart spec.
pub fn run_sanitize(source: &str) -> Result<(), Box<dyn std::error::Error>> {
    let raw: serde_json::Value = serde_json::from_str(&read_source(source)?)?;
    let Some(spec) = ChartDescription::from_value(stream::to_plain(raw)) else {
        return Err("chart spec must be a JSON object".into());
    };
    println!("{}", serde_json::to_string_pretty(&chart::sanitize(&spec))?);
    Ok(())
}

/// Run the `extract` command: print the prose, then any embedded chart (sanitized).
pub fn run_extract(source: &str) -> Result<(), Box<dyn std::error::Error>> {
    let text = read_source(source)?;
    let (cleaned, embedded) = scrub::extract_chart(&text);
    println!("{}", cleaned);
    match embedded {
        Some(spec) => {
            println!("\n--- chart ---");
            println!("{}", serde_json::to_string_pretty(&chart::sanitize(&spec))?);
        }
        None => log::info!("No chart spec found in text"),
    }
    Ok(())
}

/// Run the `request` command: print the chat request for `question` as JSON.
pub fn run_request(
    config: &Config,
    question: &str,
    mode: Option<ConversationMode>,
    history: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    config.require_service()?;
    let question = question.trim();
    if question.is_empty() {
        return Err("empty question".into());
    }

    let mut session = Session::new(config);
    if let Some(mode) = mode {
        session = session.with_mode(mode);
    }
    if let Some(path) = history {
        for turn in load_history(path)? {
            session.record(turn);
        }
    }

    log::info!("Building {} request", session.mode());
    let request = session.build_request(question);
    println!("{}", serde_json::to_string_pretty(&request)?);
    Ok(())
}
