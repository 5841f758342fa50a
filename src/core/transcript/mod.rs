//! Conversation transcript: entries, turns, and the assembler that turns
//! normalizer output into a display-ready turn.

mod assemble;
mod entry;
mod fallback;

#[cfg(test)]
mod tests;

use serde::{Deserialize, Serialize};

pub use assemble::{AssembleOptions, assemble, assemble_partial};
pub use entry::{ChartEntry, ChartOrigin, Column, DataTable, EntryContent, Role, TranscriptEntry};
#[cfg(test)]
pub use entry::EntryType;
pub(crate) use fallback::is_date_like_name;

/// How a turn ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnOutcome {
    #[default]
    Complete,
    Failed,
    Cancelled,
}

/// Normalizer output for one turn, before assembly.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Normalized {
    pub entries: Vec<TranscriptEntry>,
    /// An error unit or a terminal failure ended the turn.
    pub terminated: bool,
    /// The service sent at least one declarative chart.
    pub declarative_chart_seen: bool,
}

/// One question and the entries produced in response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub question: String,
    #[serde(default)]
    pub entries: Vec<TranscriptEntry>,
    #[serde(default)]
    pub outcome: TurnOutcome,
}
