use std::collections::HashSet;

use crate::core::chart;

use super::fallback::{infer_kind, synthesize};
use super::{
    ChartEntry, ChartOrigin, ConversationTurn, EntryContent, Normalized, Role, TranscriptEntry,
    TurnOutcome,
};

/// Assembly switches.
#[derive(Debug, Clone, Copy)]
pub struct AssembleOptions {
    /// Synthesize a chart from the last table when the service sent none.
    pub fallback_charts: bool,
}

impl Default for AssembleOptions {
    fn default() -> Self {
        Self {
            fallback_charts: true,
        }
    }
}

fn has_origin(entry: &TranscriptEntry, origin: ChartOrigin) -> bool {
    entry.chart().is_some_and(|c| c.origin == origin)
}

/// Merge normalizer output into a display-ready turn.
///
/// Superseded entries are dropped. When the service sent a declarative chart, charts
/// scraped from text are discarded as duplicates. Charts without data are bound to
/// the last table. A turn with a table but no chart may get a fallback synthesized
/// from that table. The turn failed only when an error unit or a terminal failure
/// ended it.
pub fn assemble(
    question: &str,
    normalized: Normalized,
    options: AssembleOptions,
) -> ConversationTurn {
    let outcome = if normalized.terminated {
        TurnOutcome::Failed
    } else {
        TurnOutcome::Complete
    };
    let (mut entries, next_sequence) =
        merge(normalized.entries, normalized.declarative_chart_seen);

    let has_chart = entries.iter().any(|e| e.chart().is_some());
    if options.fallback_charts
        && !has_chart
        && let Some(table) = entries.iter().rev().find_map(TranscriptEntry::table)
        && let Some(kind) = infer_kind(question)
        && let Some(spec) = synthesize(kind, table)
    {
        entries.push(TranscriptEntry::new(
            Role::Assistant,
            next_sequence,
            EntryContent::Chart(ChartEntry {
                spec,
                origin: ChartOrigin::Fallback,
            }),
        ));
    }

    ConversationTurn {
        question: question.to_string(),
        entries,
        outcome,
    }
}

/// Tidy the entries of a cancelled turn. Superseded tables and duplicate charts are
/// dropped as in `assemble`; no fallback is synthesized.
pub fn assemble_partial(question: &str, entries: Vec<TranscriptEntry>) -> ConversationTurn {
    let declarative_chart_seen = entries
        .iter()
        .any(|e| has_origin(e, ChartOrigin::Declarative));
    let (entries, _) = merge(entries, declarative_chart_seen);
    ConversationTurn {
        question: question.to_string(),
        entries,
        outcome: TurnOutcome::Cancelled,
    }
}

/// Order, dedupe, and bind. Returns the kept entries and the next free sequence number.
fn merge(
    mut entries: Vec<TranscriptEntry>,
    declarative_chart_seen: bool,
) -> (Vec<TranscriptEntry>, u64) {
    entries.sort_by_key(|e| e.sequence);
    let next_sequence = entries.last().map_or(0, |e| e.sequence + 1);

    let superseded: HashSet<u64> = entries.iter().filter_map(|e| e.supersedes).collect();
    entries.retain(|e| !superseded.contains(&e.sequence));

    if declarative_chart_seen {
        let before = entries.len();
        entries.retain(|e| !has_origin(e, ChartOrigin::TextEmbedded));
        if entries.len() < before {
            log::info!(
                "Dropped {} text-embedded chart(s) in favor of the declarative chart",
                before - entries.len()
            );
        }
    }

    if let Some(table) = entries.iter().rev().find_map(TranscriptEntry::table).cloned() {
        for entry in &mut entries {
            if let EntryContent::Chart(bound) = &mut entry.content
                && !bound.spec.has_data()
            {
                log::info!("Binding chart {} to the turn's table", entry.sequence);
                bound.spec.set_inline_values(table.rows_as_objects());
                bound.spec = chart::sanitize(&bound.spec);
            }
        }
    }

    (entries, next_sequence)
}
