//! Terminal rendering of a conversation turn: plain text or JSON.

use chrono::{TimeZone, Utc};
use serde_json::Value;

use crate::core::chart::ChartDescription;
use crate::core::transcript::{
    ChartOrigin, ConversationTurn, DataTable, EntryContent, Role, TurnOutcome, is_date_like_name,
};

pub const DEFAULT_WIDTH: usize = 80;

/// Rows shown per table before eliding the rest.
const MAX_TABLE_ROWS: usize = 20;
/// Values sampled when deciding whether a column holds Unix seconds.
const DATE_SAMPLE: usize = 5;

/// Split text into lines of max width, keeping the text's own line breaks.
fn wrap(text: &str, width: usize, indent: &str) -> String {
    let width = width.saturating_sub(indent.len()).max(20);
    let mut out = String::new();
    for line in text.split('\n') {
        if line.trim().is_empty() {
            out.push('\n');
            continue;
        }
        for chunk in textwrap::wrap(line, width) {
            out.push_str(indent);
            out.push_str(&chunk);
            out.push('\n');
        }
    }
    out
}

fn looks_like_seconds(v: &Value) -> bool {
    v.as_f64().is_some_and(|n| n > 1e9 && n < 3e9)
}

fn is_seconds_column(table: &DataTable, index: usize) -> bool {
    if !is_date_like_name(&table.columns[index].name) {
        return false;
    }
    let mut sample = table
        .column_values(index)
        .filter(|v| !v.is_null())
        .take(DATE_SAMPLE)
        .peekable();
    sample.peek().is_some() && sample.all(looks_like_seconds)
}

fn format_month(v: &Value) -> Option<String> {
    let secs = v.as_f64()? as i64;
    Utc.timestamp_opt(secs, 0)
        .single()
        .map(|d| d.format("%b %Y").to_string())
}

fn format_cell(v: &Value) -> String {
    match v {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Aligned plain-text table. Date columns holding Unix seconds show as `Mon YYYY`.
pub fn render_table(table: &DataTable) -> String {
    let seconds: Vec<bool> = (0..table.columns.len())
        .map(|i| is_seconds_column(table, i))
        .collect();
    let header: Vec<String> = table.columns.iter().map(|c| c.name.clone()).collect();
    let body: Vec<Vec<String>> = table
        .rows
        .iter()
        .take(MAX_TABLE_ROWS)
        .map(|row| {
            (0..table.columns.len())
                .map(|i| {
                    let v = row.get(i).unwrap_or(&Value::Null);
                    if seconds[i] {
                        format_month(v).unwrap_or_else(|| format_cell(v))
                    } else {
                        format_cell(v)
                    }
                })
                .collect()
        })
        .collect();

    let widths: Vec<usize> = (0..header.len())
        .map(|i| {
            body.iter()
                .map(|r| r[i].chars().count())
                .chain(std::iter::once(header[i].chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let line = |cells: &[String]| {
        let padded: Vec<String> = cells
            .iter()
            .zip(&widths)
            .map(|(c, w)| format!("{:<w$}", c, w = *w))
            .collect();
        format!("  {}", padded.join(" | ").trim_end())
    };

    let mut out = String::new();
    out.push_str(&line(&header));
    out.push('\n');
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    out.push_str(&format!("  {}\n", rule.join("-+-")));
    for row in &body {
        out.push_str(&line(row));
        out.push('\n');
    }
    if table.rows.len() > MAX_TABLE_ROWS {
        out.push_str(&format!(
            "  ... {} more row(s)\n",
            table.rows.len() - MAX_TABLE_ROWS
        ));
    }
    out
}

/// One-line chart summary: mark, origin, and bound fields per channel.
pub fn chart_summary(spec: &ChartDescription, origin: ChartOrigin) -> String {
    let origin = match origin {
        ChartOrigin::Declarative => "service",
        ChartOrigin::TextEmbedded => "from text",
        ChartOrigin::Fallback => "fallback",
    };
    let channels: Vec<String> = spec
        .channels()
        .iter()
        .filter_map(|c| {
            let field = c.field?;
            Some(match c.semantic_type {
                Some(t) => format!("{}={} ({})", c.name, field, t.as_str()),
                None => format!("{}={}", c.name, field),
            })
        })
        .collect();
    let rows = spec.inline_rows().map_or(0, Vec::len);
    format!(
        "{} chart, {}, {} row(s){}{}",
        spec.mark().unwrap_or("unknown"),
        origin,
        rows,
        if channels.is_empty() { "" } else { ": " },
        channels.join(", ")
    )
}

/// Render a turn for the terminal.
pub fn render_turn(turn: &ConversationTurn, width: usize) -> String {
    let mut out = String::new();
    out.push_str(&wrap(&format!("> {}", turn.question), width, ""));

    for entry in &turn.entries {
        out.push('\n');
        match &entry.content {
            EntryContent::Text(text) if entry.role == Role::User => {
                out.push_str(&wrap(&format!("> {}", text), width, ""));
            }
            EntryContent::Text(text) => out.push_str(&wrap(text, width, "")),
            EntryContent::Reasoning(text) => {
                out.push_str("[thinking]\n");
                out.push_str(&wrap(text, width, "  "));
            }
            EntryContent::Sql(sql) => {
                out.push_str("[sql]\n");
                for line in sql.lines() {
                    out.push_str(&format!("  {}\n", line));
                }
            }
            EntryContent::Table(table) => {
                out.push_str(&format!("[table] {} row(s)\n", table.rows.len()));
                out.push_str(&render_table(table));
            }
            EntryContent::Chart(chart) => {
                out.push_str(&format!(
                    "[chart] {}\n",
                    chart_summary(&chart.spec, chart.origin)
                ));
                let spec = serde_json::to_string_pretty(&chart.spec).unwrap_or_default();
                for line in spec.lines() {
                    out.push_str(&format!("  {}\n", line));
                }
            }
            EntryContent::Error(message) => {
                out.push_str(&wrap(&format!("[error] {}", message), width, ""));
            }
        }
    }

    match turn.outcome {
        TurnOutcome::Complete => {}
        TurnOutcome::Failed => out.push_str("\n(turn ended with an error)\n"),
        TurnOutcome::Cancelled => out.push_str("\n(cancelled)\n"),
    }
    out
}

/// Render a turn as pretty JSON, the form a UI layer consumes.
pub fn render_json(turn: &ConversationTurn) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(turn)
}
