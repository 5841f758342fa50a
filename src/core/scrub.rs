//! Text scrubbing: pull chart specs the service embedded in free-text answers.
//!
//! Candidates are found by scanning for `{` and letting serde_json's streaming
//! deserializer parse one complete value from there, so nested braces and braces
//! inside strings are bounded correctly.

use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;

use crate::core::chart::ChartDescription;

static DANGLING_FENCE: OnceLock<Regex> = OnceLock::new();
static CHART_LEAD_IN: OnceLock<Regex> = OnceLock::new();

/// Code-fence opener left behind when the chart JSON sat inside a fenced block.
fn dangling_fence() -> &'static Regex {
    DANGLING_FENCE.get_or_init(|| {
        Regex::new(r"```[ \t]*(?:json|vega-lite|vegalite|vega)?[ \t]*$").expect("valid regex")
    })
}

/// Orphaned lead-in such as "Here's the bar chart:" once the chart itself is cut.
fn chart_lead_in() -> &'static Regex {
    CHART_LEAD_IN.get_or_init(|| {
        Regex::new(r"(?i)\bhere(?:'s| is) (?:a |the )?(?:bar |line |pie )?chart[^.]*?:\s*$")
            .expect("valid regex")
    })
}

/// Split `text` into the prose before an embedded chart spec and the spec itself.
///
/// The first `{` that starts a parseable object carrying `mark` or `encoding` wins.
/// Without such a candidate the text is returned unchanged.
pub fn extract_chart(text: &str) -> (String, Option<ChartDescription>) {
    for (start, _) in text.match_indices('{') {
        let rest = &text[start..];
        // Every later candidate is a suffix of this one.
        if !rest.contains("\"mark\"") && !rest.contains("\"encoding\"") {
            break;
        }
        let Some(chart) = parse_chart_at(rest) else {
            continue;
        };
        log::info!(
            "Extracted chart spec from text (mark: {})",
            chart.mark().unwrap_or("unknown")
        );
        return (clean_prefix(&text[..start]), Some(chart));
    }
    (text.to_string(), None)
}

fn parse_chart_at(candidate: &str) -> Option<ChartDescription> {
    let mut values = serde_json::Deserializer::from_str(candidate).into_iter::<Value>();
    match values.next()? {
        Ok(Value::Object(map)) if ChartDescription::is_chart_like(&map) => Some(map.into()),
        _ => None,
    }
}

fn clean_prefix(prefix: &str) -> String {
    let text = prefix.trim_end();
    let text = dangling_fence().replace(text, "");
    let text = chart_lead_in().replace(text.trim_end(), "");
    text.trim_end().to_string()
}
