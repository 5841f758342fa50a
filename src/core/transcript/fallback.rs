//! Fallback charts synthesized from a table when the service sent none.

use std::sync::OnceLock;

use regex::Regex;
use serde_json::{Map, Value, json};

use crate::core::chart::{self, ChartDescription};

use super::DataTable;

/// Column-name words that mark a date or period column.
const DATE_HINTS: &[&str] = &[
    "date", "datetime", "timestamp", "month", "year", "time", "created", "updated", "day", "week",
    "quarter",
];

const NUMERIC_TYPES: &[&str] = &[
    "INT64", "INTEGER", "FLOAT", "FLOAT64", "NUMERIC", "BIGNUMERIC", "DECIMAL",
];

const MARK_COLOR: &str = "#4285F4";
const CHART_HEIGHT: u32 = 400;

static LINE_WORDS: OnceLock<Regex> = OnceLock::new();
static BAR_WORDS: OnceLock<Regex> = OnceLock::new();
static PIE_WORDS: OnceLock<Regex> = OnceLock::new();

fn line_words() -> &'static Regex {
    LINE_WORDS.get_or_init(|| {
        Regex::new(r"(?i)\b(trend\w*|chang\w*|over\s+time)\b").expect("valid regex")
    })
}

fn bar_words() -> &'static Regex {
    BAR_WORDS.get_or_init(|| {
        Regex::new(r"(?i)\b(compar\w*|vs|versus|top\s+\d+)\b").expect("valid regex")
    })
}

fn pie_words() -> &'static Regex {
    PIE_WORDS
        .get_or_init(|| Regex::new(r"(?i)\b(distribut\w*|proportion\w*)\b").expect("valid regex"))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackKind {
    Line,
    Bar,
    Pie,
}

impl FallbackKind {
    pub fn as_str(self) -> &'static str {
        match self {
            FallbackKind::Line => "line",
            FallbackKind::Bar => "bar",
            FallbackKind::Pie => "pie",
        }
    }
}

/// Pick a chart kind from the question's wording. Line beats bar beats pie.
pub fn infer_kind(question: &str) -> Option<FallbackKind> {
    if line_words().is_match(question) {
        Some(FallbackKind::Line)
    } else if bar_words().is_match(question) {
        Some(FallbackKind::Bar)
    } else if pie_words().is_match(question) {
        Some(FallbackKind::Pie)
    } else {
        None
    }
}

/// Split a column name into lowercase words on `_`, spaces, dashes, and camelCase humps.
fn name_words(name: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut prev_lower = false;
    for c in name.chars() {
        if !c.is_alphanumeric() {
            words.push(std::mem::take(&mut current));
            prev_lower = false;
            continue;
        }
        if c.is_uppercase() && prev_lower {
            words.push(std::mem::take(&mut current));
        }
        prev_lower = c.is_lowercase() || c.is_ascii_digit();
        current.extend(c.to_lowercase());
    }
    words.push(current);
    words.retain(|w| !w.is_empty());
    words
}

/// True when a word of the name is a date hint, singular or plural.
pub(crate) fn is_date_like_name(name: &str) -> bool {
    name_words(name).iter().any(|word| {
        let singular = word.strip_suffix('s').unwrap_or(word.as_str());
        DATE_HINTS.contains(&word.as_str()) || DATE_HINTS.contains(&singular)
    })
}

fn as_number(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

fn coerce_number(v: Value) -> Value {
    match v {
        Value::String(s) => {
            let trimmed = s.trim();
            if let Ok(n) = trimmed.parse::<i64>() {
                return Value::from(n);
            }
            match trimmed.parse::<f64>().ok().and_then(serde_json::Number::from_f64) {
                Some(n) => Value::Number(n),
                None => Value::String(s),
            }
        }
        other => other,
    }
}

fn is_numeric_column(table: &DataTable, index: usize) -> bool {
    let column = &table.columns[index];
    if is_date_like_name(&column.name) {
        return false;
    }
    if let Some(t) = column.field_type.as_deref() {
        return NUMERIC_TYPES.contains(&t.to_ascii_uppercase().as_str());
    }
    let mut values = table.column_values(index).filter(|v| !v.is_null()).peekable();
    values.peek().is_some() && values.all(|v| as_number(v).is_some())
}

/// x is the first non-numeric column, y the first numeric one; otherwise the first two.
fn pick_columns(table: &DataTable) -> (usize, usize) {
    let numeric: Vec<bool> = (0..table.columns.len())
        .map(|i| is_numeric_column(table, i))
        .collect();
    let x = numeric.iter().position(|n| !n);
    let y = numeric.iter().position(|n| *n);
    match (x, y) {
        (Some(x), Some(y)) => (x, y),
        _ => (0, 1),
    }
}

/// Build a chart of `kind` from `table`. None for tables with fewer than two columns or no rows.
pub fn synthesize(kind: FallbackKind, table: &DataTable) -> Option<ChartDescription> {
    if table.columns.len() < 2 || table.rows.is_empty() {
        return None;
    }
    let (x, y) = pick_columns(table);
    let x_name = table.columns[x].name.as_str();
    let y_name = table.columns[y].name.as_str();
    let x_type = if is_date_like_name(x_name) {
        "temporal"
    } else {
        "nominal"
    };

    let values: Vec<Value> = table
        .rows
        .iter()
        .map(|row| {
            let mut obj = Map::new();
            let cell = |i: usize| row.get(i).cloned().unwrap_or(Value::Null);
            obj.insert(x_name.to_string(), cell(x));
            obj.insert(y_name.to_string(), coerce_number(cell(y)));
            Value::Object(obj)
        })
        .collect();

    let tooltip = json!([{"field": x_name}, {"field": y_name}]);
    let (mark, encoding) = match kind {
        FallbackKind::Line => (
            json!({"type": "line", "color": MARK_COLOR, "point": true}),
            json!({
                "x": {"field": x_name, "type": x_type},
                "y": {"field": y_name, "type": "quantitative"},
                "tooltip": tooltip,
            }),
        ),
        FallbackKind::Bar => (
            json!({"type": "bar", "color": MARK_COLOR}),
            json!({
                "x": {"field": x_name, "type": x_type, "sort": "-y"},
                "y": {"field": y_name, "type": "quantitative"},
                "tooltip": tooltip,
            }),
        ),
        FallbackKind::Pie => (
            json!({"type": "arc"}),
            json!({
                "theta": {"field": y_name, "type": "quantitative"},
                "color": {"field": x_name, "type": "nominal"},
                "tooltip": tooltip,
            }),
        ),
    };

    let spec = json!({
        "mark": mark,
        "encoding": encoding,
        "data": {"values": values},
        "width": "container",
        "height": CHART_HEIGHT,
    });
    log::info!(
        "Synthesized fallback {} chart ({} by {})",
        kind.as_str(),
        y_name,
        x_name
    );
    ChartDescription::from_value(spec).map(|spec| chart::sanitize(&spec))
}
