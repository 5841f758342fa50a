//! Chart spec sanitizing: make service-produced specs safe for a generic Vega-Lite renderer.
//!
//! Pure and total: the input is cloned, unknown shapes pass through untouched.

use serde_json::{Number, Value};

use super::{ChartDescription, SemanticType};

/// Lower bound (exclusive) for a temporal value to be read as Unix seconds.
pub const SECONDS_EPOCH_MIN: f64 = 100_000_000.0;
/// Upper bound (exclusive) for a temporal value to be read as Unix seconds.
pub const SECONDS_EPOCH_MAX: f64 = 3_000_000_000.0;
/// Schema every sanitized spec is pinned to.
pub const VEGA_LITE_SCHEMA: &str = "https://vega.github.io/schema/vega-lite/v5.json";

/// Transform operations the renderer cannot apply to pre-sorted inline data.
const UNSUPPORTED_TRANSFORM_OPS: &[&str] = &["window", "sort"];

/// Return a renderer-compatible copy of `spec`.
///
/// Steps, in order: strip window/sort transforms when data is inline, drop empty
/// sort directives, convert temporal Unix seconds to milliseconds, pin `$schema`.
pub fn sanitize(spec: &ChartDescription) -> ChartDescription {
    let mut spec = spec.clone();
    strip_unsupported_transforms(&mut spec);
    remove_empty_sorts(&mut spec);
    normalize_temporal_units(&mut spec);
    spec.as_map_mut().insert(
        "$schema".to_string(),
        Value::String(VEGA_LITE_SCHEMA.to_string()),
    );
    spec
}

fn strip_unsupported_transforms(spec: &mut ChartDescription) {
    if !spec.inline_rows().is_some_and(|rows| !rows.is_empty()) {
        return;
    }
    let map = spec.as_map_mut();
    let Some(Value::Array(transforms)) = map.get_mut("transform") else {
        return;
    };
    let before = transforms.len();
    transforms.retain(|t| !is_unsupported_transform(t));
    let removed = before - transforms.len();
    if removed > 0 {
        log::info!("Removed {} window/sort transform(s) from chart spec", removed);
    }
    if transforms.is_empty() {
        map.remove("transform");
    }
}

fn is_unsupported_transform(transform: &Value) -> bool {
    transform
        .as_object()
        .is_some_and(|t| UNSUPPORTED_TRANSFORM_OPS.iter().any(|op| t.contains_key(*op)))
}

fn remove_empty_sorts(spec: &mut ChartDescription) {
    let Some(Value::Object(encoding)) = spec.as_map_mut().get_mut("encoding") else {
        return;
    };
    for (name, channel) in encoding.iter_mut() {
        let Value::Object(channel) = channel else {
            continue;
        };
        if channel.get("sort").is_some_and(is_empty_sort) {
            channel.remove("sort");
            log::info!("Removed empty sort from '{}' channel", name);
        }
    }
}

fn is_empty_sort(sort: &Value) -> bool {
    match sort {
        Value::Null => true,
        Value::Object(m) => m.is_empty(),
        _ => false,
    }
}

fn normalize_temporal_units(spec: &mut ChartDescription) {
    let mut fields: Vec<String> = spec
        .channels()
        .iter()
        .filter(|c| c.semantic_type == Some(SemanticType::Temporal))
        .filter_map(|c| c.field.map(str::to_string))
        .collect();
    fields.sort();
    fields.dedup();
    if fields.is_empty() {
        return;
    }
    let Some(rows) = spec.inline_rows_mut() else {
        return;
    };

    let mut converted = 0usize;
    for row in rows.iter_mut() {
        let Value::Object(row) = row else { continue };
        for field in &fields {
            if let Some(value) = row.get_mut(field.as_str())
                && let Some(millis) = seconds_to_millis(value)
            {
                *value = millis;
                converted += 1;
            }
        }
    }
    if converted > 0 {
        log::info!(
            "Converted {} temporal value(s) in {:?} from seconds to milliseconds",
            converted,
            fields
        );
    }
}

/// Millisecond equivalent of a value that looks like Unix seconds; None otherwise.
fn seconds_to_millis(value: &Value) -> Option<Value> {
    let n = value.as_f64()?;
    if !(n > SECONDS_EPOCH_MIN && n < SECONDS_EPOCH_MAX) {
        return None;
    }
    if let Some(i) = value.as_i64() {
        return Some(Value::from(i * 1000));
    }
    Number::from_f64(n * 1000.0).map(Value::Number)
}
