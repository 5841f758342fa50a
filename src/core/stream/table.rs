//! Data results: decode the service's tabular payload into a `DataTable`.
//!
//! Expects an already deep-converted payload: `schema.fields` gives the columns,
//! `data` the rows (objects keyed by column, or positional lists). `formattedData`
//! is used when `data` is empty.

use serde_json::{Map, Value};

use crate::core::transcript::{Column, DataTable};

use super::ChatError;

/// Decode a data result. Returns None when it holds neither columns nor rows.
pub(crate) fn decode_table(result: Value) -> Result<Option<DataTable>, ChatError> {
    let Value::Object(mut result) = result else {
        return Err(ChatError::decode("data result", "expected an object"));
    };

    let mut columns = decode_columns(result.get("schema"))?;
    let mut rows = decode_rows(take(&mut result, &["data"]), &mut columns)?;
    if rows.is_empty() {
        rows = decode_rows(
            take(&mut result, &["formattedData", "formatted_data"]),
            &mut columns,
        )?;
    }

    if columns.is_empty() && rows.is_empty() {
        return Ok(None);
    }
    Ok(Some(DataTable { columns, rows }))
}

fn take(map: &mut Map<String, Value>, keys: &[&str]) -> Option<Value> {
    keys.iter().find_map(|k| map.remove(*k))
}

fn decode_columns(schema: Option<&Value>) -> Result<Vec<Column>, ChatError> {
    let Some(fields) = schema.and_then(|s| s.get("fields")) else {
        return Ok(Vec::new());
    };
    let Some(fields) = fields.as_array() else {
        return Err(ChatError::decode("data result", "schema fields must be a list"));
    };
    Ok(fields
        .iter()
        .enumerate()
        .map(|(i, f)| Column {
            name: f
                .get("name")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| format!("col_{}", i)),
            field_type: f.get("type").and_then(Value::as_str).map(str::to_string),
        })
        .collect())
}

/// Decode rows. Columns are taken from the first object row when the schema had none.
fn decode_rows(data: Option<Value>, columns: &mut Vec<Column>) -> Result<Vec<Vec<Value>>, ChatError> {
    let rows = match data {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Array(rows)) => rows,
        Some(_) => return Err(ChatError::decode("data result", "rows must be a list")),
    };

    let mut out = Vec::with_capacity(rows.len());
    for (i, row) in rows.into_iter().enumerate() {
        match row {
            Value::Object(mut row) => {
                if columns.is_empty() {
                    *columns = row.keys().cloned().map(Column::named).collect();
                }
                out.push(
                    columns
                        .iter()
                        .map(|c| row.remove(&c.name).unwrap_or(Value::Null))
                        .collect(),
                );
            }
            Value::Array(values) => out.push(values),
            _ => {
                return Err(ChatError::decode(
                    "data result",
                    format!("row {} is neither an object nor a list", i),
                ));
            }
        }
    }
    Ok(out)
}
