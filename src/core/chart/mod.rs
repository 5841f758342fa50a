//! Declarative chart descriptions (Vega-Lite): typed read access over the raw spec.
//!
//! The spec is kept as its JSON object so that every key the renderer understands
//! survives the pipeline; the accessors below expose only what the pipeline inspects.

mod sanitize;

pub use sanitize::sanitize;
#[cfg(test)]
pub(crate) use sanitize::VEGA_LITE_SCHEMA;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Semantic type carried by an encoding channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SemanticType {
    Quantitative,
    Temporal,
    Nominal,
    Ordinal,
}

impl SemanticType {
    /// Parse a Vega-Lite type name, including the one-letter shorthands.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "quantitative" | "q" => Some(Self::Quantitative),
            "temporal" | "t" => Some(Self::Temporal),
            "nominal" | "n" => Some(Self::Nominal),
            "ordinal" | "o" => Some(Self::Ordinal),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Quantitative => "quantitative",
            Self::Temporal => "temporal",
            Self::Nominal => "nominal",
            Self::Ordinal => "ordinal",
        }
    }
}

/// One encoding channel (x, y, color, theta, ...).
#[derive(Debug, Clone, Copy)]
pub struct Channel<'a> {
    pub name: &'a str,
    pub field: Option<&'a str>,
    pub semantic_type: Option<SemanticType>,
}

/// Where a chart's data lives. Variants are listed in lookup preference order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DataRef<'a> {
    Inline(&'a [Value]),
    Named(&'a str),
    Url(&'a str),
    Datasets,
    Missing,
}

/// A declarative visualization spec: mark, encoding, data reference.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChartDescription(Map<String, Value>);

impl From<Map<String, Value>> for ChartDescription {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl ChartDescription {
    /// Wrap a JSON value. Returns None unless it is an object.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(Self(map)),
            _ => None,
        }
    }

    /// True when an object carries one of the keys that mark it as a chart spec.
    pub fn is_chart_like(map: &Map<String, Value>) -> bool {
        map.contains_key("mark") || map.contains_key("encoding")
    }

    #[cfg(test)]
    pub(crate) fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub(crate) fn as_map_mut(&mut self) -> &mut Map<String, Value> {
        &mut self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Mark type, from either `"mark": "bar"` or `"mark": {"type": "bar", ...}`.
    pub fn mark(&self) -> Option<&str> {
        match self.0.get("mark")? {
            Value::String(s) => Some(s.as_str()),
            Value::Object(m) => m.get("type")?.as_str(),
            _ => None,
        }
    }

    /// Encoding channels whose definition is an object. Array channels (tooltip lists) are skipped.
    pub fn channels(&self) -> Vec<Channel<'_>> {
        let Some(encoding) = self.0.get("encoding").and_then(Value::as_object) else {
            return Vec::new();
        };
        encoding
            .iter()
            .filter_map(|(name, def)| {
                let def = def.as_object()?;
                Some(Channel {
                    name: name.as_str(),
                    field: def.get("field").and_then(Value::as_str),
                    semantic_type: def
                        .get("type")
                        .and_then(Value::as_str)
                        .and_then(SemanticType::parse),
                })
            })
            .collect()
    }

    /// Resolve the data reference: inline values, named alias, URL, datasets table.
    pub fn data_ref(&self) -> DataRef<'_> {
        if let Some(data) = self.0.get("data").and_then(Value::as_object) {
            if let Some(values) = data.get("values").and_then(Value::as_array)
                && !values.is_empty()
            {
                return DataRef::Inline(values);
            }
            if let Some(name) = data.get("name").and_then(Value::as_str)
                && !name.is_empty()
            {
                return DataRef::Named(name);
            }
            if let Some(url) = data.get("url").and_then(Value::as_str)
                && !url.is_empty()
            {
                return DataRef::Url(url);
            }
        }
        if self.0.contains_key("datasets") {
            return DataRef::Datasets;
        }
        DataRef::Missing
    }

    /// Whether the renderer has anything to draw from.
    pub fn has_data(&self) -> bool {
        self.data_ref() != DataRef::Missing
    }

    /// Rows carried inside the spec: `data.values`, or the `datasets` entry named by `data.name`.
    pub fn inline_rows(&self) -> Option<&Vec<Value>> {
        let data = self.0.get("data")?.as_object()?;
        if let Some(values) = data.get("values").and_then(Value::as_array) {
            return Some(values);
        }
        let name = data.get("name")?.as_str()?;
        self.0.get("datasets")?.get(name)?.as_array()
    }

    pub(crate) fn inline_rows_mut(&mut self) -> Option<&mut Vec<Value>> {
        let dataset = match self.0.get("data") {
            Some(Value::Object(data)) if data.get("values").is_some_and(Value::is_array) => None,
            Some(Value::Object(data)) => Some(data.get("name")?.as_str()?.to_string()),
            _ => return None,
        };
        match dataset {
            None => self.0.get_mut("data")?.get_mut("values")?.as_array_mut(),
            Some(name) => self
                .0
                .get_mut("datasets")?
                .get_mut(name.as_str())?
                .as_array_mut(),
        }
    }

    /// Replace the data reference with inline rows.
    pub(crate) fn set_inline_values(&mut self, rows: Vec<Value>) {
        let mut data = Map::new();
        data.insert("values".to_string(), Value::Array(rows));
        self.0.insert("data".to_string(), Value::Object(data));
    }
}
