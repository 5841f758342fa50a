//! Transcript entries: the canonical, renderer-ready units of a turn.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::core::chart::ChartDescription;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

/// Tag of an entry's content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryType {
    Text,
    Sql,
    Table,
    Chart,
    Reasoning,
    Error,
}

impl EntryType {
    pub fn as_str(self) -> &'static str {
        match self {
            EntryType::Text => "text",
            EntryType::Sql => "sql",
            EntryType::Table => "table",
            EntryType::Chart => "chart",
            EntryType::Reasoning => "reasoning",
            EntryType::Error => "error",
        }
    }
}

impl fmt::Display for EntryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A result column: name plus the type the service declared, if any.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub field_type: Option<String>,
}

impl Column {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            field_type: None,
        }
    }
}

/// Tabular query result. Row values are aligned with `columns`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataTable {
    pub columns: Vec<Column>,
    pub rows: Vec<Vec<Value>>,
}

impl DataTable {
    /// Values of one column, top to bottom. Short rows yield Null.
    pub fn column_values(&self, index: usize) -> impl Iterator<Item = &Value> + '_ {
        self.rows
            .iter()
            .map(move |row| row.get(index).unwrap_or(&Value::Null))
    }

    /// Rows as `{column: value}` objects, the inline-data form charts consume.
    pub fn rows_as_objects(&self) -> Vec<Value> {
        self.rows
            .iter()
            .map(|row| {
                let obj: Map<String, Value> = self
                    .columns
                    .iter()
                    .zip(row.iter())
                    .map(|(col, v)| (col.name.clone(), v.clone()))
                    .collect();
                Value::Object(obj)
            })
            .collect()
    }
}

/// Where a chart entry came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartOrigin {
    /// The service's structured chart channel.
    Declarative,
    /// A spec found inside a free-text answer.
    TextEmbedded,
    /// Synthesized locally from a table.
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartEntry {
    pub spec: ChartDescription,
    pub origin: ChartOrigin,
}

/// Entry content. Exactly one kind per entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "content", rename_all = "snake_case")]
pub enum EntryContent {
    Text(String),
    Sql(String),
    Table(DataTable),
    Chart(ChartEntry),
    Reasoning(String),
    Error(String),
}

/// One renderer-ready unit of conversation output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptEntry {
    pub role: Role,
    pub sequence: u64,
    /// Sequence number of an earlier entry this one replaces.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supersedes: Option<u64>,
    #[serde(flatten)]
    pub content: EntryContent,
}

impl TranscriptEntry {
    pub fn new(role: Role, sequence: u64, content: EntryContent) -> Self {
        Self {
            role,
            sequence,
            supersedes: None,
            content,
        }
    }

    pub(crate) fn superseding(mut self, earlier: Option<u64>) -> Self {
        self.supersedes = earlier;
        self
    }

    pub fn entry_type(&self) -> EntryType {
        match self.content {
            EntryContent::Text(_) => EntryType::Text,
            EntryContent::Sql(_) => EntryType::Sql,
            EntryContent::Table(_) => EntryType::Table,
            EntryContent::Chart(_) => EntryType::Chart,
            EntryContent::Reasoning(_) => EntryType::Reasoning,
            EntryContent::Error(_) => EntryType::Error,
        }
    }

    pub fn chart(&self) -> Option<&ChartEntry> {
        match &self.content {
            EntryContent::Chart(chart) => Some(chart),
            _ => None,
        }
    }

    pub fn table(&self) -> Option<&DataTable> {
        match &self.content {
            EntryContent::Table(table) => Some(table),
            _ => None,
        }
    }
}
