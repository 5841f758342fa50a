//! Message normalizer: response units in, transcript entries out.

use futures::{Stream, StreamExt};
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::core::chart::{self, ChartDescription};
use crate::core::scrub;
use crate::core::transcript::{
    ChartEntry, ChartOrigin, EntryContent, Normalized, Role, TranscriptEntry,
};

use super::ChatError;
use super::proto;
use super::table::decode_table;
use super::unit::{ResponseUnit, decode_message};

/// Per-turn normalization state. Create one per question; never share across turns.
#[derive(Debug, Default)]
pub struct Normalizer {
    next_sequence: u64,
    declarative_chart_seen: bool,
    last_sql: Option<String>,
    last_table: Option<u64>,
    terminated: bool,
}

impl Normalizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Close the turn over `entries`, everything `push` and friends returned for it.
    pub fn finish(self, entries: Vec<TranscriptEntry>) -> Normalized {
        Normalized {
            entries,
            terminated: self.terminated,
            declarative_chart_seen: self.declarative_chart_seen,
        }
    }

    /// Decode one wire message and convert its units. A malformed payload becomes an
    /// error entry without hiding the other payloads of the same message.
    pub fn push(&mut self, raw: &Value) -> Vec<TranscriptEntry> {
        if self.terminated {
            log::debug!("Ignoring message after turn ended");
            return Vec::new();
        }
        let mut out = Vec::new();
        for decoded in decode_message(raw) {
            match decoded {
                Ok(unit) => out.extend(self.push_unit(unit)),
                Err(err) => out.extend(self.push_failure(&err)),
            }
        }
        out
    }

    /// Convert one unit. Emits nothing once the turn has ended.
    pub fn push_unit(&mut self, unit: ResponseUnit) -> Vec<TranscriptEntry> {
        if self.terminated {
            log::debug!("Ignoring {} unit after turn ended", unit.kind());
            return Vec::new();
        }
        match unit {
            ResponseUnit::UserEcho(text) => vec![self.emit(Role::User, EntryContent::Text(text))],
            ResponseUnit::ReasoningStep(text) => vec![self.assistant(EntryContent::Reasoning(text))],
            ResponseUnit::Text(text) => self.text(&text),
            ResponseUnit::DataResult {
                generated_sql,
                result,
            } => self.data_result(generated_sql, result),
            ResponseUnit::Chart(config) => self.declarative_chart(config),
            ResponseUnit::Error(message) => {
                self.terminated = true;
                vec![self.assistant(EntryContent::Error(message))]
            }
        }
    }

    /// Record a failure as an error entry. Terminal failures end the turn.
    pub fn push_failure(&mut self, err: &ChatError) -> Vec<TranscriptEntry> {
        if self.terminated {
            return Vec::new();
        }
        log::warn!("{}", err);
        if err.is_terminal() {
            self.terminated = true;
        }
        vec![self.assistant(EntryContent::Error(err.to_string()))]
    }

    /// Drain a unit stream into entries, handing each to `on_entry` as soon as it exists.
    ///
    /// Every await is raced against `cancel_token`. On cancellation the turn's state is
    /// dropped and `ChatError::Cancelled` is returned; entries already handed out stay out.
    pub async fn consume<S>(
        mut self,
        stream: S,
        cancel_token: Option<&CancellationToken>,
        on_entry: Option<&(dyn Fn(&TranscriptEntry) + Send + Sync)>,
    ) -> Result<Normalized, ChatError>
    where
        S: Stream<Item = Result<Value, ChatError>>,
    {
        let mut stream = std::pin::pin!(stream);
        let mut entries = Vec::new();

        loop {
            if cancel_token.is_some_and(|t| t.is_cancelled()) {
                return Err(ChatError::Cancelled);
            }

            let next = if let Some(token) = cancel_token {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => {
                        return Err(ChatError::Cancelled);
                    }
                    item = stream.next() => item,
                }
            } else {
                stream.next().await
            };
            let Some(item) = next else {
                break;
            };

            let produced = match item {
                Ok(raw) => self.push(&raw),
                Err(ChatError::Cancelled) => return Err(ChatError::Cancelled),
                Err(err) => self.push_failure(&err),
            };
            for entry in produced {
                if let Some(cb) = on_entry {
                    cb(&entry);
                }
                entries.push(entry);
            }

            if self.terminated {
                log::debug!("Turn ended by error; not reading further");
                break;
            }
        }

        log::info!("Normalized {} transcript entries", entries.len());
        Ok(self.finish(entries))
    }

    fn emit(&mut self, role: Role, content: EntryContent) -> TranscriptEntry {
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        TranscriptEntry::new(role, sequence, content)
    }

    fn assistant(&mut self, content: EntryContent) -> TranscriptEntry {
        self.emit(Role::Assistant, content)
    }

    fn chart_entry(&mut self, spec: ChartDescription, origin: ChartOrigin) -> TranscriptEntry {
        self.assistant(EntryContent::Chart(ChartEntry {
            spec: chart::sanitize(&spec),
            origin,
        }))
    }

    fn text(&mut self, text: &str) -> Vec<TranscriptEntry> {
        let (cleaned, embedded) = scrub::extract_chart(text);
        let mut out = vec![self.assistant(EntryContent::Text(cleaned))];
        if let Some(spec) = embedded {
            out.push(self.chart_entry(spec, ChartOrigin::TextEmbedded));
        }
        out
    }

    fn data_result(&mut self, generated_sql: Option<String>, result: Option<Value>) -> Vec<TranscriptEntry> {
        let mut out = Vec::new();
        let repeated = generated_sql.is_some() && generated_sql == self.last_sql;
        if !repeated {
            self.last_table = None;
            if let Some(sql) = &generated_sql {
                out.push(self.assistant(EntryContent::Sql(sql.clone())));
            }
        }
        self.last_sql = generated_sql;

        let Some(result) = result else {
            return out;
        };
        match decode_table(proto::to_plain(result)) {
            Ok(Some(table)) => {
                let supersedes = self.last_table;
                let entry = self
                    .assistant(EntryContent::Table(table))
                    .superseding(supersedes);
                if let Some(earlier) = supersedes {
                    log::debug!("Table {} supersedes table {}", entry.sequence, earlier);
                }
                self.last_table = Some(entry.sequence);
                out.push(entry);
            }
            Ok(None) => log::debug!("Skipping empty data result"),
            Err(err) => out.extend(self.push_failure(&err)),
        }
        out
    }

    fn declarative_chart(&mut self, config: Value) -> Vec<TranscriptEntry> {
        let Some(spec) = ChartDescription::from_value(proto::to_plain(config)) else {
            return self.push_failure(&ChatError::decode("chart", "spec is not an object"));
        };
        if spec.is_empty() {
            log::debug!("Skipping empty chart spec");
            return Vec::new();
        }
        self.declarative_chart_seen = true;
        vec![self.chart_entry(spec, ChartOrigin::Declarative)]
    }
}
