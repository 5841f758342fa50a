//! Response units: the tagged items of the service stream, decoded from wire JSON.
//!
//! A wire message holds either `userMessage` or `systemMessage`. A system message
//! may bundle several payload fields; they are split into one unit each, in the
//! order text, data, chart, analysis, error.

use serde_json::{Map, Value};

use super::ChatError;
use super::proto;

/// Text types the service uses for progress chatter rather than answers.
const REASONING_TEXT_TYPES: &[&str] = &["THOUGHT", "PROGRESS"];

/// One item of the service stream. Payloads are still raw; the normalizer converts them.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseUnit {
    UserEcho(String),
    Text(String),
    DataResult {
        generated_sql: Option<String>,
        result: Option<Value>,
    },
    Chart(Value),
    ReasoningStep(String),
    Error(String),
}

impl ResponseUnit {
    pub fn kind(&self) -> &'static str {
        match self {
            ResponseUnit::UserEcho(_) => "user-echo",
            ResponseUnit::Text(_) => "text",
            ResponseUnit::DataResult { .. } => "data-result",
            ResponseUnit::Chart(_) => "chart",
            ResponseUnit::ReasoningStep(_) => "reasoning-step",
            ResponseUnit::Error(_) => "error",
        }
    }
}

/// Look up a key in either its camelCase or snake_case spelling.
fn field<'a>(map: &'a Map<String, Value>, camel: &str, snake: &str) -> Option<&'a Value> {
    map.get(camel)
        .or_else(|| map.get(snake))
        .filter(|v| !v.is_null())
}

/// Result of decoding one payload of a wire message.
pub type Decoded = Result<ResponseUnit, ChatError>;

/// Decode one wire message into one result per payload.
///
/// Payloads are decoded independently, so a malformed payload does not hide its
/// siblings. A message that is not a user or system message yields a single
/// `ChatError::Decode`. A malformed error payload is reported as a terminal
/// `ChatError::Stream`, since the turn has failed either way.
pub fn decode_message(message: &Value) -> Vec<Decoded> {
    let Some(message) = message.as_object() else {
        return vec![Err(ChatError::decode("message", "expected a JSON object"))];
    };

    if let Some(user) = field(message, "userMessage", "user_message") {
        let unit = user
            .get("text")
            .and_then(Value::as_str)
            .map(|text| ResponseUnit::UserEcho(text.to_string()))
            .ok_or_else(|| ChatError::decode("user message", "missing text"));
        return vec![unit];
    }

    let Some(system) = field(message, "systemMessage", "system_message") else {
        return vec![Err(ChatError::decode(
            "message",
            "neither a user nor a system message",
        ))];
    };
    let Some(system) = system.as_object() else {
        return vec![Err(ChatError::decode("system message", "expected an object"))];
    };

    let mut units = Vec::new();
    if let Some(text) = field(system, "text", "text") {
        units.extend(decode_text(text).transpose());
    }
    if let Some(data) = field(system, "data", "data") {
        units.extend(decode_data(data).transpose());
    }
    if let Some(chart) = field(system, "chart", "chart") {
        units.extend(decode_chart(chart).transpose());
    }
    if let Some(analysis) = field(system, "analysis", "analysis") {
        units.extend(decode_analysis(analysis).map(Ok));
    }
    if let Some(error) = field(system, "error", "error") {
        units.push(decode_error(error));
    }
    if field(system, "schema", "schema").is_some() {
        log::debug!("Skipping schema payload");
    }
    units
}

fn decode_text(text: &Value) -> Result<Option<ResponseUnit>, ChatError> {
    let parts = match text.get("parts") {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::Array(parts)) => parts,
        Some(_) => return Err(ChatError::decode("text", "parts must be a list")),
    };
    let parts: Vec<&str> = parts
        .iter()
        .map(|p| {
            p.as_str()
                .ok_or_else(|| ChatError::decode("text", "parts must be strings"))
        })
        .collect::<Result<_, _>>()?;
    if parts.is_empty() {
        return Ok(None);
    }
    let joined = parts.join(" ");

    let text_type = text
        .get("textType")
        .or_else(|| text.get("text_type"))
        .and_then(Value::as_str);
    if text_type.is_some_and(|t| REASONING_TEXT_TYPES.contains(&t)) {
        return Ok(Some(ResponseUnit::ReasoningStep(joined)));
    }
    Ok(Some(ResponseUnit::Text(joined)))
}

fn decode_data(data: &Value) -> Result<Option<ResponseUnit>, ChatError> {
    let Some(data) = data.as_object() else {
        return Err(ChatError::decode("data message", "expected an object"));
    };
    let generated_sql = match field(data, "generatedSql", "generated_sql") {
        None => None,
        Some(Value::String(sql)) if sql.trim().is_empty() => None,
        Some(Value::String(sql)) => Some(sql.clone()),
        Some(_) => {
            return Err(ChatError::decode("data message", "generated SQL must be a string"));
        }
    };
    let result = field(data, "result", "result").cloned();
    if generated_sql.is_none() && result.is_none() {
        log::debug!("Skipping data message without SQL or result");
        return Ok(None);
    }
    Ok(Some(ResponseUnit::DataResult {
        generated_sql,
        result,
    }))
}

fn decode_chart(chart: &Value) -> Result<Option<ResponseUnit>, ChatError> {
    let Some(result) = chart.get("result").filter(|r| !r.is_null()) else {
        return Ok(None);
    };
    let config = match result.get("vegaConfig").or_else(|| result.get("vega_config")) {
        None | Some(Value::Null) => {
            if result.get("image").is_some() {
                log::debug!("Skipping chart image payload");
            }
            return Ok(None);
        }
        Some(Value::String(raw)) => serde_json::from_str(raw)
            .map_err(|e| ChatError::decode("chart", format!("vega config is not JSON: {}", e)))?,
        Some(config) => config.clone(),
    };
    Ok(Some(ResponseUnit::Chart(config)))
}

fn decode_analysis(analysis: &Value) -> Option<ResponseUnit> {
    let event = analysis
        .get("progressEvent")
        .or_else(|| analysis.get("progress_event"))
        .filter(|e| !e.is_null())?;
    let text = match proto::to_plain(event.clone()) {
        Value::String(s) => s,
        other => other.to_string(),
    };
    Some(ResponseUnit::ReasoningStep(text))
}

fn decode_error(error: &Value) -> Result<ResponseUnit, ChatError> {
    match error.get("text").and_then(Value::as_str) {
        Some(text) if !text.trim().is_empty() => Ok(ResponseUnit::Error(text.to_string())),
        _ => Err(ChatError::Stream(format!(
            "Service reported an error without details: {}",
            error
        ))),
    }
}
