use std::env;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

const DEFAULT_LOCATION: &str = "global";
const DEFAULT_AGENT_ID: &str = "datachat_agent";
const DEFAULT_MAX_MESSAGE_HISTORY: usize = 50;

/// Who carries the conversation history between turns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConversationMode {
    /// The service keeps the history; requests reference the conversation.
    #[default]
    Stateful,
    /// The caller resends every previous question with each request.
    Stateless,
}

impl ConversationMode {
    pub fn as_str(self) -> &'static str {
        match self {
            ConversationMode::Stateful => "stateful",
            ConversationMode::Stateless => "stateless",
        }
    }
}

impl fmt::Display for ConversationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConversationMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "stateful" => Ok(ConversationMode::Stateful),
            "stateless" => Ok(ConversationMode::Stateless),
            other => Err(format!("unknown conversation mode '{}'", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Empty when unset; only request building needs it.
    pub project_id: String,
    pub location: String,
    pub agent_id: String,
    pub conversation_id: String,
    pub mode: ConversationMode,
    pub enable_chart_rendering: bool,
    pub max_message_history: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("GCP_PROJECT_ID is not set")]
    MissingProjectId,
    #[error("Invalid value '{value}' for {key}: expected {expected}")]
    InvalidValue {
        key: &'static str,
        value: String,
        expected: &'static str,
    },
}

/// Load configuration from the environment (`.env` is loaded by the binary beforehand).
pub fn load() -> Result<Config, ConfigError> {
    Config::from_lookup(|key| env::var(key).ok())
}

/// A fresh conversation id, `conv_` plus 12 hex digits.
pub fn new_conversation_id() -> String {
    let hex = uuid::Uuid::new_v4().simple().to_string();
    format!("conv_{}", &hex[..12])
}

fn parse_bool(key: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key,
            value: value.to_string(),
            expected: "a boolean (true/false)",
        }),
    }
}

impl Config {
    /// Build from a key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let mode = match get("CONVERSATION_MODE") {
            Some(v) => v.parse().map_err(|_| ConfigError::InvalidValue {
                key: "CONVERSATION_MODE",
                value: v.clone(),
                expected: "stateful or stateless",
            })?,
            None => ConversationMode::default(),
        };
        let enable_chart_rendering = match get("ENABLE_CHART_RENDERING") {
            Some(v) => parse_bool("ENABLE_CHART_RENDERING", &v)?,
            None => true,
        };
        let max_message_history = match get("MAX_MESSAGE_HISTORY") {
            Some(v) => match v.parse::<usize>() {
                Ok(n) if n > 0 => n,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        key: "MAX_MESSAGE_HISTORY",
                        value: v,
                        expected: "a positive integer",
                    });
                }
            },
            None => DEFAULT_MAX_MESSAGE_HISTORY,
        };

        Ok(Config {
            project_id: get("GCP_PROJECT_ID").unwrap_or_default(),
            location: get("GCP_LOCATION").unwrap_or_else(|| DEFAULT_LOCATION.to_string()),
            agent_id: get("DEFAULT_AGENT_ID").unwrap_or_else(|| DEFAULT_AGENT_ID.to_string()),
            conversation_id: get("DEFAULT_CONVERSATION_ID").unwrap_or_else(new_conversation_id),
            mode,
            enable_chart_rendering,
            max_message_history,
        })
    }

    /// `projects/{project}/locations/{location}`
    pub fn parent_resource(&self) -> String {
        format!("projects/{}/locations/{}", self.project_id, self.location)
    }

    pub fn agent_resource_name(&self) -> String {
        format!("{}/dataAgents/{}", self.parent_resource(), self.agent_id)
    }

    pub fn conversation_resource_name(&self) -> String {
        format!("{}/conversations/{}", self.parent_resource(), self.conversation_id)
    }

    /// Names of required settings that are missing.
    pub fn validate_required(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.project_id.is_empty() {
            missing.push("GCP_PROJECT_ID");
        }
        missing
    }

    /// Fail unless everything needed to address the service is set.
    pub fn require_service(&self) -> Result<(), ConfigError> {
        if self.project_id.is_empty() {
            return Err(ConfigError::MissingProjectId);
        }
        Ok(())
    }
}
