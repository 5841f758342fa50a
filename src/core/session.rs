//! Per-conversation state owned by the caller: mode, completed turns, and the
//! request that would go to the service for the next question.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::core::config::{Config, ConversationMode};
use crate::core::transcript::ConversationTurn;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataAgentContext {
    pub data_agent: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationReference {
    pub conversation: String,
    pub data_agent_context: DataAgentContext,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserMessage {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestMessage {
    pub user_message: UserMessage,
}

impl RequestMessage {
    fn user(text: &str) -> Self {
        Self {
            user_message: UserMessage {
                text: text.to_string(),
            },
        }
    }
}

/// Chat request body, in the service's JSON shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub parent: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation_reference: Option<ConversationReference>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_agent_context: Option<DataAgentContext>,
    pub messages: Vec<RequestMessage>,
}

#[derive(Debug, Clone)]
pub struct Session {
    mode: ConversationMode,
    parent: String,
    agent_name: String,
    conversation_name: String,
    max_turns: usize,
    turns: VecDeque<ConversationTurn>,
}

impl Session {
    pub fn new(config: &Config) -> Self {
        Self {
            mode: config.mode,
            parent: config.parent_resource(),
            agent_name: config.agent_resource_name(),
            conversation_name: config.conversation_resource_name(),
            max_turns: config.max_message_history.max(1),
            turns: VecDeque::new(),
        }
    }

    pub fn with_mode(mut self, mode: ConversationMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn mode(&self) -> ConversationMode {
        self.mode
    }

    /// Questions of the recorded turns, oldest first.
    pub fn prior_questions(&self) -> impl Iterator<Item = &str> {
        self.turns.iter().map(|t| t.question.as_str())
    }

    /// Keep a finished turn. The oldest turns are dropped past the history cap.
    pub fn record(&mut self, turn: ConversationTurn) {
        self.turns.push_back(turn);
        while self.turns.len() > self.max_turns {
            self.turns.pop_front();
        }
    }

    /// The request for `question`.
    ///
    /// Stateful requests reference the conversation (with the agent context, which
    /// the service requires alongside it) and carry only the new question. Stateless
    /// requests reference the agent and resend every earlier question first.
    pub fn build_request(&self, question: &str) -> ChatRequest {
        let agent_context = DataAgentContext {
            data_agent: self.agent_name.clone(),
        };
        match self.mode {
            ConversationMode::Stateful => ChatRequest {
                parent: self.parent.clone(),
                conversation_reference: Some(ConversationReference {
                    conversation: self.conversation_name.clone(),
                    data_agent_context: agent_context,
                }),
                data_agent_context: None,
                messages: vec![RequestMessage::user(question)],
            },
            ConversationMode::Stateless => ChatRequest {
                parent: self.parent.clone(),
                conversation_reference: None,
                data_agent_context: Some(agent_context),
                messages: self
                    .prior_questions()
                    .chain(std::iter::once(question))
                    .map(RequestMessage::user)
                    .collect(),
            },
        }
    }
}
