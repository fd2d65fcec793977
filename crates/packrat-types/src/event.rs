use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One normalized record from a session log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentEvent {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    pub payload: EventPayload,
}

/// Kind-discriminated event payload.
///
/// Provider record shapes are heterogeneous; they normalize into this sum
/// type so a new kind extends the enum (and the compiler finds every match
/// that needs updating) instead of hiding in an untyped map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EventPayload {
    User {
        text: String,
    },
    Assistant {
        text: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        model: Option<String>,
    },
    Reasoning {
        text: String,
    },
    ToolCall {
        name: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        summary: Option<String>,
    },
    ToolResult {
        output: String,
        is_error: bool,
    },
    Notification {
        text: String,
    },
}

impl EventPayload {
    pub fn kind_str(&self) -> &'static str {
        match self {
            EventPayload::User { .. } => "user",
            EventPayload::Assistant { .. } => "assistant",
            EventPayload::Reasoning { .. } => "reasoning",
            EventPayload::ToolCall { .. } => "tool_call",
            EventPayload::ToolResult { .. } => "tool_result",
            EventPayload::Notification { .. } => "notification",
        }
    }
}
