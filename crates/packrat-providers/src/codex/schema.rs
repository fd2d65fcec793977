use serde::Deserialize;

/// One line of a Codex rollout JSONL file, discriminated by `type`.
#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
#[serde(rename_all = "snake_case")]
pub(crate) enum CodexRecord {
    SessionMeta(SessionMetaRecord),
    TurnContext(TurnContextRecord),
    EventMsg(EventMsgRecord),
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SessionMetaRecord {
    pub payload: SessionMetaPayload,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SessionMetaPayload {
    pub id: String,
    pub timestamp: Option<String>,
    pub cwd: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TurnContextRecord {
    pub payload: TurnContextPayload,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TurnContextPayload {
    pub model: Option<String>,
    pub cwd: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct EventMsgRecord {
    pub payload: EventMsgPayload,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
#[serde(rename_all = "snake_case")]
pub(crate) enum EventMsgPayload {
    UserMessage { message: String },
    #[serde(other)]
    Unknown,
}
