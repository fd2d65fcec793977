use serde::Deserialize;

/// Gemini CLI chat file: one JSON document per session under
/// `~/.gemini/tmp/<hash>/chats/session-*.json`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GeminiSession {
    pub session_id: Option<String>,
    pub start_time: Option<String>,
    pub last_updated: Option<String>,
    #[serde(default)]
    pub messages: Vec<GeminiMessage>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
#[serde(rename_all = "lowercase")]
pub(crate) enum GeminiMessage {
    User(UserMessage),
    Gemini(AssistantMessage),
    Info(InfoMessage),
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Deserialize)]
pub(crate) struct UserMessage {
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AssistantMessage {
    #[serde(default)]
    pub model: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct InfoMessage {}
