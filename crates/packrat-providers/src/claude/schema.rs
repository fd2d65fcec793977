use serde::Deserialize;
use serde_json::Value;

/// One line of a Claude Code project JSONL log. Only the fields the
/// lightweight scan needs; everything else is ignored.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ClaudeLine {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub session_id: Option<String>,
    pub cwd: Option<String>,
    pub timestamp: Option<String>,
    #[serde(default)]
    pub is_sidechain: bool,
    #[serde(default)]
    pub is_meta: bool,
    pub message: Option<ClaudeMessage>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ClaudeMessage {
    pub role: Option<String>,
    pub model: Option<String>,
    pub content: Option<Value>,
}

/// User content is either a plain string or an array of typed blocks.
pub(crate) fn text_from_content(content: &Value) -> Option<String> {
    match content {
        Value::String(text) => Some(text.clone()),
        Value::Array(blocks) => blocks.iter().find_map(|block| {
            if block.get("type").and_then(Value::as_str) == Some("text") {
                block
                    .get("text")
                    .and_then(Value::as_str)
                    .map(|t| t.to_string())
            } else {
                None
            }
        }),
        _ => None,
    }
}
