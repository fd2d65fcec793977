use std::path::Path;

use super::schema::{GeminiMessage, GeminiSession};
use crate::util::snippet_from_text;

#[derive(Debug, Default)]
pub struct GeminiHeader {
    pub session_id: Option<String>,
    pub start_time: Option<String>,
    pub last_updated: Option<String>,
    pub model: Option<String>,
    pub snippet: Option<String>,
    pub message_count: usize,
}

/// Extract header information from a Gemini chat file. The file is a single
/// JSON document, so this parse also yields an exact message count.
pub fn extract_gemini_header(path: &Path) -> Option<GeminiHeader> {
    let text = std::fs::read_to_string(path).ok()?;
    let session: GeminiSession = serde_json::from_str(&text).ok()?;

    let snippet = session.messages.iter().find_map(|msg| match msg {
        GeminiMessage::User(user) => snippet_from_text(&user.content),
        _ => None,
    });
    let model = session.messages.iter().find_map(|msg| match msg {
        GeminiMessage::Gemini(assistant) => assistant.model.clone(),
        _ => None,
    });

    Some(GeminiHeader {
        session_id: session.session_id,
        start_time: session.start_time,
        last_updated: session.last_updated,
        model,
        snippet,
        message_count: session.messages.len(),
    })
}

/// `session-<id>.json` file stem, used when the document omits its id.
pub(crate) fn session_id_from_filename(path: &Path) -> Option<String> {
    let stem = path.file_stem()?.to_str()?;
    let id = stem.strip_prefix("session-").unwrap_or(stem);
    if id.is_empty() {
        None
    } else {
        Some(id.to_string())
    }
}
