use std::io::{BufRead, BufReader};
use std::path::Path;

use super::schema::{text_from_content, ClaudeLine};
use crate::util::snippet_from_text;

/// Lines to inspect before giving up on a header field. Long preambles of
/// meta records push the first real user message down, hence the margin.
const HEADER_SCAN_LINES: usize = 120;

#[derive(Debug, Default)]
pub struct ClaudeHeader {
    pub session_id: Option<String>,
    pub cwd: Option<String>,
    pub timestamp: Option<String>,
    pub model: Option<String>,
    pub snippet: Option<String>,
}

/// Extract header information from a Claude Code file by reading a bounded
/// prefix, never the whole log.
pub fn extract_claude_header(path: &Path) -> std::io::Result<ClaudeHeader> {
    let file = std::fs::File::open(path)?;
    let reader = BufReader::new(file);

    let mut header = ClaudeHeader::default();

    for line in reader.lines().take(HEADER_SCAN_LINES) {
        let line = line?;
        let Ok(record) = serde_json::from_str::<ClaudeLine>(&line) else {
            continue;
        };

        if header.session_id.is_none() {
            header.session_id = record.session_id.clone();
        }
        if header.cwd.is_none() {
            header.cwd = record.cwd.clone();
        }
        if header.timestamp.is_none() {
            header.timestamp = record.timestamp.clone();
        }

        match (record.kind.as_deref(), &record.message) {
            (Some("user"), Some(message)) => {
                if header.snippet.is_none()
                    && !record.is_sidechain
                    && !record.is_meta
                    && let Some(content) = &message.content
                    && let Some(text) = text_from_content(content)
                {
                    header.snippet = snippet_from_text(&text);
                }
            }
            (Some("assistant"), Some(message)) => {
                if header.model.is_none() {
                    header.model = message.model.clone();
                }
            }
            _ => {}
        }

        if header.session_id.is_some()
            && header.cwd.is_some()
            && header.model.is_some()
            && header.snippet.is_some()
        {
            break;
        }
    }

    Ok(header)
}
