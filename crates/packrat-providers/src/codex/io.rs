use std::io::{BufRead, BufReader};
use std::path::Path;

use super::schema::{CodexRecord, EventMsgPayload};
use crate::util::snippet_from_text;

const HEADER_SCAN_LINES: usize = 60;

#[derive(Debug, Default)]
pub struct CodexHeader {
    pub session_id: Option<String>,
    pub cwd: Option<String>,
    pub timestamp: Option<String>,
    pub model: Option<String>,
    pub snippet: Option<String>,
}

/// Extract header information from a Codex rollout file. The session_meta
/// record is always the first line; model and the first user message follow
/// within a short prefix.
pub fn extract_codex_header(path: &Path) -> std::io::Result<CodexHeader> {
    let file = std::fs::File::open(path)?;
    let reader = BufReader::new(file);

    let mut header = CodexHeader::default();

    for line in reader.lines().take(HEADER_SCAN_LINES) {
        let line = line?;
        let Ok(record) = serde_json::from_str::<CodexRecord>(&line) else {
            continue;
        };

        match record {
            CodexRecord::SessionMeta(meta) => {
                if header.session_id.is_none() {
                    header.session_id = Some(meta.payload.id);
                }
                if header.timestamp.is_none() {
                    header.timestamp = meta.payload.timestamp;
                }
                if header.cwd.is_none() {
                    header.cwd = meta.payload.cwd;
                }
            }
            CodexRecord::TurnContext(turn) => {
                if header.model.is_none() {
                    header.model = turn.payload.model;
                }
                if header.cwd.is_none() {
                    header.cwd = turn.payload.cwd;
                }
            }
            CodexRecord::EventMsg(event) => {
                if header.snippet.is_none()
                    && let EventMsgPayload::UserMessage { message } = event.payload
                {
                    header.snippet = snippet_from_text(&message);
                }
            }
            CodexRecord::Unknown => {}
        }

        if header.session_id.is_some() && header.model.is_some() && header.snippet.is_some() {
            break;
        }
    }

    Ok(header)
}

/// Rollout filenames end in the session UUID:
/// `rollout-2026-03-01T10-00-00-<uuid>.jsonl`.
pub(crate) fn session_id_from_filename(path: &Path) -> Option<String> {
    let stem = path.file_stem()?.to_str()?;
    if stem.len() < 36 {
        return None;
    }
    let candidate = stem.get(stem.len() - 36..)?;
    let dashes = candidate.matches('-').count();
    if dashes == 4 {
        Some(candidate.to_string())
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const FIXTURE: &str = concat!(
        r#"{"timestamp":"2026-03-01T10:00:00Z","type":"session_meta","payload":{"id":"1f2e3d4c-5b6a-7980-a1b2-c3d4e5f60718","timestamp":"2026-03-01T10:00:00Z","cwd":"/home/dev/widget","originator":"codex_cli_rs","cli_version":"0.28.0","source":"cli"}}"#,
        "\n",
        r#"{"timestamp":"2026-03-01T10:00:01Z","type":"turn_context","payload":{"model":"gpt-5-codex","cwd":"/home/dev/widget"}}"#,
        "\n",
        r#"{"timestamp":"2026-03-01T10:00:02Z","type":"event_msg","payload":{"type":"user_message","message":"port the scanner"}}"#,
        "\n",
    );

    #[test]
    fn header_reads_meta_model_and_snippet() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(FIXTURE.as_bytes()).unwrap();

        let header = extract_codex_header(file.path()).unwrap();
        assert_eq!(
            header.session_id.as_deref(),
            Some("1f2e3d4c-5b6a-7980-a1b2-c3d4e5f60718")
        );
        assert_eq!(header.cwd.as_deref(), Some("/home/dev/widget"));
        assert_eq!(header.model.as_deref(), Some("gpt-5-codex"));
        assert_eq!(header.snippet.as_deref(), Some("port the scanner"));
    }

    #[test]
    fn filename_fallback_requires_uuid_shape() {
        assert_eq!(
            session_id_from_filename(Path::new(
                "rollout-2026-03-01T10-00-00-550e8400-e29b-41d4-a716-446655440000.jsonl"
            ))
            .as_deref(),
            Some("550e8400-e29b-41d4-a716-446655440000")
        );
        assert_eq!(session_id_from_filename(Path::new("notes.jsonl")), None);
    }
}
