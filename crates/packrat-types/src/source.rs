use serde::{Deserialize, Serialize};
use std::fmt;

/// Tool that produced a session log (provider-agnostic identifier)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionSource {
    ClaudeCode,
    Codex,
    Gemini,
}

impl SessionSource {
    pub const ALL: [SessionSource; 3] = [
        SessionSource::ClaudeCode,
        SessionSource::Codex,
        SessionSource::Gemini,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SessionSource::ClaudeCode => "claude_code",
            SessionSource::Codex => "codex",
            SessionSource::Gemini => "gemini",
        }
    }

    /// Parse a source name as given on the command line or in config.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "claude_code" | "claude" => Some(SessionSource::ClaudeCode),
            "codex" => Some(SessionSource::Codex),
            "gemini" => Some(SessionSource::Gemini),
            _ => None,
        }
    }
}

impl fmt::Display for SessionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
