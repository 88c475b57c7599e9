use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle state of one interview session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    Idle,
    Connecting,
    Connected,
    Error,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SessionState::Idle => "idle",
            SessionState::Connecting => "connecting",
            SessionState::Connected => "connected",
            SessionState::Error => "error",
        };
        f.write_str(s)
    }
}

/// Who said a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    /// Normalize a provider speaker label. The provider is inconsistent
    /// about how it names its own side ("ai", "agent", "assistant");
    /// anything else is the caller.
    pub fn from_label(label: &str) -> Self {
        match label {
            "ai" | "agent" | "assistant" => Role::Assistant,
            _ => Role::User,
        }
    }
}

/// One utterance in the transcript. Immutable once created; the transcript
/// is append-only and ordered by arrival.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    /// A message assembled live from a transport event.
    pub fn live(role: Role, content: impl Into<String>) -> Self {
        Self {
            id: format!("msg_{}", uuid::Uuid::new_v4().simple()),
            role,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }
}
