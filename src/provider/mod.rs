//! Upstream conversational-AI provider client
//!
//! All calls that need the provider secret happen here, server-side. The
//! session controller depends on the narrow [`CredentialBroker`] and
//! [`TranscriptSource`] traits so tests can substitute scripted fakes.

mod client;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use client::{NotesSettings, ProviderClient, ProviderSettings};

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("{0} is not configured")]
    MissingConfig(&'static str),

    #[error("provider request failed: {0}")]
    Request(String),

    #[error("provider returned {status}: {body}")]
    Upstream { status: u16, body: String },

    #[error("malformed provider response: {0}")]
    Malformed(String),

    #[error("provider returned an empty response")]
    Empty,
}

impl From<reqwest::Error> for ProviderError {
    fn from(e: reqwest::Error) -> Self {
        ProviderError::Request(e.to_string())
    }
}

/// Short-lived signed connection credential plus the session identifier
/// the provider will file the conversation under.
#[derive(Debug, Clone)]
pub struct SignedSession {
    pub signed_url: String,
    pub conversation_id: String,
}

/// One entry of the provider's durable conversation record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptEntry {
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub time_in_call_secs: Option<f64>,
}

impl TranscriptEntry {
    pub fn content(&self) -> &str {
        self.message
            .as_deref()
            .or(self.text.as_deref())
            .unwrap_or_default()
    }
}

/// Snapshot of a conversation as the provider currently has it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationSnapshot {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub transcript: Vec<TranscriptEntry>,
}

impl ConversationSnapshot {
    pub fn is_done(&self) -> bool {
        self.status == "done"
    }
}

/// Exchanges local configuration for a signed connection URL.
#[async_trait::async_trait]
pub trait CredentialBroker: Send + Sync {
    async fn signed_session(
        &self,
        agent_override: Option<&str>,
    ) -> Result<SignedSession, ProviderError>;
}

/// Reads the provider's durable conversation record.
#[async_trait::async_trait]
pub trait TranscriptSource: Send + Sync {
    async fn conversation(&self, id: &str) -> Result<ConversationSnapshot, ProviderError>;
}
