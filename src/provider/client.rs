use reqwest::Url;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};

use super::{
    ConversationSnapshot, CredentialBroker, ProviderError, SignedSession, TranscriptSource,
};

/// Connection settings for the conversational provider.
#[derive(Debug, Clone)]
pub struct ProviderSettings {
    pub base_url: String,
    pub api_key: String,
    pub agent_id: Option<String>,
}

/// Connection settings for the note-generation service.
#[derive(Debug, Clone)]
pub struct NotesSettings {
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
}

const SUMMARY_SYSTEM_PROMPT: &str = "You are a clinical documentation assistant. Using the provided patient interview transcript, generate a detailed yet concise SOAP note.\n\nGuidelines:\n- Organize the note under the headings: Subjective, Objective, Assessment, Plan.\n- Use bullet points where appropriate.\n- Only include information present in the transcript; do not fabricate details.\n- Keep the language professional and clear.\n- Return markdown formatted text starting with '## Subjective' etc.";

/// REST client for the upstream provider. Holds the server-side secret;
/// nothing here is ever exposed to callers.
pub struct ProviderClient {
    http: reqwest::Client,
    provider: ProviderSettings,
    notes: NotesSettings,
}

#[derive(Debug, Deserialize)]
struct SignedUrlResponse {
    signed_url: String,
    #[serde(default)]
    conversation_id: Option<String>,
}

impl ProviderClient {
    pub fn new(provider: ProviderSettings, notes: NotesSettings) -> Self {
        Self {
            http: reqwest::Client::new(),
            provider,
            notes,
        }
    }

    /// Generate a SOAP-style summary note from pre-formatted transcript
    /// text ("AI: ..." / "Patient: ..." lines).
    pub async fn summary_note(&self, transcript_text: &str) -> Result<String, ProviderError> {
        let api_key = self
            .notes
            .api_key
            .as_deref()
            .ok_or(ProviderError::MissingConfig("notes api key"))?;

        let body = json!({
            "model": self.notes.model,
            "temperature": 0.3,
            "messages": [
                { "role": "system", "content": SUMMARY_SYSTEM_PROMPT },
                { "role": "user", "content": transcript_text },
            ],
        });

        let response = self
            .http
            .post(format!("{}/v1/chat/completions", self.notes.base_url))
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        let result: serde_json::Value = response.json().await?;
        let note = result["choices"][0]["message"]["content"]
            .as_str()
            .map(|s| s.trim().to_string())
            .unwrap_or_default();

        if note.is_empty() {
            return Err(ProviderError::Empty);
        }

        Ok(note)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: Url,
    ) -> Result<T, ProviderError> {
        let response = self
            .http
            .get(url)
            .header("xi-api-key", &self.provider.api_key)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response.json().await?)
    }
}

/// Pull the conversation id out of a signed URL path
/// (`.../conversation/:conversation_id`).
fn conversation_id_from_url(signed_url: &str) -> Option<String> {
    let url = Url::parse(signed_url).ok()?;
    let segments: Vec<&str> = url.path_segments()?.collect();
    let idx = segments.iter().position(|s| *s == "conversation")?;
    segments
        .get(idx + 1)
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
}

#[async_trait::async_trait]
impl CredentialBroker for ProviderClient {
    async fn signed_session(
        &self,
        agent_override: Option<&str>,
    ) -> Result<SignedSession, ProviderError> {
        let agent_id = agent_override
            .or(self.provider.agent_id.as_deref())
            .ok_or(ProviderError::MissingConfig("agent id"))?;

        let mut url = Url::parse(&format!(
            "{}/v1/convai/conversation/get_signed_url",
            self.provider.base_url
        ))
        .map_err(|e| ProviderError::Malformed(e.to_string()))?;
        url.query_pairs_mut().append_pair("agent_id", agent_id);

        let data: SignedUrlResponse = self.get_json(url).await?;

        let conversation_id = conversation_id_from_url(&data.signed_url)
            .or(data.conversation_id)
            .unwrap_or_else(|| format!("conv_{}", uuid::Uuid::new_v4().simple()));

        info!(conversation_id = %conversation_id, "obtained signed session url");

        Ok(SignedSession {
            signed_url: data.signed_url,
            conversation_id,
        })
    }
}

#[async_trait::async_trait]
impl TranscriptSource for ProviderClient {
    async fn conversation(&self, id: &str) -> Result<ConversationSnapshot, ProviderError> {
        let url = Url::parse(&format!(
            "{}/v1/convai/conversations/{}",
            self.provider.base_url, id
        ))
        .map_err(|e| ProviderError::Malformed(e.to_string()))?;

        let snapshot: ConversationSnapshot = self.get_json(url).await?;
        debug!(
            conversation_id = %id,
            status = %snapshot.status,
            entries = snapshot.transcript.len(),
            "fetched conversation snapshot"
        );

        Ok(snapshot)
    }
}
