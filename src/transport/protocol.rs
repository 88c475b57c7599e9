//! Wire types for the provider's conversational WebSocket protocol.

use serde::{Deserialize, Serialize};

/// Messages received from the provider over the socket.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    /// Sent once the provider considers the conversation live.
    ConversationInitiationMetadata {
        #[serde(default)]
        conversation_initiation_metadata_event: Option<InitiationMetadata>,
    },
    /// Agent utterance.
    AgentResponse {
        agent_response_event: AgentResponseEvent,
    },
    /// Caller utterance as transcribed by the provider.
    UserTranscript {
        user_transcription_event: UserTranscriptionEvent,
    },
    /// Application-level keepalive; must be answered with a pong.
    Ping { ping_event: PingEvent },
    /// Anything this service does not consume (audio, VAD scores, ...).
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
pub struct InitiationMetadata {
    #[serde(default)]
    pub conversation_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AgentResponseEvent {
    pub agent_response: String,
}

#[derive(Debug, Deserialize)]
pub struct UserTranscriptionEvent {
    pub user_transcript: String,
}

#[derive(Debug, Deserialize)]
pub struct PingEvent {
    pub event_id: u64,
}

/// Messages sent to the provider over the socket.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientEvent {
    Pong { event_id: u64 },
}

/// Audio upload frame. Not tagged like [`ClientEvent`]: the provider
/// expects a bare `{"user_audio_chunk": "<base64 pcm>"}` object.
#[derive(Debug, Serialize)]
pub struct UserAudioChunk {
    pub user_audio_chunk: String,
}
