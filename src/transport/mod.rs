//! Streaming conversational transport
//!
//! The session controller consumes a single channel of typed
//! [`TransportEvent`]s instead of registering ad hoc callbacks; the one
//! dispatch loop on the consuming side keeps ordering and teardown easy to
//! reason about. The production implementation speaks the provider's
//! WebSocket protocol; tests substitute their own [`ConversationTransport`].

pub mod protocol;
mod ws;

use thiserror::Error;
use tokio::sync::mpsc;

use crate::audio::AudioFrame;

pub use ws::RealtimeTransport;

/// Events emitted by an open streaming session, in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// The provider completed its side of the handshake.
    Connected,
    /// One utterance. `source` is the provider's speaker label, unmapped.
    Message { source: String, text: String },
    /// Stream-level failure; terminal for the session.
    Error(String),
    /// The provider reported the session ended.
    Disconnected,
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("failed to open streaming session: {0}")]
    Connect(String),

    #[error("streaming session already closed")]
    Closed,
}

/// An opened streaming session: the event stream plus a handle to end it.
pub struct OpenSession {
    pub events: mpsc::Receiver<TransportEvent>,
    pub handle: Box<dyn SessionHandle>,
}

/// Handle to ask the transport to end the session. Ending may fail; the
/// caller must still run its own cleanup.
#[async_trait::async_trait]
pub trait SessionHandle: Send + Sync {
    async fn end(&self) -> Result<(), TransportError>;
}

/// Opens streaming sessions against the conversational provider.
#[async_trait::async_trait]
pub trait ConversationTransport: Send + Sync {
    /// Open a session using a short-lived signed URL, feeding it captured
    /// audio. Success means the stream is established, not that the
    /// provider considers the session live; wait for
    /// [`TransportEvent::Connected`].
    async fn open(
        &self,
        signed_url: &str,
        audio: mpsc::Receiver<AudioFrame>,
    ) -> Result<OpenSession, TransportError>;
}
