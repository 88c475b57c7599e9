use thiserror::Error;

use super::message::Message;

/// Session-side failures. All are terminal for the current session; the
/// caller must connect again explicitly, nothing retries on its own.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Audio capture resource could not be acquired.
    #[error("audio capture denied: {0}")]
    PermissionDenied(String),

    /// The signed-URL exchange with the credential broker failed.
    #[error("credential exchange failed: {0}")]
    Credential(String),

    /// Opening or talking to the streaming session failed.
    #[error("transport failure: {0}")]
    Transport(String),

    /// The durable transcript was not ready within the polling budget.
    /// Carries whatever the provider had returned so far; the partial
    /// record is still usable.
    #[error("durable transcript not ready within budget ({} messages collected)", partial.len())]
    TranscriptTimeout { partial: Vec<Message> },
}
