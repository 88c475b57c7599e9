pub mod audio;
pub mod config;
pub mod http;
pub mod inference;
pub mod provider;
pub mod script;
pub mod session;
pub mod transport;

pub use audio::{
    AudioCapture, AudioCaptureConfig, AudioCaptureFactory, AudioFrame, AudioSource, CaptureGrant,
    FileCapture,
};
pub use config::Config;
pub use http::{create_router, AppState};
pub use inference::{compute_progress, Category};
pub use provider::{
    ConversationSnapshot, CredentialBroker, ProviderClient, SignedSession, TranscriptEntry,
    TranscriptSource,
};
pub use script::{Script, ScriptCache, Section};
pub use session::{
    Message, ReconcilePolicy, Role, SessionController, SessionDeps, SessionError, SessionState,
    SessionStats,
};
pub use transport::{ConversationTransport, OpenSession, SessionHandle, TransportEvent};
