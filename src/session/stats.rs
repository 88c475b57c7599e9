use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::message::SessionState;

/// Statistics about an interview session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStats {
    /// Current lifecycle state
    pub state: SessionState,

    /// When the controller was created
    pub started_at: DateTime<Utc>,

    /// Total duration in seconds
    pub duration_secs: f64,

    /// Number of messages in the transcript
    pub message_count: usize,

    /// Provider-issued conversation identifier, once known
    pub conversation_id: Option<String>,

    /// True when the durable transcript could not be confirmed complete
    /// within the polling budget and the partial record was kept
    pub transcript_timed_out: bool,
}
