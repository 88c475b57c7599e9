//! Post-disconnect transcript reconciliation.
//!
//! The live event stream can drop or reorder utterances, so once the
//! provider reports the session ended the live transcript is discarded and
//! the durable record is fetched instead. The provider finalizes that
//! record asynchronously; we poll at a fixed interval under a bounded
//! attempt budget, the only timeout safeguard in the system.

use std::time::Duration;

use chrono::Utc;
use tracing::debug;

use super::error::SessionError;
use super::message::{Message, Role};
use crate::provider::{TranscriptEntry, TranscriptSource};

/// Polling budget for the durable transcript fetch.
#[derive(Debug, Clone)]
pub struct ReconcilePolicy {
    /// Delay between status checks.
    pub poll_interval: Duration,
    /// Attempts before giving up and keeping the partial record.
    pub max_attempts: u32,
}

impl Default for ReconcilePolicy {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(500),
            max_attempts: 60,
        }
    }
}

impl ReconcilePolicy {
    /// Worst-case wall time the polling loop can take.
    pub fn budget(&self) -> Duration {
        self.poll_interval * self.max_attempts
    }
}

/// Map durable transcript entries into `Message`s, preserving order.
/// Timestamps are reconstructed from the provider's seconds-into-call
/// offsets, anchored at now.
pub fn normalize_entries(entries: &[TranscriptEntry]) -> Vec<Message> {
    let now = Utc::now();

    entries
        .iter()
        .enumerate()
        .map(|(index, entry)| {
            let offset_ms = (entry.time_in_call_secs.unwrap_or(0.0) * 1000.0) as i64;
            Message {
                id: format!("transcript_{}", index),
                role: Role::from_label(&entry.role),
                content: entry.content().to_string(),
                timestamp: now - chrono::Duration::milliseconds(offset_ms),
            }
        })
        .collect()
}

/// Poll the durable conversation record until the provider reports it
/// done, or the attempt budget runs out.
///
/// Stops at the first "done" status. On exhaustion the most recent
/// partial snapshot is returned inside [`SessionError::TranscriptTimeout`]
/// rather than discarded.
pub async fn fetch_durable_transcript(
    source: &dyn TranscriptSource,
    conversation_id: &str,
    policy: &ReconcilePolicy,
) -> Result<Vec<Message>, SessionError> {
    let mut partial = Vec::new();

    for attempt in 1..=policy.max_attempts {
        let snapshot = source
            .conversation(conversation_id)
            .await
            .map_err(|e| SessionError::Transport(e.to_string()))?;

        partial = normalize_entries(&snapshot.transcript);

        if snapshot.is_done() {
            debug!(
                conversation_id,
                attempt,
                messages = partial.len(),
                "durable transcript ready"
            );
            return Ok(partial);
        }

        debug!(
            conversation_id,
            attempt,
            max_attempts = policy.max_attempts,
            "durable transcript not ready yet"
        );

        if attempt < policy.max_attempts {
            tokio::time::sleep(policy.poll_interval).await;
        }
    }

    Err(SessionError::TranscriptTimeout { partial })
}
