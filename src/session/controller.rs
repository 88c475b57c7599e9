use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{mpsc, Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use super::error::SessionError;
use super::message::{Message, Role, SessionState};
use super::reconcile::{fetch_durable_transcript, ReconcilePolicy};
use super::stats::SessionStats;
use crate::audio::{AudioCapture, CaptureGrant};
use crate::provider::{CredentialBroker, TranscriptSource};
use crate::transport::{ConversationTransport, SessionHandle, TransportEvent};

/// Collaborators the controller drives. All behind traits so tests can
/// substitute scripted fakes.
#[derive(Clone)]
pub struct SessionDeps {
    pub capture: Arc<dyn AudioCapture>,
    pub broker: Arc<dyn CredentialBroker>,
    pub transport: Arc<dyn ConversationTransport>,
    pub transcripts: Arc<dyn TranscriptSource>,
}

/// State shared between the controller and its dispatch task.
struct Shared {
    state: RwLock<SessionState>,
    /// Set before any suspension point in connect; makes a second connect
    /// a no-op while the first is in flight.
    is_connecting: AtomicBool,
    /// True only after the provider's own connected event.
    has_connected: AtomicBool,
    /// Intent flag: set unconditionally by disconnect so a deferred
    /// teardown at disposal knows to run.
    should_disconnect: AtomicBool,
    conversation_id: RwLock<Option<String>>,
    /// Latest assistant utterance, for live captioning. Replaced on each
    /// assistant message, never cleared until superseded.
    current_text: RwLock<String>,
    messages: RwLock<Vec<Message>>,
    /// Set when the durable transcript budget ran out and only the
    /// partial record was kept; callers must be able to tell that record
    /// apart from a confirmed-complete one.
    transcript_timed_out: AtomicBool,
    grant: Mutex<Option<Arc<CaptureGrant>>>,
    handle: Mutex<Option<Box<dyn SessionHandle>>>,
}

impl Shared {
    async fn release_grant(&self) {
        let grant = self.grant.lock().await.take();
        if let Some(grant) = grant {
            grant.release();
        }
    }
}

/// Owns the lifecycle of exactly one real-time conversational session:
/// audio acquisition, credential exchange, the streaming transport, live
/// transcript assembly, and exactly-once teardown however it is triggered.
pub struct SessionController {
    interview_id: String,
    deps: SessionDeps,
    policy: ReconcilePolicy,
    started_at: chrono::DateTime<Utc>,
    shared: Arc<Shared>,
    dispatch_task: Mutex<Option<JoinHandle<()>>>,
    disposed: AtomicBool,
}

impl SessionController {
    pub fn new(interview_id: impl Into<String>, deps: SessionDeps, policy: ReconcilePolicy) -> Self {
        Self {
            interview_id: interview_id.into(),
            deps,
            policy,
            started_at: Utc::now(),
            shared: Arc::new(Shared {
                state: RwLock::new(SessionState::Idle),
                is_connecting: AtomicBool::new(false),
                has_connected: AtomicBool::new(false),
                should_disconnect: AtomicBool::new(false),
                conversation_id: RwLock::new(None),
                current_text: RwLock::new(String::new()),
                messages: RwLock::new(Vec::new()),
                transcript_timed_out: AtomicBool::new(false),
                grant: Mutex::new(None),
                handle: Mutex::new(None),
            }),
            dispatch_task: Mutex::new(None),
            disposed: AtomicBool::new(false),
        }
    }

    pub fn interview_id(&self) -> &str {
        &self.interview_id
    }

    /// Connect once. Re-entrant calls while connecting or connected are
    /// no-ops; the guard flag is taken before the first suspension point.
    ///
    /// Failure at any step releases the audio grant, enters the error
    /// state, and is not retried.
    pub async fn connect(&self, agent_override: Option<&str>) -> Result<(), SessionError> {
        if *self.shared.state.read().await == SessionState::Connected {
            return Ok(());
        }
        if self
            .shared
            .is_connecting
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Ok(());
        }

        info!(interview_id = %self.interview_id, "connecting session");
        self.shared
            .transcript_timed_out
            .store(false, Ordering::SeqCst);
        *self.shared.state.write().await = SessionState::Connecting;

        // (a) local audio capture
        let grant = match self.deps.capture.acquire().await {
            Ok(grant) => grant,
            Err(e) => {
                error!(interview_id = %self.interview_id, "audio capture denied: {}", e);
                self.fail().await;
                return Err(SessionError::PermissionDenied(e.to_string()));
            }
        };
        *self.shared.grant.lock().await = Some(grant.clone());

        // (b) signed connection credential; the provider secret stays
        // server-side in the broker.
        let creds = match self.deps.broker.signed_session(agent_override).await {
            Ok(creds) => creds,
            Err(e) => {
                error!(interview_id = %self.interview_id, "credential exchange failed: {}", e);
                self.shared.release_grant().await;
                self.fail().await;
                return Err(SessionError::Credential(e.to_string()));
            }
        };

        // (c) open the streaming session
        let frames = match grant.take_frames() {
            Some(frames) => frames,
            None => {
                self.shared.release_grant().await;
                self.fail().await;
                return Err(SessionError::Transport(
                    "capture grant had no frame stream".to_string(),
                ));
            }
        };
        let opened = match self.deps.transport.open(&creds.signed_url, frames).await {
            Ok(opened) => opened,
            Err(e) => {
                error!(interview_id = %self.interview_id, "failed to open transport: {}", e);
                self.shared.release_grant().await;
                self.fail().await;
                return Err(SessionError::Transport(e.to_string()));
            }
        };

        info!(
            interview_id = %self.interview_id,
            conversation_id = %creds.conversation_id,
            "streaming session opened"
        );

        *self.shared.conversation_id.write().await = Some(creds.conversation_id);
        *self.shared.handle.lock().await = Some(opened.handle);

        // The connected state is entered from the provider's own event,
        // inside the dispatch loop, not here.
        let task = tokio::spawn(Self::dispatch(
            Arc::clone(&self.shared),
            Arc::clone(&self.deps.transcripts),
            self.policy.clone(),
            self.interview_id.clone(),
            opened.events,
        ));
        *self.dispatch_task.lock().await = Some(task);

        Ok(())
    }

    /// Disconnect. Idempotent in any state: always records the intent
    /// flag and releases local resources; asks the transport to end only
    /// if the session actually connected. A failing end call does not
    /// skip cleanup.
    pub async fn disconnect(&self) {
        self.shared.should_disconnect.store(true, Ordering::SeqCst);

        if self.shared.has_connected.load(Ordering::SeqCst) {
            let handle = self.shared.handle.lock().await.take();
            if let Some(handle) = handle {
                if let Err(e) = handle.end().await {
                    warn!(interview_id = %self.interview_id, "transport end failed: {}", e);
                }
            }
        }

        self.shared.release_grant().await;
        self.shared.has_connected.store(false, Ordering::SeqCst);
        *self.shared.state.write().await = SessionState::Idle;
    }

    /// Teardown on disposal, exactly once. Runs the full disconnect only
    /// if the intent flag was ever set; a transient create-and-drop with
    /// no user action releases local resources without any network call.
    ///
    /// When a real disconnect ran, this also waits (bounded by the
    /// reconciliation budget) for the dispatch task so the final
    /// transcript lands before the controller is discarded.
    pub async fn dispose(&self) {
        if self.disposed.swap(true, Ordering::SeqCst) {
            return;
        }

        let intended = self.shared.should_disconnect.load(Ordering::SeqCst);
        if intended {
            self.disconnect().await;
        } else {
            self.shared.release_grant().await;
        }

        let task = self.dispatch_task.lock().await.take();
        if let Some(task) = task {
            if intended {
                let grace = self.policy.budget() + Duration::from_secs(5);
                let abort = task.abort_handle();
                if tokio::time::timeout(grace, task).await.is_err() {
                    warn!(interview_id = %self.interview_id, "dispatch task outlived disposal, aborting");
                    abort.abort();
                }
            } else {
                task.abort();
            }
        }
    }

    async fn fail(&self) {
        *self.shared.state.write().await = SessionState::Error;
        self.shared.is_connecting.store(false, Ordering::SeqCst);
    }

    /// Single consumer of the typed transport event channel, processing
    /// events strictly in arrival order.
    async fn dispatch(
        shared: Arc<Shared>,
        transcripts: Arc<dyn TranscriptSource>,
        policy: ReconcilePolicy,
        interview_id: String,
        mut events: mpsc::Receiver<TransportEvent>,
    ) {
        while let Some(event) = events.recv().await {
            match event {
                TransportEvent::Connected => {
                    info!(interview_id = %interview_id, "session connected");
                    shared.has_connected.store(true, Ordering::SeqCst);
                    shared.is_connecting.store(false, Ordering::SeqCst);
                    *shared.state.write().await = SessionState::Connected;
                }
                TransportEvent::Message { source, text } => {
                    let role = Role::from_label(&source);
                    if role == Role::Assistant {
                        *shared.current_text.write().await = text.clone();
                    }
                    shared.messages.write().await.push(Message::live(role, text));
                }
                TransportEvent::Error(message) => {
                    warn!(interview_id = %interview_id, "session error: {}", message);
                    *shared.state.write().await = SessionState::Error;
                    shared.has_connected.store(false, Ordering::SeqCst);
                    shared.is_connecting.store(false, Ordering::SeqCst);
                    shared.release_grant().await;
                }
                TransportEvent::Disconnected => {
                    info!(interview_id = %interview_id, "session disconnected");
                    *shared.state.write().await = SessionState::Idle;
                    shared.has_connected.store(false, Ordering::SeqCst);
                    shared.is_connecting.store(false, Ordering::SeqCst);
                    shared.release_grant().await;

                    Self::reconcile(&shared, transcripts.as_ref(), &policy, &interview_id).await;
                    break;
                }
            }
        }

        // Covers the channel closing without a disconnected event: the
        // transport is gone, release locally.
        shared.release_grant().await;
    }

    /// Replace the live-assembled transcript with the provider's durable
    /// record. The live stream served responsiveness during the call; the
    /// durable record wins afterwards.
    async fn reconcile(
        shared: &Shared,
        transcripts: &dyn TranscriptSource,
        policy: &ReconcilePolicy,
        interview_id: &str,
    ) {
        let conversation_id = shared.conversation_id.read().await.clone();
        let Some(conversation_id) = conversation_id else {
            warn!(interview_id, "no conversation id, clearing transcript");
            shared.messages.write().await.clear();
            return;
        };

        match fetch_durable_transcript(transcripts, &conversation_id, policy).await {
            Ok(durable) => {
                info!(
                    interview_id,
                    messages = durable.len(),
                    "transcript reconciled from durable record"
                );
                *shared.messages.write().await = durable;
            }
            Err(SessionError::TranscriptTimeout { partial }) => {
                warn!(
                    interview_id,
                    messages = partial.len(),
                    "durable transcript timed out, keeping partial record"
                );
                shared.transcript_timed_out.store(true, Ordering::SeqCst);
                *shared.messages.write().await = partial;
            }
            Err(e) => {
                warn!(interview_id, "durable transcript fetch failed: {}", e);
                shared.messages.write().await.clear();
            }
        }
    }

    pub async fn state(&self) -> SessionState {
        *self.shared.state.read().await
    }

    pub async fn conversation_id(&self) -> Option<String> {
        self.shared.conversation_id.read().await.clone()
    }

    /// Latest assistant utterance for live captioning.
    pub async fn current_text(&self) -> String {
        self.shared.current_text.read().await.clone()
    }

    pub async fn messages(&self) -> Vec<Message> {
        self.shared.messages.read().await.clone()
    }

    /// True when reconciliation exhausted its budget and the transcript
    /// is the last partial snapshot, not a confirmed-complete record.
    pub fn transcript_timed_out(&self) -> bool {
        self.shared.transcript_timed_out.load(Ordering::SeqCst)
    }

    pub async fn stats(&self) -> SessionStats {
        let duration = Utc::now().signed_duration_since(self.started_at);
        SessionStats {
            state: self.state().await,
            started_at: self.started_at,
            duration_secs: duration.num_milliseconds() as f64 / 1000.0,
            message_count: self.shared.messages.read().await.len(),
            conversation_id: self.conversation_id().await,
            transcript_timed_out: self.transcript_timed_out(),
        }
    }
}
