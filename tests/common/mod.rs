// Shared test doubles for the session controller's collaborators.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Mutex};

use voice_interview::audio::{AudioCapture, AudioFrame, CaptureError, CaptureGrant};
use voice_interview::provider::{
    ConversationSnapshot, CredentialBroker, ProviderError, SignedSession, TranscriptEntry,
    TranscriptSource,
};
use voice_interview::session::{ReconcilePolicy, SessionDeps};
use voice_interview::transport::{
    ConversationTransport, OpenSession, SessionHandle, TransportError, TransportEvent,
};

pub struct MockCapture {
    pub deny: bool,
    pub grants: Mutex<Vec<Arc<CaptureGrant>>>,
}

impl MockCapture {
    pub fn new() -> Self {
        Self {
            deny: false,
            grants: Mutex::new(Vec::new()),
        }
    }

    pub fn denying() -> Self {
        Self {
            deny: true,
            grants: Mutex::new(Vec::new()),
        }
    }

    pub async fn grant_count(&self) -> usize {
        self.grants.lock().await.len()
    }

    pub async fn grant(&self, index: usize) -> Arc<CaptureGrant> {
        self.grants.lock().await[index].clone()
    }
}

#[async_trait::async_trait]
impl AudioCapture for MockCapture {
    async fn acquire(&self) -> Result<Arc<CaptureGrant>, CaptureError> {
        if self.deny {
            return Err(CaptureError::Unavailable("denied by test".to_string()));
        }
        let (_tx, rx) = mpsc::channel::<AudioFrame>(1);
        let (grant, _stop) = CaptureGrant::new(rx);
        let grant = Arc::new(grant);
        self.grants.lock().await.push(Arc::clone(&grant));
        Ok(grant)
    }

    fn name(&self) -> &str {
        "mock"
    }
}

pub struct MockBroker {
    pub fail: bool,
    pub calls: AtomicUsize,
}

impl MockBroker {
    pub fn new() -> Self {
        Self {
            fail: false,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait::async_trait]
impl CredentialBroker for MockBroker {
    async fn signed_session(
        &self,
        _agent_override: Option<&str>,
    ) -> Result<SignedSession, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(ProviderError::MissingConfig("agent id"));
        }
        Ok(SignedSession {
            signed_url: "wss://mock.test/v1/convai/conversation/conv_test".to_string(),
            conversation_id: "conv_test".to_string(),
        })
    }
}

pub struct MockTransport {
    pub fail: bool,
    /// When set, `end` succeeds but never produces a disconnected event.
    pub silent_end: bool,
    pub opens: AtomicUsize,
    events: Mutex<Option<mpsc::Sender<TransportEvent>>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self {
            fail: false,
            silent_end: false,
            opens: AtomicUsize::new(0),
            events: Mutex::new(None),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new()
        }
    }

    pub fn silent_end() -> Self {
        Self {
            silent_end: true,
            ..Self::new()
        }
    }

    pub fn open_count(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    /// Event sender for the most recently opened session.
    pub async fn sender(&self) -> mpsc::Sender<TransportEvent> {
        self.events
            .lock()
            .await
            .clone()
            .expect("no session opened yet")
    }
}

#[async_trait::async_trait]
impl ConversationTransport for MockTransport {
    async fn open(
        &self,
        _signed_url: &str,
        _audio: mpsc::Receiver<AudioFrame>,
    ) -> Result<OpenSession, TransportError> {
        if self.fail {
            return Err(TransportError::Connect("refused by test".to_string()));
        }
        self.opens.fetch_add(1, Ordering::SeqCst);

        let (tx, rx) = mpsc::channel(16);
        tx.send(TransportEvent::Connected).await.ok();
        *self.events.lock().await = Some(tx.clone());

        Ok(OpenSession {
            events: rx,
            handle: Box::new(MockHandle {
                events: tx,
                silent: self.silent_end,
            }),
        })
    }
}

struct MockHandle {
    events: mpsc::Sender<TransportEvent>,
    silent: bool,
}

#[async_trait::async_trait]
impl SessionHandle for MockHandle {
    async fn end(&self) -> Result<(), TransportError> {
        if self.silent {
            return Ok(());
        }
        self.events
            .send(TransportEvent::Disconnected)
            .await
            .map_err(|_| TransportError::Closed)
    }
}

/// Serves a scripted sequence of snapshots; the last one repeats.
pub struct MockTranscripts {
    snapshots: Mutex<Vec<ConversationSnapshot>>,
    pub calls: AtomicUsize,
}

impl MockTranscripts {
    pub fn new(snapshots: Vec<ConversationSnapshot>) -> Self {
        Self {
            snapshots: Mutex::new(snapshots),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl TranscriptSource for MockTranscripts {
    async fn conversation(&self, _id: &str) -> Result<ConversationSnapshot, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut snapshots = self.snapshots.lock().await;
        if snapshots.len() > 1 {
            Ok(snapshots.remove(0))
        } else {
            snapshots
                .first()
                .cloned()
                .ok_or(ProviderError::Request("no snapshot scripted".to_string()))
        }
    }
}

pub fn entry(role: &str, text: &str, time_in_call_secs: f64) -> TranscriptEntry {
    TranscriptEntry {
        role: role.to_string(),
        message: Some(text.to_string()),
        text: None,
        time_in_call_secs: Some(time_in_call_secs),
    }
}

pub fn snapshot(status: &str, transcript: Vec<TranscriptEntry>) -> ConversationSnapshot {
    ConversationSnapshot {
        status: status.to_string(),
        transcript,
    }
}

pub fn deps(
    capture: Arc<MockCapture>,
    broker: Arc<MockBroker>,
    transport: Arc<MockTransport>,
    transcripts: Arc<MockTranscripts>,
) -> SessionDeps {
    SessionDeps {
        capture,
        broker,
        transport,
        transcripts,
    }
}

/// Tight polling budget so reconciliation tests finish quickly.
pub fn fast_policy(max_attempts: u32) -> ReconcilePolicy {
    ReconcilePolicy {
        poll_interval: Duration::from_millis(1),
        max_attempts,
    }
}

/// Poll until `check` passes or a short deadline expires.
pub async fn wait_until<F, Fut>(mut check: F)
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    loop {
        if check().await {
            return;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "condition not reached in time"
        );
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}
