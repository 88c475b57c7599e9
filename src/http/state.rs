use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::provider::ProviderClient;
use crate::script::ScriptCache;
use crate::session::{ReconcilePolicy, SessionController, SessionDeps};

/// Shared application state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Active interview sessions (interview_id → controller)
    pub sessions: Arc<RwLock<HashMap<String, Arc<SessionController>>>>,

    /// Collaborators handed to each new session controller
    pub deps: SessionDeps,

    /// Durable-transcript polling budget
    pub reconcile: ReconcilePolicy,

    /// Interview script cache
    pub script: Arc<ScriptCache>,

    /// Upstream client for note generation
    pub provider: Arc<ProviderClient>,
}

impl AppState {
    pub fn new(
        deps: SessionDeps,
        reconcile: ReconcilePolicy,
        script: Arc<ScriptCache>,
        provider: Arc<ProviderClient>,
    ) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            deps,
            reconcile,
            script,
            provider,
        }
    }
}
