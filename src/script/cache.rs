use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{info, warn};

use super::model::Script;
use super::ScriptError;

/// Read-through cache for the interview script.
///
/// The script is fetched once and held for the process lifetime; `reset`
/// drops the cached copy so the next read reloads from disk (used by
/// tests and config reloads).
pub struct ScriptCache {
    path: PathBuf,
    cached: RwLock<Option<Arc<Script>>>,
}

impl ScriptCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cached: RwLock::new(None),
        }
    }

    pub async fn get(&self) -> Result<Arc<Script>, ScriptError> {
        {
            let cached = self.cached.read().await;
            if let Some(script) = cached.as_ref() {
                return Ok(Arc::clone(script));
            }
        }

        let mut cached = self.cached.write().await;
        // A concurrent reader may have filled the slot while we waited.
        if let Some(script) = cached.as_ref() {
            return Ok(Arc::clone(script));
        }

        let yaml = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            warn!(path = %self.path.display(), "failed to read interview script: {}", e);
            ScriptError::Unavailable(format!("{}: {}", self.path.display(), e))
        })?;

        let script = Arc::new(Script::parse(&yaml)?);
        info!(
            path = %self.path.display(),
            sections = script.sections.len(),
            questions = script.questions.len(),
            "loaded interview script"
        );

        *cached = Some(Arc::clone(&script));
        Ok(script)
    }

    /// Drop the cached script; the next `get` reloads from disk.
    pub async fn reset(&self) {
        *self.cached.write().await = None;
    }
}
