//! Interview script
//!
//! The script is a read-only YAML asset: ordered sections, each with its
//! questions. It is loaded at most once per process through
//! [`ScriptCache`], a read-through cache with an explicit reset hook.

mod cache;
mod guidance;
mod model;

use thiserror::Error;

pub use cache::ScriptCache;
pub use guidance::section_guidance;
pub use model::{Question, Script, ScriptMetadata, Section};

#[derive(Debug, Error)]
pub enum ScriptError {
    /// The script asset could not be read or parsed. Consumers degrade to
    /// an empty state rather than failing.
    #[error("interview script unavailable: {0}")]
    Unavailable(String),

    #[error("section '{name}' not found (available: {})", available.join(", "))]
    SectionNotFound {
        name: String,
        available: Vec<String>,
    },

    #[error("question {0} not found")]
    QuestionNotFound(u32),
}
