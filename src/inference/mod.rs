//! Section inference
//!
//! Best-effort, explainable, deterministic inference of which interview
//! section the conversation currently occupies, from nothing but the
//! transcript and the script. No model, no hidden state: a keyword-scoring
//! heuristic over the most recent assistant utterances, recomputed in full
//! on every transcript change.

mod engine;
mod keywords;

pub use engine::{compute_progress, detect_active, detect_completed, extract_categories, Category};
pub use keywords::{derive_keywords, section_synonyms};
