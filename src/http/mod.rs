//! HTTP API server
//!
//! REST surface for driving interviews and reading the script:
//! - POST /interviews/start - create and connect a session
//! - POST /interviews/stop/:id - disconnect and finalize a session
//! - GET  /interviews/:id/status - session state and caption text
//! - GET  /interviews/:id/transcript - current transcript
//! - GET  /interviews/:id/progress - inferred section progress
//! - GET  /script - full interview script
//! - POST /script/section - one section with guidance
//! - POST /script/question - one question by numeric id
//! - POST /notes/summary - generate a summary note from a transcript
//! - GET  /health - health check

mod handlers;
mod routes;
mod state;

pub use routes::create_router;
pub use state::AppState;
