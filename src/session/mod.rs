//! Interview session management
//!
//! This module provides the `SessionController` abstraction that manages:
//! - Exactly-once connect/disconnect against the streaming transport
//! - Audio capture acquisition and release on every exit path
//! - Live transcript assembly from transport events
//! - Post-disconnect reconciliation against the provider's durable record
//! - Session state and statistics

mod controller;
mod error;
mod message;
mod reconcile;
mod stats;

pub use controller::{SessionController, SessionDeps};
pub use error::SessionError;
pub use message::{Message, Role, SessionState};
pub use reconcile::{fetch_durable_transcript, normalize_entries, ReconcilePolicy};
pub use stats::SessionStats;
