//! Domain types for the intake assistant.
//!
//! This module contains the core data structures:
//! - PatientRecord: The eight intake fields
//! - TranscriptLog: Ordered turns of one call
//! - CallRecord: The row persisted when a call finishes
//! - Events: Turn events in, directives out

pub mod events;
pub mod patient;
pub mod record;
pub mod transcript;

// Re-export commonly used types
pub use events::{Directive, EndReason, SessionState, ToolCall, TurnEvent};
pub use patient::{PatientRecord, UNSET};
pub use record::CallRecord;
pub use transcript::{Speaker, TranscriptLog, TurnEntry};
