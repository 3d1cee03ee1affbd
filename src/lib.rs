//! intake - Voice-driven medical intake assistant
//!
//! Runs one phone call per session: the assistant greets the caller,
//! collects patient details through tool calls, offers an appointment,
//! emails a confirmation and writes the call record once when the call
//! ends.
//!
//! # Architecture
//!
//! The conversation itself (speech and the language model) is external.
//! It reaches the crate as a stream of turn events:
//! - Caller and assistant turns are appended to the transcript
//! - Tool calls mutate the patient record and the completion flag
//! - The session answers with directives (speak, end the call)
//! - The first terminal transition persists exactly one call record
//!
//! # Modules
//!
//! - `adapters`: Record stores, email notifier and conversation drivers
//! - `core`: Call session state machine, tools, prompts, runner
//! - `domain`: Data structures (PatientRecord, TranscriptLog, CallRecord)
//! - `config`: Office settings and collaborator credentials
//! - `cli`: Command-line interface
//!
//! # Usage
//!
//! ```bash
//! # Replay a scripted call without touching the store
//! intake simulate call.yaml --dry-run
//!
//! # Browse stored calls
//! intake calls --limit 5
//! intake show <call-id>
//! ```

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;

// Re-export main types at crate root for convenience
pub use crate::core::{run_session, CallSession, IntakeToolset, SessionError, ToolOutput};
pub use adapters::{CallHistory, ConversationDriver, Notifier, RecordStore};
pub use domain::{
    CallRecord, Directive, EndReason, PatientRecord, SessionState, Speaker, ToolCall,
    TranscriptLog, TurnEvent,
};
