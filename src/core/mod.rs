//! Core intake logic.
//!
//! This module contains:
//! - Tools: The intake capability set and its registration table
//! - Session: The per-call state machine
//! - Runner: Event loop feeding a session from the driver
//! - Script: YAML conversation scripts for replaying calls
//! - Prompts: Fixed phrases and model instructions

pub mod prompts;
pub mod runner;
pub mod script;
pub mod session;
pub mod tools;

// Re-export commonly used types
pub use runner::run_session;
pub use script::{Script, ScriptTurn};
pub use session::{CallSession, SessionError, TurnOutcome};
pub use tools::{tool_specs, IntakeToolset, ToolError, ToolOutput, ToolSpec, DEFAULT_GOODBYE_PHRASES};
