//! Adapter interfaces for external systems.
//!
//! The call session only talks to the outside world through these traits:
//! a record store for finished calls, a notifier for confirmation emails and
//! the conversation driver that speaks and hangs up.

pub mod console;
pub mod email;
pub mod memory;
pub mod sqlite;
pub mod supabase;

use anyhow::Result;
use async_trait::async_trait;

use crate::core::ToolOutput;
use crate::domain::{CallRecord, PatientRecord};

// Re-export the concrete adapters
pub use console::ConsoleDriver;
pub use email::{Confirmation, SmtpNotifier};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use supabase::SupabaseStore;

/// Durable storage for finished calls
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Human-readable backend name
    fn name(&self) -> &str;

    /// Insert one finished call
    async fn insert_call_record(&self, record: &CallRecord) -> Result<()>;
}

/// Read access to stored calls, newest first
#[async_trait]
pub trait CallHistory: Send + Sync {
    /// Most recent records, newest first
    async fn recent(&self, limit: usize) -> Result<Vec<CallRecord>>;

    /// Look up one call by its transport id
    async fn find(&self, call_id: &str) -> Result<Option<CallRecord>>;
}

/// Sends appointment confirmations
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Send a confirmation for `patient` to `to_address`
    async fn send_confirmation(&self, to_address: &str, patient: &PatientRecord) -> Result<()>;
}

/// The voice side of a call: speech synthesis and the transport
#[async_trait]
pub trait ConversationDriver: Send + Sync {
    /// Speak a phrase to the caller
    async fn speak(&self, text: &str) -> Result<()>;

    /// Disconnect the call
    async fn end_call(&self) -> Result<()>;

    /// Hand a tool result back to the language model
    async fn tool_result(&self, _output: &ToolOutput) -> Result<()> {
        Ok(())
    }
}
