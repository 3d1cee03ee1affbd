//! Events flowing into a call session and directives flowing out of it.

use serde::{Deserialize, Serialize};

use super::patient::PatientRecord;

/// Something the conversation driver observed during a call.
///
/// Events for one call are handled strictly one at a time, in arrival order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum TurnEvent {
    /// The caller finished an utterance
    User { text: String },

    /// The assistant finished speaking
    Agent { text: String },

    /// The language model invoked a tool mid-turn
    Tool { call: ToolCall },
}

impl TurnEvent {
    pub fn user(text: impl Into<String>) -> Self {
        Self::User { text: text.into() }
    }

    pub fn agent(text: impl Into<String>) -> Self {
        Self::Agent { text: text.into() }
    }

    pub fn tool(call: ToolCall) -> Self {
        Self::Tool { call }
    }
}

/// A typed tool invocation.
///
/// Serialized with the tool's registered name in `name` and its parameters in
/// `arguments`, which is the shape function calls arrive in from the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "name", content = "arguments", rename_all = "snake_case")]
pub enum ToolCall {
    /// Save all eight intake fields at once
    RecordPatientInfo(PatientRecord),

    /// Simulated availability lookup
    CheckDoctorAvailability { patient_availability: String },

    /// Simulated booking, ends the call once the agent has spoken
    BookAppointment,

    /// Goodbye phrase detection
    CheckGoodbye { message: String },
}

impl ToolCall {
    /// Registered tool name
    pub fn name(&self) -> &'static str {
        match self {
            Self::RecordPatientInfo(_) => "record_patient_info",
            Self::CheckDoctorAvailability { .. } => "check_doctor_availability",
            Self::BookAppointment => "book_appointment",
            Self::CheckGoodbye { .. } => "check_goodbye",
        }
    }
}

/// An instruction for the conversation driver
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "directive")]
pub enum Directive {
    /// Say this phrase to the caller
    Speak { text: String },

    /// Disconnect the call
    EndCall,
}

impl Directive {
    pub fn speak(text: impl Into<String>) -> Self {
        Self::Speak { text: text.into() }
    }
}

/// Lifecycle of a call session. `Closed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Collecting turns
    #[default]
    Active,

    /// Completion signaled, record not yet written
    Completing,

    /// Record written (or attempted), termination emitted
    Closed,
}

/// Why a call ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndReason {
    /// The caller said goodbye
    Goodbye,

    /// An appointment was booked and the agent has confirmed it
    Booked,
}
