//! Intake tools callable by the conversation model.
//!
//! Tools are registered through an explicit table ([`tool_specs`]) and
//! dispatched by matching on [`ToolCall`]; there is no runtime reflection.
//! The toolset owns the call's [`PatientRecord`] and its completion flag.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{error, info, warn};

use crate::adapters::Notifier;
use crate::config::Office;
use crate::domain::{PatientRecord, ToolCall};

use super::prompts;

/// Phrases that end a call when they occur anywhere in a user utterance
pub const DEFAULT_GOODBYE_PHRASES: &[&str] = &[
    "goodbye",
    "bye",
    "thank you bye",
    "thanks bye",
    "have a good day",
    "see you",
    "take care",
    "end call",
    "hang up",
];

/// Errors turning a model function call into a [`ToolCall`]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ToolError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Invalid arguments for '{tool}': {message}")]
    InvalidArguments { tool: String, message: String },
}

/// Registration entry for one tool
#[derive(Debug, Clone, Serialize)]
pub struct ToolSpec {
    pub name: &'static str,
    pub description: &'static str,
    /// JSON Schema of the arguments object
    pub parameters: Value,
}

/// Result handed back to the model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ToolOutput {
    Text(String),
    Flag(bool),
}

impl ToolOutput {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Flag(_) => None,
        }
    }
}

/// The tool table registered with the conversation driver
pub fn tool_specs() -> Vec<ToolSpec> {
    let field = |description: &str| json!({ "type": "string", "description": description });

    vec![
        ToolSpec {
            name: "record_patient_info",
            description: "Call this as soon as the patient gives their name. Saves all patient intake information at once.",
            parameters: json!({
                "type": "object",
                "properties": {
                    "name": field("The name of the patient"),
                    "dob": field("The date of birth of the patient"),
                    "insurance": field("The insurance of the patient"),
                    "referral": field("The referral of the patient"),
                    "complaint": field("The complaint of the patient"),
                    "address": field("The address of the patient"),
                    "phone": field("The phone number of the patient"),
                    "email": field("The email of the patient"),
                },
                "required": ["name", "dob", "insurance", "referral", "complaint", "address", "phone", "email"],
            }),
        },
        ToolSpec {
            name: "check_doctor_availability",
            description: "Check whether the doctor is available at the patient's requested time.",
            parameters: json!({
                "type": "object",
                "properties": {
                    "patient_availability": field("Patient availability day and time"),
                },
                "required": ["patient_availability"],
            }),
        },
        ToolSpec {
            name: "book_appointment",
            description: "Book the appointment once the patient confirms.",
            parameters: json!({ "type": "object", "properties": {} }),
        },
        ToolSpec {
            name: "check_goodbye",
            description: "Check if the message contains a goodbye phrase.",
            parameters: json!({
                "type": "object",
                "properties": { "message": field("The caller's message") },
                "required": ["message"],
            }),
        },
    ]
}

impl ToolCall {
    /// Parse a model function call by tool name and JSON arguments
    pub fn from_invocation(name: &str, arguments: Value) -> Result<Self, ToolError> {
        if !tool_specs().iter().any(|spec| spec.name == name) {
            return Err(ToolError::UnknownTool(name.to_string()));
        }

        // Argument-less tools may arrive with `{}` or `null`
        let envelope = match arguments {
            Value::Null => json!({ "name": name }),
            Value::Object(ref map) if map.is_empty() && name == "book_appointment" => {
                json!({ "name": name })
            }
            other => json!({ "name": name, "arguments": other }),
        };

        serde_json::from_value(envelope).map_err(|e| ToolError::InvalidArguments {
            tool: name.to_string(),
            message: e.to_string(),
        })
    }
}

/// The intake capability set for one call
pub struct IntakeToolset {
    office: Office,
    goodbye_phrases: Vec<String>,
    notifier: Option<Arc<dyn Notifier>>,
    patient: PatientRecord,
    call_complete: bool,
}

impl IntakeToolset {
    /// Create a toolset with the default goodbye phrases
    pub fn new(office: Office, notifier: Option<Arc<dyn Notifier>>) -> Self {
        Self {
            office,
            goodbye_phrases: DEFAULT_GOODBYE_PHRASES.iter().map(|p| p.to_string()).collect(),
            notifier,
            patient: PatientRecord::new(),
            call_complete: false,
        }
    }

    /// Replace the goodbye phrase list. Phrases are trimmed and lower-cased;
    /// blank ones would match every utterance and are dropped.
    pub fn with_goodbye_phrases(mut self, phrases: Vec<String>) -> Self {
        self.goodbye_phrases = phrases
            .into_iter()
            .map(|p| p.trim().to_lowercase())
            .filter(|p| !p.is_empty())
            .collect();
        self
    }

    pub fn office(&self) -> &Office {
        &self.office
    }

    pub fn patient(&self) -> &PatientRecord {
        &self.patient
    }

    /// Whether the call should end once the current turn finishes
    pub fn is_call_complete(&self) -> bool {
        self.call_complete
    }

    /// Set the completion flag. It never resets.
    pub fn mark_complete(&mut self) {
        self.call_complete = true;
    }

    /// Dispatch one tool call
    pub async fn invoke(&mut self, call: ToolCall) -> ToolOutput {
        match call {
            ToolCall::RecordPatientInfo(info) => ToolOutput::Text(self.record_patient_info(info)),
            ToolCall::CheckDoctorAvailability {
                patient_availability,
            } => ToolOutput::Text(self.check_availability(&patient_availability)),
            ToolCall::BookAppointment => ToolOutput::Text(self.book_appointment().await),
            ToolCall::CheckGoodbye { message } => ToolOutput::Flag(self.is_goodbye(&message)),
        }
    }

    /// Save every intake field at once, replacing whatever was there
    pub fn record_patient_info(&mut self, info: PatientRecord) -> String {
        self.patient.replace(info);
        info!(name = %self.patient.name, "Patient info recorded");
        prompts::RECORDED.to_string()
    }

    /// Simulated lookup: the doctor is always available
    pub fn check_availability(&self, requested_time: &str) -> String {
        info!(requested_time, "Checking doctor availability");
        prompts::availability(&self.office)
    }

    /// Simulated booking.
    ///
    /// Sends a confirmation when an email was collected. A failed send is
    /// logged and ignored; the call is marked complete either way.
    pub async fn book_appointment(&mut self) -> String {
        match (self.patient.email_address(), &self.notifier) {
            (Some(to), Some(notifier)) => {
                match notifier.send_confirmation(to, &self.patient).await {
                    Ok(()) => info!(to, "Confirmation email sent"),
                    Err(e) => error!(to, error = %e, "Failed to send confirmation email"),
                }
            }
            (Some(to), None) => warn!(to, "No notifier configured, confirmation not sent"),
            (None, _) => info!("No email on record, skipping confirmation"),
        }

        self.mark_complete();
        prompts::booked(&self.office)
    }

    /// Case-insensitive substring match against the goodbye phrases.
    ///
    /// No word-boundary check, so "I don't want to say bye yet" matches.
    pub fn is_goodbye(&self, utterance: &str) -> bool {
        let normalized = utterance.trim().to_lowercase();
        self.goodbye_phrases
            .iter()
            .any(|phrase| normalized.contains(phrase.as_str()))
    }
}
