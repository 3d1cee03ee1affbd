//! Scripted conversations.
//!
//! Scripts are YAML and list turns in the order the driver would deliver
//! them, which makes it possible to replay a call without audio or a model:
//!
//! ```yaml
//! call_id: demo-room
//! turns:
//!   - user: "Hi, I need an appointment"
//!   - agent: "Sure, what's your name?"
//!   - tool: check_doctor_availability
//!     arguments:
//!       patient_availability: "Tuesday 3pm"
//! ```

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::{ToolCall, TurnEvent};

/// A complete conversation script
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Script {
    /// Transport id to assign to the session
    #[serde(default)]
    pub call_id: Option<String>,

    /// Turns in delivery order
    pub turns: Vec<ScriptTurn>,
}

/// One scripted turn
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScriptTurn {
    User {
        user: String,
    },
    Agent {
        agent: String,
    },
    Tool {
        tool: String,
        #[serde(default)]
        arguments: Value,
    },
}

impl Script {
    /// Load a script from a YAML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read script file: {}", path.display()))?;

        Self::from_yaml(&content)
    }

    /// Parse a script from YAML content
    pub fn from_yaml(content: &str) -> Result<Self> {
        serde_yaml::from_str(content).context("Failed to parse conversation script YAML")
    }

    /// Turn every step into a session event, validating tool calls up front
    pub fn events(&self) -> Result<Vec<TurnEvent>> {
        self.turns
            .iter()
            .enumerate()
            .map(|(i, turn)| match turn {
                ScriptTurn::User { user } => Ok(TurnEvent::user(user.clone())),
                ScriptTurn::Agent { agent } => Ok(TurnEvent::agent(agent.clone())),
                ScriptTurn::Tool { tool, arguments } => {
                    ToolCall::from_invocation(tool, arguments.clone())
                        .map(TurnEvent::tool)
                        .with_context(|| format!("Turn {} has an invalid tool call", i))
                }
            })
            .collect()
    }
}
