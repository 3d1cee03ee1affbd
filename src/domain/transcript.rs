//! Append-only transcript of one call.
//!
//! Entry order is arrival order and is what reconstructs the dialogue, so the
//! log exposes no way to edit or remove an entry once appended.

use std::fmt;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

/// Who produced a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Speaker {
    /// The caller
    User,

    /// The assistant
    Agent,
}

impl Speaker {
    /// Tag stored in the `from` column of a call record
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Agent => "agent",
        }
    }

    /// Heading used when rendering the transcript
    fn label(&self) -> &'static str {
        match self {
            Self::User => "USER",
            Self::Agent => "AGENT",
        }
    }
}

impl fmt::Display for Speaker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One committed utterance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnEntry {
    /// When the turn was committed, in the office's local time
    pub timestamp: DateTime<Local>,

    /// Who spoke
    pub speaker: Speaker,

    /// What was said
    pub text: String,
}

impl TurnEntry {
    /// Render as `[YYYY-MM-DD HH:MM:SS] USER:\n{text}\n\n`
    pub fn render(&self) -> String {
        format!(
            "[{}] {}:\n{}\n\n",
            self.timestamp.format("%Y-%m-%d %H:%M:%S"),
            self.speaker.label(),
            self.text
        )
    }
}

/// Ordered log of every turn in a call
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TranscriptLog {
    entries: Vec<TurnEntry>,
}

impl TranscriptLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a turn stamped with the current time
    pub fn append(&mut self, speaker: Speaker, text: impl Into<String>) -> &TurnEntry {
        self.append_at(Local::now(), speaker, text)
    }

    /// Append a turn with an explicit timestamp
    pub fn append_at(
        &mut self,
        timestamp: DateTime<Local>,
        speaker: Speaker,
        text: impl Into<String>,
    ) -> &TurnEntry {
        self.entries.push(TurnEntry {
            timestamp,
            speaker,
            text: text.into(),
        });
        // just pushed
        &self.entries[self.entries.len() - 1]
    }

    pub fn entries(&self) -> &[TurnEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn last(&self) -> Option<&TurnEntry> {
        self.entries.last()
    }

    /// Concatenate every entry in order
    pub fn render(&self) -> String {
        self.entries.iter().map(TurnEntry::render).collect()
    }
}
