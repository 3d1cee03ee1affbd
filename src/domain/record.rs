//! The durable row written once per finished call.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::patient::{PatientRecord, UNSET};
use super::transcript::{Speaker, TranscriptLog};

/// A finished call as stored in the record store.
///
/// Field names follow the store schema: `created_at`, `from`, `call_logs`,
/// `call_ID`, `patient_info`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallRecord {
    /// When the record was assembled
    pub created_at: DateTime<Utc>,

    /// Speaker of the last committed turn (`user`, `agent` or the unset sentinel)
    pub from: String,

    /// Concatenated transcript in turn order
    pub call_logs: String,

    /// Transport session identifier
    #[serde(rename = "call_ID")]
    pub call_id: String,

    /// The eight intake fields
    pub patient_info: PatientRecord,
}

impl CallRecord {
    /// Snapshot a call's state into a record
    pub fn snapshot(
        call_id: &str,
        last_speaker: Option<Speaker>,
        transcript: &TranscriptLog,
        patient: &PatientRecord,
    ) -> Self {
        Self {
            created_at: Utc::now(),
            from: last_speaker
                .map(|s| s.as_str().to_string())
                .unwrap_or_else(|| UNSET.to_string()),
            call_logs: transcript.render(),
            call_id: call_id.to_string(),
            patient_info: patient.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_fields() {
        let mut log = TranscriptLog::new();
        log.append(Speaker::User, "thanks, bye");

        let record = CallRecord::snapshot(
            "room-42",
            Some(Speaker::User),
            &log,
            &PatientRecord::new(),
        );

        assert_eq!(record.call_id, "room-42");
        assert_eq!(record.from, "user");
        assert!(record.call_logs.contains("USER:\nthanks, bye"));
        assert!(record.patient_info.is_empty());
    }

    #[test]
    fn test_snapshot_without_turns_uses_sentinel() {
        let record = CallRecord::snapshot(UNSET, None, &TranscriptLog::new(), &PatientRecord::new());
        assert_eq!(record.from, UNSET);
        assert_eq!(record.call_logs, "");
    }

    #[test]
    fn test_serialized_column_names() {
        let record = CallRecord::snapshot("abc", None, &TranscriptLog::new(), &PatientRecord::new());
        let json = serde_json::to_value(&record).unwrap();

        assert_eq!(json["call_ID"], "abc");
        assert_eq!(json["from"], UNSET);
        assert!(json.get("call_id").is_none());
        assert_eq!(json["patient_info"]["email"], UNSET);
    }
}
