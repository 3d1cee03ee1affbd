//! Structured patient data collected during intake.

use serde::{Deserialize, Serialize};

/// Sentinel stored in every field that has not been collected yet.
///
/// Also used for the call id before the transport assigns one and for the
/// last speaker before any turn has been committed.
pub const UNSET: &str = "NULL";

/// The eight intake fields for one caller.
///
/// Fields are opaque strings: nothing is validated, and a field still holding
/// [`UNSET`] simply means the caller never supplied it. The record is only
/// ever overwritten as a whole (see [`PatientRecord::replace`]). Fields
/// missing from incoming data deserialize as [`UNSET`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatientRecord {
    pub name: String,
    pub dob: String,
    pub insurance: String,
    pub referral: String,
    pub complaint: String,
    pub address: String,
    pub phone: String,
    pub email: String,
}

impl Default for PatientRecord {
    fn default() -> Self {
        Self {
            name: UNSET.to_string(),
            dob: UNSET.to_string(),
            insurance: UNSET.to_string(),
            referral: UNSET.to_string(),
            complaint: UNSET.to_string(),
            address: UNSET.to_string(),
            phone: UNSET.to_string(),
            email: UNSET.to_string(),
        }
    }
}

impl PatientRecord {
    /// Create a record with every field unset
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace every field at once. Last write wins, never a merge.
    pub fn replace(&mut self, next: PatientRecord) {
        *self = next;
    }

    /// Email address to confirm to, if one was collected
    pub fn email_address(&self) -> Option<&str> {
        if self.email == UNSET {
            None
        } else {
            Some(self.email.as_str())
        }
    }

    /// True while no field has been collected
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}
