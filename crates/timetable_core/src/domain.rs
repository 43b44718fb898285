//! crates/timetable_core/src/domain.rs
//!
//! Defines the core data structures for the timetable service.
//! Class entries are opaque JSON objects, so the schedule types carry serde
//! derives; nothing here knows how or where documents are persisted.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::validation::{validate_batch_code, ValidationError};

/// A single class in a day's schedule (subject, time, room, ...).
/// The core never looks inside it.
pub type ClassEntry = serde_json::Map<String, serde_json::Value>;

/// A validated batch code such as `E16`. Only uppercase ASCII letters and digits.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BatchCode(String);

impl BatchCode {
    /// Validates `code` and wraps it.
    pub fn parse(code: &str) -> Result<Self, ValidationError> {
        validate_batch_code(code)
    }

    // Callers must have checked the format already.
    pub(crate) fn from_validated(code: String) -> Self {
        Self(code)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for BatchCode {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        validate_batch_code(&value)
    }
}

impl From<BatchCode> for String {
    fn from(code: BatchCode) -> Self {
        code.0
    }
}

impl AsRef<str> for BatchCode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BatchCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The weekly schedule of one batch. A missing day is the same as an empty one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WeekSchedule {
    #[serde(rename = "Monday", default)]
    pub monday: Vec<ClassEntry>,
    #[serde(rename = "Tuesday", default)]
    pub tuesday: Vec<ClassEntry>,
    #[serde(rename = "Wednesday", default)]
    pub wednesday: Vec<ClassEntry>,
    #[serde(rename = "Thursday", default)]
    pub thursday: Vec<ClassEntry>,
    #[serde(rename = "Friday", default)]
    pub friday: Vec<ClassEntry>,
    #[serde(rename = "Saturday", default)]
    pub saturday: Vec<ClassEntry>,
}

impl WeekSchedule {
    /// Day names as they appear in stored and submitted documents.
    pub const DAYS: [&'static str; 6] = [
        "Monday",
        "Tuesday",
        "Wednesday",
        "Thursday",
        "Friday",
        "Saturday",
    ];

    /// Number of class entries across the whole week.
    pub fn class_count(&self) -> usize {
        self.monday.len()
            + self.tuesday.len()
            + self.wednesday.len()
            + self.thursday.len()
            + self.friday.len()
            + self.saturday.len()
    }
}

/// One batch's timetable. `batch` is unique across the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimetableDocument {
    pub batch: BatchCode,
    #[serde(flatten)]
    pub schedule: WeekSchedule,
}

// Represents the single admin account. The token is a pre-provisioned secret,
// independent of the password.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminCredentials {
    pub username: String,
    pub password: String,
    pub token: String,
}

impl fmt::Debug for AdminCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdminCredentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("token", &"<redacted>")
            .finish()
    }
}
