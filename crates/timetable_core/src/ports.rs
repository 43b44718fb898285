//! crates/timetable_core/src/ports.rs
//!
//! Defines the storage contract for the timetable service.
//! Backends (JSON file, PostgreSQL, in-memory) implement `TimetableStore`; the
//! service and auth gate only ever see `Arc<dyn TimetableStore>`.

use async_trait::async_trait;

use crate::domain::{AdminCredentials, BatchCode, TimetableDocument};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all store operations.
/// This abstracts away the specific errors from the backends (IO, database, parsing).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
    /// Some per-record writes succeeded and others did not.
    /// A compare-and-set write found a different value than the caller expected.
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Partial write, failed batches [{}]: {message}", .failed.join(", "))]
    PartialWrite { failed: Vec<String>, message: String },
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Store Port (Trait)
//=========================================================================================

#[async_trait]
pub trait TimetableStore: Send + Sync {
    /// Short backend name for logs.
    fn backend_name(&self) -> &'static str;

    // --- Timetables ---
    async fn list_all(&self) -> PortResult<Vec<TimetableDocument>>;

    /// Returns `PortError::NotFound` when the batch has no document.
    async fn get_by_batch(&self, code: &BatchCode) -> PortResult<TimetableDocument>;

    /// Replaces the stored timetables with `documents`.
    ///
    /// Readers must never observe a half-written state. Backends that write
    /// per record report every failed batch through `PortError::PartialWrite`.
    async fn replace_all(&self, documents: Vec<TimetableDocument>) -> PortResult<()>;

    /// The persisted timetable layout, `{"batches": {CODE: {Monday: [...], ...}}}`.
    async fn raw_snapshot(&self) -> PortResult<serde_json::Value>;

    // --- Admin credentials ---
    async fn get_credentials(&self) -> PortResult<AdminCredentials>;

    /// Sets the password to `new_password` only if it is still `expected_old`.
    ///
    /// The comparison and the write happen as one step inside the backend.
    /// A stored password other than `expected_old` yields `PortError::Conflict`
    /// and leaves the record untouched.
    async fn update_credentials(&self, expected_old: &str, new_password: &str) -> PortResult<()>;

    /// Persists `defaults` unless credentials are already stored.
    async fn seed_credentials(&self, defaults: &AdminCredentials) -> PortResult<()>;
}

/// Builds the `{"batches": {...}}` layout from a set of documents.
pub fn snapshot_of(documents: &[TimetableDocument]) -> PortResult<serde_json::Value> {
    let mut batches = serde_json::Map::new();
    for doc in documents {
        let schedule =
            serde_json::to_value(&doc.schedule).map_err(|e| PortError::Unexpected(e.to_string()))?;
        batches.insert(doc.batch.to_string(), schedule);
    }
    Ok(serde_json::json!({ "batches": batches }))
}
