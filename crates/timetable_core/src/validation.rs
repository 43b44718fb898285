//! crates/timetable_core/src/validation.rs
//!
//! The batch validator: checks batch codes and the structural shape of
//! submitted timetable records before anything reaches a store.

use regex::Regex;
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::sync::LazyLock;

use crate::domain::{BatchCode, ClassEntry, TimetableDocument, WeekSchedule};

static BATCH_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z0-9]+$").expect("batch code pattern is valid"));

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Invalid or missing batch code '{0}'. Example: E16")]
    InvalidBatchCode(String),
    #[error("item {index}: {reason}")]
    MalformedItem { index: usize, reason: String },
    #[error("batch {0} appears more than once")]
    DuplicateBatch(String),
    #[error("Invalid timetable data: {}", join(.0))]
    Rejected(Vec<ValidationError>),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Accepts only non-empty codes made of `A-Z` and `0-9`.
pub fn validate_batch_code(code: &str) -> Result<BatchCode, ValidationError> {
    if BATCH_CODE.is_match(code) {
        Ok(BatchCode::from_validated(code.to_string()))
    } else {
        Err(ValidationError::InvalidBatchCode(code.to_string()))
    }
}

/// Parses one submitted item into a document.
///
/// The item must be an object with a valid `batch` string. Day fields are
/// optional; when present they must be lists of objects. Other keys are ignored.
pub fn parse_document(index: usize, item: Value) -> Result<TimetableDocument, ValidationError> {
    let malformed = |reason: String| ValidationError::MalformedItem { index, reason };

    let Value::Object(mut fields) = item else {
        return Err(malformed("expected a JSON object".to_string()));
    };

    let batch = match fields.remove("batch") {
        Some(Value::String(code)) => {
            validate_batch_code(&code).map_err(|e| malformed(e.to_string()))?
        }
        Some(_) => return Err(malformed("'batch' must be a string".to_string())),
        None => return Err(malformed("missing 'batch' field".to_string())),
    };

    let mut day = |name: &str| take_day(&mut fields, name).map_err(&malformed);
    let schedule = WeekSchedule {
        monday: day("Monday")?,
        tuesday: day("Tuesday")?,
        wednesday: day("Wednesday")?,
        thursday: day("Thursday")?,
        friday: day("Friday")?,
        saturday: day("Saturday")?,
    };

    Ok(TimetableDocument { batch, schedule })
}

fn take_day(fields: &mut Map<String, Value>, name: &str) -> Result<Vec<ClassEntry>, String> {
    match fields.remove(name) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(entries)) => entries
            .into_iter()
            .map(|entry| match entry {
                Value::Object(map) => Ok(map),
                _ => Err(format!("'{name}' must contain only objects")),
            })
            .collect(),
        Some(_) => Err(format!("'{name}' must be a list")),
    }
}

/// Parses a full bulk submission. Any bad item rejects the whole set, and every
/// problem is reported, not just the first.
pub fn parse_documents(items: Vec<Value>) -> Result<Vec<TimetableDocument>, ValidationError> {
    let mut errors = Vec::new();
    let mut seen = HashSet::new();
    let mut documents = Vec::with_capacity(items.len());

    for (index, item) in items.into_iter().enumerate() {
        match parse_document(index, item) {
            Ok(doc) => {
                if !seen.insert(doc.batch.clone()) {
                    errors.push(ValidationError::DuplicateBatch(doc.batch.to_string()));
                    continue;
                }
                documents.push(doc);
            }
            Err(e) => errors.push(e),
        }
    }

    if errors.is_empty() {
        Ok(documents)
    } else {
        Err(ValidationError::Rejected(errors))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn accepts_uppercase_alphanumeric_codes() {
        for code in ["E16", "A", "2024", "CSE3B"] {
            assert_eq!(validate_batch_code(code).unwrap().as_str(), code);
        }
    }

    #[test]
    fn rejects_malformed_codes() {
        for code in ["", "e16", "E-16", "E 16", "E16;", "É16", "../E16"] {
            assert_eq!(
                validate_batch_code(code),
                Err(ValidationError::InvalidBatchCode(code.to_string())),
                "{code:?} should be rejected"
            );
        }
    }

    #[test]
    fn batch_code_deserialization_goes_through_the_validator() {
        assert!(serde_json::from_value::<BatchCode>(json!("E16")).is_ok());
        assert!(serde_json::from_value::<BatchCode>(json!("e16")).is_err());
    }

    #[test]
    fn parse_document_fills_missing_days_with_empty_lists() {
        let doc = parse_document(
            0,
            json!({
                "batch": "E16",
                "Monday": [{ "subject": "Maths", "time": "09:00" }],
                "Sunday": [{ "subject": "ignored" }]
            }),
        )
        .unwrap();

        assert_eq!(doc.batch.as_str(), "E16");
        assert_eq!(doc.schedule.monday.len(), 1);
        assert_eq!(doc.schedule.monday[0]["subject"], "Maths");
        assert!(doc.schedule.tuesday.is_empty());
        assert!(doc.schedule.saturday.is_empty());
    }

    #[test]
    fn parse_document_rejects_bad_shapes() {
        let cases = [
            json!(["E16"]),
            json!({ "Monday": [] }),
            json!({ "batch": 16 }),
            json!({ "batch": "e16" }),
            json!({ "batch": "E16", "Monday": "maths" }),
            json!({ "batch": "E16", "Friday": ["maths"] }),
        ];
        for item in cases {
            let err = parse_document(3, item.clone()).unwrap_err();
            assert!(
                matches!(err, ValidationError::MalformedItem { index: 3, .. }),
                "{item} gave {err:?}"
            );
        }
    }

    #[test]
    fn parse_documents_reports_every_bad_item() {
        let err = parse_documents(vec![
            json!({ "batch": "E16" }),
            json!({ "Monday": [] }),
            json!({ "batch": "E17" }),
            json!({ "batch": "bad" }),
        ])
        .unwrap_err();

        let ValidationError::Rejected(errors) = err else {
            panic!("expected a rejected set");
        };
        assert_eq!(errors.len(), 2);
        assert!(matches!(errors[0], ValidationError::MalformedItem { index: 1, .. }));
        assert!(matches!(errors[1], ValidationError::MalformedItem { index: 3, .. }));
    }

    #[test]
    fn parse_documents_rejects_duplicate_batches() {
        let err = parse_documents(vec![json!({ "batch": "E16" }), json!({ "batch": "E16" })])
            .unwrap_err();
        assert_eq!(
            err,
            ValidationError::Rejected(vec![ValidationError::DuplicateBatch("E16".to_string())])
        );
    }
}
