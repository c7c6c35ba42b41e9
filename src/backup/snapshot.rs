//! Versioned backup snapshots: serialization, structural validation, and
//! restore reports.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::record::{EntityKind, Record};
use crate::error::BackupError;

/// Schema version stamped on every new snapshot.
pub const SCHEMA_VERSION: &str = "1.0";

/// Versions `restore` accepts.
pub const SUPPORTED_VERSIONS: &[&str] = &[SCHEMA_VERSION];

/// A timestamped capture of every entity collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub cars: Vec<Record>,
    pub customers: Vec<Record>,
    pub bookings: Vec<Record>,
    /// RFC 3339 creation time.
    pub timestamp: String,
    pub version: String,
}

impl Snapshot {
    /// Assemble a snapshot stamped with `at` and the current schema version.
    pub fn new(
        cars: Vec<Record>,
        customers: Vec<Record>,
        bookings: Vec<Record>,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            cars,
            customers,
            bookings,
            timestamp: at.to_rfc3339_opts(SecondsFormat::Millis, true),
            version: SCHEMA_VERSION.to_string(),
        }
    }

    /// Records of one entity kind.
    pub fn records(&self, kind: EntityKind) -> &[Record] {
        match kind {
            EntityKind::Cars => &self.cars,
            EntityKind::Customers => &self.customers,
            EntityKind::Bookings => &self.bookings,
        }
    }

    /// Number of records of one entity kind.
    pub fn count(&self, kind: EntityKind) -> usize {
        self.records(kind).len()
    }
}

/// Human-readable restore summary, e.g. `"1 cars, 0 customers, 0 bookings restored."`.
pub fn restore_summary(cars: usize, customers: usize, bookings: usize) -> String {
    format!(
        "{} cars, {} customers, {} bookings restored.",
        cars, customers, bookings
    )
}

/// Pretty-printed JSON text of a snapshot.
pub fn serialize(snapshot: &Snapshot) -> Result<String, BackupError> {
    serde_json::to_string_pretty(snapshot).map_err(|e| BackupError::MalformedInput(e.to_string()))
}

/// Parse backup text into a candidate document without checking its shape.
pub fn parse(text: &str) -> Result<Value, BackupError> {
    serde_json::from_str(text).map_err(|e| BackupError::MalformedInput(e.to_string()))
}

/// Parse backup text into a [`Snapshot`]. Inverse of [`serialize`].
pub fn deserialize(text: &str) -> Result<Snapshot, BackupError> {
    let candidate = parse(text)?;
    if !validate_structure(&candidate) {
        return Err(BackupError::StructuralValidationFailed);
    }
    serde_json::from_value(candidate).map_err(|e| BackupError::MalformedInput(e.to_string()))
}

/// True iff the candidate has array-typed `cars`, `customers` and `bookings`
/// and string-typed `timestamp` and `version`. Record contents are not
/// inspected.
pub fn validate_structure(candidate: &Value) -> bool {
    let Some(obj) = candidate.as_object() else {
        return false;
    };
    EntityKind::ALL
        .iter()
        .all(|kind| obj.get(kind.as_str()).is_some_and(Value::is_array))
        && obj.get("timestamp").is_some_and(Value::is_string)
        && obj.get("version").is_some_and(Value::is_string)
}

/// Outcome of a restore attempt, suitable for direct display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestoreReport {
    pub success: bool,
    pub message: String,
}

impl RestoreReport {
    pub fn succeeded(summary: String) -> Self {
        Self {
            success: true,
            message: summary,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}
