//! Schema-free entity records.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One entity instance: an ordered map from field name to scalar value.
///
/// Field order is insertion order (`serde_json` is built with
/// `preserve_order`), which the CSV codec relies on for header order.
pub type Record = serde_json::Map<String, Value>;

/// The entity collections a snapshot must carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Cars,
    Customers,
    Bookings,
}

impl EntityKind {
    /// Every kind, in snapshot order.
    pub const ALL: [EntityKind; 3] = [Self::Cars, Self::Customers, Self::Bookings];

    /// Key used in the snapshot document and in exported file names.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cars => "cars",
            Self::Customers => "customers",
            Self::Bookings => "bookings",
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for EntityKind {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cars" => Ok(Self::Cars),
            "customers" => Ok(Self::Customers),
            "bookings" => Ok(Self::Bookings),
            _ => Err(format!("Unknown entity kind: {}", s)),
        }
    }
}

/// Render a field value as CSV cell text.
///
/// Strings are taken verbatim, `null` becomes empty, and nested values
/// fall back to their JSON text.
pub fn stringify(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}
