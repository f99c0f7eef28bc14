use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use uuid::Uuid;

/// Keys owned by the server; clients can never set or change them.
pub const PROTECTED_KEYS: [&str; 2] = ["id", "createdAt"];

/// A stored item: server-assigned identity plus arbitrary client fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct Item {
    pub id: String,
    #[serde(rename = "createdAt")]
    pub created_at: String,
    #[serde(flatten)]
    pub fields: Map<String, JsonValue>,
}

impl Item {
    /// Build a new item with a fresh id and creation timestamp.
    ///
    /// Any `id`/`createdAt` keys in `fields` are dropped so the server values win.
    pub fn new(fields: Map<String, JsonValue>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            created_at: now_iso8601(),
            fields: strip_protected(fields),
        }
    }

    /// Apply update assignments, replacing each top-level field wholesale.
    pub fn apply(&mut self, assignments: &[Assignment]) {
        for assignment in assignments {
            self.fields
                .insert(assignment.field.clone(), assignment.value.clone());
        }
    }

    /// Decode a stored JSON document back into an item
    pub fn from_document(document: &str) -> serde_json::Result<Self> {
        serde_json::from_str(document)
    }

    pub fn to_document(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// One top-level field replacement of an update.
///
/// Stores apply `field` and `value` directly. `placeholder` only labels the
/// assignment in the logged update expression, so client keys never appear
/// in log lines.
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub placeholder: String,
    pub field: String,
    pub value: JsonValue,
}

impl Assignment {
    /// Build assignments for every updatable key, in body insertion order
    pub fn from_body(body: Map<String, JsonValue>) -> Vec<Assignment> {
        strip_protected(body)
            .into_iter()
            .enumerate()
            .map(|(index, (field, value))| Assignment {
                placeholder: format!("f{}", index),
                field,
                value,
            })
            .collect()
    }

    /// Log label for this assignment, e.g. `#f0 = :f0`
    pub fn clause(&self) -> String {
        format!("#{0} = :{0}", self.placeholder)
    }
}

/// Update expression for debug logs only, e.g. `SET #f0 = :f0, #f1 = :f1`
pub fn update_expression(assignments: &[Assignment]) -> String {
    let clauses: Vec<String> = assignments.iter().map(Assignment::clause).collect();
    format!("SET {}", clauses.join(", "))
}

fn strip_protected(mut fields: Map<String, JsonValue>) -> Map<String, JsonValue> {
    for key in PROTECTED_KEYS {
        fields.shift_remove(key);
    }
    fields
}

/// Current time as an RFC 3339 UTC timestamp with millisecond precision
pub fn now_iso8601() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Response body for operations returning a single item
#[derive(Serialize, Deserialize, utoipa::ToSchema)]
pub struct ItemResponse {
    pub ok: bool,
    pub item: Item,
}

/// Response body for the list operation
#[derive(Serialize, Deserialize, utoipa::ToSchema)]
pub struct ListResponse {
    pub ok: bool,
    pub count: usize,
    pub items: Vec<Item>,
}

/// Response body for the health probe
#[derive(Serialize, Deserialize, utoipa::ToSchema)]
pub struct HealthResponse {
    pub ok: bool,
    pub table: String,
    pub time: String,
}
