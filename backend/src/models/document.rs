//! Document-store value types shared by the repository and HTTP layers.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A stored document: a JSON object with its id under [`ID_FIELD`].
pub type Document = Map<String, Value>;

/// Field-equality filter. Every key must match exactly; `_id` matches the id.
pub type Filter = Map<String, Value>;

/// Field holding the document id.
pub const ID_FIELD: &str = "_id";

/// Collections used by the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Collection {
    Users,
    TrainingSchedules,
    Exercises,
    Clubs,
    Weights,
}

impl Collection {
    pub const ALL: [Collection; 5] = [
        Collection::Users,
        Collection::TrainingSchedules,
        Collection::Exercises,
        Collection::Clubs,
        Collection::Weights,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Users => "users",
            Collection::TrainingSchedules => "training-schedules",
            Collection::Exercises => "exercises",
            Collection::Clubs => "clubs",
            Collection::Weights => "weights",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Collection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Collection::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| format!("Unknown collection: {}", s))
    }
}

/// Opaque document identifier (UUID v4 text for new documents).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(pub String);

impl DocumentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Read the id stored in a document, if any.
    pub fn of(document: &Document) -> Option<Self> {
        match document.get(ID_FIELD)? {
            Value::String(s) => Some(Self(s.clone())),
            Value::Number(n) => Some(Self(n.to_string())),
            _ => None,
        }
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DocumentId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    pub field: String,
    pub order: SortOrder,
}

/// Options for [`find`](crate::db::repository::DocumentRepository::find).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FindOptions {
    pub sort: Option<SortSpec>,
}

impl FindOptions {
    pub fn sorted_by(field: impl Into<String>, order: SortOrder) -> Self {
        Self {
            sort: Some(SortSpec {
                field: field.into(),
                order,
            }),
        }
    }
}

/// True when every entry of `filter` is present and equal in `document`.
pub fn matches_filter(document: &Document, filter: &Filter) -> bool {
    filter
        .iter()
        .all(|(key, expected)| document.get(key) == Some(expected))
}

/// Shallow `$set` of `update` onto `document`. The id field is never replaced.
pub fn apply_update(document: &mut Document, update: &Document) {
    for (key, value) in update {
        if key != ID_FIELD {
            document.insert(key.clone(), value.clone());
        }
    }
}

/// Ordering used when sorting documents by a field.
///
/// Missing and null sort first, then numbers, strings, objects, arrays and
/// booleans.
pub fn compare_field(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    fn rank(value: Option<&Value>) -> u8 {
        match value {
            None | Some(Value::Null) => 0,
            Some(Value::Number(_)) => 1,
            Some(Value::String(_)) => 2,
            Some(Value::Object(_)) => 3,
            Some(Value::Array(_)) => 4,
            Some(Value::Bool(_)) => 5,
        }
    }

    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            let (x, y) = (x.as_f64().unwrap_or(0.0), y.as_f64().unwrap_or(0.0));
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        _ => rank(a).cmp(&rank(b)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_collection_names_round_trip() {
        for collection in Collection::ALL {
            assert_eq!(collection.as_str().parse::<Collection>(), Ok(collection));
        }
        assert!("trainers".parse::<Collection>().is_err());
    }

    #[test]
    fn test_matches_filter() {
        let document = doc(json!({"_id": "a", "trainerId": "t1", "name": "Bench"}));
        assert!(matches_filter(&document, &doc(json!({"trainerId": "t1"}))));
        assert!(matches_filter(&document, &Filter::new()));
        assert!(!matches_filter(&document, &doc(json!({"trainerId": "t2"}))));
        assert!(!matches_filter(&document, &doc(json!({"clubId": "c1"}))));
    }

    #[test]
    fn test_apply_update_keeps_id() {
        let mut document = doc(json!({"_id": "a", "name": "old", "weight": 80}));
        apply_update(&mut document, &doc(json!({"_id": "b", "name": "new"})));
        assert_eq!(document, doc(json!({"_id": "a", "name": "new", "weight": 80})));
    }

    #[test]
    fn test_compare_field_orders_mixed_values() {
        let (one, two) = (json!(1), json!(2.5));
        let (early, late) = (json!("2024-01-01"), json!("2024-02-01"));
        assert_eq!(compare_field(Some(&one), Some(&two)), Ordering::Less);
        assert_eq!(compare_field(Some(&late), Some(&early)), Ordering::Greater);
        assert_eq!(compare_field(None, Some(&one)), Ordering::Less);
        assert_eq!(compare_field(Some(&two), Some(&early)), Ordering::Less);
    }

    #[test]
    fn test_document_id_of() {
        assert_eq!(
            DocumentId::of(&doc(json!({"_id": "abc"}))),
            Some(DocumentId::new("abc"))
        );
        assert_eq!(DocumentId::of(&doc(json!({"name": "x"}))), None);
        assert_ne!(DocumentId::generate(), DocumentId::generate());
    }
}
