//! Upstream record representation.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{AppError, Result};

/// A single upstream resource.
///
/// Kept as the raw JSON object so unknown fields survive a round trip
/// through the cache untouched. The only field the proxy insists on is
/// `url`, the record's identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Map<String, Value>", into = "Map<String, Value>")]
pub struct Record {
    fields: Map<String, Value>,
}

impl Record {
    /// Build a record from an arbitrary JSON value.
    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Object(fields) => Self::try_from(fields),
            other => Err(AppError::InvalidRecord(format!(
                "expected a JSON object, got {}",
                kind_of(&other)
            ))),
        }
    }

    /// Canonical URL of the record.
    pub fn url(&self) -> &str {
        // Presence is checked on construction.
        self.fields.get("url").and_then(Value::as_str).unwrap_or_default()
    }

    /// Display name; films carry a `title` instead of a `name`.
    pub fn name(&self) -> Option<&str> {
        self.fields
            .get("name")
            .or_else(|| self.fields.get("title"))
            .and_then(Value::as_str)
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// URLs listed under a reference field, in upstream order.
    ///
    /// Returns `None` when the field is absent or is not a list. Non-string
    /// elements make the whole field unusable as a reference list.
    pub fn references(&self, field: &str) -> Option<Vec<&str>> {
        let items = self.fields.get(field)?.as_array()?;
        items.iter().map(Value::as_str).collect()
    }

    /// Reference fields present on this record among the given candidates.
    pub fn reference_fields<'a>(&self, candidates: &'a [String]) -> Vec<&'a str> {
        candidates
            .iter()
            .map(String::as_str)
            .filter(|field| self.references(field).is_some())
            .collect()
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.fields)
    }
}

impl TryFrom<Map<String, Value>> for Record {
    type Error = AppError;

    fn try_from(fields: Map<String, Value>) -> Result<Self> {
        match fields.get("url").and_then(Value::as_str) {
            Some(url) if !url.trim().is_empty() => Ok(Self { fields }),
            _ => Err(AppError::InvalidRecord(
                "record has no string `url` field".to_string(),
            )),
        }
    }
}

impl From<Record> for Map<String, Value> {
    fn from(record: Record) -> Self {
        record.fields
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_requires_url() {
        assert!(Record::from_value(json!({ "name": "Luke" })).is_err());
        assert!(Record::from_value(json!({ "name": "Luke", "url": "" })).is_err());
        assert!(Record::from_value(json!(["not", "an", "object"])).is_err());
    }

    #[test]
    fn test_name_falls_back_to_title() {
        let film = Record::from_value(json!({
            "title": "A New Hope",
            "url": "https://swapi.dev/api/films/1/"
        }))
        .unwrap();
        assert_eq!(film.name(), Some("A New Hope"));
    }

    #[test]
    fn test_references_preserve_order() {
        let record = Record::from_value(json!({
            "name": "Luke",
            "url": "/people/1/",
            "films": ["/films/3/", "/films/1/", "/films/2/"],
            "height": "172"
        }))
        .unwrap();

        assert_eq!(
            record.references("films"),
            Some(vec!["/films/3/", "/films/1/", "/films/2/"])
        );
        assert_eq!(record.references("height"), None);
        assert_eq!(record.references("vehicles"), None);
    }

    #[test]
    fn test_reference_fields_filters_candidates() {
        let record = Record::from_value(json!({
            "name": "Tatooine",
            "url": "/planets/1/",
            "residents": [],
            "films": ["/films/1/"]
        }))
        .unwrap();
        let candidates = vec![
            "films".to_string(),
            "residents".to_string(),
            "pilots".to_string(),
        ];
        assert_eq!(record.reference_fields(&candidates), vec!["films", "residents"]);
    }

    #[test]
    fn test_serde_round_trip_keeps_unknown_fields() {
        let raw = json!({ "name": "R2-D2", "url": "/people/3/", "mass": "32" });
        let record: Record = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(serde_json::to_value(&record).unwrap(), raw);
    }
}
