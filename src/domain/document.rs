//! On-disk document shape of an entry tree.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::domain::error::{DomainError, DomainResult};

/// Serialized form of one entry and its descendants.
///
/// `entries` may be absent when reading and is always written, possibly empty.
/// Unknown keys are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryDocument {
    pub title: String,
    pub entries: Vec<EntryDocument>,
}

impl EntryDocument {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            entries: Vec::new(),
        }
    }

    pub fn with_entries(mut self, entries: Vec<EntryDocument>) -> Self {
        self.entries = entries;
        self
    }

    /// Decode a JSON value, rejecting anything that is not the entry shape.
    pub fn from_value(value: &Value) -> DomainResult<Self> {
        Self::from_value_at(value, "$")
    }

    /// Decode JSON text.
    pub fn parse(content: &str) -> DomainResult<Self> {
        let value: Value = serde_json::from_str(content)
            .map_err(|e| DomainError::malformed(format!("invalid JSON: {}", e)))?;
        Self::from_value(&value)
    }

    fn from_value_at(value: &Value, location: &str) -> DomainResult<Self> {
        let object = value
            .as_object()
            .ok_or_else(|| DomainError::malformed(format!("{}: expected an object", location)))?;

        let title = match object.get("title") {
            Some(Value::String(title)) => title.clone(),
            Some(_) => {
                return Err(DomainError::malformed(format!(
                    "{}.title: expected a string",
                    location
                )))
            }
            None => {
                return Err(DomainError::malformed(format!(
                    "{}: missing key 'title'",
                    location
                )))
            }
        };

        let entries = match object.get("entries") {
            None => Vec::new(),
            Some(Value::Array(items)) => items
                .iter()
                .enumerate()
                .map(|(i, item)| Self::from_value_at(item, &format!("{}.entries[{}]", location, i)))
                .collect::<DomainResult<Vec<_>>>()?,
            Some(_) => {
                return Err(DomainError::malformed(format!(
                    "{}.entries: expected an array",
                    location
                )))
            }
        };

        Ok(Self { title, entries })
    }

    /// Ordered `{ "title", "entries" }` mapping.
    pub fn to_value(&self) -> Value {
        let mut object = Map::new();
        object.insert("title".to_string(), Value::String(self.title.clone()));
        object.insert(
            "entries".to_string(),
            Value::Array(self.entries.iter().map(Self::to_value).collect()),
        );
        Value::Object(object)
    }

    /// Titles in pre-order, parent before children.
    pub fn titles_preorder(&self) -> Vec<String> {
        let mut titles = Vec::new();
        let mut stack = vec![self];
        while let Some(doc) = stack.pop() {
            titles.push(doc.title.clone());
            // Push children in reverse order for left-to-right traversal
            for child in doc.entries.iter().rev() {
                stack.push(child);
            }
        }
        titles
    }
}
