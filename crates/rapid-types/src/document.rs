//! The nested document model.
//!
//! Documents arrive as decoded JSON objects of arbitrary depth. Instead of
//! inspecting untyped JSON at runtime, every field value is one of three
//! explicit variants: a [`Scalar`], a nested [`Document`], or a sequence of
//! nested documents. Both the write decomposer and the tree reconstructor
//! match on [`Value`] directly.

use std::collections::btree_map::{self, BTreeMap};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number};

use crate::error::DocumentError;
use crate::path::StorePath;

/// Reserved field carrying a document's canonical path.
pub const PATH_FIELD: &str = "path";

/// A leaf value that can be stored directly in a row.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "serde_json::Value", into = "serde_json::Value")]
pub enum Scalar {
    Null,
    Bool(bool),
    Number(Number),
    String(String),
}

impl Scalar {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Number(_) => "number",
            Self::String(_) => "string",
        }
    }
}

impl TryFrom<serde_json::Value> for Scalar {
    type Error = DocumentError;

    fn try_from(value: serde_json::Value) -> Result<Self, Self::Error> {
        match value {
            serde_json::Value::Null => Ok(Self::Null),
            serde_json::Value::Bool(b) => Ok(Self::Bool(b)),
            serde_json::Value::Number(n) => Ok(Self::Number(n)),
            serde_json::Value::String(s) => Ok(Self::String(s)),
            other => Err(DocumentError::NotAScalar(json_type_name(&other))),
        }
    }
}

impl From<Scalar> for serde_json::Value {
    fn from(scalar: Scalar) -> Self {
        match scalar {
            Scalar::Null => Self::Null,
            Scalar::Bool(b) => Self::Bool(b),
            Scalar::Number(n) => Self::Number(n),
            Scalar::String(s) => Self::String(s),
        }
    }
}

impl From<&str> for Scalar {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for Scalar {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<bool> for Scalar {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for Scalar {
    fn from(n: i64) -> Self {
        Self::Number(n.into())
    }
}

impl From<u64> for Scalar {
    fn from(n: u64) -> Self {
        Self::Number(n.into())
    }
}

/// A document field value.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "serde_json::Value", into = "serde_json::Value")]
pub enum Value {
    Scalar(Scalar),
    Object(Document),
    Sequence(Vec<Document>),
}

impl Value {
    fn from_json_field(field: &str, json: serde_json::Value) -> Result<Self, DocumentError> {
        match json {
            serde_json::Value::Object(map) => Ok(Self::Object(Document::try_from(map)?)),
            serde_json::Value::Array(items) => {
                let mut docs = Vec::with_capacity(items.len());
                for (index, item) in items.into_iter().enumerate() {
                    match item {
                        serde_json::Value::Object(map) => docs.push(Document::try_from(map)?),
                        _ => {
                            return Err(DocumentError::NonObjectElement {
                                field: field.to_string(),
                                index,
                            })
                        }
                    }
                }
                Ok(Self::Sequence(docs))
            }
            scalar => Ok(Self::Scalar(Scalar::try_from(scalar)?)),
        }
    }

    pub fn as_scalar(&self) -> Option<&Scalar> {
        match self {
            Self::Scalar(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Document> {
        match self {
            Self::Object(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&[Document]> {
        match self {
            Self::Sequence(s) => Some(s),
            _ => None,
        }
    }
}

impl TryFrom<serde_json::Value> for Value {
    type Error = DocumentError;

    fn try_from(value: serde_json::Value) -> Result<Self, Self::Error> {
        Self::from_json_field("", value)
    }
}

impl From<Value> for serde_json::Value {
    fn from(value: Value) -> Self {
        match value {
            Value::Scalar(s) => s.into(),
            Value::Object(d) => Self::Object(d.into()),
            Value::Sequence(docs) => {
                Self::Array(docs.into_iter().map(|d| Self::Object(d.into())).collect())
            }
        }
    }
}

impl From<Scalar> for Value {
    fn from(s: Scalar) -> Self {
        Self::Scalar(s)
    }
}

impl From<Document> for Value {
    fn from(d: Document) -> Self {
        Self::Object(d)
    }
}

impl From<Vec<Document>> for Value {
    fn from(docs: Vec<Document>) -> Self {
        Self::Sequence(docs)
    }
}

/// A string-keyed mapping of field names to values.
///
/// Field names are unique per document. Iteration order is the field name
/// order, which keeps decomposition deterministic.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(
    try_from = "Map<String, serde_json::Value>",
    into = "Map<String, serde_json::Value>"
)]
pub struct Document(BTreeMap<String, Value>);

impl Document {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Convert an untyped JSON value, which must be an object.
    pub fn from_json(json: serde_json::Value) -> Result<Self, DocumentError> {
        match json {
            serde_json::Value::Object(map) => Self::try_from(map),
            other => Err(DocumentError::NotAnObject(json_type_name(&other))),
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Object(self.clone().into())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn contains_key(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(field.into(), value.into())
    }

    pub fn remove(&mut self, field: &str) -> Option<Value> {
        self.0.remove(field)
    }

    pub fn entry(&mut self, field: impl Into<String>) -> btree_map::Entry<'_, String, Value> {
        self.0.entry(field.into())
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, Value> {
        self.0.iter()
    }

    /// The string held in the reserved `path` field, if any.
    pub fn path(&self) -> Option<&str> {
        self.get(PATH_FIELD)
            .and_then(Value::as_scalar)
            .and_then(Scalar::as_str)
    }

    pub fn set_path(&mut self, path: &StorePath) {
        self.insert(PATH_FIELD, Scalar::String(path.to_string()));
    }
}

impl TryFrom<Map<String, serde_json::Value>> for Document {
    type Error = DocumentError;

    fn try_from(map: Map<String, serde_json::Value>) -> Result<Self, Self::Error> {
        let mut fields = BTreeMap::new();
        for (field, json) in map {
            let value = Value::from_json_field(&field, json)?;
            fields.insert(field, value);
        }
        Ok(Self(fields))
    }
}

impl From<Document> for Map<String, serde_json::Value> {
    fn from(doc: Document) -> Self {
        doc.0.into_iter().map(|(k, v)| (k, v.into())).collect()
    }
}

impl IntoIterator for Document {
    type Item = (String, Value);
    type IntoIter = btree_map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a Document {
    type Item = (&'a String, &'a Value);
    type IntoIter = btree_map::Iter<'a, String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl FromIterator<(String, Value)> for Document {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

fn json_type_name(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn classify_field_values() {
        let doc = Document::from_json(json!({
            "name": "alice",
            "age": 31,
            "active": true,
            "nick": null,
            "address": { "city": "Oslo" },
            "orders": [ { "total": 3 }, { "total": 4 } ],
        }))
        .unwrap();

        assert_eq!(doc.len(), 6);
        assert_eq!(doc.get("name"), Some(&Value::Scalar("alice".into())));
        assert_eq!(doc.get("nick"), Some(&Value::Scalar(Scalar::Null)));
        assert!(doc.get("address").unwrap().as_object().is_some());
        assert_eq!(doc.get("orders").unwrap().as_sequence().unwrap().len(), 2);
    }

    #[test]
    fn reject_non_object_top_level() {
        assert_eq!(
            Document::from_json(json!([1, 2])),
            Err(DocumentError::NotAnObject("array"))
        );
        assert_eq!(
            Document::from_json(json!("x")),
            Err(DocumentError::NotAnObject("string"))
        );
    }

    #[test]
    fn reject_scalar_sequence_elements() {
        let err = Document::from_json(json!({ "tags": [ {"a": 1}, "b" ] })).unwrap_err();
        assert_eq!(
            err,
            DocumentError::NonObjectElement {
                field: "tags".into(),
                index: 1
            }
        );
    }

    #[test]
    fn nested_errors_propagate() {
        let err = Document::from_json(json!({ "a": { "b": [ 1 ] } })).unwrap_err();
        assert!(matches!(err, DocumentError::NonObjectElement { field, .. } if field == "b"));
    }

    #[test]
    fn path_field_accessors() {
        let mut doc = Document::new();
        assert_eq!(doc.path(), None);
        doc.set_path(&StorePath::parse("/users/1").unwrap());
        assert_eq!(doc.path(), Some("/users/1"));

        doc.insert(PATH_FIELD, Scalar::from(7u64));
        assert_eq!(doc.path(), None);
    }

    #[test]
    fn serde_matches_plain_json() {
        let source = json!({
            "a": 1.5,
            "b": { "c": "d" },
            "e": [ { "f": false } ],
        });
        let doc: Document = serde_json::from_value(source.clone()).unwrap();
        assert_eq!(serde_json::to_value(&doc).unwrap(), source);
        assert_eq!(doc.to_json(), source);
    }

    #[test]
    fn empty_sequence_is_kept() {
        let doc = Document::from_json(json!({ "items": [] })).unwrap();
        assert_eq!(doc.get("items"), Some(&Value::Sequence(vec![])));
    }
}
