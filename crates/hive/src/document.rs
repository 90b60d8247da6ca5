use serde::{de, ser::SerializeMap as _, Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::constants::ID_FIELD;

/// Represents a document stored in a collection.
///
/// A document is a flat JSON object made of the system-assigned `_id` and the user
/// fields that survived projection onto the collection schema. On disk `_id` is
/// always written first, followed by the user fields in insertion order.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    /// The unique identifier of the document.
    id:     String,
    /// The user fields of the document.
    fields: Map<String, Value>,
}

impl Document {
    /// Creates a document with a freshly generated identifier.
    pub(crate) fn with_new_id(fields: Map<String, Value>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            fields,
        }
    }

    /// Replaces the identifier with a fresh one.
    pub(crate) fn regenerate_id(&mut self) { self.id = Uuid::new_v4().to_string(); }

    /// Returns the document identifier.
    pub fn id(&self) -> &str { &self.id }

    /// Returns the user fields.
    pub const fn fields(&self) -> &Map<String, Value> { &self.fields }

    /// Returns the value of a field. `_id` resolves to the identifier.
    pub fn get(&self, field: &str) -> Option<Value> {
        if field == ID_FIELD {
            return Some(Value::String(self.id.clone()));
        }
        self.fields.get(field).cloned()
    }

    /// Returns a user field without cloning it.
    pub fn field(&self, field: &str) -> Option<&Value> { self.fields.get(field) }

    /// Returns a copy of this document with `patch` merged over its fields.
    ///
    /// Patch fields win; the identifier never changes.
    pub(crate) fn merged(&self, patch: &Map<String, Value>) -> Self {
        let mut fields = self.fields.clone();
        for (key, value) in patch {
            fields.insert(key.clone(), value.clone());
        }
        Self {
            id: self.id.clone(),
            fields,
        }
    }

    /// Converts the document into a single JSON object including `_id`.
    pub fn to_value(&self) -> Value {
        let mut object = Map::with_capacity(self.fields.len().saturating_add(1));
        object.insert(ID_FIELD.to_owned(), Value::String(self.id.clone()));
        for (key, value) in &self.fields {
            object.insert(key.clone(), value.clone());
        }
        Value::Object(object)
    }
}

impl Serialize for Document {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len().saturating_add(1)))?;
        map.serialize_entry(ID_FIELD, &self.id)?;
        for (key, value) in &self.fields {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Document {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let mut fields = Map::<String, Value>::deserialize(deserializer)?;
        let id = match fields.shift_remove(ID_FIELD) {
            Some(Value::String(id)) => id,
            Some(_) => return Err(de::Error::custom("document `_id` must be a string")),
            None => return Err(de::Error::missing_field("_id")),
        };
        Ok(Self {
            id,
            fields,
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn fields(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected an object"),
        }
    }

    #[test]
    fn test_document_creation_assigns_uuid() {
        let doc = Document::with_new_id(fields(json!({"name": "Ada"})));
        assert!(Uuid::parse_str(doc.id()).is_ok());
        assert_eq!(doc.field("name"), Some(&json!("Ada")));
    }

    #[test]
    fn test_document_get_resolves_id() {
        let doc = Document::with_new_id(fields(json!({"name": "Ada"})));
        assert_eq!(doc.get(ID_FIELD), Some(json!(doc.id())));
        assert_eq!(doc.get("missing"), None);
    }

    #[test]
    fn test_document_serializes_id_first() {
        let doc = Document {
            id:     "abc".to_owned(),
            fields: fields(json!({"name": "Ada", "age": 30})),
        };
        let text = serde_json::to_string(&doc).unwrap();
        assert_eq!(text, r#"{"_id":"abc","name":"Ada","age":30}"#);
    }

    #[test]
    fn test_document_deserialize_requires_string_id() {
        assert!(serde_json::from_value::<Document>(json!({"name": "Ada"})).is_err());
        assert!(serde_json::from_value::<Document>(json!({"_id": 1, "name": "Ada"})).is_err());

        let doc: Document = serde_json::from_value(json!({"_id": "x", "name": "Ada"})).unwrap();
        assert_eq!(doc.id(), "x");
        assert_eq!(doc.fields().len(), 1);
    }

    #[test]
    fn test_document_deserialize_keeps_field_order() {
        let doc: Document = serde_json::from_str(r#"{"_id": "x", "name": "Ada", "age": 30, "active": true}"#).unwrap();
        let keys: Vec<_> = doc.fields().keys().cloned().collect();
        assert_eq!(keys, vec!["name", "age", "active"]);
    }

    #[test]
    fn test_document_merge_keeps_id_and_position() {
        let doc = Document {
            id:     "abc".to_owned(),
            fields: fields(json!({"name": "Cy", "age": 3})),
        };
        let merged = doc.merged(&fields(json!({"name": "Zed"})));
        assert_eq!(merged.id(), "abc");
        assert_eq!(merged.to_value(), json!({"_id": "abc", "name": "Zed", "age": 3}));
        let keys: Vec<_> = merged.fields().keys().cloned().collect();
        assert_eq!(keys, vec!["name", "age"]);
    }
}
