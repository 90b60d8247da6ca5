//! Declarative field schemas for collections.
//!
//! A [`Schema`] is an ordered list of `(field name, FieldSpec)` pairs. The order is
//! the declaration order and is significant: required-field validation reports the
//! first missing field in this order. Schemas serialize as a JSON object, for example
//!
//! ```json
//! {
//!   "name": { "type": "string", "required": true },
//!   "age": { "type": "number" }
//! }
//! ```

use serde::{de, ser::SerializeMap as _, Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::{constants::ID_FIELD, HiveError, Result};

/// The primitive kind a field holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    /// A JSON string.
    String,
    /// A JSON number.
    Number,
    /// A JSON boolean.
    Boolean,
}

impl FieldKind {
    /// Returns the lowercase type name used in error messages and on disk.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Boolean => "boolean",
        }
    }

    /// Returns true if `value` has exactly this kind. There is no coercion.
    pub fn accepts(self, value: &Value) -> bool {
        matches!(
            (self, value),
            (Self::String, Value::String(_)) | (Self::Number, Value::Number(_)) | (Self::Boolean, Value::Bool(_))
        )
    }
}

/// Declaration of a single field.
///
/// Each variant carries the shared `required` flag, which defaults to `false` when
/// absent from the serialized form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum FieldSpec {
    /// A string field.
    String {
        #[serde(default)]
        required: bool,
    },
    /// A number field.
    Number {
        #[serde(default)]
        required: bool,
    },
    /// A boolean field.
    Boolean {
        #[serde(default)]
        required: bool,
    },
}

impl FieldSpec {
    /// An optional string field.
    pub const fn string() -> Self {
        Self::String {
            required: false,
        }
    }

    /// An optional number field.
    pub const fn number() -> Self {
        Self::Number {
            required: false,
        }
    }

    /// An optional boolean field.
    pub const fn boolean() -> Self {
        Self::Boolean {
            required: false,
        }
    }

    /// Returns the same field marked as required.
    #[must_use]
    pub const fn required(self) -> Self {
        match self {
            Self::String {
                ..
            } => {
                Self::String {
                    required: true,
                }
            },
            Self::Number {
                ..
            } => {
                Self::Number {
                    required: true,
                }
            },
            Self::Boolean {
                ..
            } => {
                Self::Boolean {
                    required: true,
                }
            },
        }
    }

    /// Returns the field's kind.
    pub const fn kind(&self) -> FieldKind {
        match *self {
            Self::String {
                ..
            } => FieldKind::String,
            Self::Number {
                ..
            } => FieldKind::Number,
            Self::Boolean {
                ..
            } => FieldKind::Boolean,
        }
    }

    /// Returns true if the field must be present on create.
    pub const fn is_required(&self) -> bool {
        match *self {
            Self::String {
                required,
            } |
            Self::Number {
                required,
            } |
            Self::Boolean {
                required,
            } => required,
        }
    }
}

/// The ordered field declarations of a collection.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Schema {
    /// Fields in declaration order.
    fields: Vec<(String, FieldSpec)>,
}

impl Schema {
    /// Creates an empty schema. Documents of an empty schema only carry `_id`.
    pub const fn new() -> Self {
        Self {
            fields: Vec::new(),
        }
    }

    /// Builds a schema from `(name, spec)` pairs, checking every field name.
    ///
    /// # Errors
    ///
    /// Returns [`HiveError::InvalidSchema`] if a name is empty, duplicated, equal to
    /// `_id`, or contains a path separator or control character.
    pub fn from_fields<I, N>(fields: I) -> Result<Self>
    where
        I: IntoIterator<Item = (N, FieldSpec)>,
        N: Into<String>,
    {
        let mut schema = Self::new();
        for (name, spec) in fields {
            schema = schema.field(name, spec)?;
        }
        Ok(schema)
    }

    /// Appends a field declaration.
    ///
    /// # Errors
    ///
    /// Same rules as [`Schema::from_fields`].
    pub fn field(mut self, name: impl Into<String>, spec: FieldSpec) -> Result<Self> {
        let name = name.into();
        validate_field_name(&name)?;
        if self.get(&name).is_some() {
            return Err(HiveError::InvalidSchema {
                reason: format!("field \"{}\" is declared twice", name),
            });
        }
        self.fields.push((name, spec));
        Ok(self)
    }

    /// Looks up a field declaration by name.
    pub fn get(&self, name: &str) -> Option<&FieldSpec> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, spec)| spec)
    }

    /// Returns true if the schema declares `name`.
    pub fn contains(&self, name: &str) -> bool { self.get(name).is_some() }

    /// Iterates over the declarations in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldSpec)> {
        self.fields
            .iter()
            .map(|(name, spec)| (name.as_str(), spec))
    }

    /// Iterates over the names of required fields in declaration order.
    pub fn required_fields(&self) -> impl Iterator<Item = &str> {
        self.iter()
            .filter(|&(_, spec)| spec.is_required())
            .map(|(name, _)| name)
    }

    /// Number of declared fields.
    pub fn len(&self) -> usize { self.fields.len() }

    /// Returns true if no field is declared.
    pub fn is_empty(&self) -> bool { self.fields.is_empty() }
}

/// Checks that a field name can be stored as a top-level JSON key of a document.
fn validate_field_name(name: &str) -> Result<()> {
    let reason = if name.is_empty() {
        Some("field names must not be empty".to_owned())
    }
    else if name == ID_FIELD {
        Some(format!("\"{}\" is reserved for the document identifier", ID_FIELD))
    }
    else if name.contains('/') || name.contains('\\') {
        Some(format!("field \"{}\" contains a path separator", name))
    }
    else if name.chars().any(char::is_control) {
        Some(format!("field \"{}\" contains a control character", name.escape_debug()))
    }
    else {
        None
    };

    match reason {
        Some(reason) => {
            Err(HiveError::InvalidSchema {
                reason,
            })
        },
        None => Ok(()),
    }
}

impl Serialize for Schema {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (name, spec) in &self.fields {
            map.serialize_entry(name, spec)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Schema {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        // serde_json's map keeps insertion order, so declaration order survives.
        let raw = Map::<String, Value>::deserialize(deserializer)?;
        let mut schema = Self::new();
        for (name, spec) in raw {
            let spec = FieldSpec::deserialize(spec).map_err(de::Error::custom)?;
            schema = schema.field(name, spec).map_err(de::Error::custom)?;
        }
        Ok(schema)
    }
}
