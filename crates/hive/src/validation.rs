//! Schema validation of candidate documents.
//!
//! Writes go through three steps, always in this order: [`project`] drops every key
//! the schema does not declare, [`validate_required_fields`] (create only) checks the
//! required fields, and [`validate_field_types`] checks the kind of every remaining
//! value. Only projection mutates its input.

use serde_json::{Map, Value};
use tracing::{debug, trace};

use crate::{schema::Schema, HiveError, Result};

/// Removes every key of `doc` that is not a schema field.
pub fn project(doc: &mut Map<String, Value>, schema: &Schema) {
    let before = doc.len();
    doc.retain(|key, _| schema.contains(key));
    let dropped = before.saturating_sub(doc.len());
    if dropped > 0 {
        debug!("Projection dropped {} undeclared field(s)", dropped);
    }
}

/// Fails with [`HiveError::ValidationFailed`] naming the first required field, in
/// schema order, that `doc` does not contain.
pub fn validate_required_fields(doc: &Map<String, Value>, schema: &Schema) -> Result<()> {
    trace!("Validating required fields");
    if let Some(missing) = schema
        .required_fields()
        .find(|&field| !doc.contains_key(field))
    {
        debug!("Required field '{}' is missing", missing);
        return Err(HiveError::ValidationFailed {
            field: missing.to_owned(),
        });
    }
    Ok(())
}

/// Fails with [`HiveError::InvalidFieldType`] for the first field, in `doc` key
/// order, whose value kind differs from the declared one.
///
/// Keys the schema does not declare are skipped; callers project first.
pub fn validate_field_types(doc: &Map<String, Value>, schema: &Schema) -> Result<()> {
    trace!("Validating field types");
    for (field, value) in doc {
        let Some(spec) = schema.get(field)
        else {
            continue;
        };
        let expected = spec.kind();
        if !expected.accepts(value) {
            debug!(
                "Field '{}' expected {}, got {}",
                field,
                expected.as_str(),
                json_type_name(value)
            );
            return Err(HiveError::InvalidFieldType {
                field: field.clone(),
                expected: expected.as_str(),
                actual: json_type_name(value),
            });
        }
    }
    Ok(())
}

/// Returns the JSON type name of a value.
pub const fn json_type_name(value: &Value) -> &'static str {
    match *value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
