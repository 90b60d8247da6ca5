//! Equality matching of documents against predicates.

use serde_json::{Map, Number, Value};

use crate::{constants::ID_FIELD, validation::json_type_name, Document, HiveError, Result};

/// A partial field -> value mapping.
///
/// A document matches when it has every predicate key with an equal value. Whether
/// an empty predicate matches everything or nothing is decided by the operation
/// using it, not here.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Predicate {
    /// Expected values keyed by field name.
    fields: Map<String, Value>,
}

impl Predicate {
    /// Builds a predicate from a JSON value. `null` is the empty predicate.
    ///
    /// # Errors
    ///
    /// Returns [`HiveError::InvalidQuery`] if `value` is neither `null` nor an object.
    pub fn from_value(value: &Value) -> Result<Self> {
        match *value {
            Value::Null => Ok(Self::default()),
            Value::Object(ref fields) => {
                Ok(Self {
                    fields: fields.clone(),
                })
            },
            ref other => {
                Err(HiveError::InvalidQuery {
                    reason: format!("a query must be an object, got {}", json_type_name(other)),
                })
            },
        }
    }

    /// Returns true if the predicate has no keys.
    pub fn is_empty(&self) -> bool { self.fields.is_empty() }

    /// Checks a document against every predicate key.
    pub fn matches(&self, doc: &Document) -> bool {
        self.fields.iter().all(|(field, expected)| {
            if field == ID_FIELD {
                return expected.as_str() == Some(doc.id());
            }
            doc.field(field)
                .is_some_and(|actual| values_equal(actual, expected))
        })
    }
}

impl From<Map<String, Value>> for Predicate {
    fn from(fields: Map<String, Value>) -> Self {
        Self {
            fields,
        }
    }
}

/// Strict type-and-value equality.
///
/// Numbers compare by numeric value so `30` and `30.0` are equal; every other kind
/// compares structurally and different kinds are never equal. An integer equals a
/// float only when the float holds exactly that integer, so no precision is lost
/// above 2^53.
pub fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(na), Value::Number(nb)) => {
            match (integer_of(na), integer_of(nb)) {
                (Some(ia), Some(ib)) => ia == ib,
                (Some(int), None) => nb.as_f64().is_some_and(|float| float_is_integer(float, int)),
                (None, Some(int)) => na.as_f64().is_some_and(|float| float_is_integer(float, int)),
                (None, None) => {
                    match (na.as_f64(), nb.as_f64()) {
                        (Some(fa), Some(fb)) => fa == fb,
                        _ => false,
                    }
                },
            }
        },
        _ => a == b,
    }
}

/// The exact value of a number stored as an integer.
fn integer_of(number: &Number) -> Option<i128> {
    number
        .as_i64()
        .map(i128::from)
        .or_else(|| number.as_u64().map(i128::from))
}

/// True if `float` is integral and equal to `int`.
fn float_is_integer(float: f64, int: i128) -> bool {
    float.fract() == 0.0 && float >= i128::MIN as f64 && float < i128::MAX as f64 && float as i128 == int
}
