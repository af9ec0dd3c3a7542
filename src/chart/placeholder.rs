//! Typed placeholder tokens inside stringly-typed property values.
//!
//! The editor can only send scalars, so booleans and array references travel
//! as reserved strings:
//! - `$true` / `$false`
//! - `$array:<name>` => the item values of the named `ArrayDef`
//!
//! Raw values are classified once into `DecodedValue`; nothing downstream
//! looks at the raw strings again.

use crate::config::ArrayDef;
use serde_json::Value;

pub const TRUE_TOKEN: &str = "$true";
pub const FALSE_TOKEN: &str = "$false";
pub const ARRAY_REF_PREFIX: &str = "$array:";

#[derive(Debug, Clone, PartialEq)]
pub enum DecodedValue {
    Bool(bool),
    ArrayRef(String),
    Scalar(Value),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlaceholderError {
    #[error("array reference {token:?} names no array (dangling array reference)")]
    DanglingArrayReference { name: String, token: String },
}

impl DecodedValue {
    pub fn classify(raw: &Value) -> Self {
        match raw.as_str() {
            Some(TRUE_TOKEN) => DecodedValue::Bool(true),
            Some(FALSE_TOKEN) => DecodedValue::Bool(false),
            Some(s) if s.starts_with(ARRAY_REF_PREFIX) => {
                DecodedValue::ArrayRef(s[ARRAY_REF_PREFIX.len()..].to_string())
            }
            _ => DecodedValue::Scalar(raw.clone()),
        }
    }

    /// Resolve against the node's array table.
    pub fn resolve(self, arrays: &[ArrayDef]) -> Result<Value, PlaceholderError> {
        match self {
            DecodedValue::Bool(b) => Ok(Value::Bool(b)),
            DecodedValue::Scalar(v) => Ok(v),
            DecodedValue::ArrayRef(name) => match arrays.iter().find(|a| a.name == name) {
                Some(array) => Ok(Value::Array(
                    array.items.iter().map(|item| item.value.clone()).collect(),
                )),
                None => Err(PlaceholderError::DanglingArrayReference {
                    token: format!("{}{}", ARRAY_REF_PREFIX, name),
                    name,
                }),
            },
        }
    }
}

/// Classify and resolve a raw property value.
pub fn decode(raw: &Value, arrays: &[ArrayDef]) -> Result<Value, PlaceholderError> {
    DecodedValue::classify(raw).resolve(arrays)
}
