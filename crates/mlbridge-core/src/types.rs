//! Structured data-type descriptors.
//!
//! Descriptors cross the bridge as their canonical JSON text and are re-parsed
//! on each side, so no binary encoding of the type tree is needed.
//!
//! ```text
//! "float"
//! {"type":"array","elementType":"double","containsNull":false}
//! ```

use crate::error::{BridgeError, Result};
use crate::value::RemoteValue;
use serde_json::{json, Value};
use std::fmt;

/// Element type descriptor, as understood by the remote runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataType {
    Boolean,
    Byte,
    Short,
    Integer,
    Long,
    Float,
    Double,
    String,
    Binary,
    Array {
        element_type: Box<DataType>,
        contains_null: bool,
    },
}

impl DataType {
    /// Array type helper.
    pub fn array_of(element_type: DataType, contains_null: bool) -> Self {
        DataType::Array {
            element_type: Box::new(element_type),
            contains_null,
        }
    }

    /// Name used by the remote runtime for atomic types.
    pub fn type_name(&self) -> &'static str {
        match self {
            DataType::Boolean => "boolean",
            DataType::Byte => "byte",
            DataType::Short => "short",
            DataType::Integer => "integer",
            DataType::Long => "long",
            DataType::Float => "float",
            DataType::Double => "double",
            DataType::String => "string",
            DataType::Binary => "binary",
            DataType::Array { .. } => "array",
        }
    }

    fn from_type_name(name: &str) -> Option<Self> {
        match name {
            "boolean" => Some(DataType::Boolean),
            "byte" => Some(DataType::Byte),
            "short" => Some(DataType::Short),
            "integer" => Some(DataType::Integer),
            "long" => Some(DataType::Long),
            "float" => Some(DataType::Float),
            "double" => Some(DataType::Double),
            "string" => Some(DataType::String),
            "binary" => Some(DataType::Binary),
            _ => None,
        }
    }

    fn to_json_value(&self) -> Value {
        match self {
            DataType::Array {
                element_type,
                contains_null,
            } => json!({
                "type": "array",
                "elementType": element_type.to_json_value(),
                "containsNull": contains_null,
            }),
            atomic => Value::String(atomic.type_name().to_string()),
        }
    }

    fn from_json_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(name) => Self::from_type_name(name),
            Value::Object(fields) => {
                if fields.get("type").and_then(Value::as_str) != Some("array") {
                    return None;
                }
                let element_type = Self::from_json_value(fields.get("elementType")?)?;
                let contains_null = fields
                    .get("containsNull")
                    .and_then(Value::as_bool)
                    .unwrap_or(true);
                Some(Self::array_of(element_type, contains_null))
            }
            _ => None,
        }
    }

    /// Canonical JSON text form.
    pub fn json(&self) -> String {
        self.to_json_value().to_string()
    }

    /// Parse the canonical JSON text form.
    pub fn from_json(text: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(text)?;
        Self::from_json_value(&value)
            .ok_or_else(|| BridgeError::type_mismatch("data type descriptor", text))
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.json())
    }
}

/// Descriptors used as catalog defaults travel as their JSON text.
impl From<DataType> for RemoteValue {
    fn from(v: DataType) -> Self {
        RemoteValue::String(v.json())
    }
}
