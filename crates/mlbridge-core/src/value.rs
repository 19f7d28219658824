//! Values exchanged with the remote runtime.
//!
//! `RemoteValue` is the single tagged union every argument and result passes
//! through. Scalars travel by value, byte payloads as ref-counted `Bytes`,
//! sequences element-wise, and anything else as a `RemoteHandle`.
//!
//! On the JSON wire each value is `{"type": <kind>, "value": <payload>}`.
//! Doubles that JSON numbers cannot hold (`NaN`, `Infinity`, `-Infinity`) are
//! written as those strings. Inline bytes are hex-encoded; the TCP transport
//! moves them into binary sections instead (see [`crate::transport::wire`]).

use crate::error::{BridgeError, Result};
use crate::handle::RemoteHandle;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A marshaled value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum RemoteValue {
    Null,
    Bool(bool),
    Int(i32),
    Long(i64),
    Double(#[serde(with = "float_text")] f64),
    String(String),
    Bytes(#[serde(with = "hex_bytes")] Bytes),
    Array(Vec<RemoteValue>),
    /// Local string-keyed map. Converted to a remote `HashMap` before it is sent.
    Map(BTreeMap<String, RemoteValue>),
    Handle(RemoteHandle),
}

impl RemoteValue {
    /// Short name of the variant, used in type mismatch reports.
    pub fn kind(&self) -> &'static str {
        match self {
            RemoteValue::Null => "null",
            RemoteValue::Bool(_) => "bool",
            RemoteValue::Int(_) => "int",
            RemoteValue::Long(_) => "long",
            RemoteValue::Double(_) => "double",
            RemoteValue::String(_) => "string",
            RemoteValue::Bytes(_) => "bytes",
            RemoteValue::Array(_) => "array",
            RemoteValue::Map(_) => "map",
            RemoteValue::Handle(_) => "handle",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, RemoteValue::Null)
    }

    pub fn as_handle(&self) -> Option<&RemoteHandle> {
        match self {
            RemoteValue::Handle(handle) => Some(handle),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            RemoteValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Convert into a typed local value, failing on shape mismatch.
    pub fn into_typed<T: FromRemote>(self) -> Result<T> {
        T::from_remote(self)
    }
}

pub(crate) mod hex_bytes {
    use bytes::Bytes;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &Bytes, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Bytes, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        hex::decode(encoded)
            .map(Bytes::from)
            .map_err(serde::de::Error::custom)
    }
}

/// Finite doubles as JSON numbers, the rest as `"NaN"` / `"Infinity"` / `"-Infinity"`.
pub(crate) mod float_text {
    use serde::de::{self, Unexpected, Visitor};
    use serde::{Deserializer, Serializer};
    use std::fmt;

    const NAN: &str = "NaN";
    const INFINITY: &str = "Infinity";
    const NEG_INFINITY: &str = "-Infinity";

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if value.is_finite() {
            serializer.serialize_f64(*value)
        } else if value.is_nan() {
            serializer.serialize_str(NAN)
        } else if value.is_sign_positive() {
            serializer.serialize_str(INFINITY)
        } else {
            serializer.serialize_str(NEG_INFINITY)
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        deserializer.deserialize_any(DoubleVisitor)
    }

    struct DoubleVisitor;

    impl<'de> Visitor<'de> for DoubleVisitor {
        type Value = f64;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a number, \"NaN\", \"Infinity\" or \"-Infinity\"")
        }

        fn visit_f64<E: de::Error>(self, v: f64) -> Result<f64, E> {
            Ok(v)
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<f64, E> {
            Ok(v as f64)
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<f64, E> {
            Ok(v as f64)
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<f64, E> {
            match v {
                NAN => Ok(f64::NAN),
                INFINITY => Ok(f64::INFINITY),
                NEG_INFINITY => Ok(f64::NEG_INFINITY),
                other => Err(E::invalid_value(Unexpected::Str(other), &self)),
            }
        }
    }
}

// Local -> remote

impl From<bool> for RemoteValue {
    fn from(v: bool) -> Self {
        RemoteValue::Bool(v)
    }
}

impl From<i32> for RemoteValue {
    fn from(v: i32) -> Self {
        RemoteValue::Int(v)
    }
}

impl From<i64> for RemoteValue {
    fn from(v: i64) -> Self {
        RemoteValue::Long(v)
    }
}

impl From<f64> for RemoteValue {
    fn from(v: f64) -> Self {
        RemoteValue::Double(v)
    }
}

impl From<String> for RemoteValue {
    fn from(v: String) -> Self {
        RemoteValue::String(v)
    }
}

impl From<&str> for RemoteValue {
    fn from(v: &str) -> Self {
        RemoteValue::String(v.to_string())
    }
}

impl From<Bytes> for RemoteValue {
    fn from(v: Bytes) -> Self {
        RemoteValue::Bytes(v)
    }
}

impl From<Vec<u8>> for RemoteValue {
    fn from(v: Vec<u8>) -> Self {
        // Takes ownership of the allocation, no copy.
        RemoteValue::Bytes(Bytes::from(v))
    }
}

impl From<Vec<String>> for RemoteValue {
    fn from(v: Vec<String>) -> Self {
        RemoteValue::Array(v.into_iter().map(RemoteValue::String).collect())
    }
}

impl From<Vec<&str>> for RemoteValue {
    fn from(v: Vec<&str>) -> Self {
        RemoteValue::Array(v.into_iter().map(RemoteValue::from).collect())
    }
}

impl From<Vec<f64>> for RemoteValue {
    fn from(v: Vec<f64>) -> Self {
        RemoteValue::Array(v.into_iter().map(RemoteValue::Double).collect())
    }
}

impl From<Vec<RemoteValue>> for RemoteValue {
    fn from(v: Vec<RemoteValue>) -> Self {
        RemoteValue::Array(v)
    }
}

impl From<BTreeMap<String, RemoteValue>> for RemoteValue {
    fn from(v: BTreeMap<String, RemoteValue>) -> Self {
        RemoteValue::Map(v)
    }
}

impl From<RemoteHandle> for RemoteValue {
    fn from(v: RemoteHandle) -> Self {
        RemoteValue::Handle(v)
    }
}

impl<T: Into<RemoteValue>> From<Option<T>> for RemoteValue {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(RemoteValue::Null)
    }
}

// Remote -> local

/// Typed extraction from an unmarshaled value.
///
/// Never coerces across shapes; the only accepted widening is `int` into `i64`.
pub trait FromRemote: Sized {
    /// Name of the expected shape, for error reports.
    const EXPECTED: &'static str;

    fn from_remote(value: RemoteValue) -> Result<Self>;
}

fn mismatch<T>(expected: &str, value: &RemoteValue) -> Result<T> {
    Err(BridgeError::type_mismatch(expected, value.kind()))
}

macro_rules! impl_from_remote {
    ($($ty:ty => $variant:ident, $expected:literal);* $(;)?) => {
        $(
            impl FromRemote for $ty {
                const EXPECTED: &'static str = $expected;

                fn from_remote(value: RemoteValue) -> Result<Self> {
                    match value {
                        RemoteValue::$variant(v) => Ok(v),
                        other => mismatch(Self::EXPECTED, &other),
                    }
                }
            }
        )*
    };
}

impl_from_remote! {
    bool => Bool, "bool";
    i32 => Int, "int";
    f64 => Double, "double";
    String => String, "string";
    Bytes => Bytes, "bytes";
    RemoteHandle => Handle, "handle";
}

impl FromRemote for i64 {
    const EXPECTED: &'static str = "long";

    fn from_remote(value: RemoteValue) -> Result<Self> {
        match value {
            RemoteValue::Long(v) => Ok(v),
            RemoteValue::Int(v) => Ok(i64::from(v)),
            other => mismatch(Self::EXPECTED, &other),
        }
    }
}

impl FromRemote for RemoteValue {
    const EXPECTED: &'static str = "any";

    fn from_remote(value: RemoteValue) -> Result<Self> {
        Ok(value)
    }
}

impl<T: FromRemote> FromRemote for Vec<T> {
    const EXPECTED: &'static str = "array";

    fn from_remote(value: RemoteValue) -> Result<Self> {
        match value {
            RemoteValue::Array(items) => items.into_iter().map(T::from_remote).collect(),
            other => mismatch(Self::EXPECTED, &other),
        }
    }
}

impl<T: FromRemote> FromRemote for Option<T> {
    const EXPECTED: &'static str = "optional";

    fn from_remote(value: RemoteValue) -> Result<Self> {
        match value {
            RemoteValue::Null => Ok(None),
            other => T::from_remote(other).map(Some),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_round_trip_through_wire() {
        let values = vec![
            RemoteValue::from(true),
            RemoteValue::from(-7),
            RemoteValue::from(9_000_000_000i64),
            RemoteValue::from(0.25),
            RemoteValue::from("RGB"),
        ];
        for value in values {
            let json = serde_json::to_string(&value).unwrap();
            let parsed: RemoteValue = serde_json::from_str(&json).unwrap();
            assert_eq!(parsed, value);
        }
    }

    #[test]
    fn test_non_finite_doubles_survive_the_wire() {
        let json = serde_json::to_value(RemoteValue::Double(f64::INFINITY)).unwrap();
        assert_eq!(json, serde_json::json!({"type": "double", "value": "Infinity"}));

        for value in [f64::INFINITY, f64::NEG_INFINITY, f64::MAX, -0.0] {
            let text = serde_json::to_string(&RemoteValue::Double(value)).unwrap();
            let parsed: f64 = serde_json::from_str::<RemoteValue>(&text)
                .unwrap()
                .into_typed()
                .unwrap();
            assert_eq!(parsed, value);
        }

        let text = serde_json::to_string(&RemoteValue::Double(f64::NAN)).unwrap();
        assert!(text.contains("\"NaN\""));
        let parsed: f64 = serde_json::from_str::<RemoteValue>(&text)
            .unwrap()
            .into_typed()
            .unwrap();
        assert!(parsed.is_nan());
    }

    #[test]
    fn test_double_accepts_integral_json_numbers() {
        let parsed: RemoteValue =
            serde_json::from_value(serde_json::json!({"type": "double", "value": 3})).unwrap();
        assert_eq!(parsed, RemoteValue::Double(3.0));

        let bad = serde_json::from_value::<RemoteValue>(
            serde_json::json!({"type": "double", "value": "inf"}),
        );
        assert!(bad.is_err());
    }

    #[test]
    fn test_bytes_are_hex_encoded() {
        let value = RemoteValue::from(vec![0xdeu8, 0xad, 0xbe, 0xef]);
        let json = serde_json::to_value(&value).unwrap();
        assert_eq!(json, serde_json::json!({"type": "bytes", "value": "deadbeef"}));

        let parsed: RemoteValue = serde_json::from_value(json).unwrap();
        assert_eq!(parsed.into_typed::<Bytes>().unwrap().as_ref(), &[0xde, 0xad, 0xbe, 0xef]);
    }

    #[test]
    fn test_null_has_no_payload() {
        let json = serde_json::to_string(&RemoteValue::Null).unwrap();
        assert_eq!(json, r#"{"type":"null"}"#);
        let parsed: RemoteValue = serde_json::from_str(&json).unwrap();
        assert!(parsed.is_null());
    }

    #[test]
    fn test_sequence_preserves_order() {
        let layers = vec!["z".to_string(), "OutputNodes".to_string(), "a".to_string()];
        let value = RemoteValue::from(layers.clone());
        let json = serde_json::to_string(&value).unwrap();
        let parsed: RemoteValue = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.into_typed::<Vec<String>>().unwrap(), layers);
    }

    #[test]
    fn test_int_widens_to_long_but_not_to_double() {
        assert_eq!(RemoteValue::Int(5).into_typed::<i64>().unwrap(), 5);
        let err = RemoteValue::Int(5).into_typed::<f64>().unwrap_err();
        match err {
            BridgeError::TypeMismatch { expected, actual } => {
                assert_eq!(expected, "double");
                assert_eq!(actual, "int");
            }
            other => panic!("Expected TypeMismatch, got: {:?}", other),
        }
    }

    #[test]
    fn test_array_with_wrong_element_type_is_rejected() {
        let value = RemoteValue::Array(vec![RemoteValue::from("a"), RemoteValue::from(1.0)]);
        assert!(value.into_typed::<Vec<String>>().is_err());
    }

    #[test]
    fn test_option_maps_null_to_none() {
        assert_eq!(RemoteValue::Null.into_typed::<Option<String>>().unwrap(), None);
        assert_eq!(
            RemoteValue::from("x").into_typed::<Option<String>>().unwrap(),
            Some("x".to_string())
        );
    }
}
