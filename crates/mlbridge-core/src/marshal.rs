//! Marshaling of catalog parameter values.
//!
//! Scalars and sequences are plain `RemoteValue`s. Maps, payload-map arrays
//! and data types live remotely as objects, so converting them costs extra
//! bridge calls:
//!
//! - A local map is sent by constructing a `java.util.HashMap` and calling
//!   `put` once per entry.
//! - A remote map is read with the two-hop protocol: the utility class's
//!   static `convertToJavaMap`, then `keySet().toArray()`, then `toString` on
//!   each key handle and `get(key)` for its value.
//! - Payload-map values additionally go through the static `mapScalaToJava`.
//! - Data types are sent as canonical JSON to `DataType.fromJson` and read back
//!   with `json()`.

use crate::catalog::ParamKind;
use crate::config::JvmClasses;
use crate::error::{BridgeError, Result};
use crate::handle::RemoteHandle;
use crate::proxy::Jvm;
use crate::types::DataType;
use crate::value::{FromRemote, RemoteValue};
use bytes::Bytes;
use std::collections::HashMap;
use tracing::debug;

/// String-to-string map parameter.
pub type StringMap = HashMap<String, String>;

/// String-keyed map whose values may be any marshaled value.
pub type PayloadMap = HashMap<String, RemoteValue>;

/// A Rust type usable as a catalog parameter value.
pub trait ParamValue: Sized {
    const KIND: ParamKind;

    /// Convert to the value passed to the remote setter.
    fn to_remote(&self, jvm: &Jvm) -> Result<RemoteValue>;

    /// Convert the remote getter's result.
    fn from_remote(jvm: &Jvm, value: RemoteValue) -> Result<Self>;
}

macro_rules! impl_plain_param {
    ($($ty:ty => $kind:ident);* $(;)?) => {
        $(
            impl ParamValue for $ty {
                const KIND: ParamKind = ParamKind::$kind;

                fn to_remote(&self, _jvm: &Jvm) -> Result<RemoteValue> {
                    Ok(RemoteValue::from(self.clone()))
                }

                fn from_remote(_jvm: &Jvm, value: RemoteValue) -> Result<Self> {
                    <$ty as FromRemote>::from_remote(value)
                }
            }
        )*
    };
}

impl_plain_param! {
    bool => Boolean;
    i32 => Integer;
    i64 => Long;
    f64 => Double;
    String => String;
    Bytes => Bytes;
    Vec<String> => StringArray;
    Vec<f64> => DoubleArray;
}

impl ParamValue for StringMap {
    const KIND: ParamKind = ParamKind::StringMap;

    fn to_remote(&self, jvm: &Jvm) -> Result<RemoteValue> {
        let entries = self
            .iter()
            .map(|(k, v)| (k.clone(), RemoteValue::from(v.as_str())));
        to_java_hash_map(jvm, entries).map(RemoteValue::Handle)
    }

    fn from_remote(jvm: &Jvm, value: RemoteValue) -> Result<Self> {
        from_java_string_map(jvm, value)
    }
}

impl ParamValue for Vec<PayloadMap> {
    const KIND: ParamKind = ParamKind::PayloadMapArray;

    fn to_remote(&self, jvm: &Jvm) -> Result<RemoteValue> {
        let maps = self
            .iter()
            .map(|map| {
                let entries = map.iter().map(|(k, v)| (k.clone(), v.clone()));
                to_java_hash_map(jvm, entries).map(RemoteValue::Handle)
            })
            .collect::<Result<Vec<_>>>()?;
        to_java_array_list(jvm, maps).map(RemoteValue::Handle)
    }

    fn from_remote(jvm: &Jvm, value: RemoteValue) -> Result<Self> {
        match value {
            RemoteValue::Array(items) => items
                .into_iter()
                .map(|item| from_java_payload_map(jvm, item))
                .collect(),
            RemoteValue::Handle(list) => {
                let items: Vec<RemoteValue> = jvm.get_typed(&list, "toArray")?;
                items
                    .into_iter()
                    .map(|item| from_java_payload_map(jvm, item))
                    .collect()
            }
            other => Err(BridgeError::type_mismatch("array", other.kind())),
        }
    }
}

impl ParamValue for DataType {
    const KIND: ParamKind = ParamKind::DataType;

    fn to_remote(&self, jvm: &Jvm) -> Result<RemoteValue> {
        let value = jvm.call_static(
            JvmClasses::DATA_TYPE,
            "fromJson",
            vec![RemoteValue::String(self.json())],
        )?;
        match value {
            RemoteValue::Handle(handle) => Ok(RemoteValue::Handle(handle)),
            other => Err(BridgeError::type_mismatch("handle", other.kind())),
        }
    }

    fn from_remote(jvm: &Jvm, value: RemoteValue) -> Result<Self> {
        let handle = RemoteHandle::from_remote(value)?;
        let json: String = jvm.get_typed(&handle, "json")?;
        DataType::from_json(&json)
    }
}

/// Create a remote `java.util.HashMap` populated with `entries`.
pub fn to_java_hash_map<I>(jvm: &Jvm, entries: I) -> Result<RemoteHandle>
where
    I: IntoIterator<Item = (String, RemoteValue)>,
{
    let map = jvm.construct(JvmClasses::HASH_MAP, Vec::new())?;
    let mut count = 0usize;
    for (key, value) in entries {
        map.invoke("put", vec![RemoteValue::String(key), value])?;
        count += 1;
    }
    debug!("marshaled {} map entries into {}", count, map.handle());
    Ok(map.into_handle())
}

/// Create a remote `java.util.ArrayList` holding `items` in order.
pub fn to_java_array_list(jvm: &Jvm, items: Vec<RemoteValue>) -> Result<RemoteHandle> {
    let list = jvm.construct(JvmClasses::ARRAY_LIST, Vec::new())?;
    for item in items {
        list.invoke("add", vec![item])?;
    }
    Ok(list.into_handle())
}

/// Enumerate a remote map as `(key, raw value)` pairs.
///
/// The value is returned exactly as the map's `get` produced it.
pub fn java_map_entries(jvm: &Jvm, value: RemoteValue) -> Result<Vec<(String, RemoteValue)>> {
    let source = RemoteHandle::from_remote(value)?;

    let map: RemoteHandle = jvm
        .call_static(
            jvm.utils_class(),
            "convertToJavaMap",
            vec![RemoteValue::Handle(source)],
        )?
        .into_typed()?;
    let key_set: RemoteHandle = jvm.get_typed(&map, "keySet")?;
    let keys: Vec<RemoteValue> = jvm.get_typed(&key_set, "toArray")?;

    let mut entries = Vec::with_capacity(keys.len());
    for key in keys {
        let name = match &key {
            RemoteValue::Handle(handle) => jvm.get_typed::<String>(handle, "toString")?,
            RemoteValue::String(s) => s.clone(),
            other => return Err(BridgeError::type_mismatch("map key", other.kind())),
        };
        let value = jvm.invoke(&map, "get", vec![key])?;
        entries.push((name, value));
    }
    Ok(entries)
}

/// Read a remote string-to-string map.
pub fn from_java_string_map(jvm: &Jvm, value: RemoteValue) -> Result<StringMap> {
    java_map_entries(jvm, value)?
        .into_iter()
        .map(|(key, value)| Ok((key, value.into_typed::<String>()?)))
        .collect()
}

/// Read a remote payload map, converting each value with `mapScalaToJava`.
pub fn from_java_payload_map(jvm: &Jvm, value: RemoteValue) -> Result<PayloadMap> {
    let utils = jvm.utils_class().to_string();
    java_map_entries(jvm, value)?
        .into_iter()
        .map(|(key, value)| {
            let converted = jvm.call_static(&utils, "mapScalaToJava", vec![value])?;
            Ok((key, converted))
        })
        .collect()
}
