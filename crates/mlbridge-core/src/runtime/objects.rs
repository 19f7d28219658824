//! Objects living inside the reference runtime.

use crate::catalog::{ClassSpec, ParamKind};
use crate::config::JvmClasses;
use crate::error::{BridgeError, Result};
use crate::handle::RemoteHandle;
use crate::types::DataType;
use crate::value::RemoteValue;
use std::collections::HashMap;

/// Exception classes raised by the reference runtime.
pub(crate) mod exceptions {
    pub const CLASS_NOT_FOUND: &str = "java.lang.ClassNotFoundException";
    pub const NO_SUCH_METHOD: &str = "java.lang.NoSuchMethodException";
    pub const ILLEGAL_ARGUMENT: &str = "java.lang.IllegalArgumentException";
    pub const ILLEGAL_STATE: &str = "java.lang.IllegalStateException";
    pub const NO_SUCH_ELEMENT: &str = "java.util.NoSuchElementException";
    pub const INDEX_OUT_OF_BOUNDS: &str = "java.lang.IndexOutOfBoundsException";
    pub const IO: &str = "java.io.IOException";
}

/// Build the error a remote method call reports when it throws.
pub(crate) fn thrown(method: &str, exception_class: &str, message: impl Into<String>) -> BridgeError {
    BridgeError::RemoteInvocation {
        method: method.to_string(),
        exception_class: exception_class.to_string(),
        message: message.into(),
    }
}

/// Instance of a catalog class.
#[derive(Debug, Clone)]
pub(crate) struct Instance {
    pub class_name: String,
    pub uid: String,
    pub params: HashMap<String, RemoteValue>,
}

#[derive(Debug, Clone)]
pub(crate) enum RuntimeObject {
    Instance(Instance),
    HashMap(HashMap<String, RemoteValue>),
    ArrayList(Vec<RemoteValue>),
    KeySet(Vec<String>),
    Str(String),
    Class(String),
    DataType(DataType),
    Writer { target: String, overwrite: bool },
    Reader { class_name: String },
}

impl RuntimeObject {
    /// Class name reported by `getClass().getTypeName()`.
    pub fn type_name(&self) -> &str {
        match self {
            RuntimeObject::Instance(instance) => &instance.class_name,
            RuntimeObject::HashMap(_) => JvmClasses::HASH_MAP,
            RuntimeObject::ArrayList(_) => JvmClasses::ARRAY_LIST,
            RuntimeObject::KeySet(_) => JvmClasses::KEY_SET,
            RuntimeObject::Str(_) => JvmClasses::STRING,
            RuntimeObject::Class(_) => JvmClasses::CLASS,
            RuntimeObject::DataType(_) => JvmClasses::DATA_TYPE,
            RuntimeObject::Writer { .. } => JvmClasses::ML_WRITER,
            RuntimeObject::Reader { .. } => JvmClasses::ML_READER,
        }
    }
}

/// Identity of an object that is reused instead of re-created on every call.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) enum InternKey {
    /// `getClass` result, by type name
    Class(String),
    /// Boxed map key, by value
    Str(String),
    /// `keySet` view, by map id
    KeySet(String),
    /// `DataType.fromJson` result, by canonical JSON
    DataType(String),
    /// `write()` result, by target id
    Writer(String),
    /// `read()` result, by class name
    Reader(String),
}

/// Object table plus id allocation.
#[derive(Debug, Default)]
pub(crate) struct ObjectTable {
    objects: HashMap<String, RuntimeObject>,
    interned: HashMap<InternKey, String>,
    next_id: u64,
}

impl ObjectTable {
    pub fn insert(&mut self, object: RuntimeObject) -> RemoteHandle {
        self.next_id += 1;
        let id = format!("o{}", self.next_id);
        let handle = RemoteHandle::with_class(id.clone(), object.type_name());
        self.objects.insert(id, object);
        handle
    }

    /// Store `object` under `key`, reusing the id already allocated for it.
    ///
    /// The stored object is refreshed, so a key set reflects its map's keys as
    /// of the latest call.
    pub fn intern(&mut self, key: InternKey, object: RuntimeObject) -> RemoteHandle {
        if let Some(id) = self.interned.get(&key) {
            if let Some(existing) = self.objects.get_mut(id) {
                *existing = object;
                return RemoteHandle::with_class(id.clone(), existing.type_name());
            }
        }
        let handle = self.insert(object);
        self.interned.insert(key, handle.id().to_string());
        handle
    }

    pub fn get(&self, id: &str) -> Option<&RuntimeObject> {
        self.objects.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut RuntimeObject> {
        self.objects.get_mut(id)
    }

    pub fn handle(&self, id: &str) -> Option<RemoteHandle> {
        self.objects
            .get(id)
            .map(|object| RemoteHandle::with_class(id, object.type_name()))
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Resolve a map key argument: a plain string or a handle to a boxed string.
    pub fn key_string(&self, method: &str, key: &RemoteValue) -> Result<String> {
        match key {
            RemoteValue::String(s) => Ok(s.clone()),
            RemoteValue::Handle(h) => match self.get(h.id()) {
                Some(RuntimeObject::Str(s)) => Ok(s.clone()),
                Some(other) => Err(thrown(
                    method,
                    exceptions::ILLEGAL_ARGUMENT,
                    format!("Map keys must be strings, got {}", other.type_name()),
                )),
                None => Err(unknown_handle(method, h)),
            },
            other => Err(thrown(
                method,
                exceptions::ILLEGAL_ARGUMENT,
                format!("Map keys must be strings, got {}", other.kind()),
            )),
        }
    }

    /// Check a setter argument against the parameter's declared kind.
    pub fn accepts(&self, kind: ParamKind, value: &RemoteValue) -> bool {
        let object = |value: &RemoteValue| value.as_handle().and_then(|h| self.get(h.id()));
        match (kind, value) {
            (ParamKind::Boolean, RemoteValue::Bool(_)) => true,
            (ParamKind::Integer, RemoteValue::Int(_)) => true,
            (ParamKind::Long, RemoteValue::Long(_) | RemoteValue::Int(_)) => true,
            (ParamKind::Double, RemoteValue::Double(_)) => true,
            (ParamKind::String, RemoteValue::String(_)) => true,
            (ParamKind::Bytes, RemoteValue::Bytes(_)) => true,
            (ParamKind::StringArray, RemoteValue::Array(items)) => {
                items.iter().all(|v| matches!(v, RemoteValue::String(_)))
            }
            (ParamKind::DoubleArray, RemoteValue::Array(items)) => {
                items.iter().all(|v| matches!(v, RemoteValue::Double(_)))
            }
            (ParamKind::StringMap, _) => match object(value) {
                Some(RuntimeObject::HashMap(entries)) => {
                    entries.values().all(|v| matches!(v, RemoteValue::String(_)))
                }
                _ => false,
            },
            (ParamKind::Transformer, _) => matches!(object(value), Some(RuntimeObject::Instance(_))),
            (ParamKind::PayloadMapArray, _) => match object(value) {
                Some(RuntimeObject::ArrayList(items)) => items
                    .iter()
                    .all(|item| matches!(object(item), Some(RuntimeObject::HashMap(_)))),
                _ => false,
            },
            (ParamKind::DataType, _) => matches!(object(value), Some(RuntimeObject::DataType(_))),
            _ => false,
        }
    }

    /// Instantiate a catalog class, materializing parameter defaults.
    pub fn instantiate(&mut self, spec: &ClassSpec, uid: Option<String>) -> Result<RemoteHandle> {
        let uid = uid.unwrap_or_else(|| {
            let suffix = uuid::Uuid::new_v4().simple().to_string();
            format!("{}_{}", spec.simple_name(), &suffix[..12])
        });

        let mut params = HashMap::new();
        for param in &spec.params {
            let Some(default) = &param.default else {
                continue;
            };
            let value = match (param.kind, default) {
                (ParamKind::DataType, RemoteValue::String(json)) => {
                    let data_type = DataType::from_json(json)?;
                    RemoteValue::Handle(self.insert(RuntimeObject::DataType(data_type)))
                }
                (_, RemoteValue::Map(entries)) => RemoteValue::Handle(
                    self.insert(RuntimeObject::HashMap(entries.clone().into_iter().collect())),
                ),
                (_, other) => other.clone(),
            };
            params.insert(param.name.to_string(), value);
        }

        Ok(self.insert(RuntimeObject::Instance(Instance {
            class_name: spec.class_name.to_string(),
            uid,
            params,
        })))
    }
}

pub(crate) fn unknown_handle(method: &str, handle: &RemoteHandle) -> BridgeError {
    thrown(
        method,
        exceptions::ILLEGAL_STATE,
        format!("No live object for handle {}", handle.id()),
    )
}
