//! In-process reference runtime.
//!
//! `LocalRuntime` hosts remote objects for a catalog of classes without a JVM.
//! It speaks the same call protocol as a real host (constructors, catalog
//! setters and getters, `java.util` maps and lists, the map-conversion
//! utilities, `DataType.fromJson`, save/load) so it can stand behind a
//! [`Jvm`](crate::Jvm) directly or behind the TCP transport.
//!
//! # Thread Safety
//!
//! The object table sits behind a mutex; each call holds it for its whole
//! duration. Clones share the table. Calls arriving through the TCP server run
//! on tokio's blocking pool, since save and load touch the filesystem.

mod objects;
mod snapshot;

use crate::bridge::{Bridge, BridgeCall};
use crate::catalog::{Accessor, ClassSpec, ParamKind};
use crate::config::JvmClasses;
use crate::error::{BridgeError, Result};
use crate::handle::RemoteHandle;
use crate::transport::BridgeDispatch;
use crate::types::DataType;
use crate::value::RemoteValue;
use objects::{exceptions, thrown, unknown_handle, InternKey, ObjectTable, RuntimeObject};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info};

/// Reference implementation of the remote object runtime.
#[derive(Debug, Clone)]
pub struct LocalRuntime {
    classes: Arc<HashMap<String, ClassSpec>>,
    utils_class: String,
    base_dir: Option<PathBuf>,
    table: Arc<Mutex<ObjectTable>>,
}

impl LocalRuntime {
    /// Create a runtime hosting the given classes.
    pub fn new(classes: impl IntoIterator<Item = ClassSpec>) -> Self {
        let classes: HashMap<String, ClassSpec> = classes
            .into_iter()
            .map(|spec| (spec.class_name.to_string(), spec))
            .collect();
        info!("Local runtime hosting {} classes", classes.len());

        Self {
            classes: Arc::new(classes),
            utils_class: JvmClasses::DEFAULT_UTILS.to_string(),
            base_dir: None,
            table: Arc::new(Mutex::new(ObjectTable::default())),
        }
    }

    /// Resolve relative save/load paths against `dir`.
    pub fn with_base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.base_dir = Some(dir.into());
        self
    }

    /// Serve the map-conversion statics from another class name.
    pub fn with_utils_class(mut self, class_name: impl Into<String>) -> Self {
        self.utils_class = class_name.into();
        self
    }

    pub fn class_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.classes.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Number of live objects.
    pub fn object_count(&self) -> Result<usize> {
        Ok(self.lock()?.len())
    }

    fn lock(&self) -> Result<MutexGuard<'_, ObjectTable>> {
        self.table
            .lock()
            .map_err(|e| BridgeError::protocol(format!("Runtime state poisoned: {}", e)))
    }

    fn resolve_path(&self, path: &str) -> PathBuf {
        let path = Path::new(path);
        match &self.base_dir {
            Some(base) if path.is_relative() => base.join(path),
            _ => path.to_path_buf(),
        }
    }

    fn invoke_object(
        &self,
        table: &mut ObjectTable,
        target: &RemoteHandle,
        method: &str,
        args: Vec<RemoteValue>,
    ) -> Result<RemoteValue> {
        let id = target.id();
        let object = table
            .get(id)
            .cloned()
            .ok_or_else(|| unknown_handle(method, target))?;

        // Methods every object answers
        match method {
            "getClass" => {
                let name = object.type_name().to_string();
                let class = table.intern(InternKey::Class(name.clone()), RuntimeObject::Class(name));
                return Ok(RemoteValue::Handle(class));
            }
            "hashCode" => return Ok(RemoteValue::Int(id_hash(id))),
            _ => {}
        }

        match object {
            RuntimeObject::Instance(instance) => {
                self.invoke_instance(table, id, instance, method, args)
            }
            RuntimeObject::HashMap(_) => invoke_hash_map(table, id, method, args),
            RuntimeObject::ArrayList(items) => invoke_array_list(table, id, items, method, args),
            RuntimeObject::KeySet(keys) => match method {
                "toArray" => {
                    let handles = keys
                        .into_iter()
                        .map(|key| {
                            let boxed = RuntimeObject::Str(key.clone());
                            RemoteValue::Handle(table.intern(InternKey::Str(key), boxed))
                        })
                        .collect();
                    Ok(RemoteValue::Array(handles))
                }
                "size" => Ok(RemoteValue::Int(len_i32(keys.len()))),
                _ => Err(no_such_method(JvmClasses::KEY_SET, method)),
            },
            RuntimeObject::Str(s) => match method {
                "toString" => Ok(RemoteValue::String(s)),
                "length" => Ok(RemoteValue::Int(len_i32(s.chars().count()))),
                _ => Err(no_such_method(JvmClasses::STRING, method)),
            },
            RuntimeObject::Class(name) => match method {
                "getTypeName" | "getName" => Ok(RemoteValue::String(name)),
                "getSimpleName" => Ok(RemoteValue::from(
                    name.rsplit('.').next().unwrap_or(&name),
                )),
                _ => Err(no_such_method(JvmClasses::CLASS, method)),
            },
            RuntimeObject::DataType(data_type) => match method {
                "json" => Ok(RemoteValue::String(data_type.json())),
                "typeName" => Ok(RemoteValue::from(data_type.type_name())),
                _ => Err(no_such_method(JvmClasses::DATA_TYPE, method)),
            },
            RuntimeObject::Writer { target, overwrite } => match method {
                "overwrite" => {
                    if let Some(RuntimeObject::Writer { overwrite, .. }) = table.get_mut(id) {
                        *overwrite = true;
                    }
                    Ok(RemoteValue::Handle(target_handle(table, id, method)?))
                }
                "save" => {
                    let path = string_arg(method, &args, 0)?;
                    self.save(table, &target, &path, overwrite, method)?;
                    Ok(RemoteValue::Null)
                }
                _ => Err(no_such_method(JvmClasses::ML_WRITER, method)),
            },
            RuntimeObject::Reader { class_name } => match method {
                "load" => {
                    let path = string_arg(method, &args, 0)?;
                    self.load(table, &class_name, &path, method)
                }
                _ => Err(no_such_method(JvmClasses::ML_READER, method)),
            },
        }
    }

    fn invoke_instance(
        &self,
        table: &mut ObjectTable,
        id: &str,
        instance: objects::Instance,
        method: &str,
        args: Vec<RemoteValue>,
    ) -> Result<RemoteValue> {
        match method {
            "uid" | "toString" => return Ok(RemoteValue::String(instance.uid)),
            "save" => {
                let path = string_arg(method, &args, 0)?;
                self.save(table, id, &path, false, method)?;
                return Ok(RemoteValue::Null);
            }
            "write" => {
                let writer = RuntimeObject::Writer {
                    target: id.to_string(),
                    overwrite: false,
                };
                let writer = table.intern(InternKey::Writer(id.to_string()), writer);
                return Ok(RemoteValue::Handle(writer));
            }
            _ => {}
        }

        let spec = self
            .classes
            .get(&instance.class_name)
            .ok_or_else(|| no_such_method(&instance.class_name, method))?;
        let (accessor, param) = spec
            .find_accessor(method)
            .ok_or_else(|| no_such_method(&instance.class_name, method))?;

        match accessor {
            Accessor::Set => {
                let value = single_arg(method, args)?;
                if !table.accepts(param.kind, &value) {
                    return Err(thrown(
                        method,
                        exceptions::ILLEGAL_ARGUMENT,
                        format!(
                            "{} parameter {} given invalid value of kind {}",
                            instance.class_name,
                            param.name,
                            value.kind()
                        ),
                    ));
                }
                let value = match (param.kind, value) {
                    (ParamKind::Long, RemoteValue::Int(v)) => RemoteValue::Long(i64::from(v)),
                    (_, value) => value,
                };
                if let Some(RuntimeObject::Instance(live)) = table.get_mut(id) {
                    live.params.insert(param.name.to_string(), value);
                }
                Ok(RemoteValue::Handle(target_handle(table, id, method)?))
            }
            Accessor::Get => {
                let value = instance.params.get(param.name).cloned().ok_or_else(|| {
                    thrown(
                        method,
                        exceptions::NO_SUCH_ELEMENT,
                        format!("Failed to find a default value for {}", param.name),
                    )
                })?;
                // Payload-map arrays come back as an array of map handles.
                if param.kind == ParamKind::PayloadMapArray {
                    if let Some(RuntimeObject::ArrayList(items)) =
                        value.as_handle().and_then(|h| table.get(h.id()))
                    {
                        return Ok(RemoteValue::Array(items.clone()));
                    }
                }
                Ok(value)
            }
        }
    }

    fn save(
        &self,
        table: &ObjectTable,
        id: &str,
        path: &str,
        overwrite: bool,
        method: &str,
    ) -> Result<()> {
        let dir = self.resolve_path(path);
        let saved = snapshot::capture(table, id).map_err(|e| as_thrown(method, e))?;
        snapshot::write_dir(&dir, &saved, overwrite).map_err(|e| as_thrown(method, e))?;
        debug!("Saved {} ({}) to {}", saved.uid, saved.class_name, dir.display());
        Ok(())
    }

    fn load(
        &self,
        table: &mut ObjectTable,
        class_name: &str,
        path: &str,
        method: &str,
    ) -> Result<RemoteValue> {
        let dir = self.resolve_path(path);
        let saved = snapshot::read_dir(&dir).map_err(|e| as_thrown(method, e))?;
        if saved.class_name != class_name {
            return Err(thrown(
                method,
                exceptions::ILLEGAL_ARGUMENT,
                format!(
                    "Saved object at {} is a {}, expected {}",
                    dir.display(),
                    saved.class_name,
                    class_name
                ),
            ));
        }
        debug!("Loading {} from {}", class_name, dir.display());
        snapshot::restore(table, saved).map_err(|e| as_thrown(method, e))
    }
}

impl Bridge for LocalRuntime {
    fn invoke(
        &self,
        target: &RemoteHandle,
        method: &str,
        args: Vec<RemoteValue>,
    ) -> Result<RemoteValue> {
        let mut table = self.lock()?;
        self.invoke_object(&mut table, target, method, args)
    }

    fn construct(&self, class_name: &str, args: Vec<RemoteValue>) -> Result<RemoteHandle> {
        let mut table = self.lock()?;
        match class_name {
            JvmClasses::HASH_MAP => Ok(table.insert(RuntimeObject::HashMap(HashMap::new()))),
            JvmClasses::ARRAY_LIST => Ok(table.insert(RuntimeObject::ArrayList(Vec::new()))),
            _ => {
                let spec = self.classes.get(class_name).ok_or_else(|| {
                    BridgeError::RemoteConstruction {
                        class_name: class_name.to_string(),
                        message: format!("{}: {}", exceptions::CLASS_NOT_FOUND, class_name),
                    }
                })?;
                let uid = match args.as_slice() {
                    [] => None,
                    [RemoteValue::String(uid)] => Some(uid.clone()),
                    _ => {
                        return Err(BridgeError::RemoteConstruction {
                            class_name: class_name.to_string(),
                            message: format!(
                                "{}: {} takes no arguments or a uid string",
                                exceptions::NO_SUCH_METHOD,
                                class_name
                            ),
                        })
                    }
                };
                table.instantiate(spec, uid)
            }
        }
    }

    fn call_static(
        &self,
        class_name: &str,
        method: &str,
        args: Vec<RemoteValue>,
    ) -> Result<RemoteValue> {
        let mut table = self.lock()?;

        if class_name == self.utils_class {
            return match method {
                "convertToJavaMap" => {
                    let value = single_arg(method, args)?;
                    match value.as_handle().map(|h| table.get(h.id())) {
                        Some(Some(RuntimeObject::HashMap(_))) => Ok(value),
                        _ => Err(thrown(
                            method,
                            exceptions::ILLEGAL_ARGUMENT,
                            format!("Expected a map, got {}", value.kind()),
                        )),
                    }
                }
                "mapScalaToJava" => single_arg(method, args),
                _ => Err(no_such_method(class_name, method)),
            };
        }

        if class_name == JvmClasses::DATA_TYPE {
            return match method {
                "fromJson" => {
                    let json = string_arg(method, &args, 0)?;
                    let data_type =
                        DataType::from_json(&json).map_err(|e| as_thrown(method, e))?;
                    let key = InternKey::DataType(data_type.json());
                    let handle = table.intern(key, RuntimeObject::DataType(data_type));
                    Ok(RemoteValue::Handle(handle))
                }
                _ => Err(no_such_method(class_name, method)),
            };
        }

        if !self.classes.contains_key(class_name) {
            return Err(thrown(
                method,
                exceptions::CLASS_NOT_FOUND,
                class_name.to_string(),
            ));
        }

        match method {
            "load" => {
                let path = string_arg(method, &args, 0)?;
                self.load(&mut table, class_name, &path, method)
            }
            "read" => {
                let reader = RuntimeObject::Reader {
                    class_name: class_name.to_string(),
                };
                let reader = table.intern(InternKey::Reader(class_name.to_string()), reader);
                Ok(RemoteValue::Handle(reader))
            }
            _ => Err(no_such_method(class_name, method)),
        }
    }
}

#[async_trait::async_trait]
impl BridgeDispatch for LocalRuntime {
    async fn dispatch(&self, call: BridgeCall) -> Result<RemoteValue> {
        let runtime = self.clone();
        tokio::task::spawn_blocking(move || call.execute(&runtime))
            .await
            .map_err(|e| BridgeError::protocol(format!("Runtime call failed to complete: {}", e)))?
    }
}

fn invoke_hash_map(
    table: &mut ObjectTable,
    id: &str,
    method: &str,
    args: Vec<RemoteValue>,
) -> Result<RemoteValue> {
    match method {
        "put" => {
            let [key, value] = two_args(method, args)?;
            let key = table.key_string(method, &key)?;
            match table.get_mut(id) {
                Some(RuntimeObject::HashMap(entries)) => {
                    Ok(entries.insert(key, value).unwrap_or(RemoteValue::Null))
                }
                _ => Err(thrown(method, exceptions::ILLEGAL_STATE, id.to_string())),
            }
        }
        "get" | "containsKey" => {
            let key = single_arg(method, args)?;
            let key = table.key_string(method, &key)?;
            let entries = match table.get(id) {
                Some(RuntimeObject::HashMap(entries)) => entries,
                _ => return Err(thrown(method, exceptions::ILLEGAL_STATE, id.to_string())),
            };
            if method == "containsKey" {
                Ok(RemoteValue::Bool(entries.contains_key(&key)))
            } else {
                Ok(entries.get(&key).cloned().unwrap_or(RemoteValue::Null))
            }
        }
        "keySet" => {
            let keys = match table.get(id) {
                Some(RuntimeObject::HashMap(entries)) => {
                    let mut keys: Vec<String> = entries.keys().cloned().collect();
                    keys.sort_unstable();
                    keys
                }
                _ => return Err(thrown(method, exceptions::ILLEGAL_STATE, id.to_string())),
            };
            let view = table.intern(InternKey::KeySet(id.to_string()), RuntimeObject::KeySet(keys));
            Ok(RemoteValue::Handle(view))
        }
        "size" => match table.get(id) {
            Some(RuntimeObject::HashMap(entries)) => Ok(RemoteValue::Int(len_i32(entries.len()))),
            _ => Err(thrown(method, exceptions::ILLEGAL_STATE, id.to_string())),
        },
        _ => Err(no_such_method(JvmClasses::HASH_MAP, method)),
    }
}

fn invoke_array_list(
    table: &mut ObjectTable,
    id: &str,
    items: Vec<RemoteValue>,
    method: &str,
    args: Vec<RemoteValue>,
) -> Result<RemoteValue> {
    match method {
        "add" => {
            let item = single_arg(method, args)?;
            if let Some(RuntimeObject::ArrayList(live)) = table.get_mut(id) {
                live.push(item);
            }
            Ok(RemoteValue::Bool(true))
        }
        "get" => {
            let index = match single_arg(method, args)? {
                RemoteValue::Int(i) => usize::try_from(i).ok(),
                other => {
                    return Err(thrown(
                        method,
                        exceptions::ILLEGAL_ARGUMENT,
                        format!("Index must be an int, got {}", other.kind()),
                    ))
                }
            };
            index
                .and_then(|i| items.get(i).cloned())
                .ok_or_else(|| {
                    thrown(
                        method,
                        exceptions::INDEX_OUT_OF_BOUNDS,
                        format!("Index out of range for length {}", items.len()),
                    )
                })
        }
        "size" => Ok(RemoteValue::Int(len_i32(items.len()))),
        "toArray" => Ok(RemoteValue::Array(items)),
        _ => Err(no_such_method(JvmClasses::ARRAY_LIST, method)),
    }
}

fn target_handle(table: &ObjectTable, id: &str, method: &str) -> Result<RemoteHandle> {
    table
        .handle(id)
        .ok_or_else(|| thrown(method, exceptions::ILLEGAL_STATE, id.to_string()))
}

fn no_such_method(class_name: &str, method: &str) -> BridgeError {
    thrown(
        method,
        exceptions::NO_SUCH_METHOD,
        format!("{}.{}", class_name, method),
    )
}

/// Report an internal failure the way the remote side would: as a thrown exception.
fn as_thrown(method: &str, err: BridgeError) -> BridgeError {
    match err {
        BridgeError::RemoteInvocation { .. } => err,
        BridgeError::Io { message, .. } => thrown(method, exceptions::IO, message),
        other => thrown(method, exceptions::ILLEGAL_ARGUMENT, other.to_string()),
    }
}

fn single_arg(method: &str, args: Vec<RemoteValue>) -> Result<RemoteValue> {
    let [value] = <[RemoteValue; 1]>::try_from(args).map_err(|args| {
        thrown(
            method,
            exceptions::ILLEGAL_ARGUMENT,
            format!("Expected 1 argument, got {}", args.len()),
        )
    })?;
    Ok(value)
}

fn two_args(method: &str, args: Vec<RemoteValue>) -> Result<[RemoteValue; 2]> {
    <[RemoteValue; 2]>::try_from(args).map_err(|args| {
        thrown(
            method,
            exceptions::ILLEGAL_ARGUMENT,
            format!("Expected 2 arguments, got {}", args.len()),
        )
    })
}

fn string_arg(method: &str, args: &[RemoteValue], index: usize) -> Result<String> {
    match args.get(index) {
        Some(RemoteValue::String(s)) => Ok(s.clone()),
        Some(other) => Err(thrown(
            method,
            exceptions::ILLEGAL_ARGUMENT,
            format!("Expected a string argument, got {}", other.kind()),
        )),
        None => Err(thrown(
            method,
            exceptions::ILLEGAL_ARGUMENT,
            "Missing string argument",
        )),
    }
}

fn len_i32(len: usize) -> i32 {
    i32::try_from(len).unwrap_or(i32::MAX)
}

fn id_hash(id: &str) -> i32 {
    id.bytes()
        .fold(0i32, |h, b| h.wrapping_mul(31).wrapping_add(i32::from(b)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ParamSpec;

    const RESIZE: &str = "com.example.Resize";

    fn runtime() -> LocalRuntime {
        LocalRuntime::new(vec![ClassSpec::new(RESIZE)
            .param(ParamSpec::new("width", ParamKind::Integer))
            .param(ParamSpec::new("seed", ParamKind::Long))
            .param(ParamSpec::new("inputCol", ParamKind::String).with_default("image"))])
    }

    #[test]
    fn test_setter_returns_receiver_and_getter_reads_back() {
        let rt = runtime();
        let obj = rt.construct(RESIZE, vec![]).unwrap();

        let returned = rt.invoke(&obj, "setWidth", vec![RemoteValue::Int(224)]).unwrap();
        assert_eq!(returned.as_handle().unwrap().id(), obj.id());
        assert_eq!(
            rt.invoke(&obj, "getWidth", vec![]).unwrap(),
            RemoteValue::Int(224)
        );
        assert_eq!(
            rt.invoke(&obj, "getInputCol", vec![]).unwrap(),
            RemoteValue::from("image")
        );
    }

    #[test]
    fn test_long_setter_widens_int() {
        let rt = runtime();
        let obj = rt.construct(RESIZE, vec![]).unwrap();
        rt.invoke(&obj, "setSeed", vec![RemoteValue::Int(7)]).unwrap();
        assert_eq!(
            rt.invoke(&obj, "getSeed", vec![]).unwrap(),
            RemoteValue::Long(7)
        );
    }

    #[test]
    fn test_getter_without_value_or_default_throws() {
        let rt = runtime();
        let obj = rt.construct(RESIZE, vec![]).unwrap();
        match rt.invoke(&obj, "getWidth", vec![]).unwrap_err() {
            BridgeError::RemoteInvocation {
                exception_class,
                message,
                ..
            } => {
                assert_eq!(exception_class, exceptions::NO_SUCH_ELEMENT);
                assert_eq!(message, "Failed to find a default value for width");
            }
            other => panic!("Expected RemoteInvocation, got: {:?}", other),
        }
    }

    #[test]
    fn test_setter_rejects_wrong_kind() {
        let rt = runtime();
        let obj = rt.construct(RESIZE, vec![]).unwrap();
        let err = rt
            .invoke(&obj, "setWidth", vec![RemoteValue::from("wide")])
            .unwrap_err();
        assert!(matches!(
            err,
            BridgeError::RemoteInvocation { ref exception_class, .. }
                if exception_class == exceptions::ILLEGAL_ARGUMENT
        ));
    }

    #[test]
    fn test_unknown_class_and_method() {
        let rt = runtime();
        assert!(matches!(
            rt.construct("not.a.real.Class", vec![]).unwrap_err(),
            BridgeError::RemoteConstruction { .. }
        ));

        let obj = rt.construct(RESIZE, vec![]).unwrap();
        assert!(matches!(
            rt.invoke(&obj, "transform", vec![]).unwrap_err(),
            BridgeError::RemoteInvocation { ref exception_class, .. }
                if exception_class == exceptions::NO_SUCH_METHOD
        ));
    }

    #[test]
    fn test_construct_with_uid() {
        let rt = runtime();
        let obj = rt
            .construct(RESIZE, vec![RemoteValue::from("Resize_fixed")])
            .unwrap();
        assert_eq!(
            rt.invoke(&obj, "uid", vec![]).unwrap(),
            RemoteValue::from("Resize_fixed")
        );
    }

    #[test]
    fn test_class_reports_type_name() {
        let rt = runtime();
        let obj = rt.construct(RESIZE, vec![]).unwrap();
        let class = rt.invoke(&obj, "getClass", vec![]).unwrap();
        let name = rt
            .invoke(class.as_handle().unwrap(), "getTypeName", vec![])
            .unwrap();
        assert_eq!(name, RemoteValue::from(RESIZE));
    }

    #[test]
    fn test_static_on_unknown_class_throws_class_not_found() {
        let rt = runtime();
        let err = rt
            .call_static("not.a.real.Class", "load", vec![RemoteValue::from("/tmp/x")])
            .unwrap_err();
        assert!(matches!(
            err,
            BridgeError::RemoteInvocation { ref exception_class, .. }
                if exception_class == exceptions::CLASS_NOT_FOUND
        ));
    }

    #[test]
    fn test_repeated_lookups_reuse_objects() {
        let rt = runtime();
        let obj = rt.construct(RESIZE, vec![]).unwrap();
        let map = rt.construct(JvmClasses::HASH_MAP, vec![]).unwrap();
        rt.invoke(
            &map,
            "put",
            vec![RemoteValue::from("input"), RemoteValue::from("image")],
        )
        .unwrap();

        let read_all = || {
            rt.invoke(&obj, "getClass", vec![]).unwrap();
            let keys = rt.invoke(&map, "keySet", vec![]).unwrap();
            rt.invoke(keys.as_handle().unwrap(), "toArray", vec![]).unwrap();
            rt.call_static(
                JvmClasses::DATA_TYPE,
                "fromJson",
                vec![RemoteValue::from(DataType::Float.json())],
            )
            .unwrap();
            rt.invoke(&obj, "write", vec![]).unwrap();
            rt.call_static(RESIZE, "read", vec![]).unwrap();
        };

        read_all();
        let settled = rt.object_count().unwrap();
        for _ in 0..1000 {
            read_all();
        }
        assert_eq!(rt.object_count().unwrap(), settled);
    }

    #[test]
    fn test_key_set_tracks_later_puts() {
        let rt = runtime();
        let map = rt.construct(JvmClasses::HASH_MAP, vec![]).unwrap();
        rt.invoke(&map, "put", vec![RemoteValue::from("a"), RemoteValue::from("1")])
            .unwrap();
        let first = rt.invoke(&map, "keySet", vec![]).unwrap();

        rt.invoke(&map, "put", vec![RemoteValue::from("b"), RemoteValue::from("2")])
            .unwrap();
        let second = rt.invoke(&map, "keySet", vec![]).unwrap();

        assert_eq!(first, second);
        assert_eq!(
            rt.invoke(second.as_handle().unwrap(), "size", vec![]).unwrap(),
            RemoteValue::Int(2)
        );
    }

    #[test]
    fn test_clones_share_objects() {
        let rt = runtime();
        let other = rt.clone();
        let obj = rt.construct(RESIZE, vec![]).unwrap();
        other
            .invoke(&obj, "setWidth", vec![RemoteValue::Int(32)])
            .unwrap();
        assert_eq!(
            rt.invoke(&obj, "getWidth", vec![]).unwrap(),
            RemoteValue::Int(32)
        );
        assert_eq!(other.object_count().unwrap(), rt.object_count().unwrap());
    }

    #[tokio::test]
    async fn test_dispatch_leaves_the_executor_free() {
        let rt = runtime();
        let holder = rt.clone();
        let (locked_tx, locked_rx) = std::sync::mpsc::channel();
        let busy = std::thread::spawn(move || {
            let _table = holder.lock().unwrap();
            locked_tx.send(()).unwrap();
            std::thread::sleep(std::time::Duration::from_millis(300));
        });
        locked_rx.recv().unwrap();

        let call = BridgeCall::Construct(crate::bridge::ConstructParams {
            class_name: RESIZE.to_string(),
            args: vec![],
        });
        let dispatch = rt.dispatch(call);
        tokio::pin!(dispatch);

        // A blocked call must not stall timers on this single-threaded runtime
        let timer_fired = tokio::select! {
            _ = tokio::time::sleep(std::time::Duration::from_millis(20)) => true,
            _ = &mut dispatch => false,
        };
        assert!(timer_fired);
        assert!(dispatch.await.unwrap().as_handle().is_some());
        busy.join().unwrap();
    }

    #[test]
    fn test_relative_paths_use_base_dir() {
        let temp = tempfile::TempDir::new().unwrap();
        let rt = runtime().with_base_dir(temp.path());
        let obj = rt.construct(RESIZE, vec![]).unwrap();

        rt.invoke(&obj, "save", vec![RemoteValue::from("resize")])
            .unwrap();
        assert!(temp.path().join("resize").join("metadata.json").exists());

        let loaded = rt
            .call_static(RESIZE, "load", vec![RemoteValue::from("resize")])
            .unwrap();
        assert!(loaded.as_handle().is_some());
    }
}
