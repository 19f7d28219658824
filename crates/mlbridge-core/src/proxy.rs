//! Remote handle proxy.
//!
//! `Jvm` is the cheap, cloneable context every wrapper carries: it owns the
//! bridge and knows which utility class performs map conversion. `RemoteObject`
//! pairs a handle with the class name it was created as.
//!
//! Every call blocks until the bridge answers. Nothing is cached locally.

use crate::bridge::Bridge;
use crate::catalog::accessor_name;
use crate::config::JvmClasses;
use crate::error::{BridgeError, Result};
use crate::handle::RemoteHandle;
use crate::marshal::{self, ParamValue};
use crate::value::{FromRemote, RemoteValue};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Entry point into the remote runtime.
#[derive(Clone)]
pub struct Jvm {
    bridge: Arc<dyn Bridge>,
    utils_class: Arc<str>,
}

impl fmt::Debug for Jvm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Jvm")
            .field("utils_class", &self.utils_class)
            .finish_non_exhaustive()
    }
}

impl Jvm {
    pub fn new(bridge: Arc<dyn Bridge>) -> Self {
        Self {
            bridge,
            utils_class: Arc::from(JvmClasses::DEFAULT_UTILS),
        }
    }

    /// Wrap an owned bridge.
    pub fn from_bridge<B: Bridge + 'static>(bridge: B) -> Self {
        Self::new(Arc::new(bridge))
    }

    /// Override the class hosting `convertToJavaMap` / `mapScalaToJava`.
    pub fn with_utils_class(mut self, class_name: impl Into<String>) -> Self {
        self.utils_class = Arc::from(class_name.into());
        self
    }

    pub fn utils_class(&self) -> &str {
        &self.utils_class
    }

    pub fn bridge(&self) -> &dyn Bridge {
        self.bridge.as_ref()
    }

    /// Instantiate a remote class.
    ///
    /// Any failure on the way, including marshaling a map argument, is reported
    /// as `RemoteConstruction` for `class_name`.
    pub fn construct(&self, class_name: &str, args: Vec<RemoteValue>) -> Result<RemoteObject> {
        debug!("construct {} ({} args)", class_name, args.len());

        let construction_error = |err: BridgeError| match err {
            BridgeError::RemoteConstruction { .. } | BridgeError::RemoteProtocol { .. } => err,
            BridgeError::RemoteInvocation {
                exception_class,
                message,
                ..
            } => BridgeError::RemoteConstruction {
                class_name: class_name.to_string(),
                message: format!("{}: {}", exception_class, message),
            },
            other => BridgeError::RemoteConstruction {
                class_name: class_name.to_string(),
                message: other.to_string(),
            },
        };

        let args = self.marshal_args(args).map_err(construction_error)?;
        let handle = self
            .bridge
            .construct(class_name, args)
            .map_err(construction_error)?;

        Ok(RemoteObject::from_handle(self.clone(), handle, class_name))
    }

    /// Call `method` on a remote object.
    pub fn invoke(
        &self,
        handle: &RemoteHandle,
        method: &str,
        args: Vec<RemoteValue>,
    ) -> Result<RemoteValue> {
        debug!("invoke {}.{} ({} args)", handle, method, args.len());
        let args = self.marshal_args(args)?;
        self.bridge.invoke(handle, method, args)
    }

    /// Call a class-level method.
    pub fn call_static(
        &self,
        class_name: &str,
        method: &str,
        args: Vec<RemoteValue>,
    ) -> Result<RemoteValue> {
        debug!("call_static {}.{} ({} args)", class_name, method, args.len());
        let args = self.marshal_args(args)?;
        self.bridge.call_static(class_name, method, args)
    }

    /// Invoke a no-argument method and convert the result.
    pub fn get_typed<T: FromRemote>(&self, handle: &RemoteHandle, method: &str) -> Result<T> {
        self.invoke(handle, method, Vec::new())?.into_typed()
    }

    /// Fully qualified class name of the object behind `handle`, as the remote
    /// runtime reports it.
    pub fn type_name_of(&self, handle: &RemoteHandle) -> Result<String> {
        let class: RemoteHandle = self.get_typed(handle, "getClass")?;
        self.get_typed(&class, "getTypeName")
    }

    /// Convert a local value into its bridge form.
    ///
    /// Local maps become remote `HashMap` handles; arrays are converted
    /// element-wise. Everything else passes through untouched.
    pub fn marshal(&self, value: RemoteValue) -> Result<RemoteValue> {
        match value {
            RemoteValue::Map(entries) => {
                marshal::to_java_hash_map(self, entries).map(RemoteValue::Handle)
            }
            RemoteValue::Array(items) if items.iter().any(needs_marshaling) => items
                .into_iter()
                .map(|item| self.marshal(item))
                .collect::<Result<Vec<_>>>()
                .map(RemoteValue::Array),
            other => Ok(other),
        }
    }

    fn marshal_args(&self, args: Vec<RemoteValue>) -> Result<Vec<RemoteValue>> {
        if !args.iter().any(needs_marshaling) {
            return Ok(args);
        }
        args.into_iter().map(|arg| self.marshal(arg)).collect()
    }
}

fn needs_marshaling(value: &RemoteValue) -> bool {
    match value {
        RemoteValue::Map(_) => true,
        RemoteValue::Array(items) => items.iter().any(needs_marshaling),
        _ => false,
    }
}

/// Local proxy for one live remote object.
///
/// Not `Clone`: each wrapper owns its own copy of the handle, and operations
/// that hand back a remote object produce a fresh wrapper.
#[derive(Debug)]
pub struct RemoteObject {
    jvm: Jvm,
    handle: RemoteHandle,
    class_name: String,
}

impl RemoteObject {
    /// Construct a new remote instance.
    pub fn construct(jvm: &Jvm, class_name: &str, args: Vec<RemoteValue>) -> Result<Self> {
        jvm.construct(class_name, args)
    }

    /// Wrap a handle returned by another call.
    pub fn from_handle(jvm: Jvm, handle: RemoteHandle, class_name: impl Into<String>) -> Self {
        Self {
            jvm,
            handle,
            class_name: class_name.into(),
        }
    }

    pub fn jvm(&self) -> &Jvm {
        &self.jvm
    }

    pub fn handle(&self) -> &RemoteHandle {
        &self.handle
    }

    pub fn into_handle(self) -> RemoteHandle {
        self.handle
    }

    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    pub fn invoke(&self, method: &str, args: Vec<RemoteValue>) -> Result<RemoteValue> {
        self.jvm.invoke(&self.handle, method, args)
    }

    pub fn get_typed<T: FromRemote>(&self, method: &str) -> Result<T> {
        self.jvm.get_typed(&self.handle, method)
    }

    /// Invoke a method that returns the (possibly same) remote object.
    ///
    /// A handle result is wrapped with this object's class name; a void result
    /// means the receiver was mutated in place.
    pub fn invoke_chained(&self, method: &str, args: Vec<RemoteValue>) -> Result<RemoteObject> {
        match self.invoke(method, args)? {
            RemoteValue::Handle(handle) => Ok(RemoteObject::from_handle(
                self.jvm.clone(),
                handle,
                self.class_name.clone(),
            )),
            RemoteValue::Null => Ok(self.rewrap()),
            other => Err(BridgeError::type_mismatch("handle", other.kind())),
        }
    }

    /// Call `set<Name>` with a marshaled parameter value.
    pub fn set_param<V: ParamValue>(&self, name: &str, value: &V) -> Result<RemoteObject> {
        let remote = value.to_remote(&self.jvm)?;
        self.invoke_chained(&accessor_name("set", name), vec![remote])
    }

    /// Call `get<Name>` and unmarshal the result.
    pub fn get_param<V: ParamValue>(&self, name: &str) -> Result<V> {
        let value = self.invoke(&accessor_name("get", name), Vec::new())?;
        V::from_remote(&self.jvm, value)
    }

    /// Identifier the remote runtime assigned to this object.
    pub fn uid(&self) -> Result<String> {
        self.get_typed("uid")
    }

    /// Remote class name as reported by the runtime.
    pub fn remote_type_name(&self) -> Result<String> {
        self.jvm.type_name_of(&self.handle)
    }

    fn rewrap(&self) -> RemoteObject {
        RemoteObject::from_handle(
            self.jvm.clone(),
            self.handle.clone(),
            self.class_name.clone(),
        )
    }
}
