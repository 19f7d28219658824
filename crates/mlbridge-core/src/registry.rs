//! Wrapper registry for nested remote objects.
//!
//! When a getter returns a handle to another remote object, the registry asks
//! the remote side for the object's class name and picks the matching local
//! wrapper. There is no fallback: an unregistered class is an error.

use crate::error::{BridgeError, Result};
use crate::handle::RemoteHandle;
use crate::persistence::RemoteWrapper;
use crate::proxy::{Jvm, RemoteObject};
use crate::value::{FromRemote, RemoteValue};
use std::collections::HashMap;
use std::fmt;
use tracing::debug;

/// Builds a local wrapper of type `T` around a resolved remote object.
pub type WrapperFactory<T> = fn(RemoteObject) -> T;

/// Maps remote class names to local wrapper constructors.
pub struct WrapperRegistry<T> {
    factories: HashMap<String, WrapperFactory<T>>,
}

impl<T> Default for WrapperRegistry<T> {
    fn default() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }
}

impl<T> fmt::Debug for WrapperRegistry<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        names.sort_unstable();
        f.debug_struct("WrapperRegistry")
            .field("classes", &names)
            .finish()
    }
}

impl<T> WrapperRegistry<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory for `class_name`, replacing any previous entry.
    pub fn register(mut self, class_name: impl Into<String>, factory: WrapperFactory<T>) -> Self {
        self.factories.insert(class_name.into(), factory);
        self
    }

    /// Register a typed wrapper under its own class name.
    pub fn with<W>(self) -> Self
    where
        W: RemoteWrapper,
        T: From<W>,
    {
        self.register(W::CLASS_NAME, |object| T::from(W::from_object(object)))
    }

    pub fn contains(&self, class_name: &str) -> bool {
        self.factories.contains_key(class_name)
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }

    /// Registered class names, sorted.
    pub fn class_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Wrap the object behind `handle` according to its remote class.
    pub fn resolve(&self, jvm: &Jvm, handle: RemoteHandle) -> Result<T> {
        let class_name = jvm.type_name_of(&handle)?;
        debug!("resolving nested {} as {}", handle, class_name);

        let factory = self
            .factories
            .get(&class_name)
            .ok_or_else(|| BridgeError::UnknownRemoteType {
                class_name: class_name.clone(),
            })?;

        Ok(factory(RemoteObject::from_handle(
            jvm.clone(),
            handle,
            class_name,
        )))
    }

    /// Same as [`resolve`](Self::resolve) for a raw getter result.
    pub fn resolve_value(&self, jvm: &Jvm, value: RemoteValue) -> Result<T> {
        self.resolve(jvm, RemoteHandle::from_remote(value)?)
    }
}
