//! Typed wrappers and their save/load helpers.
//!
//! Paths are opaque strings handed to the remote runtime; the proxy never
//! touches the file system itself.

use crate::catalog::ClassSpec;
use crate::config::JvmClasses;
use crate::error::Result;
use crate::handle::RemoteHandle;
use crate::proxy::{Jvm, RemoteObject};
use crate::value::{FromRemote, RemoteValue};
use std::marker::PhantomData;

/// A typed local wrapper around one remote class.
///
/// Implemented by every class generated with [`remote_class!`](crate::remote_class).
pub trait RemoteWrapper: Sized {
    /// Fully qualified remote class name.
    const CLASS_NAME: &'static str;

    fn from_object(object: RemoteObject) -> Self;

    fn object(&self) -> &RemoteObject;

    /// Parameter catalog of the class.
    fn catalog() -> ClassSpec;

    fn uid(&self) -> Result<String> {
        self.object().uid()
    }

    /// Save to `path` through the remote runtime. Fails if `path` already exists.
    fn save(&self, path: &str) -> Result<()> {
        self.object().invoke("save", vec![RemoteValue::from(path)])?;
        Ok(())
    }

    /// Load a previously saved instance of this class.
    fn load(jvm: &Jvm, path: &str) -> Result<Self> {
        let value = jvm.call_static(Self::CLASS_NAME, "load", vec![RemoteValue::from(path)])?;
        let handle = RemoteHandle::from_remote(value)?;
        Ok(wrap(jvm, handle))
    }

    /// Writer with extra save options.
    fn write(&self) -> Result<MlWriter> {
        let value = self.object().invoke("write", Vec::new())?;
        let handle = RemoteHandle::from_remote(value)?;
        Ok(MlWriter {
            object: RemoteObject::from_handle(
                self.object().jvm().clone(),
                handle,
                JvmClasses::ML_WRITER,
            ),
        })
    }

    /// Reader producing instances of this class.
    fn read(jvm: &Jvm) -> Result<MlReader<Self>> {
        let value = jvm.call_static(Self::CLASS_NAME, "read", Vec::new())?;
        let handle = RemoteHandle::from_remote(value)?;
        Ok(MlReader {
            object: RemoteObject::from_handle(jvm.clone(), handle, JvmClasses::ML_READER),
            _marker: PhantomData,
        })
    }
}

fn wrap<W: RemoteWrapper>(jvm: &Jvm, handle: RemoteHandle) -> W {
    W::from_object(RemoteObject::from_handle(jvm.clone(), handle, W::CLASS_NAME))
}

/// Remote writer for one object.
#[derive(Debug)]
pub struct MlWriter {
    object: RemoteObject,
}

impl MlWriter {
    /// Allow `save` to replace an existing path.
    pub fn overwrite(&self) -> Result<MlWriter> {
        let object = self.object.invoke_chained("overwrite", Vec::new())?;
        Ok(MlWriter { object })
    }

    pub fn save(&self, path: &str) -> Result<()> {
        self.object.invoke("save", vec![RemoteValue::from(path)])?;
        Ok(())
    }

    pub fn object(&self) -> &RemoteObject {
        &self.object
    }
}

/// Remote reader for one wrapper type.
#[derive(Debug)]
pub struct MlReader<T> {
    object: RemoteObject,
    _marker: PhantomData<fn() -> T>,
}

impl<T: RemoteWrapper> MlReader<T> {
    pub fn load(&self, path: &str) -> Result<T> {
        let value = self.object.invoke("load", vec![RemoteValue::from(path)])?;
        let handle = RemoteHandle::from_remote(value)?;
        Ok(wrap(self.object.jvm(), handle))
    }

    pub fn object(&self) -> &RemoteObject {
        &self.object
    }
}
