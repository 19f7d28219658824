//! On-disk form of saved runtime objects.
//!
//! A saved instance is a directory holding `metadata.json`: the instance's
//! class, uid and parameter values, with nested objects (maps, lists, data
//! types, other instances) stored inline. Directories are replaced atomically.

use super::objects::{Instance, ObjectTable, RuntimeObject};
use crate::error::{BridgeError, Result};
use crate::types::DataType;
use crate::value::RemoteValue;
use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::hash::{Hash, Hasher};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process;
use std::thread;
use tracing::{debug, warn};

pub(crate) const METADATA_FILE: &str = "metadata.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct SavedInstance {
    pub class_name: String,
    pub uid: String,
    pub params: BTreeMap<String, SavedValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub(crate) enum SavedValue {
    /// Scalar or bytes, stored as-is
    Value(RemoteValue),
    /// Plain array value
    Array(Vec<SavedValue>),
    Map(BTreeMap<String, SavedValue>),
    List(Vec<SavedValue>),
    Str(String),
    /// Canonical JSON text
    DataType(String),
    Instance(SavedInstance),
}

/// Capture an instance and everything it references.
pub(crate) fn capture(table: &ObjectTable, id: &str) -> Result<SavedInstance> {
    let mut stack = Vec::new();
    capture_instance(table, id, &mut stack)
}

fn capture_instance(table: &ObjectTable, id: &str, stack: &mut Vec<String>) -> Result<SavedInstance> {
    if stack.iter().any(|seen| seen == id) {
        return Err(BridgeError::Validation {
            field: "params".to_string(),
            message: format!("Object {} refers to itself", id),
        });
    }

    let instance = match table.get(id) {
        Some(RuntimeObject::Instance(instance)) => instance,
        Some(other) => {
            return Err(BridgeError::Validation {
                field: "target".to_string(),
                message: format!("{} cannot be saved", other.type_name()),
            })
        }
        None => {
            return Err(BridgeError::Validation {
                field: "target".to_string(),
                message: format!("No live object for handle {}", id),
            })
        }
    };

    stack.push(id.to_string());
    let mut params = BTreeMap::new();
    for (name, value) in &instance.params {
        params.insert(name.clone(), capture_value(table, value, stack)?);
    }
    stack.pop();

    Ok(SavedInstance {
        class_name: instance.class_name.clone(),
        uid: instance.uid.clone(),
        params,
    })
}

fn capture_value(table: &ObjectTable, value: &RemoteValue, stack: &mut Vec<String>) -> Result<SavedValue> {
    let handle = match value {
        RemoteValue::Handle(handle) => handle,
        RemoteValue::Array(items) => {
            return items
                .iter()
                .map(|item| capture_value(table, item, stack))
                .collect::<Result<Vec<_>>>()
                .map(SavedValue::Array)
        }
        other => return Ok(SavedValue::Value(other.clone())),
    };

    match table.get(handle.id()) {
        Some(RuntimeObject::Instance(_)) => {
            capture_instance(table, handle.id(), stack).map(SavedValue::Instance)
        }
        Some(RuntimeObject::HashMap(entries)) => {
            let mut saved = BTreeMap::new();
            for (key, value) in entries {
                saved.insert(key.clone(), capture_value(table, value, stack)?);
            }
            Ok(SavedValue::Map(saved))
        }
        Some(RuntimeObject::ArrayList(items)) => items
            .iter()
            .map(|item| capture_value(table, item, stack))
            .collect::<Result<Vec<_>>>()
            .map(SavedValue::List),
        Some(RuntimeObject::Str(s)) => Ok(SavedValue::Str(s.clone())),
        Some(RuntimeObject::DataType(dt)) => Ok(SavedValue::DataType(dt.json())),
        Some(other) => Err(BridgeError::Validation {
            field: "params".to_string(),
            message: format!("{} cannot be saved", other.type_name()),
        }),
        None => Err(BridgeError::Validation {
            field: "params".to_string(),
            message: format!("No live object for handle {}", handle.id()),
        }),
    }
}

/// Re-create a saved instance graph, returning the new root id's handle value.
pub(crate) fn restore(table: &mut ObjectTable, saved: SavedInstance) -> Result<RemoteValue> {
    let mut params = std::collections::HashMap::new();
    for (name, value) in saved.params {
        params.insert(name, restore_value(table, value)?);
    }
    let handle = table.insert(RuntimeObject::Instance(Instance {
        class_name: saved.class_name,
        uid: saved.uid,
        params,
    }));
    Ok(RemoteValue::Handle(handle))
}

fn restore_value(table: &mut ObjectTable, saved: SavedValue) -> Result<RemoteValue> {
    let value = match saved {
        SavedValue::Value(value) => value,
        SavedValue::Array(items) => RemoteValue::Array(
            items
                .into_iter()
                .map(|item| restore_value(table, item))
                .collect::<Result<Vec<_>>>()?,
        ),
        SavedValue::Map(entries) => {
            let mut map = std::collections::HashMap::new();
            for (key, value) in entries {
                map.insert(key, restore_value(table, value)?);
            }
            RemoteValue::Handle(table.insert(RuntimeObject::HashMap(map)))
        }
        SavedValue::List(items) => {
            let items = items
                .into_iter()
                .map(|item| restore_value(table, item))
                .collect::<Result<Vec<_>>>()?;
            RemoteValue::Handle(table.insert(RuntimeObject::ArrayList(items)))
        }
        SavedValue::Str(s) => RemoteValue::Handle(table.insert(RuntimeObject::Str(s))),
        SavedValue::DataType(json) => {
            let data_type = DataType::from_json(&json)?;
            RemoteValue::Handle(table.insert(RuntimeObject::DataType(data_type)))
        }
        SavedValue::Instance(instance) => restore(table, instance)?,
    };
    Ok(value)
}

/// Write a captured instance to `dir`.
///
/// The metadata is serialized, re-parsed, written and synced inside a staging
/// directory next to `dir`, which is then renamed into place. An existing
/// `dir` is an error unless `overwrite` is set. When it is, the old save is
/// only removed once the new one is in place, so a failed write leaves it
/// intact.
pub(crate) fn write_dir(dir: &Path, saved: &SavedInstance, overwrite: bool) -> Result<()> {
    if dir.exists() && !overwrite {
        return Err(BridgeError::Io {
            message: format!(
                "Path {} already exists. To overwrite it, please use write.overwrite().save(path)",
                dir.display()
            ),
            path: Some(dir.to_path_buf()),
            source: None,
        });
    }

    let serialized = serde_json::to_vec_pretty(saved)?;
    // A save that cannot be read back is not a save
    serde_json::from_slice::<SavedInstance>(&serialized).map_err(|e| BridgeError::Json {
        message: format!("Saved metadata failed validation: {}", e),
        source: Some(e),
    })?;

    if let Some(parent) = dir.parent() {
        fs::create_dir_all(parent).map_err(|e| BridgeError::io_with_path(e, parent))?;
    }

    let staging = sibling_path(dir, "tmp");
    if staging.is_dir() {
        fs::remove_dir_all(&staging).map_err(|e| BridgeError::io_with_path(e, &staging))?;
    }
    stage_metadata(&staging, &serialized).inspect_err(|_| {
        if staging.is_dir() {
            let _ = fs::remove_dir_all(&staging);
        }
    })?;

    let replaced = if dir.exists() {
        let old = sibling_path(dir, "old");
        fs::rename(dir, &old).map_err(|e| BridgeError::io_with_path(e, dir))?;
        Some(old)
    } else {
        None
    };

    if let Err(e) = fs::rename(&staging, dir) {
        if let Some(old) = &replaced {
            if let Err(restore_err) = fs::rename(old, dir) {
                warn!("Failed to restore {}: {}", dir.display(), restore_err);
            }
        }
        let _ = fs::remove_dir_all(&staging);
        return Err(BridgeError::io_with_path(e, dir));
    }

    if let Some(old) = replaced {
        let removed = if old.is_dir() {
            fs::remove_dir_all(&old)
        } else {
            fs::remove_file(&old)
        };
        if let Err(e) = removed {
            warn!("Failed to remove replaced save {}: {}", old.display(), e);
        }
    }

    debug!("Atomically wrote {}", dir.display());
    Ok(())
}

fn stage_metadata(staging: &Path, serialized: &[u8]) -> Result<()> {
    fs::create_dir(staging).map_err(|e| BridgeError::io_with_path(e, staging))?;
    let path = staging.join(METADATA_FILE);
    let mut file = File::create(&path).map_err(|e| BridgeError::io_with_path(e, &path))?;
    file.write_all(serialized)
        .and_then(|()| file.flush())
        .and_then(|()| file.sync_all())
        .map_err(|e| BridgeError::io_with_path(e, &path))
}

/// Hidden sibling of `dir` unique to this process and thread.
fn sibling_path(dir: &Path, suffix: &str) -> PathBuf {
    let name = dir
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    dir.with_file_name(format!(".{}.{}.{}.{}", name, process::id(), thread_id(), suffix))
}

fn thread_id() -> u64 {
    let mut hasher = DefaultHasher::new();
    format!("{:?}", thread::current().id()).hash(&mut hasher);
    hasher.finish()
}

/// Read a saved instance from `dir`.
pub(crate) fn read_dir(dir: &Path) -> Result<SavedInstance> {
    let path = dir.join(METADATA_FILE);
    let bytes = fs::read(&path).map_err(|e| BridgeError::io_with_path(e, &path))?;
    Ok(serde_json::from_slice(&bytes)?)
}
