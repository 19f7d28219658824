//! Opaque tokens naming live objects inside the remote runtime.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of one object living in the remote runtime.
///
/// The proxy never interprets the id; it only hands it back to the bridge.
/// `class_name` is the name the object was constructed with, when the bridge
/// reports it. It is a hint only: nested-object resolution asks the remote side.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RemoteHandle {
    id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    class_name: Option<String>,
}

impl RemoteHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            class_name: None,
        }
    }

    pub fn with_class(id: impl Into<String>, class_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            class_name: Some(class_name.into()),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn class_name(&self) -> Option<&str> {
        self.class_name.as_deref()
    }
}

impl fmt::Display for RemoteHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.class_name {
            Some(class) => write!(f, "{} ({})", self.id, class),
            None => write!(f, "{}", self.id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_class_name_is_omitted_when_absent() {
        let json = serde_json::to_string(&RemoteHandle::new("o12")).unwrap();
        assert_eq!(json, r#"{"id":"o12"}"#);
    }

    #[test]
    fn test_display_includes_class() {
        let handle = RemoteHandle::with_class("o3", "java.util.HashMap");
        assert_eq!(handle.to_string(), "o3 (java.util.HashMap)");
    }
}
