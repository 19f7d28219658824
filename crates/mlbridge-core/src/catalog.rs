//! Parameter catalogs describing remote classes.
//!
//! A catalog entry names one configurable field of a remote class and its
//! semantic type. Accessor method names are derived from the parameter name
//! (`width` -> `setWidth` / `getWidth`).

use crate::value::RemoteValue;
use serde::{Deserialize, Serialize};

/// Semantic type of a catalog parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamKind {
    Boolean,
    Integer,
    Long,
    Double,
    String,
    Bytes,
    StringArray,
    DoubleArray,
    /// String-to-string map, stored remotely as a map object
    StringMap,
    /// Nested transformer handle
    Transformer,
    /// Array of string-keyed maps with values of any marshaled type
    PayloadMapArray,
    /// Structured data-type descriptor
    DataType,
}

impl ParamKind {
    /// Kinds whose remote value is an object handle rather than a plain value.
    pub fn is_object(&self) -> bool {
        matches!(
            self,
            ParamKind::StringMap
                | ParamKind::Transformer
                | ParamKind::PayloadMapArray
                | ParamKind::DataType
        )
    }
}

/// One named, typed parameter of a remote class.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamSpec {
    pub name: &'static str,
    pub kind: ParamKind,
    pub default: Option<RemoteValue>,
    pub doc: &'static str,
}

impl ParamSpec {
    pub fn new(name: &'static str, kind: ParamKind) -> Self {
        Self {
            name,
            kind,
            default: None,
            doc: "",
        }
    }

    pub fn with_default(mut self, default: impl Into<RemoteValue>) -> Self {
        self.default = Some(default.into());
        self
    }

    pub fn with_doc(mut self, doc: &'static str) -> Self {
        self.doc = doc;
        self
    }

    pub fn setter(&self) -> String {
        accessor_name("set", self.name)
    }

    pub fn getter(&self) -> String {
        accessor_name("get", self.name)
    }
}

/// Full parameter catalog for one remote class.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassSpec {
    pub class_name: &'static str,
    pub params: Vec<ParamSpec>,
}

impl ClassSpec {
    pub fn new(class_name: &'static str) -> Self {
        Self {
            class_name,
            params: Vec::new(),
        }
    }

    pub fn param(mut self, spec: ParamSpec) -> Self {
        self.params.push(spec);
        self
    }

    pub fn find(&self, name: &str) -> Option<&ParamSpec> {
        self.params.iter().find(|p| p.name == name)
    }

    /// Match an accessor method name (`setWidth`, `getWidth`) to its parameter.
    pub fn find_accessor(&self, method: &str) -> Option<(Accessor, &ParamSpec)> {
        let (accessor, rest) = if let Some(rest) = method.strip_prefix("set") {
            (Accessor::Set, rest)
        } else if let Some(rest) = method.strip_prefix("get") {
            (Accessor::Get, rest)
        } else {
            return None;
        };

        self.params
            .iter()
            .find(|p| capitalize(p.name) == rest)
            .map(|p| (accessor, p))
    }

    /// Short class name (after the last `.`).
    pub fn simple_name(&self) -> &'static str {
        self.class_name
            .rsplit('.')
            .next()
            .unwrap_or(self.class_name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Accessor {
    Get,
    Set,
}

/// Build `setFoo` / `getFoo` from a parameter name.
pub fn accessor_name(prefix: &str, param: &str) -> String {
    format!("{}{}", prefix, capitalize(param))
}

fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
