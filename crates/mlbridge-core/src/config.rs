//! Centralized configuration for mlbridge.
//!
//! Transport limits and the well-known remote class names the marshaling layer
//! relies on.

use std::time::Duration;

/// Transport-level configuration.
pub struct BridgeConfig;

impl BridgeConfig {
    /// Largest accepted JSON header. Byte payloads travel in binary sections
    /// after the header and are not limited.
    pub const MAX_HEADER_SIZE: usize = 64 * 1024 * 1024; // 64MB
    pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
    pub const MAX_CONNECTIONS: usize = 32;
    /// How long a connection turned away at capacity is kept open to read the
    /// peer's first request before closing.
    pub const REJECT_LINGER: Duration = Duration::from_secs(1);
    pub const JSONRPC_VERSION: &'static str = "2.0";
}

/// Remote class names used by the marshaling protocol.
pub struct JvmClasses;

impl JvmClasses {
    /// Static helpers for map conversion (`convertToJavaMap`, `mapScalaToJava`).
    pub const DEFAULT_UTILS: &'static str = "org.apache.spark.api.dotnet.DotnetUtils";
    pub const HASH_MAP: &'static str = "java.util.HashMap";
    pub const ARRAY_LIST: &'static str = "java.util.ArrayList";
    pub const KEY_SET: &'static str = "java.util.HashMap$KeySet";
    pub const STRING: &'static str = "java.lang.String";
    pub const CLASS: &'static str = "java.lang.Class";
    pub const DATA_TYPE: &'static str = "org.apache.spark.sql.types.DataType";
    pub const ML_WRITER: &'static str = "org.apache.spark.ml.util.MLWriter";
    pub const ML_READER: &'static str = "org.apache.spark.ml.util.MLReader";
}
