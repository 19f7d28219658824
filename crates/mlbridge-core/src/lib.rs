//! mlbridge - Remote-object proxy runtime for JVM-hosted machine-learning classes.
//!
//! Local code constructs typed handles to objects living in a remote runtime,
//! forwards setter/getter/method calls across a [`Bridge`], and marshals
//! scalars, byte payloads, sequences, maps, nested objects and data types in
//! both directions.
//!
//! # Example
//!
//! ```rust,ignore
//! use mlbridge::{Jvm, TcpBridge};
//!
//! fn main() -> mlbridge::Result<()> {
//!     let bridge = TcpBridge::connect("127.0.0.1:5567".parse().unwrap())?;
//!     let jvm = Jvm::from_bridge(bridge);
//!
//!     let resize = jvm.construct("com.microsoft.azure.synapse.ml.image.ResizeImageTransformer", vec![])?;
//!     let resize = resize.set_param("width", &224)?;
//!     let width: i32 = resize.get_param("width")?;
//!     println!("width = {}", width);
//!
//!     Ok(())
//! }
//! ```

mod macros;

pub mod bridge;
pub mod catalog;
pub mod config;
pub mod error;
pub mod handle;
pub mod marshal;
pub mod persistence;
pub mod proxy;
pub mod registry;
pub mod runtime;
pub mod transport;
pub mod types;
pub mod value;

// Re-export commonly used types
pub use bridge::{Bridge, BridgeCall};
pub use catalog::{ClassSpec, ParamKind, ParamSpec};
pub use config::{BridgeConfig, JvmClasses};
pub use error::{BridgeError, Result};
pub use handle::RemoteHandle;
pub use marshal::{ParamValue, PayloadMap, StringMap};
pub use persistence::{MlReader, MlWriter, RemoteWrapper};
pub use proxy::{Jvm, RemoteObject};
pub use registry::{WrapperFactory, WrapperRegistry};
pub use runtime::LocalRuntime;
pub use transport::{BridgeServer, BridgeServerHandle, TcpBridge};
pub use types::DataType;
pub use value::{FromRemote, RemoteValue};

/// Re-exported for generated wrappers.
pub use bytes::Bytes;
