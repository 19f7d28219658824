//! mlbridge-stages - Typed wrappers for remote image and model stages.
//!
//! Each wrapper is generated from its parameter catalog with
//! [`mlbridge::remote_class!`]: one setter and one getter per parameter, plus
//! save/load through [`mlbridge::RemoteWrapper`].
//!
//! # Example
//!
//! ```rust,ignore
//! use mlbridge::{Jvm, LocalRuntime, RemoteWrapper};
//! use mlbridge_stages::{catalog, ResizeImageTransformer};
//!
//! fn main() -> mlbridge::Result<()> {
//!     let jvm = Jvm::from_bridge(LocalRuntime::new(catalog()));
//!
//!     let resize = ResizeImageTransformer::new(&jvm)?
//!         .set_height(100)?
//!         .set_width(50)?;
//!     resize.save("/tmp/resize")?;
//!
//!     let loaded = ResizeImageTransformer::load(&jvm, "/tmp/resize")?;
//!     assert_eq!(loaded.get_width()?, 50);
//!     Ok(())
//! }
//! ```

pub mod cntk;
pub mod image;
pub mod onnx;
pub mod opencv;
pub mod stages;
pub mod transformer;

pub use cntk::{CNTKModel, ImageFeaturizer};
pub use image::{ResizeImageTransformer, UnrollBinaryImage, UnrollImage};
pub use onnx::ONNXModel;
pub use opencv::{ImageSetAugmenter, ImageTransformer};
pub use stages::{FixedMiniBatchTransformer, FlattenBatch, TextPreprocessor};
pub use transformer::{catalog, registry, Transformer};
