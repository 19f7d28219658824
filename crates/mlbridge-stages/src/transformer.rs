//! Nested transformer parameters.
//!
//! Some parameters hold another remote stage (a featurizer's model, a model's
//! mini-batcher). Their getters resolve the returned handle through a
//! process-wide registry keyed by remote class name.

use crate::cntk::{CNTKModel, ImageFeaturizer};
use crate::image::{ResizeImageTransformer, UnrollBinaryImage, UnrollImage};
use crate::onnx::ONNXModel;
use crate::opencv::{ImageSetAugmenter, ImageTransformer};
use crate::stages::{FixedMiniBatchTransformer, FlattenBatch, TextPreprocessor};
use mlbridge::{
    ClassSpec, Jvm, ParamKind, ParamValue, RemoteObject, RemoteValue, RemoteWrapper, Result,
    WrapperRegistry,
};
use std::sync::OnceLock;
use tracing::debug;

macro_rules! transformers {
    ($($variant:ident),* $(,)?) => {
        /// Any stage that can be passed where a transformer is expected.
        #[derive(Debug)]
        pub enum Transformer {
            $($variant($variant)),*
        }

        impl Transformer {
            /// Remote class name of the wrapped stage.
            pub fn class_name(&self) -> &'static str {
                match self {
                    $(Self::$variant(_) => <$variant as RemoteWrapper>::CLASS_NAME),*
                }
            }

            pub fn object(&self) -> &RemoteObject {
                match self {
                    $(Self::$variant(stage) => stage.object()),*
                }
            }
        }

        $(
            impl From<$variant> for Transformer {
                fn from(stage: $variant) -> Self {
                    Self::$variant(stage)
                }
            }
        )*

        fn build_registry() -> WrapperRegistry<Transformer> {
            WrapperRegistry::new()
                $(.with::<$variant>())*
        }

        /// Parameter catalogs of every wrapped class.
        pub fn catalog() -> Vec<ClassSpec> {
            vec![$(<$variant as RemoteWrapper>::catalog()),*]
        }
    };
}

transformers! {
    ImageTransformer,
    ImageSetAugmenter,
    ResizeImageTransformer,
    UnrollImage,
    UnrollBinaryImage,
    ImageFeaturizer,
    CNTKModel,
    ONNXModel,
    FixedMiniBatchTransformer,
    FlattenBatch,
    TextPreprocessor,
}

static REGISTRY: OnceLock<WrapperRegistry<Transformer>> = OnceLock::new();

/// Registry resolving nested transformer handles. Built on first use.
pub fn registry() -> &'static WrapperRegistry<Transformer> {
    REGISTRY.get_or_init(|| {
        let registry = build_registry();
        debug!("Registered {} transformer wrappers", registry.len());
        registry
    })
}

impl ParamValue for Transformer {
    const KIND: ParamKind = ParamKind::Transformer;

    fn to_remote(&self, _jvm: &Jvm) -> Result<RemoteValue> {
        Ok(RemoteValue::Handle(self.object().handle().clone()))
    }

    fn from_remote(jvm: &Jvm, value: RemoteValue) -> Result<Self> {
        registry().resolve_value(jvm, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_covers_every_catalog_class() {
        let registry = registry();
        let catalog = catalog();
        assert_eq!(registry.len(), catalog.len());
        for spec in &catalog {
            assert!(registry.contains(spec.class_name), "{}", spec.class_name);
        }
    }

    #[test]
    fn test_class_names_are_unique() {
        let mut names: Vec<&str> = catalog().iter().map(|spec| spec.class_name).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), 11);
    }
}
