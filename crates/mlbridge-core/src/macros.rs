/// Declare a typed wrapper for a remote class from its parameter catalog.
///
/// Each parameter names its remote name, its Rust value type (any
/// [`ParamValue`](crate::ParamValue)), the setter and getter method names and
/// an optional default. The macro generates:
///
/// - the wrapper struct with `new(&Jvm)` and `with_uid(&Jvm, uid)`
/// - one setter returning a fresh wrapper and one getter per parameter
/// - a [`RemoteWrapper`](crate::RemoteWrapper) impl whose `catalog()` lists
///   every parameter with its kind, default and doc text
///
/// ```rust,ignore
/// mlbridge::remote_class! {
///     /// Resizes images.
///     pub struct ResizeImageTransformer = "com.microsoft.azure.synapse.ml.image.ResizeImageTransformer" {
///         /// the width of the image
///         "width": i32 { set: set_width, get: get_width },
///         /// input image column
///         "inputCol": String { set: set_input_col, get: get_input_col, default: "image" },
///     }
/// }
/// ```
#[macro_export]
macro_rules! remote_class {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident = $class:literal {
            $(
                $(#[doc = $doc:literal])*
                $param:literal : $ty:ty {
                    set: $setter:ident,
                    get: $getter:ident
                    $(, default: $default:expr)?
                    $(,)?
                }
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug)]
        $vis struct $name {
            object: $crate::RemoteObject,
        }

        impl $name {
            /// Construct a new remote instance with a generated uid.
            pub fn new(jvm: &$crate::Jvm) -> $crate::Result<Self> {
                jvm.construct($class, ::std::vec::Vec::new())
                    .map(|object| Self { object })
            }

            /// Construct a new remote instance with the given uid.
            pub fn with_uid(jvm: &$crate::Jvm, uid: &str) -> $crate::Result<Self> {
                jvm.construct($class, ::std::vec![$crate::RemoteValue::from(uid)])
                    .map(|object| Self { object })
            }

            $(
                $(#[doc = $doc])*
                pub fn $setter(&self, value: $ty) -> $crate::Result<Self> {
                    self.object
                        .set_param($param, &value)
                        .map(|object| Self { object })
                }

                $(#[doc = $doc])*
                pub fn $getter(&self) -> $crate::Result<$ty> {
                    self.object.get_param($param)
                }
            )*
        }

        impl $crate::RemoteWrapper for $name {
            const CLASS_NAME: &'static str = $class;

            fn from_object(object: $crate::RemoteObject) -> Self {
                Self { object }
            }

            fn object(&self) -> &$crate::RemoteObject {
                &self.object
            }

            fn catalog() -> $crate::ClassSpec {
                $crate::ClassSpec::new($class)
                $(
                    .param({
                        let spec = $crate::ParamSpec::new(
                            $param,
                            <$ty as $crate::ParamValue>::KIND,
                        )
                        .with_doc(concat!("" $(, $doc)*).trim());
                        $( let spec = spec.with_default($default); )?
                        spec
                    })
                )*
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use crate::{Jvm, LocalRuntime, ParamKind, RemoteWrapper};

    remote_class! {
        /// Test-only wrapper.
        pub struct Resize = "com.example.Resize" {
            /// the width of the image
            "width": i32 { set: set_width, get: get_width },
            /// input column
            "inputCol": String { set: set_input_col, get: get_input_col, default: "image" },
            "layerNames": Vec<String> { set: set_layer_names, get: get_layer_names },
        }
    }

    fn jvm() -> Jvm {
        Jvm::from_bridge(LocalRuntime::new(vec![Resize::catalog()]))
    }

    #[test]
    fn test_generated_catalog() {
        let spec = Resize::catalog();
        assert_eq!(spec.class_name, "com.example.Resize");
        assert_eq!(spec.params.len(), 3);

        let width = spec.find("width").unwrap();
        assert_eq!(width.kind, ParamKind::Integer);
        assert_eq!(width.doc, "the width of the image");
        assert!(width.default.is_none());

        let input = spec.find("inputCol").unwrap();
        assert!(input.default.is_some());
        assert_eq!(spec.find("layerNames").unwrap().kind, ParamKind::StringArray);
    }

    #[test]
    fn test_generated_accessors_round_trip() {
        let jvm = jvm();
        let resize = Resize::new(&jvm).unwrap().set_width(224).unwrap();
        assert_eq!(resize.get_width().unwrap(), 224);
        assert_eq!(resize.get_input_col().unwrap(), "image");

        let layers = vec!["z".to_string(), "a".to_string()];
        let resize = resize.set_layer_names(layers.clone()).unwrap();
        assert_eq!(resize.get_layer_names().unwrap(), layers);
    }

    #[test]
    fn test_with_uid() {
        let jvm = jvm();
        let resize = Resize::with_uid(&jvm, "Resize_42").unwrap();
        assert_eq!(resize.uid().unwrap(), "Resize_42");
    }
}
