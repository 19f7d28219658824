//! OpenCV-backed image stages.

use mlbridge::{remote_class, DataType, PayloadMap};

remote_class! {
    /// Applies a sequence of OpenCV transformations (resize, crop, flip, blur,
    /// threshold, ...) to an image column, optionally producing a tensor.
    ///
    /// Each entry of `stages` is a map with an `action` key plus the
    /// action's own arguments.
    pub struct ImageTransformer = "com.microsoft.azure.synapse.ml.opencv.ImageTransformer" {
        /// The scale factor for color values. Used for normalization. The color
        /// values will be multiplied with the scale factor.
        "colorScaleFactor": f64 { set: set_color_scale_factor, get: get_color_scale_factor },
        /// The name of the input column
        "inputCol": String { set: set_input_col, get: get_input_col },
        /// The mean value to use for normalization for each channel. The length
        /// of the array must match the number of channels of the input image.
        "normalizeMean": Vec<f64> { set: set_normalize_mean, get: get_normalize_mean },
        /// The standard deviation to use for normalization for each channel. The
        /// length of the array must match the number of channels of the input image.
        "normalizeStd": Vec<f64> { set: set_normalize_std, get: get_normalize_std },
        /// The name of the output column
        "outputCol": String { set: set_output_col, get: get_output_col },
        /// Image transformation stages
        "stages": Vec<PayloadMap> { set: set_stages, get: get_stages },
        /// The color channel order of the output channels. Valid values are RGB
        /// and GBR.
        "tensorChannelOrder": String {
            set: set_tensor_channel_order,
            get: get_tensor_channel_order,
            default: "RGB",
        },
        /// The element data type for the output tensor. Only used when toTensor
        /// is set to true. Valid values are double or float.
        "tensorElementType": DataType {
            set: set_tensor_element_type,
            get: get_tensor_element_type,
            default: DataType::Float,
        },
        /// Convert output image to tensor in the shape of (C * H * W)
        "toTensor": bool { set: set_to_tensor, get: get_to_tensor, default: false },
    }
}

remote_class! {
    /// Produces flipped copies of each input image.
    pub struct ImageSetAugmenter = "com.microsoft.azure.synapse.ml.opencv.ImageSetAugmenter" {
        /// Symmetric Left-Right
        "flipLeftRight": bool { set: set_flip_left_right, get: get_flip_left_right, default: true },
        /// Symmetric Up-Down
        "flipUpDown": bool { set: set_flip_up_down, get: get_flip_up_down, default: false },
        /// The name of the input column
        "inputCol": String { set: set_input_col, get: get_input_col },
        /// The name of the output column
        "outputCol": String { set: set_output_col, get: get_output_col },
    }
}

/// Builders for the `stages` entries accepted by [`ImageTransformer`].
pub mod stage {
    use mlbridge::{PayloadMap, RemoteValue};

    fn action(name: &str) -> PayloadMap {
        let mut map = PayloadMap::new();
        map.insert("action".to_string(), RemoteValue::from(name));
        map
    }

    pub fn resize(height: i32, width: i32) -> PayloadMap {
        let mut map = action("resize");
        map.insert("height".to_string(), RemoteValue::Int(height));
        map.insert("width".to_string(), RemoteValue::Int(width));
        map
    }

    pub fn crop(x: i32, y: i32, height: i32, width: i32) -> PayloadMap {
        let mut map = action("crop");
        map.insert("x".to_string(), RemoteValue::Int(x));
        map.insert("y".to_string(), RemoteValue::Int(y));
        map.insert("height".to_string(), RemoteValue::Int(height));
        map.insert("width".to_string(), RemoteValue::Int(width));
        map
    }

    pub fn center_crop(height: i32, width: i32) -> PayloadMap {
        let mut map = action("centercrop");
        map.insert("height".to_string(), RemoteValue::Int(height));
        map.insert("width".to_string(), RemoteValue::Int(width));
        map
    }

    /// `flip_code`: 0 flips up-down, 1 left-right, -1 both.
    pub fn flip(flip_code: i32) -> PayloadMap {
        let mut map = action("flip");
        map.insert("flipCode".to_string(), RemoteValue::Int(flip_code));
        map
    }

    pub fn gaussian_kernel(aperture_size: i32, sigma: f64) -> PayloadMap {
        let mut map = action("gaussiankernel");
        map.insert("apertureSize".to_string(), RemoteValue::Int(aperture_size));
        map.insert("sigma".to_string(), RemoteValue::Double(sigma));
        map
    }
}
