//! Image resizing and unrolling stages.

use mlbridge::remote_class;

remote_class! {
    /// Resizes images to a fixed size.
    pub struct ResizeImageTransformer = "com.microsoft.azure.synapse.ml.image.ResizeImageTransformer" {
        /// the height of the image
        "height": i32 { set: set_height, get: get_height },
        /// The name of the input column
        "inputCol": String { set: set_input_col, get: get_input_col },
        /// the number of channels of the target image
        "nChannels": i32 { set: set_n_channels, get: get_n_channels },
        /// The name of the output column
        "outputCol": String { set: set_output_col, get: get_output_col },
        /// the width of the image
        "width": i32 { set: set_width, get: get_width },
    }
}

remote_class! {
    /// Converts an image column into a flat vector column.
    pub struct UnrollImage = "com.microsoft.azure.synapse.ml.image.UnrollImage" {
        /// The name of the input column
        "inputCol": String { set: set_input_col, get: get_input_col },
        /// The name of the output column
        "outputCol": String { set: set_output_col, get: get_output_col },
    }
}

remote_class! {
    /// Decodes binary image files and unrolls them into vectors.
    pub struct UnrollBinaryImage = "com.microsoft.azure.synapse.ml.image.UnrollBinaryImage" {
        /// the height of the image
        "height": i32 { set: set_height, get: get_height },
        /// The name of the input column
        "inputCol": String { set: set_input_col, get: get_input_col },
        /// the number of channels of the target image
        "nChannels": i32 { set: set_n_channels, get: get_n_channels },
        /// The name of the output column
        "outputCol": String { set: set_output_col, get: get_output_col },
        /// the width of the image
        "width": i32 { set: set_width, get: get_width },
    }
}
