//! CNTK model stages.

use crate::Transformer;
use mlbridge::{remote_class, StringMap};

remote_class! {
    /// Evaluates a CNTK model over a dataframe column.
    pub struct CNTKModel = "com.microsoft.azure.synapse.ml.cntk.CNTKModel" {
        /// whether to use a batcher
        "batchInput": bool { set: set_batch_input, get: get_batch_input, default: true },
        /// whether to convert the output to dense vectors
        "convertOutputToDenseVector": bool {
            set: set_convert_output_to_dense_vector,
            get: get_convert_output_to_dense_vector,
            default: true,
        },
        /// Provide a map from CNTK/ONNX model input variable names (keys) to
        /// column names of the input dataframe (values)
        "feedDict": StringMap { set: set_feed_dict, get: get_feed_dict },
        /// Provide a map from column names of the output dataframe (keys) to
        /// CNTK/ONNX model output variable names (values)
        "fetchDict": StringMap { set: set_fetch_dict, get: get_fetch_dict },
        /// Minibatcher to use
        "miniBatcher": Transformer { set: set_mini_batcher, get: get_mini_batcher },
        /// Location of the serialized CNTK model
        "modelLocation": String { set: set_model_location, get: get_model_location },
    }
}

remote_class! {
    /// Featurizes images with a pretrained CNTK network by cutting off its
    /// final layers.
    pub struct ImageFeaturizer = "com.microsoft.azure.synapse.ml.cntk.ImageFeaturizer" {
        /// The internal CNTK model used in the featurizer
        "cntkModel": Transformer { set: set_cntk_model, get: get_cntk_model },
        /// The number of layers to cut off the end of the network, 0 leaves the
        /// network intact, 1 removes the output layer, etc
        "cutOutputLayers": i32 { set: set_cut_output_layers, get: get_cut_output_layers, default: 1 },
        /// Whether to drop na values before mapping
        "dropNa": bool { set: set_drop_na, get: get_drop_na, default: true },
        /// The name of the input column
        "inputCol": String { set: set_input_col, get: get_input_col },
        /// Array with valid CNTK nodes to choose from, the first entries of this
        /// array should be closer to the output node
        "layerNames": Vec<String> { set: set_layer_names, get: get_layer_names },
        /// The name of the output column
        "outputCol": String { set: set_output_col, get: get_output_col },
    }
}
