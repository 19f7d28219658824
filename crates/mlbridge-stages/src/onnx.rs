//! ONNX model stage.

use crate::Transformer;
use mlbridge::{remote_class, Bytes, StringMap};

remote_class! {
    /// Evaluates a serialized ONNX model over a dataframe column.
    pub struct ONNXModel = "com.microsoft.azure.synapse.ml.onnx.ONNXModel" {
        /// A map between output dataframe columns, where the value column will be
        /// computed from taking the argmax of the key column. This can be used to
        /// convert probability output to predicted label.
        "argMaxDict": StringMap { set: set_arg_max_dict, get: get_arg_max_dict },
        /// Specify a device type the model inference runs on. Supported types
        /// are: CPU or CUDA. If not specified, auto detection will be used.
        "deviceType": String { set: set_device_type, get: get_device_type },
        /// Provide a map from CNTK/ONNX model input variable names (keys) to
        /// column names of the input dataframe (values)
        "feedDict": StringMap { set: set_feed_dict, get: get_feed_dict },
        /// Provide a map from column names of the output dataframe (keys) to
        /// CNTK/ONNX model output variable names (values)
        "fetchDict": StringMap { set: set_fetch_dict, get: get_fetch_dict },
        /// Minibatcher to use
        "miniBatcher": Transformer { set: set_mini_batcher, get: get_mini_batcher },
        /// Array of bytes containing the serialized ONNX model.
        "modelPayload": Bytes { set: set_model_payload, get: get_model_payload },
        /// Specify the optimization level for the ONNX graph optimizations.
        /// Supported values are: NO_OPT; BASIC_OPT; EXTENDED_OPT; ALL_OPT.
        "optimizationLevel": String {
            set: set_optimization_level,
            get: get_optimization_level,
            default: "ALL_OPT",
        },
        /// A map between output dataframe columns, where the value column will be
        /// computed from taking the softmax of the key column.
        "softMaxDict": StringMap { set: set_soft_max_dict, get: get_soft_max_dict },
    }
}
