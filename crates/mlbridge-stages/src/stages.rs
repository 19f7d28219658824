//! Batching and text stages.

use mlbridge::{remote_class, StringMap};

remote_class! {
    /// Groups rows into fixed-size batches.
    pub struct FixedMiniBatchTransformer = "com.microsoft.azure.synapse.ml.stages.FixedMiniBatchTransformer" {
        /// The max size of the buffer
        "batchSize": i32 { set: set_batch_size, get: get_batch_size },
        /// Whether or not to buffer batches in memory
        "buffered": bool { set: set_buffered, get: get_buffered, default: false },
        /// The max size of the buffer
        "maxBufferSize": i32 { set: set_max_buffer_size, get: get_max_buffer_size },
    }
}

remote_class! {
    /// Expands batched rows back into one row per element.
    pub struct FlattenBatch = "com.microsoft.azure.synapse.ml.stages.FlattenBatch" {}
}

remote_class! {
    /// Replaces substrings in a text column after normalizing it.
    pub struct TextPreprocessor = "com.microsoft.azure.synapse.ml.stages.TextPreprocessor" {
        /// The name of the input column
        "inputCol": String { set: set_input_col, get: get_input_col },
        /// Map of substring match to replacement
        "map": StringMap { set: set_map, get: get_map },
        /// Name of normalization function to apply
        "normFunc": String { set: set_norm_func, get: get_norm_func, default: "identity" },
        /// The name of the output column
        "outputCol": String { set: set_output_col, get: get_output_col },
    }
}
