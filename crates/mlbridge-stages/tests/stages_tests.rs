//! Integration tests for the stage wrappers against the reference runtime.

use mlbridge::{
    BridgeError, BridgeServer, Bytes, ClassSpec, DataType, Jvm, LocalRuntime, ParamKind,
    ParamSpec, RemoteValue, RemoteWrapper, StringMap, TcpBridge,
};
use mlbridge_stages::opencv::stage;
use mlbridge_stages::{
    catalog, CNTKModel, FixedMiniBatchTransformer, FlattenBatch, ImageFeaturizer,
    ImageSetAugmenter, ImageTransformer, ONNXModel, ResizeImageTransformer, TextPreprocessor,
    Transformer, UnrollBinaryImage,
};
use std::sync::Arc;
use tempfile::TempDir;

const MYSTERY: &str = "com.example.MysteryTransformer";

fn jvm() -> Jvm {
    Jvm::from_bridge(LocalRuntime::new(catalog()))
}

#[test]
fn test_setter_then_getter_returns_value() {
    let jvm = jvm();
    let resize = ResizeImageTransformer::new(&jvm)
        .unwrap()
        .set_width(224)
        .unwrap()
        .set_height(160)
        .unwrap()
        .set_n_channels(3)
        .unwrap()
        .set_input_col("image".to_string())
        .unwrap();

    assert_eq!(resize.get_width().unwrap(), 224);
    assert_eq!(resize.get_height().unwrap(), 160);
    assert_eq!(resize.get_n_channels().unwrap(), 3);
    assert_eq!(resize.get_input_col().unwrap(), "image");
}

#[test]
fn test_defaults_are_visible_before_any_setter() {
    let jvm = jvm();

    let transformer = ImageTransformer::new(&jvm).unwrap();
    assert_eq!(transformer.get_tensor_channel_order().unwrap(), "RGB");
    assert_eq!(transformer.get_tensor_element_type().unwrap(), DataType::Float);
    assert!(!transformer.get_to_tensor().unwrap());

    let augmenter = ImageSetAugmenter::new(&jvm).unwrap();
    assert!(augmenter.get_flip_left_right().unwrap());
    assert!(!augmenter.get_flip_up_down().unwrap());

    let featurizer = ImageFeaturizer::new(&jvm).unwrap();
    assert_eq!(featurizer.get_cut_output_layers().unwrap(), 1);
    assert!(featurizer.get_drop_na().unwrap());

    assert_eq!(
        ONNXModel::new(&jvm).unwrap().get_optimization_level().unwrap(),
        "ALL_OPT"
    );
    assert_eq!(
        TextPreprocessor::new(&jvm).unwrap().get_norm_func().unwrap(),
        "identity"
    );
    assert!(!FixedMiniBatchTransformer::new(&jvm)
        .unwrap()
        .get_buffered()
        .unwrap());
}

#[test]
fn test_getter_without_default_fails_remotely() {
    let jvm = jvm();
    let err = UnrollBinaryImage::new(&jvm).unwrap().get_width().unwrap_err();
    assert!(matches!(
        err,
        BridgeError::RemoteInvocation { ref exception_class, .. }
            if exception_class == "java.util.NoSuchElementException"
    ));
}

#[test]
fn test_image_transformer_stages_and_tensor_type() {
    let jvm = jvm();
    let stages = vec![stage::resize(48, 64), stage::flip(1), stage::gaussian_kernel(3, 0.5)];
    let tensor_type = DataType::Double;

    let transformer = ImageTransformer::new(&jvm)
        .unwrap()
        .set_stages(stages.clone())
        .unwrap()
        .set_tensor_element_type(tensor_type.clone())
        .unwrap()
        .set_normalize_mean(vec![0.5, 0.25, 0.125])
        .unwrap()
        .set_to_tensor(true)
        .unwrap();

    assert_eq!(transformer.get_stages().unwrap(), stages);
    assert_eq!(transformer.get_tensor_element_type().unwrap(), tensor_type);
    assert_eq!(
        transformer.get_normalize_mean().unwrap(),
        vec![0.5, 0.25, 0.125]
    );
    assert!(transformer.get_to_tensor().unwrap());
}

#[test]
fn test_onnx_model_payload_and_dicts() {
    let jvm = jvm();
    let payload = Bytes::from_static(b"\x08\x07\x12\x04onnx");
    let mut feed = StringMap::new();
    feed.insert("data_0".to_string(), "features".to_string());
    let mut soft_max = StringMap::new();
    soft_max.insert("rawPrediction".to_string(), "probability".to_string());

    let model = ONNXModel::new(&jvm)
        .unwrap()
        .set_model_payload(payload.clone())
        .unwrap()
        .set_feed_dict(feed.clone())
        .unwrap()
        .set_soft_max_dict(soft_max.clone())
        .unwrap()
        .set_device_type("CPU".to_string())
        .unwrap();

    assert_eq!(model.get_model_payload().unwrap(), payload);
    assert_eq!(model.get_feed_dict().unwrap(), feed);
    assert_eq!(model.get_soft_max_dict().unwrap(), soft_max);
    assert_eq!(model.get_device_type().unwrap(), "CPU");
}

#[test]
fn test_repeated_map_getter_keeps_object_count_flat() {
    let runtime = LocalRuntime::new(catalog());
    let jvm = Jvm::from_bridge(runtime.clone());
    let mut feed = StringMap::new();
    feed.insert("data_0".to_string(), "features".to_string());

    let model = CNTKModel::new(&jvm)
        .unwrap()
        .set_feed_dict(feed.clone())
        .unwrap();
    assert_eq!(model.get_feed_dict().unwrap(), feed);
    let settled = runtime.object_count().unwrap();

    for _ in 0..1000 {
        assert_eq!(model.get_feed_dict().unwrap(), feed);
    }
    assert_eq!(runtime.object_count().unwrap(), settled);
}

#[test]
fn test_text_preprocessor_map() {
    let jvm = jvm();
    let mut map = StringMap::new();
    map.insert("happy".to_string(), "sad".to_string());
    map.insert("one".to_string(), "two".to_string());

    let pre = TextPreprocessor::new(&jvm)
        .unwrap()
        .set_map(map.clone())
        .unwrap()
        .set_norm_func("lowerCase".to_string())
        .unwrap();
    assert_eq!(pre.get_map().unwrap(), map);
    assert_eq!(pre.get_norm_func().unwrap(), "lowerCase");
}

#[test]
fn test_nested_transformer_resolves_to_typed_wrapper() {
    let jvm = jvm();
    let model = CNTKModel::new(&jvm)
        .unwrap()
        .set_model_location("/models/resnet50.model".to_string())
        .unwrap();
    let featurizer = ImageFeaturizer::new(&jvm)
        .unwrap()
        .set_cntk_model(model.into())
        .unwrap();

    match featurizer.get_cntk_model().unwrap() {
        Transformer::CNTKModel(model) => {
            assert_eq!(model.get_model_location().unwrap(), "/models/resnet50.model")
        }
        other => panic!("Expected CNTKModel, got {}", other.class_name()),
    }

    let batcher = FixedMiniBatchTransformer::new(&jvm)
        .unwrap()
        .set_batch_size(10)
        .unwrap();
    let model = CNTKModel::new(&jvm)
        .unwrap()
        .set_mini_batcher(batcher.into())
        .unwrap();
    match model.get_mini_batcher().unwrap() {
        Transformer::FixedMiniBatchTransformer(batcher) => {
            assert_eq!(batcher.get_batch_size().unwrap(), 10)
        }
        other => panic!("Expected FixedMiniBatchTransformer, got {}", other.class_name()),
    }
}

#[test]
fn test_nested_handle_with_unregistered_class_fails() {
    let mut classes = catalog();
    classes.push(ClassSpec::new(MYSTERY).param(ParamSpec::new("seed", ParamKind::Long)));
    let jvm = Jvm::from_bridge(LocalRuntime::new(classes));

    let mystery = jvm.construct(MYSTERY, vec![]).unwrap();
    let featurizer = ImageFeaturizer::new(&jvm).unwrap();
    featurizer
        .object()
        .invoke(
            "setCntkModel",
            vec![RemoteValue::Handle(mystery.handle().clone())],
        )
        .unwrap();

    match featurizer.get_cntk_model().unwrap_err() {
        BridgeError::UnknownRemoteType { class_name } => assert_eq!(class_name, MYSTERY),
        other => panic!("Expected UnknownRemoteType, got: {:?}", other),
    }
}

#[test]
fn test_construct_unknown_class_fails() {
    let err = jvm().construct("not.a.real.Class", vec![]).unwrap_err();
    assert!(matches!(err, BridgeError::RemoteConstruction { .. }));
}

#[test]
fn test_save_load_round_trip() {
    let jvm = jvm();
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("resize");
    let path = path.to_str().unwrap();

    let resize = ResizeImageTransformer::new(&jvm)
        .unwrap()
        .set_height(100)
        .unwrap()
        .set_width(50)
        .unwrap();
    resize.save(path).unwrap();

    let loaded = ResizeImageTransformer::load(&jvm, path).unwrap();
    assert_eq!(loaded.get_height().unwrap(), 100);
    assert_eq!(loaded.get_width().unwrap(), 50);
    assert_eq!(loaded.uid().unwrap(), resize.uid().unwrap());
}

#[test]
fn test_save_refuses_existing_path_unless_overwriting() {
    let jvm = jvm();
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("featurizer");
    let path = path.to_str().unwrap();

    let featurizer = ImageFeaturizer::new(&jvm)
        .unwrap()
        .set_layer_names(vec!["z".to_string(), "OutputNodes".to_string()])
        .unwrap();
    featurizer.save(path).unwrap();

    let updated = featurizer.set_cut_output_layers(2).unwrap();
    let err = updated.save(path).unwrap_err();
    assert!(matches!(
        err,
        BridgeError::RemoteInvocation { ref exception_class, .. }
            if exception_class == "java.io.IOException"
    ));

    updated.write().unwrap().overwrite().unwrap().save(path).unwrap();
    let loaded = ImageFeaturizer::read(&jvm).unwrap().load(path).unwrap();
    assert_eq!(loaded.get_cut_output_layers().unwrap(), 2);
    assert_eq!(
        loaded.get_layer_names().unwrap(),
        vec!["z".to_string(), "OutputNodes".to_string()]
    );
}

#[test]
fn test_nested_transformer_survives_save_load() {
    let jvm = jvm();
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("featurizer");
    let path = path.to_str().unwrap();

    let model = CNTKModel::new(&jvm)
        .unwrap()
        .set_batch_input(false)
        .unwrap();
    ImageFeaturizer::new(&jvm)
        .unwrap()
        .set_cntk_model(model.into())
        .unwrap()
        .save(path)
        .unwrap();

    let loaded = ImageFeaturizer::load(&jvm, path).unwrap();
    match loaded.get_cntk_model().unwrap() {
        Transformer::CNTKModel(model) => assert!(!model.get_batch_input().unwrap()),
        other => panic!("Expected CNTKModel, got {}", other.class_name()),
    }
}

#[test]
fn test_load_with_wrong_class_fails() {
    let jvm = jvm();
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("flatten");
    let path = path.to_str().unwrap();

    FlattenBatch::new(&jvm).unwrap().save(path).unwrap();
    let err = ResizeImageTransformer::load(&jvm, path).unwrap_err();
    assert!(matches!(err, BridgeError::RemoteInvocation { .. }));
}

#[test]
fn test_wrappers_over_tcp_bridge() {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let mut server = rt
        .block_on(BridgeServer::start(
            Arc::new(LocalRuntime::new(catalog())),
            "127.0.0.1:0".parse().unwrap(),
        ))
        .unwrap();
    let jvm = Jvm::from_bridge(TcpBridge::connect(server.addr()).unwrap());

    let model = CNTKModel::new(&jvm).unwrap();
    let featurizer = ImageFeaturizer::new(&jvm)
        .unwrap()
        .set_cntk_model(model.into())
        .unwrap()
        .set_input_col("image".to_string())
        .unwrap();

    assert_eq!(featurizer.get_input_col().unwrap(), "image");
    assert!(matches!(
        featurizer.get_cntk_model().unwrap(),
        Transformer::CNTKModel(_)
    ));

    drop(jvm);
    server.shutdown();
}

/// Reference runtime served over TCP, with a client connected to it.
fn tcp_jvm(
    base_dir: &std::path::Path,
) -> (tokio::runtime::Runtime, mlbridge::BridgeServerHandle, Jvm) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let server = rt
        .block_on(BridgeServer::start(
            Arc::new(LocalRuntime::new(catalog()).with_base_dir(base_dir)),
            "127.0.0.1:0".parse().unwrap(),
        ))
        .unwrap();
    let jvm = Jvm::from_bridge(TcpBridge::connect(server.addr()).unwrap());
    (rt, server, jvm)
}

#[test]
fn test_non_finite_doubles_over_tcp_and_save_load() {
    let temp_dir = TempDir::new().unwrap();
    let (_rt, mut server, jvm) = tcp_jvm(temp_dir.path());

    let transformer = ImageTransformer::new(&jvm)
        .unwrap()
        .set_color_scale_factor(f64::INFINITY)
        .unwrap();
    assert_eq!(transformer.get_color_scale_factor().unwrap(), f64::INFINITY);

    transformer.save("scaled").unwrap();
    let loaded = ImageTransformer::load(&jvm, "scaled").unwrap();
    assert_eq!(loaded.get_color_scale_factor().unwrap(), f64::INFINITY);

    let transformer = transformer.set_color_scale_factor(f64::NAN).unwrap();
    assert!(transformer.get_color_scale_factor().unwrap().is_nan());
    transformer.write().unwrap().overwrite().unwrap().save("scaled").unwrap();
    let loaded = ImageTransformer::load(&jvm, "scaled").unwrap();
    assert!(loaded.get_color_scale_factor().unwrap().is_nan());

    drop(jvm);
    server.shutdown();
}

#[test]
fn test_large_model_payload_over_tcp() {
    let temp_dir = TempDir::new().unwrap();
    let (_rt, mut server, jvm) = tcp_jvm(temp_dir.path());

    let payload = Bytes::from(vec![7u8; 40 << 20]);
    let model = ONNXModel::new(&jvm)
        .unwrap()
        .set_model_payload(payload.clone())
        .unwrap();
    assert_eq!(model.get_model_payload().unwrap(), payload);

    drop(jvm);
    server.shutdown();
}
