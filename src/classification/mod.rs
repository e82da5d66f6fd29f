pub mod image_classifier;
pub mod onnx_classifier;
