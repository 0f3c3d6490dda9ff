pub mod math;
pub mod onnx_expression_classifier;
pub mod onnx_expression_detector;
pub mod onnx_face_detector;
pub mod onnx_session;
