pub const FACE_MODEL_NAME: &str = "yolo11n-pose_widerface.onnx";
pub const FACE_MODEL_URL: &str =
    "https://github.com/neutrinographics/faceguard/releases/download/v0.1.0/yolo11n-pose_widerface.onnx";

pub const EXPRESSION_MODEL_NAME: &str = "emotion-ferplus-8.onnx";
pub const EXPRESSION_MODEL_URL: &str =
    "https://github.com/onnx/models/raw/main/validated/vision/body_analysis/emotion_ferplus/model/emotion-ferplus-8.onnx";

/// Detector input resolution requested when the model shape is dynamic.
pub const DETECTOR_INPUT_SIZE: u32 = 224;

pub const DEFAULT_SMOOTHING: f64 = 0.6;
pub const DEFAULT_MIN_CONFIDENCE: f64 = 0.5;

/// Update interval used when the configured value is 0 (unset).
pub const DEFAULT_UPDATE_MS: u64 = 100;

/// Floor applied to the update interval.
pub const MIN_UPDATE_MS: u64 = 30;

/// Width of the FPS counting window.
pub const FPS_WINDOW_MS: f64 = 1000.0;
