use crate::detection::domain::face_detector::{
    DetectorOptions, FaceDetection, FaceExpressionDetector,
};
use crate::shared::frame::Frame;
use crate::shared::model_resolver::ModelPaths;

use super::onnx_expression_classifier::OnnxExpressionClassifier;
use super::onnx_face_detector::OnnxFaceDetector;

/// Face detection followed by per-face expression classification.
pub struct OnnxExpressionDetector {
    faces: OnnxFaceDetector,
    classifier: OnnxExpressionClassifier,
}

impl OnnxExpressionDetector {
    /// Loads both models. Either failing is fatal for the session.
    pub fn new(models: &ModelPaths) -> Result<Self, Box<dyn std::error::Error>> {
        let faces = OnnxFaceDetector::new(&models.face)?;
        let classifier = OnnxExpressionClassifier::new(&models.expression)?;
        Ok(Self { faces, classifier })
    }
}

impl FaceExpressionDetector for OnnxExpressionDetector {
    fn detect(
        &mut self,
        frame: &Frame,
        options: &DetectorOptions,
    ) -> Result<Vec<FaceDetection>, Box<dyn std::error::Error>> {
        let faces = self.faces.detect_faces(frame, options)?;
        let mut detections = Vec::with_capacity(faces.len());
        for (region, score) in faces {
            if region.area() <= 0.0 {
                continue;
            }
            let expressions = self.classifier.classify(frame, &region)?;
            detections.push(FaceDetection {
                region,
                score,
                expressions,
            });
        }
        Ok(detections)
    }
}
