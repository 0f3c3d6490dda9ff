use crate::shared::expression::ExpressionScores;
use crate::shared::frame::Frame;
use crate::shared::region::Region;

/// Per-call detector tuning.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DetectorOptions {
    /// Square input resolution requested from the face model.
    pub input_size: u32,
    /// Minimum face score for a detection to be reported.
    pub score_threshold: f64,
}

/// One detected face with its expression distribution.
#[derive(Clone, Debug, PartialEq)]
pub struct FaceDetection {
    pub region: Region,
    pub score: f64,
    pub expressions: ExpressionScores,
}

/// Domain interface for face + expression detection.
///
/// Implementations may hold inference sessions that need exclusive access,
/// hence `&mut self`.
pub trait FaceExpressionDetector: Send {
    fn detect(
        &mut self,
        frame: &Frame,
        options: &DetectorOptions,
    ) -> Result<Vec<FaceDetection>, Box<dyn std::error::Error>>;
}
