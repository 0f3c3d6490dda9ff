use std::time::Instant;

use thiserror::Error;

use crate::detection::domain::face_detector::{DetectorOptions, FaceDetection, FaceExpressionDetector};
use crate::shared::frame::Frame;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum SubmitError {
    #[error("a detection is already in flight")]
    Busy,
    #[error("detection worker has stopped")]
    Disconnected,
}

/// A finished detection together with the frame it ran on.
///
/// Errors are carried as text so outcomes can cross threads.
pub struct DetectionOutcome {
    pub frame: Frame,
    pub result: Result<Vec<FaceDetection>, String>,
    pub duration_ms: f64,
}

/// Runs at most one detection at a time.
///
/// A detection stays in flight from `submit` until its outcome has been
/// taken; submitting meanwhile fails with `SubmitError::Busy`.
pub trait DetectionExecutor: Send {
    fn submit(&mut self, frame: Frame, options: DetectorOptions) -> Result<(), SubmitError>;

    fn is_busy(&self) -> bool;

    /// Returns the finished outcome without blocking, if there is one.
    fn try_take(&mut self) -> Option<DetectionOutcome>;

    /// Blocks until the in-flight detection finishes. `None` when idle.
    fn wait(&mut self) -> Option<DetectionOutcome>;
}

pub(crate) fn run_detection(
    detector: &mut dyn FaceExpressionDetector,
    frame: Frame,
    options: &DetectorOptions,
) -> DetectionOutcome {
    let started = Instant::now();
    let result = detector.detect(&frame, options).map_err(|e| e.to_string());
    DetectionOutcome {
        frame,
        result,
        duration_ms: started.elapsed().as_secs_f64() * 1000.0,
    }
}

/// Detects synchronously inside `submit`. Deterministic; used for file
/// replays and tests.
pub struct InlineDetectionExecutor {
    detector: Box<dyn FaceExpressionDetector>,
    finished: Option<DetectionOutcome>,
}

impl InlineDetectionExecutor {
    pub fn new(detector: Box<dyn FaceExpressionDetector>) -> Self {
        Self {
            detector,
            finished: None,
        }
    }
}

impl DetectionExecutor for InlineDetectionExecutor {
    fn submit(&mut self, frame: Frame, options: DetectorOptions) -> Result<(), SubmitError> {
        if self.finished.is_some() {
            return Err(SubmitError::Busy);
        }
        self.finished = Some(run_detection(self.detector.as_mut(), frame, &options));
        Ok(())
    }

    fn is_busy(&self) -> bool {
        self.finished.is_some()
    }

    fn try_take(&mut self) -> Option<DetectionOutcome> {
        self.finished.take()
    }

    fn wait(&mut self) -> Option<DetectionOutcome> {
        self.finished.take()
    }
}
