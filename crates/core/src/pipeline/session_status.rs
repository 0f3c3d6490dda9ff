use std::fmt;

use thiserror::Error;

use crate::shared::model_resolver::ModelResolveError;

/// User-visible session state, shown in the status line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionStatus {
    OpeningCamera,
    LoadingModels,
    ModelsLoaded,
    CameraError,
    ModelLoadFailed,
}

impl SessionStatus {
    pub fn message(self) -> &'static str {
        match self {
            SessionStatus::OpeningCamera => "Opening camera...",
            SessionStatus::LoadingModels => "Loading models...",
            SessionStatus::ModelsLoaded => "Models loaded",
            SessionStatus::CameraError => {
                "Camera error. Check camera permissions and the device path."
            }
            SessionStatus::ModelLoadFailed => {
                "Model load failed. Check network or self-host models under ./models"
            }
        }
    }

    /// Fatal states end the session before the frame loop starts.
    pub fn is_fatal(self) -> bool {
        matches!(
            self,
            SessionStatus::CameraError | SessionStatus::ModelLoadFailed
        )
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// Startup failures. Neither is retried.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("cannot open {device}: {reason}")]
    CameraUnavailable { device: String, reason: String },
    #[error("cannot resolve models: {0}")]
    ModelResolve(#[from] ModelResolveError),
    #[error("cannot load models: {0}")]
    ModelLoad(String),
}

impl SessionError {
    /// The status to show for this failure.
    pub fn status(&self) -> SessionStatus {
        match self {
            SessionError::CameraUnavailable { .. } => SessionStatus::CameraError,
            SessionError::ModelResolve(_) | SessionError::ModelLoad(_) => {
                SessionStatus::ModelLoadFailed
            }
        }
    }
}
