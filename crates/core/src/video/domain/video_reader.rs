use std::fmt;
use std::path::PathBuf;

use crate::shared::frame::Frame;
use crate::shared::video_metadata::VideoMetadata;

/// What to read frames from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum VideoSource {
    File(PathBuf),
    /// A capture device such as `/dev/video0`, `0` (avfoundation) or
    /// `video=Integrated Camera` (dshow). `format` overrides the platform's
    /// default device input format.
    Camera {
        device: String,
        format: Option<String>,
    },
}

impl VideoSource {
    /// Treats `/dev/video*` paths and bare device indices as cameras and
    /// anything else as a file.
    pub fn detect(spec: &str) -> Self {
        let is_device = spec.starts_with("/dev/video")
            || spec.starts_with("video=")
            || (!spec.is_empty() && spec.chars().all(|c| c.is_ascii_digit()));
        if is_device {
            VideoSource::Camera {
                device: spec.to_string(),
                format: None,
            }
        } else {
            VideoSource::File(PathBuf::from(spec))
        }
    }

    pub fn is_camera(&self) -> bool {
        matches!(self, VideoSource::Camera { .. })
    }
}

impl fmt::Display for VideoSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VideoSource::File(path) => write!(f, "{}", path.display()),
            VideoSource::Camera { device, .. } => write!(f, "camera {device}"),
        }
    }
}

/// Reads frames from a camera or a video file.
///
/// Implementations handle I/O details (device formats, codecs) while the
/// session works with the abstract `Frame` and `VideoMetadata` types.
pub trait VideoReader: Send {
    /// Opens the source and returns its metadata.
    fn open(&mut self, source: &VideoSource) -> Result<VideoMetadata, Box<dyn std::error::Error>>;

    /// Returns an iterator over frames in capture/decode order.
    fn frames(
        &mut self,
    ) -> Box<dyn Iterator<Item = Result<Frame, Box<dyn std::error::Error>>> + '_>;

    /// Releases any resources held by the reader.
    fn close(&mut self);
}
