/// Describes an opened frame source.
#[derive(Clone, Debug, PartialEq)]
pub struct VideoMetadata {
    pub width: u32,
    pub height: u32,
    /// Nominal frame rate; 0 when the source does not report one.
    pub fps: f64,
    pub codec: String,
    /// Device path or file path the frames come from.
    pub source: String,
    /// True for capture devices, which have no end and no frame count.
    pub live: bool,
}

impl VideoMetadata {
    /// Milliseconds between frames at the nominal rate, if known.
    pub fn frame_interval_ms(&self) -> Option<f64> {
        (self.fps > 0.0).then(|| 1000.0 / self.fps)
    }
}
