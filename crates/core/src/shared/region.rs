/// A face bounding box in the pixel space of the frame it was detected in.
///
/// Coordinates stay fractional: detectors report sub-pixel boxes and the
/// area comparison used for face selection should not be skewed by rounding.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Region {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Region {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Builds a region from corner coordinates `(x1, y1, x2, y2)`.
    pub fn from_corners(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self::new(x1, y1, x2 - x1, y2 - y1)
    }

    pub fn area(&self) -> f64 {
        self.width * self.height
    }

    /// Integer pixel rectangle `(x, y, w, h)` intersected with the frame.
    ///
    /// Returns `None` when nothing of the region lies inside the frame.
    pub fn clamped_pixels(&self, frame_width: u32, frame_height: u32) -> Option<(u32, u32, u32, u32)> {
        let x1 = self.x.floor().max(0.0);
        let y1 = self.y.floor().max(0.0);
        let x2 = (self.x + self.width).ceil().min(frame_width as f64);
        let y2 = (self.y + self.height).ceil().min(frame_height as f64);
        if x2 <= x1 || y2 <= y1 {
            return None;
        }
        Some((x1 as u32, y1 as u32, (x2 - x1) as u32, (y2 - y1) as u32))
    }
}
