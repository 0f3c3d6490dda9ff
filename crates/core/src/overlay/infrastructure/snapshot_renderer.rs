use std::path::{Path, PathBuf};

use crate::overlay::domain::overlay_renderer::{Badge, OverlayRenderer};
use crate::shared::expression::BestExpression;
use crate::shared::frame::Frame;
use crate::shared::region::Region;

use super::draw::{fill_rect, stroke_rect, Rgba};

const BOX_COLOR: Rgba = Rgba::new(110, 168, 254, 0.9);
const BOX_LINE_WIDTH: i64 = 2;
const PLATE_FILL: Rgba = Rgba::new(17, 20, 26, 0.8);
const PLATE_BORDER: Rgba = Rgba::new(42, 49, 69, 1.0);
const PLATE_HEIGHT: i64 = 20;
const PLATE_OFFSET: i64 = 22;
const PLATE_PADDING: i64 = 4;
/// Approximate advance of one label character at the overlay's 14px size.
const CHAR_WIDTH: i64 = 7;

/// Draws the face box and label plate onto a copy of the frame and,
/// when a path is configured, saves the result as an image.
///
/// Glyphs are not rasterized; the plate marks where the label sits and
/// the text itself goes through the badge.
pub struct SnapshotRenderer {
    path: Option<PathBuf>,
    annotated: Option<Frame>,
    written: usize,
}

impl SnapshotRenderer {
    pub fn new(path: Option<PathBuf>) -> Self {
        Self {
            path,
            annotated: None,
            written: 0,
        }
    }

    /// The frame annotated on this callback, if a face was drawn.
    pub fn annotated(&self) -> Option<&Frame> {
        self.annotated.as_ref()
    }

    pub fn snapshots_written(&self) -> usize {
        self.written
    }
}

impl OverlayRenderer for SnapshotRenderer {
    fn clear(&mut self) {
        self.annotated = None;
    }

    fn draw_face(
        &mut self,
        frame: &Frame,
        region: &Region,
        best: &BestExpression,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let mut canvas = frame.clone();
        annotate(&mut canvas, region, &best.label());

        if let Some(path) = &self.path {
            save_png(path, &canvas)?;
            self.written += 1;
        }
        self.annotated = Some(canvas);
        Ok(())
    }

    fn show_badge(&mut self, _badge: &Badge) -> Result<(), Box<dyn std::error::Error>> {
        Ok(())
    }
}

fn annotate(canvas: &mut Frame, region: &Region, label: &str) {
    let x = region.x.round() as i64;
    let y = region.y.round() as i64;
    let w = region.width.round() as i64;
    let h = region.height.round() as i64;
    stroke_rect(canvas, x, y, w, h, BOX_LINE_WIDTH, BOX_COLOR);

    let plate_y = (y - PLATE_OFFSET).max(0);
    let plate_w = label.chars().count() as i64 * CHAR_WIDTH + PLATE_PADDING * 2;
    fill_rect(canvas, x, plate_y, plate_w, PLATE_HEIGHT, PLATE_FILL);
    stroke_rect(canvas, x, plate_y, plate_w, PLATE_HEIGHT, 1, PLATE_BORDER);
}

fn save_png(path: &Path, frame: &Frame) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let img = image::RgbImage::from_raw(frame.width(), frame.height(), frame.data().to_vec())
        .ok_or("Failed to create image from frame data")?;
    img.save(path)?;
    Ok(())
}
