//! Minimal alpha-blended rectangle primitives on RGB frames.

use crate::shared::frame::Frame;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: f32,
}

impl Rgba {
    pub const fn new(r: u8, g: u8, b: u8, a: f32) -> Self {
        Self { r, g, b, a }
    }
}

fn blend(dst: u8, src: u8, alpha: f32) -> u8 {
    (src as f32 * alpha + dst as f32 * (1.0 - alpha)).round().clamp(0.0, 255.0) as u8
}

/// Fills the rectangle `[x, x+w) × [y, y+h)`, clipped to the frame.
pub fn fill_rect(frame: &mut Frame, x: i64, y: i64, w: i64, h: i64, color: Rgba) {
    let fw = frame.width() as i64;
    let fh = frame.height() as i64;
    let channels = frame.channels() as usize;
    if channels < 3 {
        return;
    }
    let x0 = x.max(0);
    let y0 = y.max(0);
    let x1 = (x + w).min(fw);
    let y1 = (y + h).min(fh);
    if x1 <= x0 || y1 <= y0 {
        return;
    }

    let data = frame.data_mut();
    for row in y0..y1 {
        for col in x0..x1 {
            let offset = (row as usize * fw as usize + col as usize) * channels;
            data[offset] = blend(data[offset], color.r, color.a);
            data[offset + 1] = blend(data[offset + 1], color.g, color.a);
            data[offset + 2] = blend(data[offset + 2], color.b, color.a);
        }
    }
}

/// Strokes the outline of a rectangle with an inward `line_width`.
pub fn stroke_rect(frame: &mut Frame, x: i64, y: i64, w: i64, h: i64, line_width: i64, color: Rgba) {
    if w <= 0 || h <= 0 {
        return;
    }
    let lw = line_width.max(1).min(w).min(h);
    fill_rect(frame, x, y, w, lw, color);
    fill_rect(frame, x, y + h - lw, w, lw, color);
    fill_rect(frame, x, y + lw, lw, h - 2 * lw, color);
    fill_rect(frame, x + w - lw, y + lw, lw, h - 2 * lw, color);
}
