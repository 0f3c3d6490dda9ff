use std::io::Write;

use crate::overlay::domain::overlay_renderer::{Badge, OverlayRenderer};
use crate::shared::expression::BestExpression;
use crate::shared::frame::Frame;
use crate::shared::region::Region;

/// Renders the badge as a single self-overwriting terminal line.
///
/// There is no video surface in a terminal, so face boxes are only logged.
pub struct ConsoleBadgeRenderer<W: Write + Send> {
    out: W,
    opacity: f64,
    lines: usize,
}

impl ConsoleBadgeRenderer<std::io::Stderr> {
    pub fn stderr() -> Self {
        Self::new(std::io::stderr())
    }
}

impl<W: Write + Send> ConsoleBadgeRenderer<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            opacity: 1.0,
            lines: 0,
        }
    }

    pub fn opacity(&self) -> f64 {
        self.opacity
    }

    pub fn lines_written(&self) -> usize {
        self.lines
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write + Send> OverlayRenderer for ConsoleBadgeRenderer<W> {
    fn clear(&mut self) {}

    fn draw_face(
        &mut self,
        _frame: &Frame,
        region: &Region,
        best: &BestExpression,
    ) -> Result<(), Box<dyn std::error::Error>> {
        log::debug!(
            "face at ({:.0}, {:.0}) {:.0}x{:.0}: {}",
            region.x,
            region.y,
            region.width,
            region.height,
            best.label()
        );
        Ok(())
    }

    fn show_badge(&mut self, badge: &Badge) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(opacity) = badge.opacity {
            self.opacity = opacity;
        }
        write!(
            self.out,
            "\r{} {:<16} opacity {:.2}",
            badge.emoji, badge.text, self.opacity
        )?;
        self.out.flush()?;
        self.lines += 1;
        Ok(())
    }
}
