use crate::shared::expression::{emoji_for_label, BestExpression};
use crate::shared::frame::Frame;
use crate::shared::region::Region;

/// The emoji + label readout shown next to the video.
#[derive(Clone, Debug, PartialEq)]
pub struct Badge {
    pub emoji: &'static str,
    pub text: String,
    /// New label opacity, or `None` to leave the current opacity as is.
    pub opacity: Option<f64>,
}

impl Badge {
    pub fn new(best: &BestExpression, opacity: Option<f64>) -> Self {
        Self {
            emoji: emoji_for_label(best.expression.name()),
            text: best.label(),
            opacity,
        }
    }
}

/// Domain interface for drawing the expression overlay.
///
/// `clear` runs on every frame callback; `draw_face` and `show_badge` only
/// on detection cycles.
pub trait OverlayRenderer: Send {
    /// Removes anything drawn over the video since the last callback.
    fn clear(&mut self);

    /// Draws the face box and its label plate over `frame`.
    fn draw_face(
        &mut self,
        frame: &Frame,
        region: &Region,
        best: &BestExpression,
    ) -> Result<(), Box<dyn std::error::Error>>;

    /// Updates the emoji/label readout.
    fn show_badge(&mut self, badge: &Badge) -> Result<(), Box<dyn std::error::Error>>;
}
