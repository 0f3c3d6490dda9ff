use std::path::Path;

use crate::shared::expression::{Expression, ExpressionScores};
use crate::shared::frame::Frame;
use crate::shared::region::Region;

use super::math::softmax;
use super::onnx_session::load_session;

/// FER+ input is a single-channel 64x64 crop.
const INPUT_SIZE: usize = 64;

/// FER+ output order. Contempt has no label of its own and is folded into
/// disgusted.
const OUTPUT_LABELS: [Expression; 8] = [
    Expression::Neutral,
    Expression::Happy,
    Expression::Surprised,
    Expression::Sad,
    Expression::Angry,
    Expression::Disgusted,
    Expression::Fearful,
    Expression::Disgusted,
];

/// Expression classifier backed by the FER+ ONNX model.
pub struct OnnxExpressionClassifier {
    session: ort::session::Session,
}

impl OnnxExpressionClassifier {
    pub fn new(model_path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        Ok(Self {
            session: load_session(model_path)?,
        })
    }

    /// Classifies the face inside `region` into a probability per label.
    pub fn classify(
        &mut self,
        frame: &Frame,
        region: &Region,
    ) -> Result<ExpressionScores, Box<dyn std::error::Error>> {
        let input = preprocess(frame, region).ok_or("face region lies outside the frame")?;
        let input_value = ort::value::Tensor::from_array(input)?;
        let outputs = self.session.run(ort::inputs![input_value])?;
        if outputs.len() == 0 {
            return Err("expression model produced no outputs".into());
        }
        let tensor = outputs[0].try_extract_array::<f32>()?;
        let logits = tensor.as_slice().ok_or("Cannot get tensor slice")?;
        Ok(to_scores(logits))
    }
}

/// Crops `region`, converts to luma and nearest-neighbor resizes to 64x64.
///
/// FER+ expects raw 0..=255 intensities, so no normalization is applied.
fn preprocess(frame: &Frame, region: &Region) -> Option<ndarray::Array4<f32>> {
    let (rx, ry, rw, rh) = region.clamped_pixels(frame.width(), frame.height())?;
    let mut tensor = ndarray::Array4::<f32>::zeros((1, 1, INPUT_SIZE, INPUT_SIZE));
    let sx = rw as f64 / INPUT_SIZE as f64;
    let sy = rh as f64 / INPUT_SIZE as f64;
    for y in 0..INPUT_SIZE {
        let src_y = ry + ((y as f64 * sy) as u32).min(rh - 1);
        for x in 0..INPUT_SIZE {
            let src_x = rx + ((x as f64 * sx) as u32).min(rw - 1);
            tensor[[0, 0, y, x]] = frame.luma(src_x, src_y);
        }
    }
    Some(tensor)
}

fn to_scores(logits: &[f32]) -> ExpressionScores {
    let probabilities = softmax(logits);
    let mut scores = ExpressionScores::zero();
    for (label, p) in OUTPUT_LABELS.iter().zip(probabilities) {
        scores.set(*label, scores.get(*label) + p as f64);
    }
    scores
}
