/// YOLO face detector using ONNX Runtime via `ort`.
///
/// Handles letterbox preprocessing, inference and NMS post-processing.
/// Only the box and confidence columns of the output are read; landmark
/// columns, when present, are ignored.
use std::path::Path;

use crate::detection::domain::face_detector::DetectorOptions;
use crate::shared::frame::Frame;
use crate::shared::region::Region;

use super::math::nms;
use super::onnx_session::{load_session, static_input_size};

/// NMS IoU threshold.
const NMS_IOU_THRESH: f64 = 0.45;

/// Gray used to pad letterboxed input (YOLO convention, 114/255).
const PAD_VALUE: f32 = 114.0 / 255.0;

pub struct OnnxFaceDetector {
    session: ort::session::Session,
    static_size: Option<u32>,
}

impl OnnxFaceDetector {
    /// Load a YOLO face model.
    ///
    /// When the model declares a fixed input size it wins over the size
    /// requested per call.
    pub fn new(model_path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let session = load_session(model_path)?;
        let static_size = static_input_size(&session);
        Ok(Self {
            session,
            static_size,
        })
    }

    /// Returns `(region, confidence)` for every face above the threshold,
    /// highest confidence first.
    pub fn detect_faces(
        &mut self,
        frame: &Frame,
        options: &DetectorOptions,
    ) -> Result<Vec<(Region, f64)>, Box<dyn std::error::Error>> {
        let input_size = self.static_size.unwrap_or(options.input_size);
        let (input_tensor, lb) = letterbox(frame, input_size);

        let input_value = ort::value::Tensor::from_array(input_tensor)?;
        let outputs = self.session.run(ort::inputs![input_value])?;
        if outputs.len() == 0 {
            return Err("face model produced no outputs".into());
        }
        let tensor = outputs[0].try_extract_array::<f32>()?;
        let shape = tensor.shape().to_vec();
        let data = tensor.as_slice().ok_or("Cannot get tensor slice")?;

        let boxes = parse_predictions(data, &shape, options.score_threshold)?;
        let kept = nms(boxes, NMS_IOU_THRESH);

        Ok(kept
            .into_iter()
            .map(|(bbox, conf)| (lb.to_frame(bbox, frame.width(), frame.height()), conf))
            .collect())
    }
}

/// Scale and padding applied when letterboxing, needed to map boxes back.
#[derive(Clone, Copy, Debug, PartialEq)]
struct Letterbox {
    scale: f64,
    pad_x: u32,
    pad_y: u32,
}

impl Letterbox {
    /// Maps a letterbox-space `[x1, y1, x2, y2]` box into a frame region,
    /// clamped to the frame bounds.
    fn to_frame(&self, bbox: [f64; 4], frame_w: u32, frame_h: u32) -> Region {
        let fw = frame_w as f64;
        let fh = frame_h as f64;
        let x1 = ((bbox[0] - self.pad_x as f64) / self.scale).clamp(0.0, fw);
        let y1 = ((bbox[1] - self.pad_y as f64) / self.scale).clamp(0.0, fh);
        let x2 = ((bbox[2] - self.pad_x as f64) / self.scale).clamp(0.0, fw);
        let y2 = ((bbox[3] - self.pad_y as f64) / self.scale).clamp(0.0, fh);
        Region::from_corners(x1, y1, x2, y2)
    }
}

/// Letterbox-resize a frame to `target_size` × `target_size` NCHW float32.
fn letterbox(frame: &Frame, target_size: u32) -> (ndarray::Array4<f32>, Letterbox) {
    let fw = frame.width() as f64;
    let fh = frame.height() as f64;
    let target = target_size as f64;

    let scale = (target / fw).min(target / fh);
    let new_w = ((fw * scale).round() as u32).min(target_size);
    let new_h = ((fh * scale).round() as u32).min(target_size);
    let pad_x = (target_size - new_w) / 2;
    let pad_y = (target_size - new_h) / 2;

    let mut tensor = ndarray::Array4::<f32>::from_elem(
        (1, 3, target_size as usize, target_size as usize),
        PAD_VALUE,
    );

    let src = frame.as_ndarray();
    let src_h = frame.height() as usize;
    let src_w = frame.width() as usize;
    let channels = frame.channels() as usize;

    // Nearest-neighbor resize into the padded area
    for y in 0..new_h as usize {
        let src_y = ((y as f64 / scale) as usize).min(src_h - 1);
        for x in 0..new_w as usize {
            let src_x = ((x as f64 / scale) as usize).min(src_w - 1);
            let ty = pad_y as usize + y;
            let tx = pad_x as usize + x;
            for c in 0..3 {
                let sc = c.min(channels - 1);
                tensor[[0, c, ty, tx]] = src[[src_y, src_x, sc]] as f32 / 255.0;
            }
        }
    }

    (
        tensor,
        Letterbox {
            scale,
            pad_x,
            pad_y,
        },
    )
}

/// Decodes YOLO rows `[cx, cy, w, h, conf, ...]` into corner boxes.
///
/// Accepts both `[1, features, detections]` and `[1, detections, features]`
/// layouts.
fn parse_predictions(
    data: &[f32],
    shape: &[usize],
    threshold: f64,
) -> Result<Vec<([f64; 4], f64)>, Box<dyn std::error::Error>> {
    if shape.len() != 3 {
        return Err(format!("Unexpected face model output shape: {shape:?}").into());
    }
    let transposed = shape[1] < shape[2];
    let (num_dets, num_feats) = if transposed {
        (shape[2], shape[1])
    } else {
        (shape[1], shape[2])
    };
    if num_feats < 5 {
        return Ok(Vec::new());
    }

    let value = |det: usize, feat: usize| -> f64 {
        if transposed {
            data[feat * num_dets + det] as f64
        } else {
            data[det * num_feats + feat] as f64
        }
    };

    let mut boxes = Vec::new();
    for i in 0..num_dets {
        let conf = value(i, 4);
        if conf < threshold {
            continue;
        }
        let cx = value(i, 0);
        let cy = value(i, 1);
        let w = value(i, 2);
        let h = value(i, 3);
        boxes.push((
            [cx - w / 2.0, cy - h / 2.0, cx + w / 2.0, cy + h / 2.0],
            conf,
        ));
    }
    Ok(boxes)
}
