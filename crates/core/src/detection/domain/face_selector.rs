use super::face_detector::FaceDetection;

/// Picks the detection with the largest bounding-box area.
///
/// Scans in input order and only replaces the candidate on a strictly
/// larger area, so the first of several equal-area faces wins.
pub fn pick_largest_face(detections: &[FaceDetection]) -> Option<&FaceDetection> {
    let (first, rest) = detections.split_first()?;
    let mut best = first;
    let mut max_area = first.region.area();
    for d in rest {
        let area = d.region.area();
        if area > max_area {
            best = d;
            max_area = area;
        }
    }
    Some(best)
}
