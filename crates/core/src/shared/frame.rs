use ndarray::ArrayView3;

/// A single captured frame: contiguous RGB bytes in row-major order.
///
/// `timestamp_ms` is monotonic within a stream and is the clock the
/// session's interval gate runs on.
#[derive(Clone, Debug)]
pub struct Frame {
    data: Vec<u8>,
    width: u32,
    height: u32,
    channels: u8,
    index: usize,
    timestamp_ms: f64,
}

impl Frame {
    pub fn new(
        data: Vec<u8>,
        width: u32,
        height: u32,
        channels: u8,
        index: usize,
        timestamp_ms: f64,
    ) -> Self {
        debug_assert_eq!(
            data.len(),
            (width as usize) * (height as usize) * (channels as usize),
            "data length must equal width * height * channels"
        );
        Self {
            data,
            width,
            height,
            channels,
            index,
            timestamp_ms,
        }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channels(&self) -> u8 {
        self.channels
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn timestamp_ms(&self) -> f64 {
        self.timestamp_ms
    }

    pub fn as_ndarray(&self) -> ArrayView3<'_, u8> {
        ArrayView3::from_shape(
            (
                self.height as usize,
                self.width as usize,
                self.channels as usize,
            ),
            &self.data,
        )
        .expect("Frame data length must match dimensions")
    }

    /// ITU-R BT.601 luma of the pixel at `(x, y)`, in 0..=255.
    pub fn luma(&self, x: u32, y: u32) -> f32 {
        let offset = ((y as usize) * (self.width as usize) + x as usize) * self.channels as usize;
        if self.channels < 3 {
            return self.data[offset] as f32;
        }
        let r = self.data[offset] as f32;
        let g = self.data[offset + 1] as f32;
        let b = self.data[offset + 2] as f32;
        0.299 * r + 0.587 * g + 0.114 * b
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_construction_and_accessors() {
        let data = vec![0u8; 12]; // 2x2x3
        let frame = Frame::new(data.clone(), 2, 2, 3, 5, 166.5);
        assert_eq!(frame.width(), 2);
        assert_eq!(frame.height(), 2);
        assert_eq!(frame.channels(), 3);
        assert_eq!(frame.index(), 5);
        assert_relative_eq!(frame.timestamp_ms(), 166.5);
        assert_eq!(frame.data(), &data[..]);
    }

    #[test]
    #[should_panic(expected = "data length must equal width * height * channels")]
    fn test_mismatched_data_length_panics_in_debug() {
        Frame::new(vec![0u8; 10], 2, 2, 3, 0, 0.0);
    }

    #[test]
    fn test_as_ndarray_shape_and_pixel() {
        let mut data = vec![0u8; 24]; // 2x4x3
        data[(4 + 1) * 3] = 255; // row=1, col=1, R
        let frame = Frame::new(data, 4, 2, 3, 0, 0.0);
        let arr = frame.as_ndarray();
        assert_eq!(arr.shape(), &[2, 4, 3]);
        assert_eq!(arr[[1, 1, 0]], 255);
        assert_eq!(arr[[1, 1, 1]], 0);
    }

    #[test]
    fn test_luma_of_white_and_red() {
        let mut data = vec![255u8; 6]; // 2x1 white
        data[3] = 255;
        data[4] = 0;
        data[5] = 0; // second pixel pure red
        let frame = Frame::new(data, 2, 1, 3, 0, 0.0);
        assert_relative_eq!(frame.luma(0, 0), 255.0, epsilon = 0.01);
        assert_relative_eq!(frame.luma(1, 0), 0.299 * 255.0, epsilon = 0.01);
    }

    #[test]
    fn test_data_mut_allows_modification() {
        let mut frame = Frame::new(vec![0u8; 6], 2, 1, 3, 0, 0.0);
        frame.data_mut()[0] = 255;
        assert_eq!(frame.data()[0], 255);
    }
}
