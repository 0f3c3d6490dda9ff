use crate::shared::constants::FPS_WINDOW_MS;

/// Counts callbacks and reports a rounded rate once per window.
#[derive(Debug, Default)]
pub struct FpsCounter {
    window_start_ms: Option<f64>,
    count: u32,
    fps: Option<u32>,
}

impl FpsCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers one callback at `now_ms`. Returns the new rate when a window
    /// closes.
    pub fn tick(&mut self, now_ms: f64) -> Option<u32> {
        let start = *self.window_start_ms.get_or_insert(now_ms);
        self.count += 1;

        let elapsed = now_ms - start;
        if elapsed < FPS_WINDOW_MS {
            return None;
        }

        let fps = (self.count as f64 * 1000.0 / elapsed).round() as u32;
        self.count = 0;
        self.window_start_ms = Some(now_ms);
        self.fps = Some(fps);
        Some(fps)
    }

    /// Most recently reported rate.
    pub fn fps(&self) -> Option<u32> {
        self.fps
    }
}
