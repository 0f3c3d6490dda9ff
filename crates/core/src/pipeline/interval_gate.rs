/// Lets an expensive step run at most once per interval while a faster
/// loop keeps calling in.
///
/// Timestamps are stream milliseconds; `last_update_ms` starts at 0.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct IntervalGate {
    last_update_ms: f64,
}

impl IntervalGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_due(&self, now_ms: f64, interval_ms: f64) -> bool {
        now_ms - self.last_update_ms >= interval_ms
    }

    /// Records that a cycle started at `now_ms`.
    pub fn mark(&mut self, now_ms: f64) {
        self.last_update_ms = now_ms;
    }

    pub fn last_update_ms(&self) -> f64 {
        self.last_update_ms
    }
}
