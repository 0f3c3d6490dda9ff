pub mod console_badge_renderer;
mod draw;
pub mod snapshot_renderer;
