//! Tick source backed by the embassy time driver

use embassy_time::Instant;
use envmon_hal::TickSource;

/// Milliseconds since boot, wrapping at `u32::MAX`
#[derive(Clone, Copy, Default)]
pub struct EmbassyClock;

impl TickSource for EmbassyClock {
    fn now_ms(&self) -> u32 {
        Instant::now().as_millis() as u32
    }
}
