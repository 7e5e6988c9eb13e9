//! Inter-task communication channels
//!
//! Defines the static channels used for communication between Embassy tasks.
//! Uses embassy-sync primitives for safe async communication.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;

use envmon_core::reading::{Measurement, PowerReading};
use envmon_core::supervisor::SensorStatus;

/// Channel capacity for display updates
const DISPLAY_CHANNEL_SIZE: usize = 4;

/// What the sensor task reports after each cycle that did something
#[derive(Clone, Copy, defmt::Format)]
pub enum DisplayUpdate {
    /// Environmental sensor status, with the reading if the cycle succeeded
    Environment(SensorStatus, Option<Measurement>),
    /// Power monitor status, with the reading if the cycle succeeded
    Power(SensorStatus, Option<PowerReading>),
}

/// Sensor results for the display task
pub static DISPLAY_CHANNEL: Channel<CriticalSectionRawMutex, DisplayUpdate, DISPLAY_CHANNEL_SIZE> =
    Channel::new();
