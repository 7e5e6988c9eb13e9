//! Embassy async tasks
//!
//! Each task runs independently and communicates via channels.

pub mod display;
pub mod sensors;

pub use display::display_task;
pub use sensors::sensor_task;
