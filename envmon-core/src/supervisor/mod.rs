//! Sensor supervision
//!
//! Drives polled sensors through initialization, periodic reads and
//! recovery from bus failures.

mod monitor;

pub use monitor::{Outcome, SensorState, SensorStatus, SensorSupervisor};
