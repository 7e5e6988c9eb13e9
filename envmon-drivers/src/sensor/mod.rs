//! I2C sensor drivers
//!
//! Drivers talk to their device through a [`RegisterDevice`](crate::register::RegisterDevice)
//! on a shared bus and implement [`PolledSensor`](envmon_core::traits::PolledSensor).

pub mod bme280;
pub mod ina219;

pub use bme280::{Bme280, Bme280Config, ChipIdCheck, InitError, ReadError};
pub use ina219::{Ina219, Ina219Config, PartialReading};
