//! Hardware driver implementations
//!
//! This crate provides concrete implementations of the traits defined
//! in envmon-core for the sensors on the display unit:
//!
//! - Register-addressed device access over a shared I2C bus
//! - BME280 humidity/pressure/temperature sensor
//! - INA219 bus voltage/current monitor

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

pub mod register;
pub mod sensor;

#[cfg(test)]
mod mock;

pub use register::{RegisterDevice, SharedBus, Transaction};
