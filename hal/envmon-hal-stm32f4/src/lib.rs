//! STM32F4-specific HAL for the envmon firmware
//!
//! This crate implements the `envmon-hal` traits for the STM32F4 family
//! (I2C v1 peripheral). It targets the STM32F411 used on the display unit,
//! but every F4 part with the same I2C block works.
//!
//! # Features
//!
//! - `defmt` - Enable debug formatting support
//! - `serde` - Serializable instance/pin descriptions
//!
//! # Usage
//!
//! The firmware enables the peripheral clock and sets up the pins listed by
//! [`pins::I2cInstance::pins`], then hands an [`regs::Mmio`] block to
//! [`i2c::I2cPort::new`]. Clocks and GPIO stay with embassy-stm32.

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

pub mod i2c;
pub mod pins;
pub mod regs;

pub use i2c::{I2cPort, Timing};
pub use pins::{AfPin, I2cInstance, PinMap, Port};
pub use regs::{Mmio, Reg, RegisterBlock};
