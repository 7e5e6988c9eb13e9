//! envmon Hardware Abstraction Layer
//!
//! This crate defines the hardware abstraction traits implemented by
//! chip-specific HALs (STM32F4 today). Sensor drivers are written against
//! these traits so they can be exercised on the host with fakes.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  Sensor drivers (envmon-drivers)        │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  envmon-hal (this crate - traits)       │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//!             ┌───────────────┐
//!             │  envmon-hal-  │
//!             │    stm32f4    │
//!             └───────────────┘
//! ```
//!
//! # Traits
//!
//! - [`i2c::BusTransport`] - Polled I2C master primitives
//! - [`time::TickSource`] - Millisecond counter used to bound every poll

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

pub mod i2c;
pub mod time;

// Re-export key items at crate root for convenience
pub use i2c::{Ack, Address, BusError, BusTransport, Condition, Direction, I2cConfig, SpeedMode};
pub use time::{poll_until, Deadline, Expired, TickSource, Timeout};
