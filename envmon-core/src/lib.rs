//! Board-agnostic core logic for the environmental monitor firmware
//!
//! This crate contains all application logic that does not depend on
//! specific hardware implementations:
//!
//! - Sensor traits and reading types
//! - Sensor supervision (init, periodic reads, recovery)
//! - Configuration type definitions

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

pub mod config;
pub mod reading;
pub mod supervisor;
pub mod traits;
