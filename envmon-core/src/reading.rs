//! Sensor reading types
//!
//! Values stay in the sensors' native fixed-point units. The helpers only
//! rescale; formatting for the screen belongs to the display layer.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Compensated environmental reading
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Measurement {
    /// Relative humidity in %RH × 1024 (Q22.10)
    pub humidity: u32,
    /// Pressure in Pa × 256 (Q24.8)
    pub pressure: u32,
    /// Temperature in °C × 100
    pub temperature: i32,
}

impl Measurement {
    /// Pressure in whole pascals
    pub fn pressure_pa(&self) -> u32 {
        self.pressure >> 8
    }

    /// Pressure in hPa × 10
    pub fn pressure_hpa_x10(&self) -> u32 {
        (self.pressure >> 8) / 10
    }

    /// Relative humidity in %RH × 100
    pub fn humidity_x100(&self) -> u32 {
        ((self.humidity as u64 * 100) >> 10) as u32
    }

    /// Temperature in 0.1°C units, rounded toward zero
    pub fn temperature_x10(&self) -> i32 {
        self.temperature / 10
    }
}

/// Raw power monitor registers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PowerReading {
    /// Bus voltage register
    pub bus_voltage: u16,
    /// Shunt voltage register (two's complement, 10 µV/LSB)
    pub shunt_voltage: u16,
    /// Current register (scaled by the calibration register)
    pub current: u16,
    /// Power register (scaled by the calibration register)
    pub power: u16,
}

impl PowerReading {
    /// Bus voltage in millivolts (4 mV/LSB, bits 15..3)
    pub fn bus_voltage_mv(&self) -> u32 {
        (self.bus_voltage >> 3) as u32 * 4
    }

    /// Shunt voltage in microvolts
    pub fn shunt_voltage_uv(&self) -> i32 {
        self.shunt_voltage as i16 as i32 * 10
    }

    /// Conversion ready flag (CNVR)
    pub fn conversion_ready(&self) -> bool {
        self.bus_voltage & 0x0002 != 0
    }

    /// Math overflow flag (OVF): power/current are invalid
    pub fn overflow(&self) -> bool {
        self.bus_voltage & 0x0001 != 0
    }
}
