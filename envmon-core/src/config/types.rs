//! Configuration type definitions
//!
//! These types describe how the board is wired and how often sensors are
//! polled. The firmware builds one at startup; all fields have defaults
//! matching the reference board (STM32F411 at 84 MHz, APB1 at 42 MHz).

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Highest SCL frequency supported by the I2C v1 peripheral
pub const MAX_BUS_FREQUENCY_HZ: u32 = 400_000;

/// Valid range of the I2C input clock (CR2.FREQ)
pub const MIN_INPUT_CLOCK_HZ: u32 = 2_000_000;
pub const MAX_INPUT_CLOCK_HZ: u32 = 50_000_000;

/// Default BME280 address (SDO tied low)
pub const DEFAULT_BME280_ADDRESS: u8 = 0x76;

/// Default INA219 address (A0/A1 tied low)
pub const DEFAULT_INA219_ADDRESS: u8 = 0x40;

/// Configuration validation errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// Device address does not fit in 7 bits
    InvalidAddress(u8),
    /// Both sensors configured at the same address
    AddressConflict(u8),
    /// SCL frequency zero or above fast mode
    InvalidBusFrequency(u32),
    /// Input clock outside the peripheral's range
    InvalidInputClock(u32),
    /// Polling interval of zero
    InvalidInterval,
}

/// Shared bus settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BusSettings {
    /// Peripheral input (APB1) clock in Hz
    pub input_clock_hz: u32,
    /// SCL frequency in Hz
    pub frequency_hz: u32,
    /// Upper bound for every status poll (ms)
    pub timeout_ms: u32,
}

impl Default for BusSettings {
    fn default() -> Self {
        Self {
            input_clock_hz: 42_000_000,
            frequency_hz: 100_000,
            timeout_ms: 10,
        }
    }
}

/// Sensor polling policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PollingSettings {
    /// Time between reading cycles (ms)
    pub read_interval_ms: u32,
    /// Delay before retrying a failed initialization (ms)
    pub reinit_interval_ms: u32,
    /// Consecutive failed reads before the sensor is re-initialized
    pub max_read_failures: u8,
}

impl Default for PollingSettings {
    fn default() -> Self {
        Self {
            read_interval_ms: 1000,
            reinit_interval_ms: 5000,
            max_read_failures: 3,
        }
    }
}

/// Board description
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BoardConfig {
    /// I2C bus
    pub bus: BusSettings,
    /// Environmental sensor address
    pub bme280_address: u8,
    /// Power monitor address, if fitted
    pub ina219_address: Option<u8>,
    /// Sensor polling
    pub polling: PollingSettings,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            bus: BusSettings::default(),
            bme280_address: DEFAULT_BME280_ADDRESS,
            ina219_address: Some(DEFAULT_INA219_ADDRESS),
            polling: PollingSettings::default(),
        }
    }
}

impl BoardConfig {
    /// Check the configuration for values the hardware cannot honour
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bus.frequency_hz == 0 || self.bus.frequency_hz > MAX_BUS_FREQUENCY_HZ {
            return Err(ConfigError::InvalidBusFrequency(self.bus.frequency_hz));
        }

        if !(MIN_INPUT_CLOCK_HZ..=MAX_INPUT_CLOCK_HZ).contains(&self.bus.input_clock_hz) {
            return Err(ConfigError::InvalidInputClock(self.bus.input_clock_hz));
        }

        if self.bme280_address > 0x7F {
            return Err(ConfigError::InvalidAddress(self.bme280_address));
        }

        if let Some(address) = self.ina219_address {
            if address > 0x7F {
                return Err(ConfigError::InvalidAddress(address));
            }
            if address == self.bme280_address {
                return Err(ConfigError::AddressConflict(address));
            }
        }

        if self.polling.read_interval_ms == 0 {
            return Err(ConfigError::InvalidInterval);
        }

        Ok(())
    }
}
