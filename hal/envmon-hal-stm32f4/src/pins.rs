//! I2C peripheral instances and their pin assignments
//!
//! Binds a logical bus to its physical register block and GPIO pins. The
//! firmware configures the listed pins as open-drain, pulled-up alternate
//! function outputs before the port is configured.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Base address of I2C1; I2C2 and I2C3 follow at 0x400 strides
const I2C1_BASE: usize = 0x4000_5400;

/// GPIO port letter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Port {
    A,
    B,
    C,
}

/// A GPIO pin with its alternate function number
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AfPin {
    pub port: Port,
    pub pin: u8,
    pub af: u8,
}

/// SDA/SCL pins of one I2C instance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PinMap {
    pub sda: AfPin,
    pub scl: AfPin,
}

/// I2C peripheral instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum I2cInstance {
    #[default]
    I2c1,
    I2c2,
    I2c3,
}

impl I2cInstance {
    /// Instance number (1-based)
    pub const fn number(self) -> u8 {
        match self {
            I2cInstance::I2c1 => 1,
            I2cInstance::I2c2 => 2,
            I2cInstance::I2c3 => 3,
        }
    }

    /// Register block base address
    pub const fn base_address(self) -> usize {
        I2C1_BASE + 0x400 * (self.number() as usize - 1)
    }

    /// APB1ENR clock enable bit for this instance
    pub const fn apb1_enable_bit(self) -> u32 {
        1 << (self.number() as u32 + 20)
    }

    /// Pin assignment on the board
    pub const fn pins(self) -> PinMap {
        match self {
            I2cInstance::I2c1 => PinMap {
                sda: AfPin { port: Port::B, pin: 7, af: 4 },
                scl: AfPin { port: Port::B, pin: 6, af: 4 },
            },
            I2cInstance::I2c2 => PinMap {
                sda: AfPin { port: Port::B, pin: 3, af: 9 },
                scl: AfPin { port: Port::B, pin: 10, af: 4 },
            },
            I2cInstance::I2c3 => PinMap {
                sda: AfPin { port: Port::B, pin: 4, af: 9 },
                scl: AfPin { port: Port::A, pin: 8, af: 4 },
            },
        }
    }
}
