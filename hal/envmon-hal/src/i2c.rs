//! I2C bus abstractions
//!
//! Provides the byte/condition-level primitives of a polled I2C master.
//! Chip-specific HALs implement [`BusTransport`]; register-addressed device
//! access is layered on top of it in `envmon-drivers`.

use crate::time::Timeout;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Transfer direction encoded in the least significant bit of the address byte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Direction {
    /// Master transmits (R/W bit = 0)
    Write,
    /// Master receives (R/W bit = 1)
    Read,
}

/// Acknowledge policy for a received byte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Ack {
    /// Acknowledge, requesting another byte
    Ack,
    /// Not-acknowledge, marking the last byte of a read
    Nack,
}

/// 7-bit device address
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Address(u8);

impl Address {
    /// Create an address, returning `None` if it does not fit in 7 bits
    pub const fn new(address: u8) -> Option<Self> {
        if address <= 0x7F {
            Some(Self(address))
        } else {
            None
        }
    }

    /// Raw 7-bit value
    pub const fn value(self) -> u8 {
        self.0
    }

    /// Address byte placed on the wire: `(address << 1) | rw`
    pub const fn frame(self, direction: Direction) -> u8 {
        match direction {
            Direction::Write => self.0 << 1,
            Direction::Read => (self.0 << 1) | 1,
        }
    }
}

/// Status condition a transport was polling for when it gave up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Condition {
    /// Bus never left the busy state
    BusIdle,
    /// START condition was not confirmed
    StartGenerated,
    /// Address was not acknowledged (device absent or busy)
    AddressAcknowledged,
    /// Transmit data register never emptied
    TransmitEmpty,
    /// No byte arrived in the receive data register
    ReceiveNotEmpty,
}

/// Error from I2C transport operations
///
/// Every failure of a polled transport is a timeout; the condition tells
/// the caller which step of the transaction stalled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BusError {
    /// A status poll did not succeed within its timeout
    Timeout(Condition),
}

/// Polled I2C master transport
///
/// Implementations busy-wait on hardware status bits; every wait is bounded
/// by the supplied timeout. No primitive retries, and none of them releases
/// the bus on failure: the caller must always finish with
/// [`stop_condition`](BusTransport::stop_condition).
pub trait BusTransport {
    /// Wait until no transfer is in progress on the bus
    fn wait_idle(&mut self, timeout: Timeout) -> Result<(), BusError>;

    /// Generate a (repeated) START condition
    fn start_condition(&mut self, timeout: Timeout) -> Result<(), BusError>;

    /// Generate a STOP condition
    ///
    /// Completion is not confirmed; that is only observable in slave mode.
    fn stop_condition(&mut self);

    /// Send the address byte and wait for the device to acknowledge it
    fn send_address(
        &mut self,
        address: Address,
        direction: Direction,
        timeout: Timeout,
    ) -> Result<(), BusError>;

    /// Send one data byte
    fn send_byte(&mut self, value: u8, timeout: Timeout) -> Result<(), BusError>;

    /// Receive one data byte, answering with the given acknowledge policy
    fn receive_byte(&mut self, ack: Ack, timeout: Timeout) -> Result<u8, BusError>;
}

impl<T: BusTransport + ?Sized> BusTransport for &mut T {
    fn wait_idle(&mut self, timeout: Timeout) -> Result<(), BusError> {
        (**self).wait_idle(timeout)
    }

    fn start_condition(&mut self, timeout: Timeout) -> Result<(), BusError> {
        (**self).start_condition(timeout)
    }

    fn stop_condition(&mut self) {
        (**self).stop_condition()
    }

    fn send_address(
        &mut self,
        address: Address,
        direction: Direction,
        timeout: Timeout,
    ) -> Result<(), BusError> {
        (**self).send_address(address, direction, timeout)
    }

    fn send_byte(&mut self, value: u8, timeout: Timeout) -> Result<(), BusError> {
        (**self).send_byte(value, timeout)
    }

    fn receive_byte(&mut self, ack: Ack, timeout: Timeout) -> Result<u8, BusError> {
        (**self).receive_byte(ack, timeout)
    }
}

/// Bus speed class
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum SpeedMode {
    /// Standard mode, up to 100 kHz
    Standard,
    /// Fast mode, up to 400 kHz
    Fast,
}

/// I2C configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct I2cConfig {
    /// Peripheral input (APB) clock in Hz
    pub input_clock_hz: u32,
    /// SCL frequency in Hz
    pub frequency: u32,
}

impl Default for I2cConfig {
    fn default() -> Self {
        Self::standard(16_000_000)
    }
}

impl I2cConfig {
    /// Standard mode (100 kHz)
    pub const fn standard(input_clock_hz: u32) -> Self {
        Self {
            input_clock_hz,
            frequency: 100_000,
        }
    }

    /// Fast mode (400 kHz)
    pub const fn fast(input_clock_hz: u32) -> Self {
        Self {
            input_clock_hz,
            frequency: 400_000,
        }
    }

    /// Speed class implied by the SCL frequency
    pub const fn speed_mode(&self) -> SpeedMode {
        if self.frequency > 100_000 {
            SpeedMode::Fast
        } else {
            SpeedMode::Standard
        }
    }

    /// Input clock in whole MHz
    pub const fn input_clock_mhz(&self) -> u32 {
        self.input_clock_hz / 1_000_000
    }
}
