//! INA219 bus voltage/current monitor
//!
//! All registers are 16-bit, big-endian on the wire. The driver reports raw
//! register values; scaling of current and power depends on the shunt and
//! the calibration register, both board decisions.

use embassy_sync::blocking_mutex::raw::RawMutex;
use envmon_core::reading::PowerReading;
use envmon_core::traits::{PolledSensor, SensorError};
use envmon_hal::{Address, BusError, BusTransport, Timeout};

use crate::register::{RegisterDevice, SharedBus};

/// INA219 register addresses
pub mod reg {
    pub const CONFIG: u8 = 0x00;
    pub const SHUNT_VOLTAGE: u8 = 0x01;
    pub const BUS_VOLTAGE: u8 = 0x02;
    pub const POWER: u8 = 0x03;
    pub const CURRENT: u8 = 0x04;
    pub const CALIBRATION: u8 = 0x05;
}

/// INA219 driver configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Ina219Config {
    /// Calibration register value programmed at init, if any
    ///
    /// Without it the current and power registers read zero.
    pub calibration: Option<u16>,
}

/// Per-register results of one reading cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PartialReading {
    pub shunt_voltage: Result<u16, BusError>,
    pub bus_voltage: Result<u16, BusError>,
    pub power: Result<u16, BusError>,
    pub current: Result<u16, BusError>,
}

impl PartialReading {
    /// Complete reading, or the first failure in register order
    pub fn complete(self) -> Result<PowerReading, BusError> {
        Ok(PowerReading {
            shunt_voltage: self.shunt_voltage?,
            bus_voltage: self.bus_voltage?,
            power: self.power?,
            current: self.current?,
        })
    }
}

/// INA219 driver
pub struct Ina219<'a, M: RawMutex, B> {
    device: RegisterDevice<'a, M, B>,
    config: Ina219Config,
}

impl<'a, M: RawMutex, B: BusTransport> Ina219<'a, M, B> {
    pub fn new(
        bus: &'a SharedBus<M, B>,
        address: Address,
        timeout: Timeout,
        config: Ina219Config,
    ) -> Self {
        Self {
            device: RegisterDevice::new(bus, address, timeout),
            config,
        }
    }

    pub fn config(&self) -> &Ina219Config {
        &self.config
    }

    /// Program the calibration register if one is configured
    pub fn init(&mut self) -> Result<(), BusError> {
        if let Some(calibration) = self.config.calibration {
            self.device
                .write_registers(reg::CALIBRATION, &calibration.to_be_bytes())?;
        }
        Ok(())
    }

    /// Read one 16-bit register
    pub fn read_word(&self, register: u8) -> Result<u16, BusError> {
        let mut buf = [0u8; 2];
        self.device.read_registers(register, &mut buf)?;
        Ok(u16::from_be_bytes(buf))
    }

    /// Read all four measurement registers, keeping each result
    ///
    /// Every register is attempted even if an earlier one failed.
    pub fn read_partial(&self) -> PartialReading {
        PartialReading {
            shunt_voltage: self.read_word(reg::SHUNT_VOLTAGE),
            bus_voltage: self.read_word(reg::BUS_VOLTAGE),
            power: self.read_word(reg::POWER),
            current: self.read_word(reg::CURRENT),
        }
    }

    /// Read all four measurement registers
    pub fn read_data(&self) -> Result<PowerReading, BusError> {
        self.read_partial().complete()
    }
}

impl<M: RawMutex, B: BusTransport> PolledSensor for Ina219<'_, M, B> {
    type Reading = PowerReading;

    fn initialize(&mut self) -> Result<(), SensorError> {
        self.init().map_err(|_e| {
            #[cfg(feature = "defmt")]
            defmt::error!("INA219 init: {}", _e);
            SensorError::Bus
        })
    }

    fn read(&mut self) -> Result<PowerReading, SensorError> {
        self.read_data().map_err(|_e| {
            #[cfg(feature = "defmt")]
            defmt::warn!("INA219 read: {}", _e);
            SensorError::Bus
        })
    }
}
