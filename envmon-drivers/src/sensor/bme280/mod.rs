//! BME280 combined humidity/pressure/temperature sensor
//!
//! # Initialization
//!
//! 1. Read the chip id (0xD0)
//! 2. Soft reset (0xB6 to 0xE0) and wait for the NVM copy to finish
//!    (status bit `im_update` clears)
//! 3. Read the trimming coefficients, one register read per coefficient
//! 4. Program oversampling, filter and standby, then let the first
//!    conversion complete
//!
//! Readings are only available after all four steps succeed. A failed
//! initialization leaves the driver without coefficients; call
//! [`Bme280::initialize`] again to recover.

mod calibration;

pub use calibration::{unpack_h4_h5, Calibration, FineTemperature, RawSample};

use core::fmt;

use embassy_sync::blocking_mutex::raw::RawMutex;
use embedded_hal::delay::DelayNs;
use envmon_core::reading::Measurement;
use envmon_core::traits::{PolledSensor, SensorError};
use envmon_hal::{Address, BusError, BusTransport, Timeout};

use crate::register::{RegisterDevice, SharedBus};

/// BME280 register addresses
pub mod reg {
    pub const DIG_T1: u8 = 0x88;
    pub const DIG_T2: u8 = 0x8A;
    pub const DIG_T3: u8 = 0x8C;

    pub const DIG_P1: u8 = 0x8E;
    pub const DIG_P2: u8 = 0x90;
    pub const DIG_P3: u8 = 0x92;
    pub const DIG_P4: u8 = 0x94;
    pub const DIG_P5: u8 = 0x96;
    pub const DIG_P6: u8 = 0x98;
    pub const DIG_P7: u8 = 0x9A;
    pub const DIG_P8: u8 = 0x9C;
    pub const DIG_P9: u8 = 0x9E;

    pub const DIG_H1: u8 = 0xA1;
    pub const DIG_H2: u8 = 0xE1;
    pub const DIG_H3: u8 = 0xE3;
    pub const DIG_H4: u8 = 0xE4;
    pub const DIG_H5: u8 = 0xE5;
    pub const DIG_H6: u8 = 0xE7;

    /// Chip identification
    pub const CHIP_ID: u8 = 0xD0;
    /// Soft reset
    pub const RESET: u8 = 0xE0;
    /// Humidity oversampling
    pub const CTRL_HUM: u8 = 0xF2;
    /// Device status (bit 3 measuring, bit 0 im_update)
    pub const STATUS: u8 = 0xF3;
    /// Temperature/pressure oversampling and mode
    pub const CTRL_MEAS: u8 = 0xF4;
    /// Standby, filter
    pub const CONFIG: u8 = 0xF5;
    /// First data register (press_msb); 8 bytes through hum_lsb
    pub const DATA: u8 = 0xF7;
}

/// Value of the chip id register on a BME280
pub const CHIP_ID: u8 = 0x60;

/// Soft reset command word
const RESET_COMMAND: u8 = 0xB6;

/// Status bit set while the NVM coefficients are being copied
const STATUS_IM_UPDATE: u8 = 0x01;

/// Interval between status polls after a soft reset
const CALIBRATION_POLL_MS: u32 = 10;

/// Settling time after sampling configuration
const STARTUP_DELAY_MS: u32 = 100;

/// Oversampling setting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Sampling {
    Skip = 0b000,
    X1 = 0b001,
    X2 = 0b010,
    X4 = 0b011,
    X8 = 0b100,
    X16 = 0b101,
}

/// Power mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Mode {
    Sleep = 0b00,
    Forced = 0b01,
    Normal = 0b11,
}

/// IIR filter coefficient
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Filter {
    Off = 0b000,
    X2 = 0b001,
    X4 = 0b010,
    X8 = 0b011,
    X16 = 0b100,
}

/// Inactive time between conversions in normal mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Standby {
    Ms0_5 = 0b000,
    Ms62_5 = 0b001,
    Ms125 = 0b010,
    Ms250 = 0b011,
    Ms500 = 0b100,
    Ms1000 = 0b101,
    Ms10 = 0b110,
    Ms20 = 0b111,
}

/// Chip id verification policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ChipIdCheck {
    /// Accept any id (a mismatch is only logged)
    #[default]
    Disabled,
    /// Fail initialization unless the id matches
    Require(u8),
}

/// BME280 driver configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Bme280Config {
    pub mode: Mode,
    pub temperature_oversampling: Sampling,
    pub pressure_oversampling: Sampling,
    pub humidity_oversampling: Sampling,
    pub filter: Filter,
    pub standby: Standby,
    pub chip_id_check: ChipIdCheck,
    /// Upper bound for the post-reset NVM copy (ms)
    pub calibration_timeout_ms: u32,
}

impl Default for Bme280Config {
    fn default() -> Self {
        Self {
            mode: Mode::Normal,
            temperature_oversampling: Sampling::X16,
            pressure_oversampling: Sampling::X16,
            humidity_oversampling: Sampling::X16,
            filter: Filter::Off,
            standby: Standby::Ms0_5,
            chip_id_check: ChipIdCheck::Disabled,
            calibration_timeout_ms: 500,
        }
    }
}

impl Bme280Config {
    /// CTRL_HUM register value
    pub fn ctrl_hum(&self) -> u8 {
        self.humidity_oversampling as u8
    }

    /// CONFIG register value
    pub fn config(&self) -> u8 {
        (self.standby as u8) << 5 | (self.filter as u8) << 2
    }

    /// CTRL_MEAS register value
    pub fn ctrl_meas(&self) -> u8 {
        (self.temperature_oversampling as u8) << 5
            | (self.pressure_oversampling as u8) << 2
            | self.mode as u8
    }

    /// Number of status polls allowed after a soft reset
    fn calibration_polls(&self) -> u32 {
        (self.calibration_timeout_ms / CALIBRATION_POLL_MS).max(1)
    }
}

/// Initialization failure, by step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum InitError {
    /// Chip id could not be read
    ReadingId(BusError),
    /// Chip id did not match
    BadId(u8),
    /// Reset command was not accepted
    SoftReset(BusError),
    /// Status could not be read while waiting for the NVM copy
    ReadingCalibration(BusError),
    /// NVM copy did not finish in time
    CalibrationTimeout,
    /// A trimming coefficient could not be read
    ReadingCoefficients(BusError),
    /// Sampling configuration could not be written
    SettingSampling(BusError),
}

impl fmt::Display for InitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            InitError::ReadingId(_) => "Failed to read device id",
            InitError::BadId(_) => "Bad device id",
            InitError::SoftReset(_) => "Failed to perform soft reset",
            InitError::ReadingCalibration(_) => "Failed to read calibration",
            InitError::CalibrationTimeout => "Calibration timed out",
            InitError::ReadingCoefficients(_) => "Failed to read coefficients",
            InitError::SettingSampling(_) => "Failed to set sampling",
        })
    }
}

impl From<InitError> for SensorError {
    fn from(e: InitError) -> Self {
        match e {
            InitError::BadId(_) => SensorError::WrongDevice,
            InitError::CalibrationTimeout => SensorError::NotResponding,
            _ => SensorError::Bus,
        }
    }
}

/// Reading failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ReadError {
    /// No successful initialization yet
    NotInitialized,
    /// Burst read failed
    Bus(BusError),
}

impl fmt::Display for ReadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ReadError::NotInitialized => "Not ready",
            ReadError::Bus(_) => "Sensor failure",
        })
    }
}

impl From<ReadError> for SensorError {
    fn from(e: ReadError) -> Self {
        match e {
            ReadError::NotInitialized => SensorError::NotInitialized,
            ReadError::Bus(_) => SensorError::Bus,
        }
    }
}

/// BME280 driver
pub struct Bme280<'a, M: RawMutex, B, D> {
    device: RegisterDevice<'a, M, B>,
    delay: D,
    config: Bme280Config,
    calibration: Option<Calibration>,
}

impl<'a, M: RawMutex, B: BusTransport, D: DelayNs> Bme280<'a, M, B, D> {
    /// Create a driver; the device is not touched until [`initialize`](Self::initialize)
    pub fn new(
        bus: &'a SharedBus<M, B>,
        address: Address,
        timeout: Timeout,
        delay: D,
        config: Bme280Config,
    ) -> Self {
        Self {
            device: RegisterDevice::new(bus, address, timeout),
            delay,
            config,
            calibration: None,
        }
    }

    pub fn config(&self) -> &Bme280Config {
        &self.config
    }

    /// Coefficients of the last successful initialization
    pub fn calibration(&self) -> Option<&Calibration> {
        self.calibration.as_ref()
    }

    pub fn is_initialized(&self) -> bool {
        self.calibration.is_some()
    }

    /// Read the chip id register
    pub fn read_id(&self) -> Result<u8, BusError> {
        self.device.read_register(reg::CHIP_ID)
    }

    /// Read the status register
    pub fn read_status(&self) -> Result<u8, BusError> {
        self.device.read_register(reg::STATUS)
    }

    /// Burst-read the eight data registers
    pub fn read_raw(&self) -> Result<[u8; 8], BusError> {
        let mut regs = [0u8; 8];
        self.device.read_registers(reg::DATA, &mut regs)?;
        Ok(regs)
    }

    /// Run the full initialization sequence
    pub fn initialize(&mut self) -> Result<(), InitError> {
        self.calibration = None;

        let id = self.read_id().map_err(InitError::ReadingId)?;
        match self.config.chip_id_check {
            ChipIdCheck::Require(expected) if id != expected => {
                return Err(InitError::BadId(id));
            }
            ChipIdCheck::Disabled if id != CHIP_ID => {
                #[cfg(feature = "defmt")]
                defmt::warn!("BME280: unexpected chip id {=u8:#x}", id);
            }
            _ => {}
        }

        self.device
            .write_register(reg::RESET, RESET_COMMAND)
            .map_err(InitError::SoftReset)?;
        self.wait_for_nvm_copy()?;

        let calibration = self
            .read_coefficients()
            .map_err(InitError::ReadingCoefficients)?;

        self.set_sampling().map_err(InitError::SettingSampling)?;
        self.delay.delay_ms(STARTUP_DELAY_MS);

        #[cfg(feature = "defmt")]
        defmt::info!("BME280 initialized (id {=u8:#x})", id);

        self.calibration = Some(calibration);
        Ok(())
    }

    /// Read and compensate one sample
    pub fn read_compensated(&mut self) -> Result<Measurement, ReadError> {
        let calibration = self.calibration.ok_or(ReadError::NotInitialized)?;
        let regs = self.read_raw().map_err(ReadError::Bus)?;
        Ok(calibration.compensate(&RawSample::from_bytes(&regs)))
    }

    /// Poll im_update until the NVM copy after reset is done
    fn wait_for_nvm_copy(&mut self) -> Result<(), InitError> {
        for _ in 0..self.config.calibration_polls() {
            self.delay.delay_ms(CALIBRATION_POLL_MS);
            let status = self.read_status().map_err(InitError::ReadingCalibration)?;
            if status & STATUS_IM_UPDATE == 0 {
                return Ok(());
            }
        }
        Err(InitError::CalibrationTimeout)
    }

    fn read_coefficients(&self) -> Result<Calibration, BusError> {
        let mut calibration = Calibration {
            dig_t1: self.read_u16(reg::DIG_T1)?,
            dig_t2: self.read_i16(reg::DIG_T2)?,
            dig_t3: self.read_i16(reg::DIG_T3)?,

            dig_p1: self.read_u16(reg::DIG_P1)?,
            dig_p2: self.read_i16(reg::DIG_P2)?,
            dig_p3: self.read_i16(reg::DIG_P3)?,
            dig_p4: self.read_i16(reg::DIG_P4)?,
            dig_p5: self.read_i16(reg::DIG_P5)?,
            dig_p6: self.read_i16(reg::DIG_P6)?,
            dig_p7: self.read_i16(reg::DIG_P7)?,
            dig_p8: self.read_i16(reg::DIG_P8)?,
            dig_p9: self.read_i16(reg::DIG_P9)?,

            dig_h1: self.read_u8(reg::DIG_H1)?,
            dig_h2: self.read_i16(reg::DIG_H2)?,
            dig_h3: self.read_u8(reg::DIG_H3)?,
            ..Default::default()
        };

        let h4_raw = self.read_u8(reg::DIG_H4)?;
        let h5_raw = self.read_u16(reg::DIG_H5)?;
        (calibration.dig_h4, calibration.dig_h5) = unpack_h4_h5(h4_raw, h5_raw);
        calibration.dig_h6 = self.read_u8(reg::DIG_H6)? as i8;

        Ok(calibration)
    }

    fn set_sampling(&self) -> Result<(), BusError> {
        self.device.write_register(reg::CTRL_MEAS, Mode::Sleep as u8)?;
        self.device.write_register(reg::CTRL_HUM, self.config.ctrl_hum())?;
        self.device.write_register(reg::CONFIG, self.config.config())?;
        self.device.write_register(reg::CTRL_MEAS, self.config.ctrl_meas())
    }

    fn read_u8(&self, register: u8) -> Result<u8, BusError> {
        self.device.read_register(register)
    }

    fn read_u16(&self, register: u8) -> Result<u16, BusError> {
        let mut buf = [0u8; 2];
        self.device.read_registers(register, &mut buf)?;
        Ok(u16::from_le_bytes(buf))
    }

    fn read_i16(&self, register: u8) -> Result<i16, BusError> {
        self.read_u16(register).map(|v| v as i16)
    }
}

impl<M: RawMutex, B: BusTransport, D: DelayNs> PolledSensor for Bme280<'_, M, B, D> {
    type Reading = Measurement;

    fn initialize(&mut self) -> Result<(), SensorError> {
        Bme280::initialize(self).map_err(|e| {
            #[cfg(feature = "defmt")]
            defmt::error!("BME280 init: {}", e);
            SensorError::from(e)
        })
    }

    fn read(&mut self) -> Result<Measurement, SensorError> {
        self.read_compensated().map_err(|e| {
            #[cfg(feature = "defmt")]
            defmt::warn!("BME280 read: {}", e);
            SensorError::from(e)
        })
    }
}
