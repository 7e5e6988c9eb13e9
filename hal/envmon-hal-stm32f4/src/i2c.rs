//! I2C master driver for STM32F4 (I2C v1 peripheral)
//!
//! Polled, blocking master-mode transport. Each primitive busy-waits on one
//! status bit with a bounded timeout and reports which condition stalled.
//! There is no interrupt, DMA or slave support.

use envmon_hal::i2c::{Ack, Address, BusError, BusTransport, Condition, Direction, I2cConfig, SpeedMode};
use envmon_hal::time::{poll_until, TickSource, Timeout};

use crate::pins::I2cInstance;
use crate::regs::{ccr, cr1, cr2, oar1, sr1, sr2, trise, Reg, RegisterBlock};

/// Minimum CCR value allowed in standard mode
const CCR_MIN_STANDARD: u32 = 4;

/// Minimum CCR value allowed in fast mode
const CCR_MIN_FAST: u32 = 1;

/// Register values derived from an [`I2cConfig`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Timing {
    /// CR2.FREQ
    pub freq: u32,
    /// TRISE
    pub trise: u32,
    /// CCR (including F/S, DUTY cleared)
    pub ccr: u32,
}

impl Timing {
    /// Compute timing registers for a master at the configured speed
    pub fn from_config(config: &I2cConfig) -> Self {
        let freq_mhz = config.input_clock_mhz();
        let speed = config.frequency.max(1);

        match config.speed_mode() {
            SpeedMode::Standard => {
                // Thigh = Tlow = CCR * Tpclk
                let value = (config.input_clock_hz / speed.saturating_mul(2)).max(CCR_MIN_STANDARD);
                Self {
                    freq: freq_mhz & cr2::FREQ_MASK,
                    // 1000 ns maximum rise time
                    trise: (freq_mhz + 1) & trise::TRISE_MASK,
                    ccr: value & ccr::CCR_MASK,
                }
            }
            SpeedMode::Fast => {
                // DUTY = 0: Tlow = 2 * Thigh
                let value = (config.input_clock_hz / speed.saturating_mul(3)).max(CCR_MIN_FAST);
                Self {
                    freq: freq_mhz & cr2::FREQ_MASK,
                    // 300 ns maximum rise time
                    trise: (freq_mhz * 300 / 1000 + 1) & trise::TRISE_MASK,
                    ccr: (value & ccr::CCR_MASK) | ccr::FS,
                }
            }
        }
    }
}

/// One I2C controller in master mode
///
/// Owning an `I2cPort` means owning the peripheral; share it between
/// devices through a mutex rather than by creating a second port.
pub struct I2cPort<R, C> {
    instance: I2cInstance,
    regs: R,
    clock: C,
    config: I2cConfig,
}

impl<R: RegisterBlock, C: TickSource> I2cPort<R, C> {
    /// Take ownership of a controller and configure it
    ///
    /// SDA/SCL must already be open-drain, pulled-up alternate function pins.
    pub fn new(instance: I2cInstance, regs: R, clock: C, config: I2cConfig) -> Self {
        let mut port = Self {
            instance,
            regs,
            clock,
            config,
        };
        port.configure(config);
        port
    }

    /// (Re)initialize the controller
    ///
    /// Leaves the peripheral enabled and idle. All steps are plain register
    /// writes and cannot fail.
    pub fn configure(&mut self, config: I2cConfig) {
        self.config = config;
        let timing = Timing::from_config(&config);

        self.regs.clear_bits(Reg::Cr1, cr1::PE);

        // Reset pulse clears any latched BUSY state
        self.regs.set_bits(Reg::Cr1, cr1::SWRST);
        self.regs.clear_bits(Reg::Cr1, cr1::SWRST);

        self.regs.modify(Reg::Cr2, |v| (v & !cr2::FREQ_MASK) | timing.freq);
        self.regs.modify(Reg::Trise, |v| (v & !trise::TRISE_MASK) | timing.trise);
        self.regs.modify(Reg::Ccr, |v| (v & !(ccr::CCR_MASK | ccr::FS | ccr::DUTY)) | timing.ccr);

        self.regs.clear_bits(Reg::Cr1, cr1::NOSTRETCH | cr1::ENGC);

        // Master only: 7-bit mode, own address zero, no dual addressing
        self.regs.write(Reg::Oar1, oar1::RESERVED_SET);
        self.regs.write(Reg::Oar2, 0);

        self.regs.set_bits(Reg::Cr1, cr1::PE);
    }

    /// Active configuration
    pub fn config(&self) -> &I2cConfig {
        &self.config
    }

    /// Peripheral instance this port drives
    pub fn instance(&self) -> I2cInstance {
        self.instance
    }

    /// Give back the register block and clock
    pub fn release(self) -> (R, C) {
        (self.regs, self.clock)
    }

    fn wait_set(
        &self,
        reg: Reg,
        bits: u32,
        timeout: Timeout,
        condition: Condition,
    ) -> Result<(), BusError> {
        let regs = &self.regs;
        poll_until(&self.clock, timeout, || regs.is_set(reg, bits))
            .map_err(|_| BusError::Timeout(condition))
    }

    fn wait_clear(
        &self,
        reg: Reg,
        bits: u32,
        timeout: Timeout,
        condition: Condition,
    ) -> Result<(), BusError> {
        let regs = &self.regs;
        poll_until(&self.clock, timeout, || regs.read(reg) & bits == 0)
            .map_err(|_| BusError::Timeout(condition))
    }
}

impl<R: RegisterBlock, C: TickSource> BusTransport for I2cPort<R, C> {
    fn wait_idle(&mut self, timeout: Timeout) -> Result<(), BusError> {
        self.wait_clear(Reg::Sr2, sr2::BUSY, timeout, Condition::BusIdle)
    }

    fn start_condition(&mut self, timeout: Timeout) -> Result<(), BusError> {
        self.regs.set_bits(Reg::Cr1, cr1::START);
        self.wait_set(Reg::Sr1, sr1::SB, timeout, Condition::StartGenerated)
    }

    fn stop_condition(&mut self) {
        self.regs.set_bits(Reg::Cr1, cr1::STOP);
    }

    fn send_address(
        &mut self,
        address: Address,
        direction: Direction,
        timeout: Timeout,
    ) -> Result<(), BusError> {
        self.regs.write(Reg::Dr, address.frame(direction) as u32);
        self.wait_set(Reg::Sr1, sr1::ADDR, timeout, Condition::AddressAcknowledged)?;

        // ADDR is cleared by reading SR1 followed by SR2
        let _ = self.regs.read(Reg::Sr1);
        let _ = self.regs.read(Reg::Sr2);
        Ok(())
    }

    fn send_byte(&mut self, value: u8, timeout: Timeout) -> Result<(), BusError> {
        // A previous byte may still be shifting out
        self.wait_set(Reg::Sr1, sr1::TXE, timeout, Condition::TransmitEmpty)?;
        self.regs.write(Reg::Dr, value as u32);
        self.wait_set(Reg::Sr1, sr1::TXE, timeout, Condition::TransmitEmpty)
    }

    fn receive_byte(&mut self, ack: Ack, timeout: Timeout) -> Result<u8, BusError> {
        match ack {
            Ack::Ack => self.regs.set_bits(Reg::Cr1, cr1::ACK),
            Ack::Nack => self.regs.clear_bits(Reg::Cr1, cr1::ACK),
        }
        self.wait_set(Reg::Sr1, sr1::RXNE, timeout, Condition::ReceiveNotEmpty)?;
        Ok(self.regs.read(Reg::Dr) as u8)
    }
}
