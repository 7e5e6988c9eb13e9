//! STM32F4 I2C (v1) register block
//!
//! The transport talks to the peripheral only through [`RegisterBlock`],
//! which keeps the sequencing logic testable on the host. [`Mmio`] is the
//! volatile implementation used on hardware.

/// I2C v1 registers with their byte offsets from the peripheral base
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Reg {
    /// Control register 1
    Cr1,
    /// Control register 2
    Cr2,
    /// Own address register 1
    Oar1,
    /// Own address register 2
    Oar2,
    /// Data register
    Dr,
    /// Status register 1
    Sr1,
    /// Status register 2
    Sr2,
    /// Clock control register
    Ccr,
    /// Rise time register
    Trise,
    /// Noise filter register
    Fltr,
}

impl Reg {
    /// Byte offset from the peripheral base address
    pub const fn offset(self) -> usize {
        match self {
            Reg::Cr1 => 0x00,
            Reg::Cr2 => 0x04,
            Reg::Oar1 => 0x08,
            Reg::Oar2 => 0x0C,
            Reg::Dr => 0x10,
            Reg::Sr1 => 0x14,
            Reg::Sr2 => 0x18,
            Reg::Ccr => 0x1C,
            Reg::Trise => 0x20,
            Reg::Fltr => 0x24,
        }
    }
}

/// CR1 bits
pub mod cr1 {
    /// Peripheral enable
    pub const PE: u32 = 1 << 0;
    /// General call enable
    pub const ENGC: u32 = 1 << 6;
    /// Clock stretching disable
    pub const NOSTRETCH: u32 = 1 << 7;
    /// START generation
    pub const START: u32 = 1 << 8;
    /// STOP generation
    pub const STOP: u32 = 1 << 9;
    /// Acknowledge enable
    pub const ACK: u32 = 1 << 10;
    /// Software reset
    pub const SWRST: u32 = 1 << 15;
}

/// CR2 fields
pub mod cr2 {
    /// Peripheral clock frequency in MHz
    pub const FREQ_MASK: u32 = 0x3F;
}

/// OAR1 fields
pub mod oar1 {
    /// Addressing mode (1 = 10-bit slave address)
    pub const ADDMODE: u32 = 1 << 15;
    /// Must be kept at 1 by software
    pub const RESERVED_SET: u32 = 1 << 14;
}

/// SR1 bits
pub mod sr1 {
    /// START condition generated
    pub const SB: u32 = 1 << 0;
    /// Address sent and acknowledged
    pub const ADDR: u32 = 1 << 1;
    /// Receive data register not empty
    pub const RXNE: u32 = 1 << 6;
    /// Transmit data register empty
    pub const TXE: u32 = 1 << 7;
}

/// SR2 bits
pub mod sr2 {
    /// Communication ongoing on the bus
    pub const BUSY: u32 = 1 << 1;
}

/// CCR fields
pub mod ccr {
    /// Clock control value
    pub const CCR_MASK: u32 = 0x0FFF;
    /// Fast mode duty cycle
    pub const DUTY: u32 = 1 << 14;
    /// Fast/standard mode selection
    pub const FS: u32 = 1 << 15;
}

/// TRISE fields
pub mod trise {
    /// Maximum rise time in input clock cycles plus one
    pub const TRISE_MASK: u32 = 0x3F;
}

/// Access to the ten I2C v1 registers
pub trait RegisterBlock {
    /// Read a register
    fn read(&self, reg: Reg) -> u32;

    /// Write a register
    fn write(&mut self, reg: Reg, value: u32);

    /// Read-modify-write a register
    fn modify<F: FnOnce(u32) -> u32>(&mut self, reg: Reg, f: F) {
        let value = self.read(reg);
        self.write(reg, f(value));
    }

    /// Set bits in a register
    fn set_bits(&mut self, reg: Reg, bits: u32) {
        self.modify(reg, |v| v | bits);
    }

    /// Clear bits in a register
    fn clear_bits(&mut self, reg: Reg, bits: u32) {
        self.modify(reg, |v| v & !bits);
    }

    /// Check that every bit of `bits` is set
    fn is_set(&self, reg: Reg, bits: u32) -> bool {
        self.read(reg) & bits == bits
    }
}

/// Memory-mapped register block
///
/// The base is stored as an address rather than a pointer so the port can
/// live in a `static` behind a mutex.
#[derive(Debug)]
pub struct Mmio {
    base: usize,
}

impl Mmio {
    /// Wrap the register block at `base`
    ///
    /// # Safety
    ///
    /// `base` must be the address of an I2C v1 register block and nothing
    /// else may access that peripheral while the `Mmio` exists.
    #[allow(unsafe_code)]
    pub const unsafe fn new(base: usize) -> Self {
        Self { base }
    }

    /// Peripheral base address
    pub const fn base(&self) -> usize {
        self.base
    }

    fn ptr(&self, reg: Reg) -> *mut u32 {
        (self.base + reg.offset()) as *mut u32
    }
}

#[allow(unsafe_code)]
impl RegisterBlock for Mmio {
    fn read(&self, reg: Reg) -> u32 {
        // SAFETY: `new` guarantees `base` points at an I2C register block
        unsafe { core::ptr::read_volatile(self.ptr(reg)) }
    }

    fn write(&mut self, reg: Reg, value: u32) {
        // SAFETY: see `read`
        unsafe { core::ptr::write_volatile(self.ptr(reg), value) }
    }
}
