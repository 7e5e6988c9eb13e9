//! envmon - Environmental Display Unit Firmware
//!
//! Main firmware binary for STM32F411-based display units. Reads a BME280
//! (temperature, pressure, humidity) and optionally an INA219 (battery
//! voltage and current) over one shared I2C bus.

#![no_std]
#![no_main]

use core::cell::RefCell;

use defmt::*;
use embassy_executor::Spawner;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;
use static_cell::StaticCell;
use {defmt_rtt as _, panic_probe as _};

use envmon_drivers::SharedBus;
use envmon_hal_stm32f4::{I2cPort, Mmio};

use crate::board::{BOARD, I2C_INSTANCE};
use crate::clock::EmbassyClock;

mod board;
mod channels;
mod clock;
mod tasks;

/// The sensor bus controller
pub type I2cBus = I2cPort<Mmio, EmbassyClock>;

/// Sensor bus shared between the drivers
pub type SharedI2c = SharedBus<CriticalSectionRawMutex, I2cBus>;

// Static cell for the bus (must live forever for task references)
static I2C_BUS: StaticCell<SharedI2c> = StaticCell::new();

/// Main entry point
#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("envmon firmware starting...");

    if let Err(e) = BOARD.validate() {
        defmt::panic!("Invalid board configuration: {}", e);
    }

    let p = embassy_stm32::init(board::rcc_config());
    info!("Peripherals initialized");

    // The port drives the controller registers directly; keep the
    // peripheral token so nothing else claims it
    let _i2c = p.I2C1;
    board::setup_i2c(I2C_INSTANCE);

    // SAFETY: base address of an I2C controller we own (token held above)
    let regs = unsafe { Mmio::new(I2C_INSTANCE.base_address()) };
    let port = I2cPort::new(
        I2C_INSTANCE,
        regs,
        EmbassyClock,
        board::i2c_config(&BOARD.bus),
    );
    info!(
        "I2C{} configured at {} Hz",
        I2C_INSTANCE.number(),
        BOARD.bus.frequency_hz
    );

    let bus = I2C_BUS.init(Mutex::new(RefCell::new(port)));

    spawner.spawn(tasks::display_task()).unwrap();
    spawner.spawn(tasks::sensor_task(bus, BOARD)).unwrap();

    info!("All tasks spawned");
}
