//! Board description and low-level bring-up
//!
//! WeAct-style STM32F411 "Black Pill": 25 MHz crystal, BME280 and INA219
//! on I2C1 (PB6/PB7) with external pull-ups.

use embassy_stm32::pac;
use embassy_stm32::pac::gpio::vals;
use embassy_stm32::time::Hertz;
use embassy_stm32::Config;

use envmon_core::config::{BoardConfig, BusSettings, PollingSettings};
use envmon_core::config::{DEFAULT_BME280_ADDRESS, DEFAULT_INA219_ADDRESS};
use envmon_hal::I2cConfig;
use envmon_hal_stm32f4::{AfPin, I2cInstance, Port};

/// I2C controller the sensors are wired to
pub const I2C_INSTANCE: I2cInstance = I2cInstance::I2c1;

/// Calibration register value for a 0.1 Ω shunt at 100 µA/LSB
pub const INA219_CALIBRATION: u16 = 4096;

/// APB1 frequency produced by [`rcc_config`]
const APB1_HZ: u32 = 42_000_000;

/// Board configuration
pub const BOARD: BoardConfig = BoardConfig {
    bus: BusSettings {
        input_clock_hz: APB1_HZ,
        frequency_hz: 100_000,
        timeout_ms: 10,
    },
    bme280_address: DEFAULT_BME280_ADDRESS,
    ina219_address: Some(DEFAULT_INA219_ADDRESS),
    polling: PollingSettings {
        read_interval_ms: 1000,
        reinit_interval_ms: 5000,
        max_read_failures: 3,
    },
};

/// Clock tree: HSE 25 MHz, SYSCLK 84 MHz, APB1 42 MHz, APB2 84 MHz
pub fn rcc_config() -> Config {
    use embassy_stm32::rcc::*;

    let mut config = Config::default();
    config.rcc.hse = Some(Hse {
        freq: Hertz(25_000_000),
        mode: HseMode::Oscillator,
    });
    config.rcc.pll_src = PllSource::HSE;
    config.rcc.pll = Some(Pll {
        prediv: PllPreDiv::DIV25,
        mul: PllMul::MUL336,
        divp: Some(PllPDiv::DIV4),
        divq: Some(PllQDiv::DIV7),
        divr: None,
    });
    config.rcc.ahb_pre = AHBPrescaler::DIV1;
    config.rcc.apb1_pre = APBPrescaler::DIV2;
    config.rcc.apb2_pre = APBPrescaler::DIV1;
    config.rcc.sys = Sysclk::PLL1_P;
    config
}

/// Bus timing derived from the board configuration
pub fn i2c_config(bus: &BusSettings) -> I2cConfig {
    I2cConfig {
        input_clock_hz: bus.input_clock_hz,
        frequency: bus.frequency_hz,
    }
}

fn gpio(port: Port) -> pac::gpio::Gpio {
    match port {
        Port::A => pac::GPIOA,
        Port::B => pac::GPIOB,
        Port::C => pac::GPIOC,
    }
}

/// Switch one pin to open-drain, pulled-up alternate function
fn setup_af_pin(pin: AfPin) {
    let gpio = gpio(pin.port);
    let n = pin.pin as usize;

    gpio.otyper().modify(|w| w.set_ot(n, vals::Ot::OPENDRAIN));
    gpio.pupdr().modify(|w| w.set_pupdr(n, vals::Pupdr::PULLUP));
    gpio.ospeedr()
        .modify(|w| w.set_ospeedr(n, vals::Ospeedr::HIGHSPEED));
    gpio.afr(n / 8).modify(|w| w.set_afr(n % 8, pin.af));
    gpio.moder().modify(|w| w.set_moder(n, vals::Moder::ALTERNATE));
}

/// Clock the controller and route its pins
///
/// GPIO port clocks are already enabled by `embassy_stm32::init`.
pub fn setup_i2c(instance: I2cInstance) {
    pac::RCC
        .apb1enr()
        .modify(|w| w.0 |= instance.apb1_enable_bit());

    let pins = instance.pins();
    setup_af_pin(pins.scl);
    setup_af_pin(pins.sda);
}
