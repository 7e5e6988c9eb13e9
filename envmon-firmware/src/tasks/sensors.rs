//! Sensor polling task
//!
//! Owns both sensor drivers and their supervisors. Each tick the
//! supervisors decide whether to initialize, read or wait; anything that
//! changes what the screen shows goes to the display task.
//!
//! Bus transactions are blocking busy-polls, so this task holds the
//! executor for the length of a transaction (a BME280 initialization
//! blocks for roughly 150 ms).

use defmt::*;
use embassy_time::{Delay, Duration, Instant, Ticker};

use envmon_core::config::BoardConfig;
use envmon_core::supervisor::{Outcome, SensorSupervisor};
use envmon_core::traits::{EnvironmentSensor, PowerMonitor};
use envmon_drivers::sensor::{Bme280, Bme280Config, Ina219, Ina219Config};
use envmon_hal::{Address, Timeout};

use crate::board::INA219_CALIBRATION;
use crate::channels::{DisplayUpdate, DISPLAY_CHANNEL};
use crate::SharedI2c;

/// Supervisor step interval in milliseconds
pub const TICK_INTERVAL_MS: u64 = 100;

/// Sensor task - drives the BME280 and (if fitted) the INA219
#[embassy_executor::task]
pub async fn sensor_task(bus: &'static SharedI2c, board: BoardConfig) {
    info!("Sensor task started");

    let timeout = Timeout::from_millis(board.bus.timeout_ms);

    let Some(bme280_address) = Address::new(board.bme280_address) else {
        error!("Invalid BME280 address {=u8:#x}", board.bme280_address);
        return;
    };
    let mut bme280 = Bme280::new(
        bus,
        bme280_address,
        timeout,
        Delay,
        Bme280Config::default(),
    );
    let mut env_supervisor = SensorSupervisor::new(board.polling);

    let mut ina219 = board.ina219_address.and_then(Address::new).map(|address| {
        Ina219::new(
            bus,
            address,
            timeout,
            Ina219Config {
                calibration: Some(INA219_CALIBRATION),
            },
        )
    });
    let mut power_supervisor = SensorSupervisor::new(board.polling);

    if ina219.is_none() {
        info!("No power monitor configured");
    }

    let mut ticker = Ticker::every(Duration::from_millis(TICK_INTERVAL_MS));
    let start = Instant::now();

    loop {
        ticker.next().await;
        let now_ms = start.elapsed().as_millis() as u32;

        poll_environment(&mut env_supervisor, &mut bme280, now_ms).await;

        if let Some(ina219) = ina219.as_mut() {
            poll_power(&mut power_supervisor, ina219, now_ms).await;
        }
    }
}

async fn poll_environment<S: EnvironmentSensor>(
    supervisor: &mut SensorSupervisor,
    sensor: &mut S,
    now_ms: u32,
) {
    let outcome = supervisor.step(sensor, now_ms);
    if let Some(reading) = report("BME280", outcome) {
        DISPLAY_CHANNEL
            .send(DisplayUpdate::Environment(supervisor.status(), reading))
            .await;
    }
}

async fn poll_power<S: PowerMonitor>(supervisor: &mut SensorSupervisor, sensor: &mut S, now_ms: u32) {
    let outcome = supervisor.step(sensor, now_ms);
    if let Some(reading) = report("INA219", outcome) {
        DISPLAY_CHANNEL
            .send(DisplayUpdate::Power(supervisor.status(), reading))
            .await;
    }
}

/// Log an outcome; returns `Some` when the display needs an update
fn report<R>(name: &str, outcome: Outcome<R>) -> Option<Option<R>> {
    match outcome {
        Outcome::Idle => None,
        Outcome::Initialized => {
            info!("{} ready", name);
            None
        }
        Outcome::InitFailed(e) => {
            warn!("{} init failed: {}", name, e);
            Some(None)
        }
        Outcome::ReadFailed(e) => {
            warn!("{} read failed: {}", name, e);
            Some(None)
        }
        Outcome::Reading(reading) => Some(Some(reading)),
    }
}
