//! Display task
//!
//! Renders sensor updates as text lines. The panel driver is not part of
//! this firmware yet, so lines go to the defmt log.

use core::fmt::{self, Write};

use defmt::*;
use heapless::String;

use envmon_core::reading::{Measurement, PowerReading};
use envmon_core::supervisor::SensorStatus;

use crate::channels::{DisplayUpdate, DISPLAY_CHANNEL};

/// Longest line the panel can show
const LINE_LEN: usize = 48;

/// Display task - waits for sensor updates and renders them
#[embassy_executor::task]
pub async fn display_task() {
    info!("Display task started");

    loop {
        let update = DISPLAY_CHANNEL.receive().await;
        let mut line: String<LINE_LEN> = String::new();

        let result = match update {
            DisplayUpdate::Environment(status, reading) => {
                environment_line(&mut line, status, reading)
            }
            DisplayUpdate::Power(status, reading) => power_line(&mut line, status, reading),
        };

        // Truncated lines are still worth showing
        if result.is_err() {
            warn!("Display line truncated");
        }
        info!("{}", line.as_str());
    }
}

/// "25.08C 1006.5hPa 55.00%" or the sensor status
fn environment_line(
    line: &mut impl Write,
    status: SensorStatus,
    reading: Option<Measurement>,
) -> fmt::Result {
    let Some(m) = reading else {
        return write!(line, "Env: {}", status.describe());
    };

    let sign = if m.temperature < 0 { "-" } else { "" };
    let t = m.temperature.unsigned_abs();
    let p = m.pressure_hpa_x10();
    let h = m.humidity_x100();

    write!(
        line,
        "{}{}.{:02}C {}.{}hPa {}.{:02}%",
        sign,
        t / 100,
        t % 100,
        p / 10,
        p % 10,
        h / 100,
        h % 100
    )
}

/// "12.000V 40000uV" or the sensor status
fn power_line(line: &mut impl Write, status: SensorStatus, reading: Option<PowerReading>) -> fmt::Result {
    let Some(r) = reading else {
        return write!(line, "Pwr: {}", status.describe());
    };

    let mv = r.bus_voltage_mv();
    write!(line, "{}.{:03}V {}uV", mv / 1000, mv % 1000, r.shunt_voltage_uv())?;
    if r.overflow() {
        line.write_str(" OVF")?;
    }
    Ok(())
}
