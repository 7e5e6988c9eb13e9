//! Polled sensor trait
//!
//! The display layer and the supervisor only see this interface; the
//! bus-level detail of a failure is logged by the driver and collapsed
//! into a [`SensorError`] here.

use crate::reading::{Measurement, PowerReading};

/// Errors that can occur with a polled sensor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SensorError {
    /// A bus transaction failed (device absent, busy or stuck bus)
    Bus,
    /// Device answered with an unexpected identity
    WrongDevice,
    /// Device never reported ready within its timeout
    NotResponding,
    /// Read attempted before a successful initialization
    NotInitialized,
}

impl SensorError {
    /// Short text for the status line of the screen
    pub fn describe(&self) -> &'static str {
        match self {
            SensorError::Bus => "Sensor failure",
            SensorError::WrongDevice => "Bad device id",
            SensorError::NotResponding => "Sensor not ready",
            SensorError::NotInitialized => "Not ready",
        }
    }
}

/// A sensor that is initialized once and then read periodically
pub trait PolledSensor {
    /// Value produced by one reading cycle
    type Reading;

    /// Bring the device into a state where readings are valid
    ///
    /// May be called again after a failure to recover the device.
    fn initialize(&mut self) -> Result<(), SensorError>;

    /// Run one reading cycle
    fn read(&mut self) -> Result<Self::Reading, SensorError>;
}

/// Temperature/pressure/humidity sensor
pub trait EnvironmentSensor: PolledSensor<Reading = Measurement> {}

impl<T: PolledSensor<Reading = Measurement>> EnvironmentSensor for T {}

/// Bus voltage/current sensor
pub trait PowerMonitor: PolledSensor<Reading = PowerReading> {}

impl<T: PolledSensor<Reading = PowerReading>> PowerMonitor for T {}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedEnvironment;

    impl PolledSensor for FixedEnvironment {
        type Reading = Measurement;

        fn initialize(&mut self) -> Result<(), SensorError> {
            Ok(())
        }

        fn read(&mut self) -> Result<Measurement, SensorError> {
            Ok(Measurement {
                humidity: 56317,
                pressure: 25767233,
                temperature: 2508,
            })
        }
    }

    struct DeadMonitor;

    impl PolledSensor for DeadMonitor {
        type Reading = PowerReading;

        fn initialize(&mut self) -> Result<(), SensorError> {
            Err(SensorError::Bus)
        }

        fn read(&mut self) -> Result<PowerReading, SensorError> {
            Err(SensorError::NotInitialized)
        }
    }

    fn temperature<S: EnvironmentSensor>(sensor: &mut S) -> Result<i32, SensorError> {
        sensor.initialize()?;
        Ok(sensor.read()?.temperature)
    }

    fn bus_voltage<S: PowerMonitor>(sensor: &mut S) -> Result<u32, SensorError> {
        sensor.initialize()?;
        Ok(sensor.read()?.bus_voltage_mv())
    }

    #[test]
    fn test_environment_sensor_bound() {
        assert_eq!(temperature(&mut FixedEnvironment), Ok(2508));
    }

    #[test]
    fn test_power_monitor_bound() {
        assert_eq!(bus_voltage(&mut DeadMonitor), Err(SensorError::Bus));
    }

    #[test]
    fn test_error_text() {
        assert_eq!(SensorError::Bus.describe(), "Sensor failure");
        assert_eq!(SensorError::NotResponding.describe(), "Sensor not ready");
    }
}
