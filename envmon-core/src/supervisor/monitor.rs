//! Sensor supervisor implementation
//!
//! Decides when a sensor is initialized, read or re-initialized, and keeps
//! the status the display shows for it. A failed read only affects the
//! cycle it happened in; a failed initialization is retried after the
//! re-init interval instead of leaving the sensor dead.

use crate::config::PollingSettings;
use crate::traits::{PolledSensor, SensorError};

/// Supervisor lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SensorState {
    /// Initialization pending
    Uninitialized,
    /// Initialized, reading periodically
    Ready,
    /// Last initialization failed; waiting to retry
    Failed,
}

/// What the display should show for a sensor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SensorStatus {
    /// No reading yet
    Starting,
    /// Last cycle produced a reading
    Ok,
    /// Last reading cycle failed
    ReadFailure(SensorError),
    /// Sensor could not be initialized
    InitFailure(SensorError),
}

impl SensorStatus {
    /// Short text for the status line of the screen
    pub fn describe(&self) -> &'static str {
        match self {
            SensorStatus::Starting => "Not ready",
            SensorStatus::Ok => "Ok",
            SensorStatus::ReadFailure(e) | SensorStatus::InitFailure(e) => e.describe(),
        }
    }
}

/// Result of one supervisor step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Outcome<R> {
    /// Nothing was due
    Idle,
    /// Sensor initialized successfully
    Initialized,
    /// Initialization failed
    InitFailed(SensorError),
    /// A reading cycle succeeded
    Reading(R),
    /// A reading cycle failed
    ReadFailed(SensorError),
}

/// Per-sensor supervisor
#[derive(Debug, Clone)]
pub struct SensorSupervisor {
    policy: PollingSettings,
    state: SensorState,
    status: SensorStatus,
    /// Tick at which the next action is due (None = immediately)
    next_due_ms: Option<u32>,
    /// Consecutive failed reading cycles
    consecutive_failures: u8,
}

impl SensorSupervisor {
    /// Create a supervisor; the first step initializes the sensor
    pub fn new(policy: PollingSettings) -> Self {
        Self {
            policy,
            state: SensorState::Uninitialized,
            status: SensorStatus::Starting,
            next_due_ms: None,
            consecutive_failures: 0,
        }
    }

    /// Current lifecycle state
    pub fn state(&self) -> SensorState {
        self.state
    }

    /// Status for the display
    pub fn status(&self) -> SensorStatus {
        self.status
    }

    /// Number of consecutive failed reading cycles
    pub fn consecutive_failures(&self) -> u8 {
        self.consecutive_failures
    }

    /// Force re-initialization on the next step
    pub fn request_reinit(&mut self) {
        self.state = SensorState::Uninitialized;
        self.next_due_ms = None;
    }

    /// Check whether an action is due at `now_ms`
    pub fn is_due(&self, now_ms: u32) -> bool {
        match self.next_due_ms {
            None => true,
            // Signed distance handles tick wrap-around
            Some(due) => now_ms.wrapping_sub(due) as i32 >= 0,
        }
    }

    /// Run whatever the sensor needs at `now_ms`
    pub fn step<S: PolledSensor>(&mut self, sensor: &mut S, now_ms: u32) -> Outcome<S::Reading> {
        if !self.is_due(now_ms) {
            return Outcome::Idle;
        }

        match self.state {
            SensorState::Uninitialized | SensorState::Failed => self.initialize(sensor, now_ms),
            SensorState::Ready => self.read(sensor, now_ms),
        }
    }

    fn initialize<S: PolledSensor>(&mut self, sensor: &mut S, now_ms: u32) -> Outcome<S::Reading> {
        match sensor.initialize() {
            Ok(()) => {
                self.state = SensorState::Ready;
                self.consecutive_failures = 0;
                // First reading right away
                self.next_due_ms = None;
                Outcome::Initialized
            }
            Err(e) => {
                self.state = SensorState::Failed;
                self.status = SensorStatus::InitFailure(e);
                self.next_due_ms = Some(now_ms.wrapping_add(self.policy.reinit_interval_ms));
                Outcome::InitFailed(e)
            }
        }
    }

    fn read<S: PolledSensor>(&mut self, sensor: &mut S, now_ms: u32) -> Outcome<S::Reading> {
        self.next_due_ms = Some(now_ms.wrapping_add(self.policy.read_interval_ms));

        match sensor.read() {
            Ok(reading) => {
                self.consecutive_failures = 0;
                self.status = SensorStatus::Ok;
                Outcome::Reading(reading)
            }
            Err(e) => {
                self.consecutive_failures = self.consecutive_failures.saturating_add(1);
                self.status = SensorStatus::ReadFailure(e);

                let limit = self.policy.max_read_failures;
                if e == SensorError::NotInitialized
                    || (limit > 0 && self.consecutive_failures >= limit)
                {
                    self.state = SensorState::Uninitialized;
                }
                Outcome::ReadFailed(e)
            }
        }
    }
}
