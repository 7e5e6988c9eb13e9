//! Millisecond tick source and bounded polling
//!
//! All waits in the bus layer are busy polls against a monotonically
//! increasing millisecond counter. The counter may wrap; deadlines compare
//! elapsed ticks with wrapping subtraction.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Monotonic millisecond counter
pub trait TickSource {
    /// Current tick count in milliseconds
    fn now_ms(&self) -> u32;
}

impl<T: TickSource + ?Sized> TickSource for &T {
    fn now_ms(&self) -> u32 {
        (**self).now_ms()
    }
}

/// Upper bound for a single poll
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Timeout(u32);

impl Timeout {
    /// Timeout in milliseconds
    pub const fn from_millis(ms: u32) -> Self {
        Self(ms)
    }

    /// Duration in milliseconds
    pub const fn as_millis(self) -> u32 {
        self.0
    }
}

impl Default for Timeout {
    fn default() -> Self {
        Self(10)
    }
}

/// Point in time after which a poll gives up
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Deadline {
    start_ms: u32,
    timeout: Timeout,
}

impl Deadline {
    /// Start a deadline from the current tick
    pub fn start<C: TickSource + ?Sized>(clock: &C, timeout: Timeout) -> Self {
        Self {
            start_ms: clock.now_ms(),
            timeout,
        }
    }

    /// Milliseconds elapsed since the deadline was started
    pub fn elapsed_ms<C: TickSource + ?Sized>(&self, clock: &C) -> u32 {
        clock.now_ms().wrapping_sub(self.start_ms)
    }

    /// Check whether the timeout has passed
    pub fn is_expired<C: TickSource + ?Sized>(&self, clock: &C) -> bool {
        self.elapsed_ms(clock) > self.timeout.as_millis()
    }
}

/// A bounded poll ran out of time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Expired;

/// Busy-poll `ready` until it returns true or the timeout passes
///
/// The condition is sampled once more after expiry so that a bit which
/// arrives on the final tick still counts as success.
pub fn poll_until<C, F>(clock: &C, timeout: Timeout, mut ready: F) -> Result<(), Expired>
where
    C: TickSource + ?Sized,
    F: FnMut() -> bool,
{
    let deadline = Deadline::start(clock, timeout);
    while !deadline.is_expired(clock) {
        if ready() {
            return Ok(());
        }
        core::hint::spin_loop();
    }
    if ready() {
        Ok(())
    } else {
        Err(Expired)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::cell::Cell;

    /// Clock that advances by `step` every time it is read
    struct SteppingClock {
        now: Cell<u32>,
        step: u32,
    }

    impl SteppingClock {
        fn new(start: u32, step: u32) -> Self {
            Self {
                now: Cell::new(start),
                step,
            }
        }
    }

    impl TickSource for SteppingClock {
        fn now_ms(&self) -> u32 {
            let now = self.now.get();
            self.now.set(now.wrapping_add(self.step));
            now
        }
    }

    #[test]
    fn test_poll_succeeds_immediately() {
        let clock = SteppingClock::new(0, 1);
        assert_eq!(poll_until(&clock, Timeout::from_millis(5), || true), Ok(()));
    }

    #[test]
    fn test_poll_succeeds_after_some_attempts() {
        let clock = SteppingClock::new(0, 1);
        let mut attempts = 0;
        let result = poll_until(&clock, Timeout::from_millis(100), || {
            attempts += 1;
            attempts == 3
        });
        assert_eq!(result, Ok(()));
        assert_eq!(attempts, 3);
    }

    #[test]
    fn test_poll_expires() {
        let clock = SteppingClock::new(0, 1);
        let result = poll_until(&clock, Timeout::from_millis(5), || false);
        assert_eq!(result, Err(Expired));
    }

    #[test]
    fn test_deadline_across_wraparound() {
        let clock = SteppingClock::new(u32::MAX - 2, 0);
        let deadline = Deadline::start(&clock, Timeout::from_millis(10));

        clock.now.set(3); // 6 ticks later, wrapped
        assert!(!deadline.is_expired(&clock));
        assert_eq!(deadline.elapsed_ms(&clock), 6);

        clock.now.set(20);
        assert!(deadline.is_expired(&clock));
    }

    #[test]
    fn test_zero_timeout_still_samples_condition() {
        let clock = SteppingClock::new(0, 5);
        assert_eq!(poll_until(&clock, Timeout::from_millis(0), || true), Ok(()));
    }
}
