//! Register-addressed I2C devices
//!
//! Most I2C sensors expose a register file: a write of the register number
//! sets an internal pointer, then data is read or written from there. This
//! module implements that protocol on top of [`BusTransport`].
//!
//! # Sharing
//!
//! Several devices sit on one controller, so the transport lives in a
//! [`SharedBus`]. The lock is held for a complete transaction, never per
//! byte, so two devices cannot interleave on the wire.
//!
//! # Bus release
//!
//! Every transaction runs inside a [`Transaction`] guard that generates the
//! STOP condition when dropped. A transaction therefore ends with exactly
//! one STOP whether it completes or fails part way.

use core::cell::RefCell;
use core::ops::{Deref, DerefMut};

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::blocking_mutex::Mutex;
use envmon_hal::{Ack, Address, BusError, BusTransport, Direction, Timeout};

/// Bus transport shared between several devices
pub type SharedBus<M, B> = Mutex<M, RefCell<B>>;

/// One bus transaction; issues STOP when dropped
pub struct Transaction<'b, B: BusTransport> {
    bus: &'b mut B,
}

impl<'b, B: BusTransport> Transaction<'b, B> {
    /// Begin a transaction on an exclusively borrowed transport
    pub fn begin(bus: &'b mut B) -> Self {
        Self { bus }
    }
}

impl<B: BusTransport> Deref for Transaction<'_, B> {
    type Target = B;

    fn deref(&self) -> &B {
        self.bus
    }
}

impl<B: BusTransport> DerefMut for Transaction<'_, B> {
    fn deref_mut(&mut self) -> &mut B {
        self.bus
    }
}

impl<B: BusTransport> Drop for Transaction<'_, B> {
    fn drop(&mut self) {
        self.bus.stop_condition();
    }
}

/// A device with a register file at a fixed address
pub struct RegisterDevice<'a, M: RawMutex, B> {
    bus: &'a SharedBus<M, B>,
    address: Address,
    timeout: Timeout,
}

impl<'a, M: RawMutex, B: BusTransport> RegisterDevice<'a, M, B> {
    /// Create a device handle; `timeout` bounds every status poll
    pub fn new(bus: &'a SharedBus<M, B>, address: Address, timeout: Timeout) -> Self {
        Self {
            bus,
            address,
            timeout,
        }
    }

    /// Device address
    pub fn address(&self) -> Address {
        self.address
    }

    /// Per-poll timeout
    pub fn timeout(&self) -> Timeout {
        self.timeout
    }

    /// Read `buf.len()` consecutive bytes starting at `register`
    ///
    /// On failure the buffer is zeroed; partial data is never returned.
    pub fn read_registers(&self, register: u8, buf: &mut [u8]) -> Result<(), BusError> {
        if buf.is_empty() {
            return Ok(());
        }

        let result = self.transaction(|tx, address, timeout| {
            select_register(tx, address, register, timeout)?;

            tx.start_condition(timeout)?;
            tx.send_address(address, Direction::Read, timeout)?;

            // NACK and STOP are requested only once the final byte is due.
            // On the F4 controller the bus may see extra SCL cycles before
            // STOP takes effect; any byte clocked in there is never read.
            let last = buf.len() - 1;
            for (i, byte) in buf.iter_mut().enumerate() {
                let ack = if i == last { Ack::Nack } else { Ack::Ack };
                *byte = tx.receive_byte(ack, timeout)?;
            }
            Ok(())
        });

        if result.is_err() {
            buf.fill(0);
        }
        result
    }

    /// Write `data` to consecutive registers starting at `register`
    pub fn write_registers(&self, register: u8, data: &[u8]) -> Result<(), BusError> {
        if data.is_empty() {
            return Ok(());
        }

        self.transaction(|tx, address, timeout| {
            select_register(tx, address, register, timeout)?;
            for &byte in data {
                tx.send_byte(byte, timeout)?;
            }
            Ok(())
        })
    }

    /// Read a single register
    pub fn read_register(&self, register: u8) -> Result<u8, BusError> {
        let mut value = [0u8; 1];
        self.read_registers(register, &mut value)?;
        Ok(value[0])
    }

    /// Write a single register
    pub fn write_register(&self, register: u8, value: u8) -> Result<(), BusError> {
        self.write_registers(register, &[value])
    }

    /// Run `f` with the bus locked and a STOP guaranteed at the end
    fn transaction<R>(
        &self,
        f: impl FnOnce(&mut Transaction<'_, B>, Address, Timeout) -> Result<R, BusError>,
    ) -> Result<R, BusError> {
        let (address, timeout) = (self.address, self.timeout);
        self.bus.lock(|cell| {
            let mut bus = cell.borrow_mut();
            let mut tx = Transaction::begin(&mut *bus);
            let result = f(&mut tx, address, timeout);

            #[cfg(feature = "defmt")]
            if let Err(e) = &result {
                defmt::debug!("i2c {=u8:#x}: {}", address.value(), e);
            }

            result
        })
    }
}

/// Wait for the bus, address the device for writing and send the register
fn select_register<B: BusTransport>(
    tx: &mut Transaction<'_, B>,
    address: Address,
    register: u8,
    timeout: Timeout,
) -> Result<(), BusError> {
    tx.wait_idle(timeout)?;
    tx.start_condition(timeout)?;
    tx.send_address(address, Direction::Write, timeout)?;
    tx.send_byte(register, timeout)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{Event, MockBus};
    use embassy_sync::blocking_mutex::raw::NoopRawMutex;
    use envmon_hal::Condition;

    const DEV: u8 = 0x76;

    fn address() -> Address {
        Address::new(DEV).unwrap()
    }

    fn shared(mock: MockBus) -> SharedBus<NoopRawMutex, MockBus> {
        Mutex::new(RefCell::new(mock))
    }

    fn bus_with_device() -> SharedBus<NoopRawMutex, MockBus> {
        shared(MockBus::new().with_device(DEV))
    }

    fn events(bus: &SharedBus<NoopRawMutex, MockBus>) -> Vec<Event> {
        bus.lock(|cell| cell.borrow().events().to_vec())
    }

    fn stops(bus: &SharedBus<NoopRawMutex, MockBus>) -> usize {
        bus.lock(|cell| cell.borrow().count(|e| *e == Event::Stop))
    }

    #[test]
    fn test_read_sequence() {
        let bus = bus_with_device();
        bus.lock(|cell| cell.borrow_mut().set_registers(DEV, 0x88, &[0x11, 0x22, 0x33]));
        let dev = RegisterDevice::new(&bus, address(), Timeout::default());

        let mut buf = [0u8; 3];
        dev.read_registers(0x88, &mut buf).unwrap();
        assert_eq!(buf, [0x11, 0x22, 0x33]);

        assert_eq!(
            events(&bus),
            vec![
                Event::WaitIdle,
                Event::Start,
                Event::Address(DEV, Direction::Write),
                Event::Send(0x88),
                Event::Start,
                Event::Address(DEV, Direction::Read),
                Event::Receive(0x11, Ack::Ack),
                Event::Receive(0x22, Ack::Ack),
                Event::Receive(0x33, Ack::Nack),
                Event::Stop,
            ]
        );
    }

    #[test]
    fn test_ack_all_but_last() {
        for len in 1..=8usize {
            let bus = bus_with_device();
            let dev = RegisterDevice::new(&bus, address(), Timeout::default());
            let mut buf = [0u8; 8];
            dev.read_registers(0x00, &mut buf[..len]).unwrap();

            let acks: Vec<Ack> = events(&bus)
                .iter()
                .filter_map(|e| match e {
                    Event::Receive(_, ack) => Some(*ack),
                    _ => None,
                })
                .collect();
            assert_eq!(acks.len(), len);
            assert!(acks[..len - 1].iter().all(|a| *a == Ack::Ack));
            assert_eq!(acks[len - 1], Ack::Nack);
            assert_eq!(stops(&bus), 1);
        }
    }

    #[test]
    fn test_write_sequence() {
        let bus = bus_with_device();
        let dev = RegisterDevice::new(&bus, address(), Timeout::default());

        dev.write_registers(0xF4, &[0x27, 0xA0]).unwrap();
        assert_eq!(
            events(&bus),
            vec![
                Event::WaitIdle,
                Event::Start,
                Event::Address(DEV, Direction::Write),
                Event::Send(0xF4),
                Event::Send(0x27),
                Event::Send(0xA0),
                Event::Stop,
            ]
        );
    }

    #[test]
    fn test_write_then_read_round_trip() {
        let bus = bus_with_device();
        let dev = RegisterDevice::new(&bus, address(), Timeout::default());

        dev.write_registers(0x10, &[1, 2, 3, 4]).unwrap();
        let mut buf = [0u8; 4];
        dev.read_registers(0x10, &mut buf).unwrap();
        assert_eq!(buf, [1, 2, 3, 4]);

        dev.write_register(0x20, 0x5A).unwrap();
        assert_eq!(dev.read_register(0x20), Ok(0x5A));
    }

    #[test]
    fn test_absent_device_releases_bus() {
        let bus = shared(MockBus::new());
        let dev = RegisterDevice::new(&bus, address(), Timeout::default());

        let mut buf = [0xFFu8; 2];
        assert_eq!(
            dev.read_registers(0xD0, &mut buf),
            Err(BusError::Timeout(Condition::AddressAcknowledged))
        );
        assert_eq!(buf, [0, 0]);
        assert_eq!(stops(&bus), 1);
        assert_eq!(events(&bus).last(), Some(&Event::Stop));
    }

    #[test]
    fn test_failed_receive_zeroes_buffer() {
        let bus = bus_with_device();
        bus.lock(|cell| {
            let mut mock = cell.borrow_mut();
            mock.set_registers(DEV, 0xF7, &[9, 9, 9]);
            mock.fail_reads_of(DEV, 0xF9);
        });
        let dev = RegisterDevice::new(&bus, address(), Timeout::default());

        let mut buf = [0u8; 3];
        assert_eq!(
            dev.read_registers(0xF7, &mut buf),
            Err(BusError::Timeout(Condition::ReceiveNotEmpty))
        );
        assert_eq!(buf, [0, 0, 0]);
        assert_eq!(stops(&bus), 1);
    }

    #[test]
    fn test_next_transaction_after_failure_is_clean() {
        let bus = bus_with_device();
        bus.lock(|cell| {
            let mut mock = cell.borrow_mut();
            mock.set_registers(DEV, 0xD0, &[0x60]);
            mock.fail_reads_of(DEV, 0xD0);
        });
        let dev = RegisterDevice::new(&bus, address(), Timeout::default());

        assert!(dev.read_register(0xD0).is_err());

        bus.lock(|cell| {
            let mut mock = cell.borrow_mut();
            mock.clear_failures();
            mock.clear_events();
        });
        assert_eq!(dev.read_register(0xD0), Ok(0x60));
        assert_eq!(events(&bus).first(), Some(&Event::WaitIdle));
        assert_eq!(stops(&bus), 1);
    }

    #[test]
    fn test_busy_bus_still_stops_once() {
        let bus = bus_with_device();
        bus.lock(|cell| cell.borrow_mut().set_busy(true));
        let dev = RegisterDevice::new(&bus, address(), Timeout::default());

        assert_eq!(
            dev.write_register(0xE0, 0xB6),
            Err(BusError::Timeout(Condition::BusIdle))
        );
        assert_eq!(events(&bus), vec![Event::WaitIdle, Event::Stop]);
    }

    #[test]
    fn test_failed_write_stops_once() {
        let bus = bus_with_device();
        bus.lock(|cell| cell.borrow_mut().fail_writes_to(DEV, 0xF2));
        let dev = RegisterDevice::new(&bus, address(), Timeout::default());

        assert_eq!(
            dev.write_register(0xF2, 0x05),
            Err(BusError::Timeout(Condition::TransmitEmpty))
        );
        assert_eq!(stops(&bus), 1);
    }

    #[test]
    fn test_empty_transfers_are_silent() {
        let bus = bus_with_device();
        let dev = RegisterDevice::new(&bus, address(), Timeout::default());

        dev.read_registers(0x00, &mut []).unwrap();
        dev.write_registers(0x00, &[]).unwrap();
        assert!(events(&bus).is_empty());
    }

    #[test]
    fn test_devices_share_bus() {
        let bus = shared(MockBus::new().with_device(0x76).with_device(0x77));
        let a = RegisterDevice::new(&bus, Address::new(0x76).unwrap(), Timeout::default());
        let b = RegisterDevice::new(&bus, Address::new(0x77).unwrap(), Timeout::default());

        a.write_register(0x00, 0xAA).unwrap();
        b.write_register(0x00, 0xBB).unwrap();
        bus.lock(|cell| {
            let mock = cell.borrow();
            assert_eq!(mock.register(0x76, 0x00), 0xAA);
            assert_eq!(mock.register(0x77, 0x00), 0xBB);
        });
        assert_eq!(a.read_register(0x00), Ok(0xAA));
        assert_eq!(b.read_register(0x00), Ok(0xBB));
        assert_eq!(stops(&bus), 4);
    }
}
