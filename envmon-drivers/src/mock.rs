//! Host-side bus fake for driver tests
//!
//! [`MockBus`] models devices with a register pointer, logs every transport
//! primitive and can be told to fail specific register accesses.

use std::collections::VecDeque;

use embedded_hal::delay::DelayNs;
use envmon_hal::{Ack, Address, BusError, BusTransport, Condition, Direction, Timeout};

/// One transport primitive as observed on the bus
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    WaitIdle,
    Start,
    Stop,
    Address(u8, Direction),
    Send(u8),
    Receive(u8, Ack),
}

/// How a device lays out its registers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Layout {
    /// 8-bit registers, pointer advances after every byte
    Bytes,
    /// 16-bit big-endian registers, pointer stays put
    Words,
}

struct MockDevice {
    address: u8,
    layout: Layout,
    bytes: [u8; 256],
    words: [u16; 256],
    pointer: u8,
    /// Values returned by reads of a register before its stored value
    scripted: Vec<(u8, VecDeque<u8>)>,
}

impl MockDevice {
    fn new(address: u8, layout: Layout) -> Self {
        Self {
            address,
            layout,
            bytes: [0; 256],
            words: [0; 256],
            pointer: 0,
            scripted: Vec::new(),
        }
    }
}

/// Register-map bus model
pub struct MockBus {
    devices: Vec<MockDevice>,
    events: Vec<Event>,
    /// Payload bytes written as (address, register, value)
    writes: Vec<(u8, u8, u8)>,
    selected: Option<usize>,
    direction: Direction,
    pointer_set: bool,
    byte_index: usize,
    busy: bool,
    fail_reads: Vec<(u8, u8)>,
    fail_writes: Vec<(u8, u8)>,
}

impl MockBus {
    pub fn new() -> Self {
        Self {
            devices: Vec::new(),
            events: Vec::new(),
            writes: Vec::new(),
            selected: None,
            direction: Direction::Write,
            pointer_set: false,
            byte_index: 0,
            busy: false,
            fail_reads: Vec::new(),
            fail_writes: Vec::new(),
        }
    }

    /// Add a device with auto-incrementing 8-bit registers
    pub fn with_device(mut self, address: u8) -> Self {
        self.devices.push(MockDevice::new(address, Layout::Bytes));
        self
    }

    /// Add a device with 16-bit registers
    pub fn with_word_device(mut self, address: u8) -> Self {
        self.devices.push(MockDevice::new(address, Layout::Words));
        self
    }

    fn device_mut(&mut self, address: u8) -> &mut MockDevice {
        self.devices
            .iter_mut()
            .find(|d| d.address == address)
            .expect("no such mock device")
    }

    fn device(&self, address: u8) -> &MockDevice {
        self.devices
            .iter()
            .find(|d| d.address == address)
            .expect("no such mock device")
    }

    pub fn set_registers(&mut self, address: u8, register: u8, values: &[u8]) {
        let dev = self.device_mut(address);
        for (i, &value) in values.iter().enumerate() {
            dev.bytes[register.wrapping_add(i as u8) as usize] = value;
        }
    }

    pub fn register(&self, address: u8, register: u8) -> u8 {
        self.device(address).bytes[register as usize]
    }

    pub fn set_word(&mut self, address: u8, register: u8, value: u16) {
        self.device_mut(address).words[register as usize] = value;
    }

    pub fn word(&self, address: u8, register: u8) -> u16 {
        self.device(address).words[register as usize]
    }

    /// Queue values returned by the next reads of `register`
    pub fn script_reads(&mut self, address: u8, register: u8, values: &[u8]) {
        let dev = self.device_mut(address);
        match dev.scripted.iter_mut().find(|(r, _)| *r == register) {
            Some((_, queue)) => queue.extend(values.iter().copied()),
            None => dev
                .scripted
                .push((register, values.iter().copied().collect())),
        }
    }

    /// Make every read of `register` fail
    pub fn fail_reads_of(&mut self, address: u8, register: u8) {
        self.fail_reads.push((address, register));
    }

    /// Make every payload write to `register` fail
    pub fn fail_writes_to(&mut self, address: u8, register: u8) {
        self.fail_writes.push((address, register));
    }

    pub fn clear_failures(&mut self) {
        self.fail_reads.clear();
        self.fail_writes.clear();
    }

    pub fn set_busy(&mut self, busy: bool) {
        self.busy = busy;
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn clear_events(&mut self) {
        self.events.clear();
        self.writes.clear();
    }

    pub fn count(&self, mut predicate: impl FnMut(&Event) -> bool) -> usize {
        self.events.iter().filter(|e| predicate(e)).count()
    }

    /// Payload writes to one device as (register, value)
    pub fn writes_to(&self, address: u8) -> Vec<(u8, u8)> {
        self.writes
            .iter()
            .filter(|(a, _, _)| *a == address)
            .map(|&(_, r, v)| (r, v))
            .collect()
    }

    /// Number of read transactions that started at `register`
    pub fn reads_of(&self, address: u8, register: u8) -> usize {
        self.events
            .windows(4)
            .filter(|w| {
                w[0] == Event::Address(address, Direction::Write)
                    && w[1] == Event::Send(register)
                    && w[2] == Event::Start
                    && w[3] == Event::Address(address, Direction::Read)
            })
            .count()
    }
}

impl BusTransport for MockBus {
    fn wait_idle(&mut self, _timeout: Timeout) -> Result<(), BusError> {
        self.events.push(Event::WaitIdle);
        if self.busy {
            return Err(BusError::Timeout(Condition::BusIdle));
        }
        Ok(())
    }

    fn start_condition(&mut self, _timeout: Timeout) -> Result<(), BusError> {
        self.events.push(Event::Start);
        self.selected = None;
        Ok(())
    }

    fn stop_condition(&mut self) {
        self.events.push(Event::Stop);
        self.selected = None;
    }

    fn send_address(
        &mut self,
        address: Address,
        direction: Direction,
        _timeout: Timeout,
    ) -> Result<(), BusError> {
        self.events.push(Event::Address(address.value(), direction));
        let index = self
            .devices
            .iter()
            .position(|d| d.address == address.value())
            .ok_or(BusError::Timeout(Condition::AddressAcknowledged))?;

        self.selected = Some(index);
        self.direction = direction;
        self.pointer_set = false;
        self.byte_index = 0;
        Ok(())
    }

    fn send_byte(&mut self, value: u8, _timeout: Timeout) -> Result<(), BusError> {
        self.events.push(Event::Send(value));
        let index = match (self.selected, self.direction) {
            (Some(index), Direction::Write) => index,
            _ => return Err(BusError::Timeout(Condition::TransmitEmpty)),
        };

        let dev = &mut self.devices[index];
        if !self.pointer_set {
            dev.pointer = value;
            self.pointer_set = true;
            return Ok(());
        }

        if self.fail_writes.contains(&(dev.address, dev.pointer)) {
            return Err(BusError::Timeout(Condition::TransmitEmpty));
        }

        self.writes.push((dev.address, dev.pointer, value));
        match dev.layout {
            Layout::Bytes => {
                dev.bytes[dev.pointer as usize] = value;
                dev.pointer = dev.pointer.wrapping_add(1);
            }
            Layout::Words => {
                let word = &mut dev.words[dev.pointer as usize];
                *word = if self.byte_index % 2 == 0 {
                    (*word & 0x00FF) | ((value as u16) << 8)
                } else {
                    (*word & 0xFF00) | value as u16
                };
            }
        }
        self.byte_index += 1;
        Ok(())
    }

    fn receive_byte(&mut self, ack: Ack, _timeout: Timeout) -> Result<u8, BusError> {
        let index = match (self.selected, self.direction) {
            (Some(index), Direction::Read) => index,
            _ => return Err(BusError::Timeout(Condition::ReceiveNotEmpty)),
        };

        let dev = &mut self.devices[index];
        if self.fail_reads.contains(&(dev.address, dev.pointer)) {
            return Err(BusError::Timeout(Condition::ReceiveNotEmpty));
        }

        let pointer = dev.pointer;
        let scripted = dev
            .scripted
            .iter_mut()
            .find(|(r, _)| *r == pointer)
            .and_then(|(_, queue)| queue.pop_front());

        let value = match dev.layout {
            Layout::Bytes => {
                let value = scripted.unwrap_or(dev.bytes[pointer as usize]);
                dev.pointer = pointer.wrapping_add(1);
                value
            }
            Layout::Words => {
                let word = dev.words[pointer as usize];
                if self.byte_index % 2 == 0 {
                    (word >> 8) as u8
                } else {
                    word as u8
                }
            }
        };
        self.byte_index += 1;

        self.events.push(Event::Receive(value, ack));
        Ok(value)
    }
}

/// Delay that only records how long it was asked to wait
#[derive(Debug, Default)]
pub struct MockDelay {
    pub elapsed_ns: u64,
}

impl MockDelay {
    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed_ns / 1_000_000
    }
}

impl DelayNs for MockDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.elapsed_ns += ns as u64;
    }
}
