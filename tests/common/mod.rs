//! Simulated MPU6050 register file behind a scriptable bus

#![allow(dead_code)]

use mpu6050_driver::{Bus, BusFault, BusState, Delay, TransferStatus};
use std::cell::Cell;
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;
use std::time::Duration;

pub const ACCEL_START: u8 = 0x3B;
pub const TEMP_START: u8 = 0x41;
pub const GYRO_START: u8 = 0x43;

/// Records operations performed on the mock bus
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    Transmit(Vec<u8>),
    Receive { register: u8, len: usize },
}

#[derive(Debug)]
pub struct MockBus {
    pub registers: HashMap<u8, u8>,
    pointer: u8,
    fault: BusFault,

    /// Operations log for verification
    pub operations: Vec<Operation>,

    /// Failure injection: the n-th transmit/receive (1-based) faults fatally
    pub fatal_on_transmit: Option<usize>,
    pub fatal_on_receive: Option<usize>,
    /// Number of upcoming transfers answered with no-acknowledge
    pub pending_nacks: u32,
    transmits: usize,
    receives: usize,

    /// Sensor data sequences, one entry consumed per group read
    pub accel_sequence: VecDeque<[i16; 3]>,
    pub gyro_sequence: VecDeque<[i16; 3]>,
}

impl MockBus {
    pub fn new() -> Self {
        Self {
            registers: HashMap::new(),
            pointer: 0,
            fault: BusFault::Other,
            operations: Vec::new(),
            fatal_on_transmit: None,
            fatal_on_receive: None,
            pending_nacks: 0,
            transmits: 0,
            receives: 0,
            accel_sequence: VecDeque::new(),
            gyro_sequence: VecDeque::new(),
        }
    }

    pub fn set_axes(&mut self, start: u8, [x, y, z]: [i16; 3]) {
        for (i, value) in [x, y, z].into_iter().enumerate() {
            self.set_pair(start + 2 * i as u8, value);
        }
    }

    pub fn set_pair(&mut self, start: u8, value: i16) {
        let [high, low] = value.to_be_bytes();
        self.registers.insert(start, high);
        self.registers.insert(start + 1, low);
    }

    pub fn set_bytes(&mut self, start: u8, bytes: &[u8]) {
        for (i, byte) in bytes.iter().enumerate() {
            self.registers.insert(start + i as u8, *byte);
        }
    }

    pub fn register(&self, address: u8) -> u8 {
        self.registers.get(&address).copied().unwrap_or(0)
    }

    pub fn transmits(&self) -> Vec<Vec<u8>> {
        self.operations
            .iter()
            .filter_map(|op| match op {
                Operation::Transmit(bytes) => Some(bytes.clone()),
                Operation::Receive { .. } => None,
            })
            .collect()
    }

    /// Group reads that started at `register`
    pub fn reads_of(&self, register: u8) -> usize {
        self.operations
            .iter()
            .filter(|op| matches!(op, Operation::Receive { register: r, .. } if *r == register))
            .count()
    }

    fn take_nack(&mut self) -> bool {
        if self.pending_nacks > 0 {
            self.pending_nacks -= 1;
            self.fault = BusFault::NoAck;
            true
        } else {
            false
        }
    }
}

impl Default for MockBus {
    fn default() -> Self {
        Self::new()
    }
}

impl Bus for MockBus {
    fn transmit(&mut self, _address: u8, bytes: &[u8], _timeout: Duration) -> TransferStatus {
        self.operations.push(Operation::Transmit(bytes.to_vec()));
        self.transmits += 1;

        if self.fatal_on_transmit == Some(self.transmits) {
            self.fault = BusFault::Other;
            return TransferStatus::Fault;
        }
        if self.take_nack() {
            return TransferStatus::Fault;
        }

        self.pointer = bytes[0];
        if let &[register, value] = bytes {
            self.registers.insert(register, value);
        }
        TransferStatus::Ok
    }

    fn receive(&mut self, _address: u8, buffer: &mut [u8], _timeout: Duration) -> TransferStatus {
        self.operations.push(Operation::Receive {
            register: self.pointer,
            len: buffer.len(),
        });
        self.receives += 1;

        if self.fatal_on_receive == Some(self.receives) {
            self.fault = BusFault::Other;
            return TransferStatus::Fault;
        }
        if self.take_nack() {
            return TransferStatus::Fault;
        }

        // Advance sequences so a NACK'd attempt does not consume a sample
        match self.pointer {
            ACCEL_START => {
                if let Some(axes) = self.accel_sequence.pop_front() {
                    self.set_axes(ACCEL_START, axes);
                }
            }
            GYRO_START => {
                if let Some(axes) = self.gyro_sequence.pop_front() {
                    self.set_axes(GYRO_START, axes);
                }
            }
            _ => {}
        }

        for (i, byte) in buffer.iter_mut().enumerate() {
            *byte = self.register(self.pointer + i as u8);
        }
        TransferStatus::Ok
    }

    fn current_fault(&self) -> BusFault {
        self.fault
    }

    fn bus_state(&self) -> BusState {
        BusState::Ready
    }
}

/// No-op delay that counts how often it was asked to wait
#[derive(Debug, Clone, Default)]
pub struct CountingDelay {
    pub calls: Rc<Cell<u32>>,
    pub total_ms: Rc<Cell<u32>>,
}

impl Delay for CountingDelay {
    fn delay_ms(&mut self, ms: u32) {
        self.calls.set(self.calls.get() + 1);
        self.total_ms.set(self.total_ms.get() + ms);
    }
}
