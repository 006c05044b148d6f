//! Register-addressed bus access
//!
//! [`Bus`] is what a platform I2C peripheral has to provide. [`Transport`] layers
//! the driver's policy on top: retry while the device does not acknowledge,
//! escalate every other fault, and wait for the bus to settle after each transfer.

use std::time::Duration;

use log::{error, warn};

use crate::config::TransportConfig;
use crate::error::{BusOperation, Mpu6050Error, Result};

/// Outcome of a single bus call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferStatus {
    Ok,
    /// Peripheral is occupied, try again
    Busy,
    /// Transfer failed, see [`Bus::current_fault`]
    Fault,
}

/// Last error latched by the bus peripheral
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusFault {
    /// Target did not acknowledge its address or a data byte
    NoAck,
    /// Arbitration loss, bus error, timeout, ...
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusState {
    Ready,
    NotReady,
}

/// Blocking master-mode bus peripheral
///
/// Addresses are 7-bit; the implementation is responsible for any shifting
/// its hardware needs.
pub trait Bus {
    /// Send `bytes` to `address`
    fn transmit(&mut self, address: u8, bytes: &[u8], timeout: Duration) -> TransferStatus;

    /// Fill `buffer` with bytes read from `address`
    fn receive(&mut self, address: u8, buffer: &mut [u8], timeout: Duration) -> TransferStatus;

    /// Fault behind the most recent [`TransferStatus::Fault`]
    fn current_fault(&self) -> BusFault;

    fn bus_state(&self) -> BusState;
}

impl<B: Bus + ?Sized> Bus for &mut B {
    fn transmit(&mut self, address: u8, bytes: &[u8], timeout: Duration) -> TransferStatus {
        (**self).transmit(address, bytes, timeout)
    }

    fn receive(&mut self, address: u8, buffer: &mut [u8], timeout: Duration) -> TransferStatus {
        (**self).receive(address, buffer, timeout)
    }

    fn current_fault(&self) -> BusFault {
        (**self).current_fault()
    }

    fn bus_state(&self) -> BusState {
        (**self).bus_state()
    }
}

/// Blocking millisecond delay
pub trait Delay {
    fn delay_ms(&mut self, ms: u32);
}

/// [`Delay`] backed by `std::thread::sleep`
#[derive(Debug, Clone, Copy, Default)]
pub struct StdDelay;

impl Delay for StdDelay {
    fn delay_ms(&mut self, ms: u32) {
        std::thread::sleep(Duration::from_millis(ms as u64));
    }
}

/// One device on a bus, plus the retry policy
#[derive(Debug)]
pub struct Transport<B> {
    bus: B,
    address: u8,
    config: TransportConfig,
}

impl<B: Bus> Transport<B> {
    pub fn new(bus: B, address: u8, config: TransportConfig) -> Self {
        Self {
            bus,
            address,
            config,
        }
    }

    /// 7-bit device address
    pub fn address(&self) -> u8 {
        self.address
    }

    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }

    pub fn bus_mut(&mut self) -> &mut B {
        &mut self.bus
    }

    /// Give the bus back
    pub fn release(self) -> B {
        self.bus
    }

    /// Send `bytes` (register address first, then payload)
    pub fn write_buffer(&mut self, bytes: &[u8]) -> Result<()> {
        if bytes.is_empty() {
            return Err(Mpu6050Error::InvalidParameter(
                "write needs at least a register address".to_string(),
            ));
        }

        self.complete(BusOperation::Transmit, |bus, address, timeout| {
            bus.transmit(address, bytes, timeout)
        })
    }

    /// Write a single register
    pub fn write_register(&mut self, register: u8, value: u8) -> Result<()> {
        self.write_buffer(&[register, value])
    }

    /// Set the register pointer to `register`, then read `buffer.len()` bytes
    pub fn read_buffer(&mut self, register: u8, buffer: &mut [u8]) -> Result<()> {
        self.write_buffer(&[register])?;

        self.complete(BusOperation::Receive, |bus, address, timeout| {
            bus.receive(address, buffer, timeout)
        })
    }

    /// Run `attempt` until it succeeds or a fatal fault shows up, then wait for
    /// the bus to go idle
    fn complete<F>(&mut self, operation: BusOperation, mut attempt: F) -> Result<()>
    where
        F: FnMut(&mut B, u8, Duration) -> TransferStatus,
    {
        let mut nacks = 0u32;

        loop {
            match attempt(&mut self.bus, self.address, self.config.timeout) {
                TransferStatus::Ok => break,
                TransferStatus::Busy => continue,
                TransferStatus::Fault => match self.bus.current_fault() {
                    BusFault::NoAck => {
                        nacks += 1;
                        if let Some(limit) = self.config.nack_retry_limit {
                            if nacks > limit {
                                error!(
                                    "device 0x{:02X} gave no acknowledge on {} {} times, giving up",
                                    self.address, operation, nacks
                                );
                                return Err(Mpu6050Error::NackRetriesExhausted {
                                    operation,
                                    address: self.address,
                                    attempts: nacks,
                                });
                            }
                        }
                        warn!(
                            "device 0x{:02X} gave no acknowledge on {}, retrying",
                            self.address, operation
                        );
                    }
                    BusFault::Other => {
                        error!("bus fault during {} to 0x{:02X}", operation, self.address);
                        return Err(Mpu6050Error::BusFault {
                            operation,
                            address: self.address,
                        });
                    }
                },
            }
        }

        while self.bus.bus_state() != BusState::Ready {
            std::hint::spin_loop();
        }

        Ok(())
    }
}
