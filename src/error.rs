//! Error types for the MPU6050 driver

use thiserror::Error;

use crate::config::State;

/// Bus operation that was in flight when a fault was observed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusOperation {
    Transmit,
    Receive,
}

impl std::fmt::Display for BusOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BusOperation::Transmit => f.write_str("transmit"),
            BusOperation::Receive => f.write_str("receive"),
        }
    }
}

/// Error type for MPU6050 operations
#[derive(Error, Debug)]
pub enum Mpu6050Error {
    /// Bus reported a fault other than no-acknowledge
    #[error("Bus fault during {operation} to device 0x{address:02X}")]
    BusFault { operation: BusOperation, address: u8 },

    /// Device kept answering with no-acknowledge past the configured limit
    #[error("Device 0x{address:02X} did not acknowledge {operation} after {attempts} attempts")]
    NackRetriesExhausted {
        operation: BusOperation,
        address: u8,
        attempts: u32,
    },

    /// Device is in a state that refuses the operation
    #[error("Device not ready (state: {0:?})")]
    NotReady(State),

    /// Invalid parameter
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// FTDI driver error
    #[cfg(feature = "ftdi")]
    #[error("FTDI error: {status} ({description})")]
    FtdiError { status: u32, description: String },

    /// No I2C channels found
    #[cfg(feature = "ftdi")]
    #[error("No I2C channels found")]
    NoChannelsFound,

    /// Invalid channel index
    #[cfg(feature = "ftdi")]
    #[error("Invalid channel index: {0}")]
    InvalidChannel(u32),
}

impl Mpu6050Error {
    /// True for errors that put the device into the terminal `Error` state
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Mpu6050Error::BusFault { .. } | Mpu6050Error::NackRetriesExhausted { .. }
        )
    }
}

/// Result type for MPU6050 operations
pub type Result<T> = std::result::Result<T, Mpu6050Error>;
