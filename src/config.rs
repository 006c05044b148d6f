//! Driver configuration and lifecycle state

use std::time::Duration;

use crate::registers::{AccelRange, ClockSource, GyroRange};

/// Lifecycle state of a device instance
///
/// `Uninitialized -> Initializing -> Ready`, then `Ready <-> Sampling` once
/// periodic reads start. `Error` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum State {
    #[default]
    Uninitialized,
    Initializing,
    Ready,
    Sampling,
    Error,
}

/// Running-average and output options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExtendedConfig {
    /// Publish window means instead of direct readings
    pub use_averages: bool,
    /// Accumulation keeps going while the counter is `<= window_size`,
    /// so one window spans `window_size + 1` samples
    pub window_size: u32,
    /// Expose readings converted to g and °/s
    pub use_physical_units: bool,
}

/// Device configuration written during `init`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Configuration {
    pub clock_source: ClockSource,
    pub gyro_range: GyroRange,
    pub accel_range: AccelRange,
    /// Measure and subtract the accelerometer resting bias during `base_init`
    pub calibration: bool,
    pub extended: ExtendedConfig,
}

impl Configuration {
    pub fn with_clock_source(mut self, clock_source: ClockSource) -> Self {
        self.clock_source = clock_source;
        self
    }

    pub fn with_gyro_range(mut self, gyro_range: GyroRange) -> Self {
        self.gyro_range = gyro_range;
        self
    }

    pub fn with_accel_range(mut self, accel_range: AccelRange) -> Self {
        self.accel_range = accel_range;
        self
    }

    pub fn with_calibration(mut self, enabled: bool) -> Self {
        self.calibration = enabled;
        self
    }

    /// Enable running averages over `window_size + 1` samples
    pub fn with_averaging(mut self, window_size: u32) -> Self {
        self.extended.use_averages = true;
        self.extended.window_size = window_size;
        self
    }

    pub fn with_physical_units(mut self, enabled: bool) -> Self {
        self.extended.use_physical_units = enabled;
        self
    }

    /// PWR_MGMT_1 value
    pub fn power_management_byte(&self) -> u8 {
        self.clock_source.bits()
    }

    /// GYRO_CONFIG value
    pub fn gyro_config_byte(&self) -> u8 {
        self.gyro_range.bits()
    }

    /// ACCEL_CONFIG value
    pub fn accel_config_byte(&self) -> u8 {
        self.accel_range.bits()
    }
}

/// Bus call parameters used by the transport adapter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransportConfig {
    /// Timeout handed to every transmit/receive call
    pub timeout: Duration,
    /// Consecutive no-acknowledge retries allowed before escalating.
    /// `None` retries until the device answers.
    pub nack_retry_limit: Option<u32>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(1000),
            nack_retry_limit: None,
        }
    }
}
