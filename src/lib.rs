//! MPU6050 6-axis inertial sensor driver
//!
//! Configures the sensor over any register-addressed bus, calibrates the
//! accelerometer resting bias and keeps the latest temperature, accelerometer
//! and gyroscope readings, optionally smoothed by a running average.
//!
//! The platform supplies a [`Bus`] (and a [`Delay`] if `std::thread::sleep`
//! is not wanted). With the `ftdi` feature, [`ftdi::FtdiBus`] drives the sensor
//! through an FT232H USB-to-I2C bridge.
//!
//! # Quick Start
//!
//! ```
//! use std::time::Duration;
//! use mpu6050_driver::{
//!     Bus, BusFault, BusState, Configuration, Mpu6050, State, TransferStatus,
//! };
//!
//! // A bus whose device reads back zeros
//! struct QuietBus;
//!
//! impl Bus for QuietBus {
//!     fn transmit(&mut self, _: u8, _: &[u8], _: Duration) -> TransferStatus {
//!         TransferStatus::Ok
//!     }
//!     fn receive(&mut self, _: u8, buf: &mut [u8], _: Duration) -> TransferStatus {
//!         buf.fill(0);
//!         TransferStatus::Ok
//!     }
//!     fn current_fault(&self) -> BusFault {
//!         BusFault::Other
//!     }
//!     fn bus_state(&self) -> BusState {
//!         BusState::Ready
//!     }
//! }
//!
//! let mut sensor = Mpu6050::new(QuietBus)
//!     .with_configuration(Configuration::default().with_averaging(4));
//! assert_eq!(sensor.base_init(), State::Ready);
//!
//! // Call from the application's periodic loop
//! if sensor.handler() == State::Error {
//!     // Fatal bus fault: stop polling
//! }
//! let reading = sensor.latest();
//! println!("temp {} accel {:?}", reading.temperature, reading.accelerometer);
//! ```
//!
//! ## Streaming
//!
//! [`Mpu6050::stream`] runs the periodic loop itself and stops on the first
//! fatal bus fault:
//!
//! ```no_run
//! # use mpu6050_driver::{Bus, Mpu6050, StreamControl};
//! # fn run<B: Bus>(bus: B) -> mpu6050_driver::Result<()> {
//! let mut sensor = Mpu6050::new(bus);
//! sensor.base_init();
//! sensor.stream(100, |reading| {
//!     if reading.accelerometer.z < 0 {
//!         StreamControl::Break // upside down
//!     } else {
//!         StreamControl::Continue
//!     }
//! })?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
#[cfg(feature = "ftdi")]
mod ffi;
pub mod filter;
#[cfg(feature = "ftdi")]
pub mod ftdi;
pub mod mpu6050;
pub mod registers;
pub mod transport;

// Re-export public API
pub use config::{Configuration, ExtendedConfig, State, TransportConfig};
pub use error::{BusOperation, Mpu6050Error, Result};
pub use filter::{AxisAccumulator, AxisSample};
pub use mpu6050::{
    FatalHandler, Mpu6050, Orientation, PhysicalReading, Reading, StreamControl,
    CALIBRATION_DELAY_MS, CALIBRATION_SAMPLES,
};
pub use registers::{AccelRange, ClockSource, GyroRange, REGISTERS};
pub use transport::{Bus, BusFault, BusState, Delay, StdDelay, TransferStatus, Transport};
