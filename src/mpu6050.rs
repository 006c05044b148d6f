//! MPU6050 device instance: configuration, calibration and periodic sampling

use std::time::{Duration, Instant};

use log::{debug, error};

use crate::config::{Configuration, State, TransportConfig};
use crate::error::{Mpu6050Error, Result};
use crate::filter::{correct_temperature, decode_axes, decode_i16, AxisAccumulator, AxisSample};
use crate::registers::{
    AccelRange, ClockSource, GyroRange, RegisterGroup, MAX_GROUP_LEN, MPU6050_ADDRESS, REGISTERS,
};
use crate::transport::{Bus, Delay, StdDelay, Transport};

/// Accelerometer samples averaged into the calibration offset
pub const CALIBRATION_SAMPLES: u32 = 25;
/// Pause between calibration samples
pub const CALIBRATION_DELAY_MS: u32 = 5;

/// Hook run once when a fatal bus fault is observed
pub type FatalHandler = Box<dyn FnMut(&Mpu6050Error)>;

/// Control flow for streaming operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamControl {
    /// Continue streaming
    Continue,
    /// Stop streaming
    Break,
}

/// Latest published values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Reading {
    /// Corrected temperature
    pub temperature: i16,
    pub accelerometer: AxisSample,
    pub gyroscope: AxisSample,
}

/// Orientation angles. Reserved for a fusion stage, never computed here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Orientation {
    pub roll: i16,
    pub pitch: i16,
    pub yaw: i16,
}

/// Latest reading converted with the configured full-scale ranges
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhysicalReading {
    /// Acceleration in g (X, Y, Z)
    pub accel_g: [f32; 3],
    /// Angular rate in °/s (X, Y, Z)
    pub gyro_dps: [f32; 3],
    /// Temperature in °C
    pub temperature_c: f32,
}

impl PhysicalReading {
    /// Scale `reading` by the full-scale ranges in `config`
    ///
    /// Returns `None` unless `use_physical_units` is enabled.
    pub fn convert(reading: &Reading, config: &Configuration) -> Option<Self> {
        if !config.extended.use_physical_units {
            return None;
        }

        Some(Self {
            accel_g: reading.accelerometer.scaled(config.accel_range.lsb_per_g()),
            gyro_dps: reading.gyroscope.scaled(config.gyro_range.lsb_per_dps()),
            temperature_c: reading.temperature as f32,
        })
    }
}

/// MPU6050 sensor on a register-addressed bus
pub struct Mpu6050<B, D = StdDelay> {
    transport: Transport<B>,
    delay: D,
    config: Configuration,
    state: State,
    temperature: i16,
    accelerometer: AxisSample,
    gyroscope: AxisSample,
    accel_offset: AxisSample,
    accel_window: AxisAccumulator<f64>,
    gyro_window: AxisAccumulator<i32>,
    orientation: Orientation,
    fatal_handler: FatalHandler,
}

impl<B: Bus> Mpu6050<B, StdDelay> {
    /// Create an uninitialized device at the default address
    ///
    /// Nothing is sent to the bus until [`init`](Self::init) or
    /// [`base_init`](Self::base_init) is called.
    pub fn new(bus: B) -> Self {
        Self::with_parts(bus, MPU6050_ADDRESS, StdDelay, TransportConfig::default())
    }
}

impl<B: Bus, D: Delay> Mpu6050<B, D> {
    /// Create an uninitialized device
    ///
    /// # Arguments
    /// * `bus` - Bus the sensor is attached to
    /// * `address` - 7-bit device address (0x68 or 0x69)
    /// * `delay` - Delay used between calibration samples
    /// * `transport` - Timeout and retry policy for bus calls
    pub fn with_parts(bus: B, address: u8, delay: D, transport: TransportConfig) -> Self {
        Self {
            transport: Transport::new(bus, address, transport),
            delay,
            config: Configuration::default(),
            state: State::Uninitialized,
            temperature: 0,
            accelerometer: AxisSample::default(),
            gyroscope: AxisSample::default(),
            accel_offset: AxisSample::default(),
            accel_window: AxisAccumulator::new(),
            gyro_window: AxisAccumulator::new(),
            orientation: Orientation::default(),
            fatal_handler: Box::new(|err: &Mpu6050Error| error!("unrecoverable bus failure: {}", err)),
        }
    }

    /// Replace the configuration, builder style
    pub fn with_configuration(mut self, config: Configuration) -> Self {
        self.config = config;
        self
    }

    /// Replace the hook run on fatal bus faults (the default logs the error)
    pub fn set_fatal_handler(&mut self, handler: FatalHandler) {
        self.fatal_handler = handler;
    }

    /// Current lifecycle state
    pub fn state(&self) -> State {
        self.state
    }

    /// 7-bit device address
    pub fn address(&self) -> u8 {
        self.transport.address()
    }

    /// Stored configuration
    pub fn configuration(&self) -> &Configuration {
        &self.config
    }

    /// Configuration is only picked up by the next `init`/`base_init`
    /// (register options) or the next read (filter options)
    pub fn configuration_mut(&mut self) -> &mut Configuration {
        &mut self.config
    }

    /// Underlying bus
    pub fn bus(&self) -> &B {
        self.transport.bus()
    }

    /// Underlying bus, mutably. Transfers made through it bypass the retry policy.
    pub fn bus_mut(&mut self) -> &mut B {
        self.transport.bus_mut()
    }

    /// Tear down the driver and hand back the bus
    pub fn release(self) -> B {
        self.transport.release()
    }

    /// Write the stored power, accelerometer and gyroscope configuration
    ///
    /// # Returns
    /// * `State::Ready` - All three registers were written
    /// * `State::Error` - A fatal bus fault occurred (or the device was
    ///   already in `Error`)
    pub fn init(&mut self) -> State {
        if self.state == State::Error {
            return self.state;
        }
        self.set_state(State::Initializing);

        let writes = [
            (REGISTERS.power_management, self.config.power_management_byte()),
            (REGISTERS.accel_config, self.config.accel_config_byte()),
            (REGISTERS.gyro_config, self.config.gyro_config_byte()),
        ];
        for (register, value) in writes {
            if self.write_register(register, value).is_err() {
                break;
            }
        }

        if self.state != State::Error {
            self.set_state(State::Ready);
        }
        self.state
    }

    /// Initialize with the default ranges and, if enabled, calibrate
    ///
    /// Selects the internal 8 MHz clock, ±2 g and ±250 °/s, runs
    /// [`init`](Self::init), then measures the accelerometer resting bias
    /// when `Configuration::calibration` is set. Calibration takes
    /// `CALIBRATION_SAMPLES` direct readings spaced `CALIBRATION_DELAY_MS`
    /// apart; keep the sensor still meanwhile.
    pub fn base_init(&mut self) -> State {
        self.config.clock_source = ClockSource::Internal8MHz;
        self.config.accel_range = AccelRange::G2;
        self.config.gyro_range = GyroRange::Dps250;

        if self.init() != State::Ready {
            self.set_state(State::Error);
            return self.state;
        }

        // Initializing keeps accelerometer reads on the direct path
        self.set_state(State::Initializing);
        if self.config.calibration && self.calibrate().is_err() {
            return self.state;
        }

        self.set_state(State::Ready);
        self.state
    }

    /// One periodic sampling cycle: temperature, gyroscope, accelerometer
    ///
    /// Returns immediately, without touching the bus, once the device is in
    /// `Error`. Otherwise the device enters `Sampling` and stays there after
    /// the cycle unless a read fails.
    pub fn handler(&mut self) -> State {
        if let Err(err) = self.cycle() {
            debug!("sampling cycle stopped: {}", err);
        }
        self.state
    }

    fn cycle(&mut self) -> Result<()> {
        self.ensure_usable()?;
        self.set_state(State::Sampling);
        self.get_temperature()?;
        self.get_gyroscope()?;
        self.get_accelerometer()?;
        Ok(())
    }

    /// Read and publish the corrected temperature
    pub fn get_temperature(&mut self) -> Result<i16> {
        self.ensure_usable()?;
        let raw = self.read_group(REGISTERS.temperature)?;
        self.temperature = correct_temperature(decode_i16(raw[0], raw[1]));
        Ok(self.temperature)
    }

    /// Read the gyroscope and publish either the raw sample or, with
    /// averaging on, the mean of each completed window
    pub fn get_gyroscope(&mut self) -> Result<AxisSample> {
        self.ensure_usable()?;
        let raw = self.read_group(REGISTERS.gyroscope)?;
        let sample = AxisSample::from(decode_axes(&raw));

        let extended = self.config.extended;
        if !extended.use_averages {
            self.gyroscope = sample;
        } else if let Some(mean) = self.gyro_window.push(sample, extended.window_size) {
            self.gyroscope = mean;
        }
        Ok(self.gyroscope)
    }

    /// Read the accelerometer, remove the calibration offset while sampling,
    /// and publish either the sample or a completed window mean
    ///
    /// Averaging is bypassed while `Initializing` so calibration always sees
    /// direct readings.
    pub fn get_accelerometer(&mut self) -> Result<AxisSample> {
        self.ensure_usable()?;
        let raw = self.read_group(REGISTERS.accelerometer)?;
        let sample = AxisSample::from(decode_axes(&raw));
        let offset = if self.config.calibration && self.state == State::Sampling {
            self.accel_offset
        } else {
            AxisSample::default()
        };

        let extended = self.config.extended;
        if !extended.use_averages || self.state == State::Initializing {
            self.accelerometer = sample.offset_by(offset);
        } else if let Some(mean) = self
            .accel_window
            .push_offset(sample, offset, extended.window_size)
        {
            self.accelerometer = mean;
        }
        Ok(self.accelerometer)
    }

    fn calibrate(&mut self) -> Result<()> {
        let mut sum = [0f64; 3];
        for _ in 0..CALIBRATION_SAMPLES {
            let sample = self.get_accelerometer()?;
            for (total, axis) in sum.iter_mut().zip(sample.to_array()) {
                *total += axis as f64;
            }
            self.delay.delay_ms(CALIBRATION_DELAY_MS);
        }

        let samples = CALIBRATION_SAMPLES as f64;
        self.accel_offset = AxisSample::new(
            (sum[0] / samples) as i16,
            (sum[1] / samples) as i16,
            (sum[2] / samples) as i16,
        );
        debug!("accelerometer calibration offset: {:?}", self.accel_offset);
        Ok(())
    }

    /// Last published temperature
    pub fn temperature(&self) -> i16 {
        self.temperature
    }

    /// Last published accelerometer sample
    pub fn accelerometer(&self) -> AxisSample {
        self.accelerometer
    }

    /// Last published gyroscope sample
    pub fn gyroscope(&self) -> AxisSample {
        self.gyroscope
    }

    /// Offset subtracted from accelerometer readings (zero until calibrated)
    pub fn calibration_offset(&self) -> AxisSample {
        self.accel_offset
    }

    /// Orientation angles (always zero, no fusion is done here)
    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    /// Snapshot of the last published values
    pub fn latest(&self) -> Reading {
        Reading {
            temperature: self.temperature,
            accelerometer: self.accelerometer,
            gyroscope: self.gyroscope,
        }
    }

    /// Latest reading in g and °/s, if `use_physical_units` is enabled
    pub fn physical(&self) -> Option<PhysicalReading> {
        PhysicalReading::convert(&self.latest(), &self.config)
    }

    /// Run sampling cycles at a fixed rate, handing each reading to `callback`
    ///
    /// The device must be initialized (`Ready` or `Sampling`). Streaming stops
    /// when the callback returns `StreamControl::Break`, or with the fault
    /// that moved the device into `Error`.
    ///
    /// # Arguments
    /// * `rate_hz` - Target cycle rate in Hz (1-1000). The actual rate may be
    ///               lower depending on bus speed.
    /// * `callback` - Called after every completed cycle
    ///
    /// # Returns
    /// * `Ok(u64)` - Number of cycles completed before stopping
    /// * `Err(Mpu6050Error)` - Bad rate, device not ready, or a fatal bus fault
    pub fn stream<F>(&mut self, rate_hz: u32, mut callback: F) -> Result<u64>
    where
        F: FnMut(Reading) -> StreamControl,
    {
        if rate_hz == 0 || rate_hz > 1000 {
            return Err(Mpu6050Error::InvalidParameter(format!(
                "Sample rate must be between 1-1000 Hz, got {}",
                rate_hz
            )));
        }
        if !matches!(self.state, State::Ready | State::Sampling) {
            return Err(Mpu6050Error::NotReady(self.state));
        }

        let interval = Duration::from_micros(1_000_000 / rate_hz as u64);
        let mut cycles = 0u64;
        let mut next_cycle = Instant::now();

        loop {
            self.cycle()?;
            cycles += 1;

            if callback(self.latest()) == StreamControl::Break {
                break;
            }

            next_cycle += interval;
            let now = Instant::now();
            if next_cycle > now {
                std::thread::sleep(next_cycle - now);
            }
        }

        Ok(cycles)
    }

    /// [`stream`](Self::stream) bounded by wall-clock `duration`
    pub fn stream_for<F>(&mut self, rate_hz: u32, duration: Duration, mut callback: F) -> Result<u64>
    where
        F: FnMut(Reading),
    {
        let end_time = Instant::now() + duration;

        self.stream(rate_hz, |reading| {
            callback(reading);
            if Instant::now() >= end_time {
                StreamControl::Break
            } else {
                StreamControl::Continue
            }
        })
    }

    fn ensure_usable(&self) -> Result<()> {
        if self.state == State::Error {
            return Err(Mpu6050Error::NotReady(self.state));
        }
        Ok(())
    }

    fn set_state(&mut self, state: State) {
        if self.state != state {
            debug!("mpu6050@0x{:02X}: {:?} -> {:?}", self.address(), self.state, state);
            self.state = state;
        }
    }

    fn write_register(&mut self, register: u8, value: u8) -> Result<()> {
        let result = self.transport.write_register(register, value);
        self.escalate(result)
    }

    /// Read one register group into a stack buffer sized for the largest group
    fn read_group(&mut self, group: RegisterGroup) -> Result<[u8; MAX_GROUP_LEN]> {
        let mut raw = [0u8; MAX_GROUP_LEN];
        let result = self.transport.read_buffer(group.start, &mut raw[..group.len]);
        self.escalate(result)?;
        Ok(raw)
    }

    fn escalate<T>(&mut self, result: Result<T>) -> Result<T> {
        if let Err(err) = &result {
            if err.is_fatal() {
                self.set_state(State::Error);
                (self.fatal_handler)(err);
            }
        }
        result
    }
}
