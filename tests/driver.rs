//! End-to-end behavior of the driver against a simulated register file

mod common;

use common::{CountingDelay, MockBus, Operation, ACCEL_START, GYRO_START, TEMP_START};
use mpu6050_driver::{
    AxisSample, Configuration, Mpu6050, Mpu6050Error, State, StreamControl, TransportConfig,
    CALIBRATION_DELAY_MS, CALIBRATION_SAMPLES,
};
use std::cell::Cell;
use std::rc::Rc;

fn create_device(bus: MockBus, config: Configuration) -> Mpu6050<MockBus, CountingDelay> {
    Mpu6050::with_parts(bus, 0x68, CountingDelay::default(), TransportConfig::default())
        .with_configuration(config)
}

#[test]
fn test_direct_accelerometer_scenario() {
    let mut bus = MockBus::new();
    bus.set_bytes(ACCEL_START, &[0x10, 0x00, 0x00, 0x00, 0xFF, 0xF0]);
    let mut sensor = create_device(bus, Configuration::default());

    assert_eq!(sensor.base_init(), State::Ready);
    assert_eq!(sensor.handler(), State::Sampling);
    assert_eq!(sensor.accelerometer(), AxisSample::new(4096, 0, -16));
}

#[test]
fn test_averaging_publishes_once_per_window() {
    let mut bus = MockBus::new();
    bus.accel_sequence.extend([[100, 0, 0], [200, 0, 0], [300, 0, 0]]);
    let mut sensor = create_device(bus, Configuration::default().with_averaging(2));
    assert_eq!(sensor.base_init(), State::Ready);

    assert_eq!(sensor.get_accelerometer().unwrap(), AxisSample::default());
    assert_eq!(sensor.get_accelerometer().unwrap(), AxisSample::default());
    assert_eq!(sensor.get_accelerometer().unwrap(), AxisSample::new(200, 0, 0));

    // next window starts from an empty accumulator
    sensor.bus_mut().accel_sequence.extend([[10, 0, 0], [20, 0, 0], [30, 0, 0]]);
    assert_eq!(sensor.get_accelerometer().unwrap().x, 200);
    assert_eq!(sensor.get_accelerometer().unwrap().x, 200);
    assert_eq!(sensor.get_accelerometer().unwrap().x, 20);
}

#[test]
fn test_gyroscope_averaging_truncates_mean() {
    let mut bus = MockBus::new();
    bus.gyro_sequence.extend([[-1, 5, 32767], [-2, 6, 32767]]);
    let mut sensor = create_device(bus, Configuration::default().with_averaging(1));
    assert_eq!(sensor.base_init(), State::Ready);

    assert_eq!(sensor.get_gyroscope().unwrap(), AxisSample::default());
    assert_eq!(sensor.get_gyroscope().unwrap(), AxisSample::new(-1, 5, 32767));
}

#[test]
fn test_averaging_disabled_tracks_every_read() {
    let mut bus = MockBus::new();
    bus.gyro_sequence.extend([[1, 2, 3], [4, 5, 6]]);
    let mut sensor = create_device(bus, Configuration::default());
    sensor.base_init();

    assert_eq!(sensor.get_gyroscope().unwrap(), AxisSample::new(1, 2, 3));
    assert_eq!(sensor.get_gyroscope().unwrap(), AxisSample::new(4, 5, 6));
}

#[test]
fn test_calibration_zeroes_resting_reading() {
    let resting = [120, -340, 16000];
    let mut bus = MockBus::new();
    bus.set_axes(ACCEL_START, resting);
    let mut sensor = create_device(bus, Configuration::default().with_calibration(true));

    assert_eq!(sensor.base_init(), State::Ready);
    assert_eq!(sensor.calibration_offset(), AxisSample::from(resting));
    assert_eq!(sensor.bus().reads_of(ACCEL_START), CALIBRATION_SAMPLES as usize);

    assert_eq!(sensor.handler(), State::Sampling);
    assert_eq!(sensor.accelerometer(), AxisSample::new(0, 0, 0));
}

#[test]
fn test_calibration_waits_between_samples() {
    let delay = CountingDelay::default();
    let calls = delay.calls.clone();
    let total_ms = delay.total_ms.clone();
    let mut sensor = Mpu6050::with_parts(MockBus::new(), 0x68, delay, TransportConfig::default())
        .with_configuration(Configuration::default().with_calibration(true));

    sensor.base_init();
    assert_eq!(calls.get(), CALIBRATION_SAMPLES);
    assert_eq!(total_ms.get(), CALIBRATION_SAMPLES * CALIBRATION_DELAY_MS);
}

#[test]
fn test_calibration_uses_mean_of_samples() {
    let mut bus = MockBus::new();
    // 24 readings of 10 and one of 35: mean 11
    bus.accel_sequence.extend(std::iter::repeat([10, -10, 0]).take(24));
    bus.accel_sequence.push_back([35, -35, 24]);
    let mut sensor = create_device(bus, Configuration::default().with_calibration(true));

    assert_eq!(sensor.base_init(), State::Ready);
    assert_eq!(sensor.calibration_offset(), AxisSample::new(11, -11, 0));
}

#[test]
fn test_calibration_bypasses_averaging() {
    let resting = [50, 60, 70];
    let mut bus = MockBus::new();
    bus.set_axes(ACCEL_START, resting);
    let config = Configuration::default()
        .with_calibration(true)
        .with_averaging(3);
    let mut sensor = create_device(bus, config);

    assert_eq!(sensor.base_init(), State::Ready);
    assert_eq!(sensor.calibration_offset(), AxisSample::from(resting));
    // last direct calibration read is still published
    assert_eq!(sensor.accelerometer(), AxisSample::from(resting));

    for _ in 0..3 {
        sensor.handler();
        assert_eq!(sensor.accelerometer(), AxisSample::from(resting));
    }
    sensor.handler();
    assert_eq!(sensor.accelerometer(), AxisSample::new(0, 0, 0));
}

#[test]
fn test_offset_only_applied_while_sampling() {
    let mut bus = MockBus::new();
    bus.set_axes(ACCEL_START, [100, 100, 100]);
    let mut sensor = create_device(bus, Configuration::default().with_calibration(true));
    sensor.base_init();

    sensor.bus_mut().set_axes(ACCEL_START, [150, 90, 100]);
    assert_eq!(sensor.state(), State::Ready);
    assert_eq!(sensor.get_accelerometer().unwrap(), AxisSample::new(150, 90, 100));

    sensor.handler();
    assert_eq!(sensor.accelerometer(), AxisSample::new(50, -10, 0));
}

#[test]
fn test_averaged_offset_is_not_clamped_per_sample() {
    let mut bus = MockBus::new();
    bus.set_axes(ACCEL_START, [100, 0, 0]);
    let config = Configuration::default()
        .with_calibration(true)
        .with_averaging(1);
    let mut sensor = create_device(bus, config);
    assert_eq!(sensor.base_init(), State::Ready);

    sensor.bus_mut().accel_sequence.extend([[i16::MIN, 0, 0], [0, 0, 0]]);
    sensor.handler();
    sensor.handler();
    // (-32868 + -100) / 2
    assert_eq!(sensor.accelerometer().x, -16484);
}

#[test]
fn test_long_gyroscope_window_keeps_sampling() {
    let mut bus = MockBus::new();
    bus.set_axes(GYRO_START, [i16::MAX, 0, 0]);
    let mut sensor = create_device(bus, Configuration::default().with_averaging(100_000));
    assert_eq!(sensor.base_init(), State::Ready);

    for _ in 0..70_000 {
        assert_eq!(sensor.get_gyroscope().unwrap(), AxisSample::default());
    }
    assert_eq!(sensor.state(), State::Ready);
}

#[test]
fn test_init_writes_are_two_bytes_each() {
    let mut sensor = create_device(MockBus::new(), Configuration::default());
    assert_eq!(sensor.base_init(), State::Ready);
    sensor.handler();

    let transmits = sensor.bus().transmits();
    assert_eq!(&transmits[..3], &[vec![0x6B, 0x00], vec![0x1C, 0x00], vec![0x1B, 0x00]]);
    // the rest are single-byte register pointers
    assert!(transmits[3..].iter().all(|t| t.len() == 1));
}

#[test]
fn test_handler_reads_temperature_gyro_accel_in_order() {
    let mut sensor = create_device(MockBus::new(), Configuration::default());
    sensor.base_init();
    let before = sensor.bus().operations.len();
    sensor.handler();

    let receives: Vec<_> = sensor.bus().operations[before..]
        .iter()
        .filter_map(|op| match op {
            Operation::Receive { register, len } => Some((*register, *len)),
            Operation::Transmit(_) => None,
        })
        .collect();
    assert_eq!(receives, vec![(TEMP_START, 2), (GYRO_START, 6), (ACCEL_START, 6)]);
}

#[test]
fn test_temperature_is_idempotent() {
    let mut bus = MockBus::new();
    bus.set_pair(TEMP_START, -2000);
    let mut sensor = create_device(bus, Configuration::default());
    sensor.base_init();

    let first = sensor.get_temperature().unwrap();
    let second = sensor.get_temperature().unwrap();
    assert_eq!(first, second);
    // -2000 / 340 == -5 before adding 36.53
    assert_eq!(first, 31);
}

#[test]
fn test_fatal_write_fault_is_terminal() {
    let mut bus = MockBus::new();
    bus.fatal_on_transmit = Some(2);
    let mut sensor = create_device(bus, Configuration::default());
    let fatal_count = Rc::new(Cell::new(0));
    let counter = fatal_count.clone();
    sensor.set_fatal_handler(Box::new(move |err: &Mpu6050Error| {
        assert!(err.is_fatal());
        counter.set(counter.get() + 1);
    }));

    assert_eq!(sensor.base_init(), State::Error);
    assert_eq!(fatal_count.get(), 1);

    let issued = sensor.bus().operations.len();
    assert_eq!(sensor.handler(), State::Error);
    assert_eq!(sensor.init(), State::Error);
    assert_eq!(sensor.bus().operations.len(), issued);
    assert!(matches!(
        sensor.get_temperature(),
        Err(Mpu6050Error::NotReady(State::Error))
    ));
}

#[test]
fn test_fatal_read_fault_during_sampling() {
    let mut sensor = create_device(MockBus::new(), Configuration::default());
    sensor.base_init();
    // temperature, then gyroscope read fails
    sensor.bus_mut().fatal_on_receive = Some(2);

    assert_eq!(sensor.handler(), State::Error);
    assert_eq!(sensor.bus().reads_of(ACCEL_START), 0);
    assert_eq!(sensor.handler(), State::Error);
}

#[test]
fn test_fatal_fault_during_calibration() {
    let mut bus = MockBus::new();
    bus.fatal_on_receive = Some(10);
    let mut sensor = create_device(bus, Configuration::default().with_calibration(true));

    assert_eq!(sensor.base_init(), State::Error);
    assert_eq!(sensor.calibration_offset(), AxisSample::default());
}

#[test]
fn test_no_acknowledge_is_retried_transparently() {
    let mut bus = MockBus::new();
    bus.pending_nacks = 3;
    bus.set_pair(TEMP_START, 340);
    let mut sensor = create_device(bus, Configuration::default());

    assert_eq!(sensor.base_init(), State::Ready);
    // first register write went out four times
    assert_eq!(sensor.bus().transmits()[..4], vec![vec![0x6B, 0x00]; 4][..]);
    assert_eq!(sensor.get_temperature().unwrap(), 37);
}

#[test]
fn test_no_acknowledge_limit_is_fatal() {
    let mut bus = MockBus::new();
    bus.pending_nacks = 10;
    let transport = TransportConfig {
        nack_retry_limit: Some(4),
        ..TransportConfig::default()
    };
    let mut sensor = Mpu6050::with_parts(bus, 0x68, CountingDelay::default(), transport);

    assert_eq!(sensor.base_init(), State::Error);
    assert_eq!(sensor.bus().transmits().len(), 5);
}

#[test]
fn test_stream_surfaces_fatal_fault() {
    let mut bus = MockBus::new();
    bus.set_axes(GYRO_START, [3, 2, 1]);
    let mut sensor = create_device(bus, Configuration::default());
    sensor.base_init();
    sensor.bus_mut().fatal_on_receive = Some(7);

    let mut cycles_seen = 0;
    let err = sensor
        .stream(1000, |reading| {
            cycles_seen += 1;
            assert_eq!(reading.gyroscope, AxisSample::new(3, 2, 1));
            StreamControl::Continue
        })
        .unwrap_err();

    // three reads per cycle, the seventh read is the first of cycle three
    assert_eq!(cycles_seen, 2);
    assert!(matches!(err, Mpu6050Error::BusFault { .. }));
    assert_eq!(sensor.state(), State::Error);
    assert!(matches!(
        sensor.stream(1000, |_| StreamControl::Break),
        Err(Mpu6050Error::NotReady(State::Error))
    ));
}

#[test]
fn test_stream_for_stops_after_duration() {
    let mut sensor = create_device(MockBus::new(), Configuration::default());
    sensor.base_init();

    let mut seen = 0u64;
    let cycles = sensor
        .stream_for(1000, std::time::Duration::from_millis(20), |_| seen += 1)
        .unwrap();
    assert_eq!(cycles, seen);
    assert!(cycles >= 1);
    assert_eq!(sensor.state(), State::Sampling);
}

#[test]
fn test_release_returns_bus() {
    let mut sensor = create_device(MockBus::new(), Configuration::default());
    sensor.base_init();
    let bus = sensor.release();
    assert_eq!(bus.register(0x6B), 0x00);
    assert_eq!(bus.transmits().len(), 3);
}
