//! MPU6050 reader - periodic acquisition through an FT232H bridge
//!
//! Initializes the sensor, optionally calibrates it, then runs the sampling
//! handler at a fixed rate and prints (or logs to CSV) every reading until
//! Ctrl+C, the requested duration, or a fatal bus fault.
//!
//! Usage:
//!   mpu6050-reader --rate 50 --calibrate --average 9 --csv readings.csv

use clap::Parser;
use mpu6050_driver::ftdi::FtdiBus;
use mpu6050_driver::{
    Configuration, Mpu6050, Mpu6050Error, PhysicalReading, Reading, State, StreamControl,
    TransportConfig,
};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Parser, Debug)]
#[command(name = "mpu6050-reader")]
#[command(about = "Read an MPU6050 through an FT232H USB-to-I2C bridge", long_about = None)]
struct Args {
    /// FT232H I2C channel index
    #[arg(long, default_value = "0")]
    channel: u32,

    /// Device address in decimal (104 = 0x68 with AD0 low, 105 = 0x69 with AD0 high)
    #[arg(long, default_value = "104")]
    address: u8,

    /// Sampling rate in Hz (1-1000)
    #[arg(short, long, default_value = "50")]
    rate: u32,

    /// Duration in seconds (runs until Ctrl+C if omitted)
    #[arg(short, long)]
    duration: Option<u64>,

    /// Measure the accelerometer resting bias at startup
    #[arg(short, long)]
    calibrate: bool,

    /// Publish running averages; a window spans AVERAGE + 1 samples
    #[arg(short, long)]
    average: Option<u32>,

    /// Print readings in g and °/s instead of raw LSB
    #[arg(short, long)]
    physical: bool,

    /// Give up after this many consecutive no-acknowledge retries
    #[arg(long)]
    nack_limit: Option<u32>,

    /// Also append readings to a CSV file
    #[arg(long)]
    csv: Option<PathBuf>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();

    println!("MPU6050 Reader");
    println!("==============");
    println!("Opening FT232H channel {}...", args.channel);

    let bus = match FtdiBus::open(args.channel) {
        Ok(bus) => bus,
        Err(Mpu6050Error::NoChannelsFound) => {
            eprintln!("Error: No FT232H devices found.");
            eprintln!("Please check:");
            eprintln!("  1. FT232H is connected via USB");
            eprintln!("  2. FTDI drivers are installed");
            eprintln!("  3. No other application is using the device");
            return Err(Box::new(Mpu6050Error::NoChannelsFound));
        }
        Err(e) => {
            eprintln!("Error opening bridge: {}", e);
            return Err(Box::new(e));
        }
    };

    let mut config = Configuration::default()
        .with_calibration(args.calibrate)
        .with_physical_units(args.physical);
    if let Some(window) = args.average {
        config = config.with_averaging(window);
    }

    let transport = TransportConfig {
        nack_retry_limit: args.nack_limit,
        ..TransportConfig::default()
    };
    let mut sensor = Mpu6050::with_parts(bus, args.address, mpu6050_driver::StdDelay, transport)
        .with_configuration(config);

    if args.calibrate {
        println!("Calibrating, keep the sensor still...");
    }
    if sensor.base_init() != State::Ready {
        eprintln!("Error: sensor did not initialize (address 0x{:02X})", args.address);
        eprintln!("Please check wiring, pull-ups and the AD0 level.");
        return Err(Box::new(Mpu6050Error::NotReady(sensor.state())));
    }
    if args.calibrate {
        println!("Calibration offset: {:?}", sensor.calibration_offset());
    }

    let mut csv = match &args.csv {
        Some(path) => {
            let mut writer = BufWriter::new(File::create(path)?);
            writeln!(writer, "timestamp,temperature,accel_x,accel_y,accel_z,gyro_x,gyro_y,gyro_z")?;
            Some(writer)
        }
        None => None,
    };

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        println!("\nReceived Ctrl+C, stopping...");
        r.store(false, Ordering::SeqCst);
    })?;

    let start = Instant::now();
    let end_time = args.duration.map(|d| start + Duration::from_secs(d));
    println!("Sampling at {} Hz, press Ctrl+C to stop\n", args.rate);

    // base_init has settled the ranges the conversion uses
    let units = *sensor.configuration();
    let mut write_error = None;
    let result = sensor.stream(args.rate, |reading| {
        let timestamp = chrono::Local::now().to_rfc3339();
        print_reading(&timestamp, &reading, PhysicalReading::convert(&reading, &units));

        if let Some(writer) = csv.as_mut() {
            if let Err(e) = write_csv(writer, &timestamp, &reading) {
                write_error = Some(e);
                return StreamControl::Break;
            }
        }

        let expired = end_time.is_some_and(|end| Instant::now() >= end);
        if !running.load(Ordering::SeqCst) || expired {
            StreamControl::Break
        } else {
            StreamControl::Continue
        }
    });

    if let Some(writer) = csv.as_mut() {
        writer.flush()?;
    }
    if let Some(e) = write_error {
        eprintln!("CSV write error: {}", e);
        return Err(Box::new(e));
    }

    match result {
        Ok(cycles) => {
            let elapsed = start.elapsed().as_secs_f64();
            println!("\nCycles: {}", cycles);
            println!("Elapsed time: {:.2} seconds", elapsed);
            println!("Actual rate: {:.1} Hz", cycles as f64 / elapsed);
            Ok(())
        }
        Err(e) => {
            eprintln!("\nSampling stopped: {} (state {:?})", e, sensor.state());
            Err(Box::new(e))
        }
    }
}

fn print_reading(timestamp: &str, reading: &Reading, physical: Option<PhysicalReading>) {
    match physical {
        Some(p) => {
            let [ax, ay, az] = p.accel_g;
            let [gx, gy, gz] = p.gyro_dps;
            println!(
                "{} | T {:4.0}°C | A {:7.3} {:7.3} {:7.3} g | G {:8.2} {:8.2} {:8.2} °/s",
                timestamp, p.temperature_c, ax, ay, az, gx, gy, gz
            );
        }
        None => {
            let a = reading.accelerometer;
            let g = reading.gyroscope;
            println!(
                "{} | T {:4} | A {:6} {:6} {:6} | G {:6} {:6} {:6}",
                timestamp, reading.temperature, a.x, a.y, a.z, g.x, g.y, g.z
            );
        }
    }
}

fn write_csv<W: Write>(writer: &mut W, timestamp: &str, reading: &Reading) -> std::io::Result<()> {
    let a = reading.accelerometer;
    let g = reading.gyroscope;
    writeln!(
        writer,
        "{},{},{},{},{},{},{},{}",
        timestamp, reading.temperature, a.x, a.y, a.z, g.x, g.y, g.z
    )
}
