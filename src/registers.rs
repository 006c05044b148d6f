//! MPU6050 register layout
//!
//! Register addresses and option bit patterns as published in the MPU-6000/6050
//! register map. Multi-byte groups are big-endian signed pairs, X then Y then Z.

/// Default I2C address (AD0 pulled low)
pub const MPU6050_ADDRESS: u8 = 0x68;

/// A contiguous block of data registers read in one transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisterGroup {
    /// Address of the first (high) byte
    pub start: u8,
    /// Number of bytes in the group
    pub len: usize,
}

/// Full register table for one device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisterMap {
    /// PWR_MGMT_1, holds CLKSEL
    pub power_management: u8,
    /// GYRO_CONFIG, holds FS_SEL
    pub gyro_config: u8,
    /// ACCEL_CONFIG, holds AFS_SEL
    pub accel_config: u8,
    /// TEMP_OUT_H..TEMP_OUT_L
    pub temperature: RegisterGroup,
    /// GYRO_XOUT_H..GYRO_ZOUT_L
    pub gyroscope: RegisterGroup,
    /// ACCEL_XOUT_H..ACCEL_ZOUT_L
    pub accelerometer: RegisterGroup,
}

/// The register table shared by every device instance
pub const REGISTERS: RegisterMap = RegisterMap {
    power_management: 0x6B,
    gyro_config: 0x1B,
    accel_config: 0x1C,
    temperature: RegisterGroup { start: 0x41, len: 2 },
    gyroscope: RegisterGroup { start: 0x43, len: 6 },
    accelerometer: RegisterGroup { start: 0x3B, len: 6 },
};

/// Largest register group, sizes the read scratch buffer
pub const MAX_GROUP_LEN: usize = 6;

/// Clock source selection (PWR_MGMT_1 CLKSEL)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClockSource {
    /// Internal 8 MHz oscillator
    #[default]
    Internal8MHz,
    /// PLL with X axis gyroscope reference
    PllGyroX,
    /// PLL with Y axis gyroscope reference
    PllGyroY,
    /// PLL with Z axis gyroscope reference
    PllGyroZ,
    /// PLL with external 32.768 kHz reference
    PllExternal32kHz,
    /// PLL with external 19.2 MHz reference
    PllExternal19MHz,
    /// Stops the clock and keeps the timing generator in reset
    Stop,
}

impl ClockSource {
    pub const fn bits(self) -> u8 {
        match self {
            ClockSource::Internal8MHz => 0,
            ClockSource::PllGyroX => 1,
            ClockSource::PllGyroY => 2,
            ClockSource::PllGyroZ => 3,
            ClockSource::PllExternal32kHz => 4,
            ClockSource::PllExternal19MHz => 5,
            ClockSource::Stop => 7,
        }
    }
}

/// Gyroscope full-scale range (GYRO_CONFIG FS_SEL)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GyroRange {
    /// ±250 °/s
    #[default]
    Dps250,
    /// ±500 °/s
    Dps500,
    /// ±1000 °/s
    Dps1000,
    /// ±2000 °/s
    Dps2000,
}

impl GyroRange {
    pub const fn bits(self) -> u8 {
        match self {
            GyroRange::Dps250 => 0,
            GyroRange::Dps500 => 8,
            GyroRange::Dps1000 => 16,
            GyroRange::Dps2000 => 24,
        }
    }

    /// Sensitivity in LSB/(°/s)
    pub const fn lsb_per_dps(self) -> f32 {
        match self {
            GyroRange::Dps250 => 131.0,
            GyroRange::Dps500 => 65.5,
            GyroRange::Dps1000 => 32.8,
            GyroRange::Dps2000 => 16.4,
        }
    }
}

/// Accelerometer full-scale range (ACCEL_CONFIG AFS_SEL)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AccelRange {
    /// ±2 g
    #[default]
    G2,
    /// ±4 g
    G4,
    /// ±8 g
    G8,
    /// ±16 g
    G16,
}

impl AccelRange {
    pub const fn bits(self) -> u8 {
        match self {
            AccelRange::G2 => 0,
            AccelRange::G4 => 8,
            AccelRange::G8 => 16,
            AccelRange::G16 => 24,
        }
    }

    /// Sensitivity in LSB/g
    pub const fn lsb_per_g(self) -> f32 {
        match self {
            AccelRange::G2 => 16384.0,
            AccelRange::G4 => 8192.0,
            AccelRange::G8 => 4096.0,
            AccelRange::G16 => 2048.0,
        }
    }
}
