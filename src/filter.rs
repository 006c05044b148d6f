//! Raw register decoding and the running-average filter

use log::trace;

/// Divisor of the TEMP_OUT linear correction
pub const TEMPERATURE_SCALE: i16 = 340;
/// Offset of the TEMP_OUT linear correction
pub const TEMPERATURE_OFFSET: f64 = 36.53;

/// Combine a big-endian register pair into a signed value
pub fn decode_i16(high: u8, low: u8) -> i16 {
    i16::from_be_bytes([high, low])
}

/// Decode three consecutive big-endian pairs (X, Y, Z)
pub fn decode_axes(raw: &[u8; 6]) -> [i16; 3] {
    [
        decode_i16(raw[0], raw[1]),
        decode_i16(raw[2], raw[3]),
        decode_i16(raw[4], raw[5]),
    ]
}

/// Apply the TEMP_OUT correction
///
/// The raw value is divided as an integer first; only then is the fractional
/// offset added and the sum truncated toward zero.
pub fn correct_temperature(raw: i16) -> i16 {
    ((raw / TEMPERATURE_SCALE) as f64 + TEMPERATURE_OFFSET) as i16
}

/// One published reading for an axis group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AxisSample {
    pub x: i16,
    pub y: i16,
    pub z: i16,
}

impl AxisSample {
    pub const fn new(x: i16, y: i16, z: i16) -> Self {
        Self { x, y, z }
    }

    pub fn to_array(self) -> [i16; 3] {
        [self.x, self.y, self.z]
    }

    /// Per-axis `self - offset`, clamped to the i16 range
    pub fn offset_by(self, offset: AxisSample) -> Self {
        Self {
            x: self.x.saturating_sub(offset.x),
            y: self.y.saturating_sub(offset.y),
            z: self.z.saturating_sub(offset.z),
        }
    }

    /// Convert to physical units given a sensitivity in LSB per unit
    pub fn scaled(self, lsb_per_unit: f32) -> [f32; 3] {
        [
            self.x as f32 / lsb_per_unit,
            self.y as f32 / lsb_per_unit,
            self.z as f32 / lsb_per_unit,
        ]
    }
}

impl From<[i16; 3]> for AxisSample {
    fn from([x, y, z]: [i16; 3]) -> Self {
        Self { x, y, z }
    }
}

/// Sum type used while a window is being accumulated
pub trait AccumulatorValue: Copy + Default {
    /// `raw - offset` widened to the sum type
    fn difference(raw: i16, offset: i16) -> Self;

    fn accumulate(self, value: Self) -> Self;

    /// Mean over `count` samples, truncated toward zero and clamped to i16
    fn mean(self, count: u32) -> i16;
}

/// 32-bit sums wrap instead of trapping on windows longer than ~65 000 samples
impl AccumulatorValue for i32 {
    fn difference(raw: i16, offset: i16) -> Self {
        raw as i32 - offset as i32
    }

    fn accumulate(self, value: Self) -> Self {
        self.wrapping_add(value)
    }

    fn mean(self, count: u32) -> i16 {
        (self as i64 / count as i64).clamp(i16::MIN as i64, i16::MAX as i64) as i16
    }
}

impl AccumulatorValue for f64 {
    fn difference(raw: i16, offset: i16) -> Self {
        raw as f64 - offset as f64
    }

    fn accumulate(self, value: Self) -> Self {
        self + value
    }

    fn mean(self, count: u32) -> i16 {
        // float-to-int casts saturate
        (self / count as f64) as i16
    }
}

/// Per-axis sums and the number of samples behind them
///
/// The sums and the counter are always cleared together. The counter only
/// grows between drains.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AxisAccumulator<T> {
    sum: [T; 3],
    count: u32,
}

impl<T: AccumulatorValue> AxisAccumulator<T> {
    pub fn new() -> Self {
        Self {
            sum: [T::default(); 3],
            count: 0,
        }
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn sum(&self) -> [T; 3] {
        self.sum
    }

    /// Add one sample. Once the counter exceeds `window_size` the window is
    /// drained and its mean returned; otherwise `None`.
    pub fn push(&mut self, sample: AxisSample, window_size: u32) -> Option<AxisSample> {
        self.push_offset(sample, AxisSample::default(), window_size)
    }

    /// [`push`](Self::push) with `offset` removed in the sum type, so raw
    /// values near the i16 limits are not clamped before averaging
    pub fn push_offset(
        &mut self,
        sample: AxisSample,
        offset: AxisSample,
        window_size: u32,
    ) -> Option<AxisSample> {
        let values = sample.to_array().into_iter().zip(offset.to_array());
        for (sum, (raw, offset)) in self.sum.iter_mut().zip(values) {
            *sum = sum.accumulate(T::difference(raw, offset));
        }
        self.count += 1;

        if self.count > window_size {
            Some(self.drain())
        } else {
            None
        }
    }

    fn drain(&mut self) -> AxisSample {
        let count = self.count;
        let mean = AxisSample::new(
            self.sum[0].mean(count),
            self.sum[1].mean(count),
            self.sum[2].mean(count),
        );
        trace!("averaging window of {} drained: {:?}", count, mean);
        self.reset();
        mean
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }
}
