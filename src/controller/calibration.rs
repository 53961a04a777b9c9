//! # Calibration Module
//!
//! Learned raw value ranges and the normalization formula.
//!
//! Devices report wildly different native ranges (0..255, -32768..32767,
//! 0..1023, ...). Each required axis has its range read once from the device
//! at probe time, and every raw reading is then rescaled to the fixed
//! integer range `[-127, 127]`:
//!
//! `normalized = ((raw - min) * 254) / (max - min) - 127`
//!
//! Division truncates toward zero. Readings outside `[min, max]` are not
//! clamped unless [`NormalizationMode::Clamped`] is selected, so a noisy
//! device can produce values past ±127.
//!
//! ## Usage
//!
//! ```
//! use stick_bridge::controller::calibration::{normalize, AxisRange};
//!
//! let range = AxisRange::new(0, 255);
//! assert_eq!(normalize(0, range), -127);
//! assert_eq!(normalize(255, range), 127);
//! ```

use super::device::InputDevice;
use super::mapper::{AxisDescriptor, LogicalAxis, AXIS_COUNT};
use crate::error::Rejection;

/// Lower bound of the normalized range.
pub const NORMALIZED_MIN: i32 = -127;
/// Upper bound of the normalized range.
pub const NORMALIZED_MAX: i32 = 127;
/// Width of the normalized range.
pub const NORMALIZED_SPAN: i64 = (NORMALIZED_MAX - NORMALIZED_MIN) as i64;

/// Native (minimum, maximum) range of one device axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AxisRange {
    pub min: i32,
    pub max: i32,
}

impl AxisRange {
    #[must_use]
    pub const fn new(min: i32, max: i32) -> Self {
        Self { min, max }
    }

    /// A usable range has `min < max`.
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.min < self.max
    }
}

/// Whether normalized values are clamped to `[-127, 127]`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum NormalizationMode {
    /// Apply the formula as is; out-of-range raw values overshoot ±127.
    #[default]
    Unclamped,
    /// Saturate at ±127.
    Clamped,
}

impl NormalizationMode {
    #[must_use]
    pub fn from_clamp(clamp: bool) -> Self {
        if clamp {
            Self::Clamped
        } else {
            Self::Unclamped
        }
    }
}

/// Rescales a raw reading into the normalized range.
///
/// Computed in 64-bit so wide native ranges cannot overflow; a result beyond
/// `i32` saturates. `range` must satisfy [`AxisRange::is_valid`].
///
/// # Examples
///
/// ```
/// use stick_bridge::controller::calibration::{normalize, AxisRange};
///
/// let range = AxisRange::new(-32768, 32767);
/// assert_eq!(normalize(-32768, range), -127);
/// assert_eq!(normalize(0, range), 0);
/// assert_eq!(normalize(32767, range), 127);
/// ```
#[must_use]
pub fn normalize(raw: i32, range: AxisRange) -> i32 {
    let offset = i64::from(raw) - i64::from(range.min);
    let span = i64::from(range.max) - i64::from(range.min);
    let scaled = offset * NORMALIZED_SPAN / span + i64::from(NORMALIZED_MIN);
    scaled.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}

/// Calibrated ranges for every logical axis.
///
/// Built once during probing and never modified afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AxisCalibration {
    ranges: [AxisRange; AXIS_COUNT],
}

impl AxisCalibration {
    /// Validates one range per logical axis, in [`LogicalAxis::ALL`] order.
    ///
    /// # Errors
    ///
    /// Returns [`Rejection::BadRange`] for the first axis whose
    /// minimum is not below its maximum.
    pub fn new(ranges: [AxisRange; AXIS_COUNT]) -> Result<Self, Rejection> {
        for axis in LogicalAxis::ALL {
            let range = ranges[axis.index()];
            if !range.is_valid() {
                return Err(Rejection::BadRange {
                    axis: axis.name(),
                    min: range.min,
                    max: range.max,
                });
            }
        }
        Ok(Self { ranges })
    }

    #[must_use]
    pub fn range(&self, axis: LogicalAxis) -> AxisRange {
        self.ranges[axis.index()]
    }

    /// Normalizes a raw reading for `axis` under `mode`.
    #[must_use]
    pub fn normalize(&self, axis: LogicalAxis, raw: i32, mode: NormalizationMode) -> i32 {
        let value = normalize(raw, self.range(axis));
        match mode {
            NormalizationMode::Unclamped => value,
            NormalizationMode::Clamped => value.clamp(NORMALIZED_MIN, NORMALIZED_MAX),
        }
    }
}

/// Reads and validates the native range of every sampled axis.
///
/// Any failing axis rejects the whole device.
///
/// # Errors
///
/// - [`Rejection::RangeQuery`]: the range query failed
/// - [`Rejection::BadRange`]: the reported minimum is not below the maximum
pub fn calibrate<D: InputDevice + ?Sized>(
    device: &D,
    descriptor: &AxisDescriptor,
) -> Result<AxisCalibration, Rejection> {
    let mut ranges = [AxisRange::new(0, 0); AXIS_COUNT];
    for axis in LogicalAxis::ALL {
        ranges[axis.index()] = device
            .axis_range(descriptor.code(axis))
            .map_err(|source| Rejection::RangeQuery { axis: axis.name(), source })?;
    }
    AxisCalibration::new(ranges)
}
