//! # Axis Mapper Module
//!
//! Maps raw evdev events onto the three logical control axes and keeps the
//! most recent [`NormalizedPosition`].
//!
//! ## Axis Codes (EV_ABS)
//!
//! | Logical axis | evdev Code | Sampled |
//! |--------------|------------|---------|
//! | Aileron (roll) | ABS_Z | yes |
//! | Elevator (pitch) | ABS_Y | yes |
//! | Throttle | ABS_RZ | yes |
//! | Rudder (legacy) | ABS_X | no, presence is still required |
//!
//! ## Usage
//!
//! ```
//! use stick_bridge::controller::calibration::{AxisCalibration, AxisRange, NormalizationMode};
//! use stick_bridge::controller::mapper::{AxisDescriptor, PositionMapper, RawEvent};
//!
//! let calibration = AxisCalibration::new([AxisRange::new(0, 255); 3])?;
//! let mut mapper = PositionMapper::new(
//!     AxisDescriptor::default(),
//!     calibration,
//!     NormalizationMode::Unclamped,
//! );
//!
//! mapper.process_event(&RawEvent::absolute(AxisDescriptor::ELEVATOR, 255));
//! assert_eq!(mapper.position().as_array(), [0, 127, 0]);
//! # Ok::<(), stick_bridge::error::Rejection>(())
//! ```

use std::fmt;

use super::calibration::{AxisCalibration, NormalizationMode};

/// Number of sampled logical axes.
pub const AXIS_COUNT: usize = 3;

/// `EV_ABS` event type.
pub const EV_ABS: u16 = 0x03;

/// One sampled degree of freedom.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogicalAxis {
    Aileron,
    Elevator,
    Throttle,
}

impl LogicalAxis {
    /// All axes in publication order.
    pub const ALL: [LogicalAxis; AXIS_COUNT] =
        [LogicalAxis::Aileron, LogicalAxis::Elevator, LogicalAxis::Throttle];

    /// Position of this axis in [`NormalizedPosition`] and outbound messages.
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            LogicalAxis::Aileron => 0,
            LogicalAxis::Elevator => 1,
            LogicalAxis::Throttle => 2,
        }
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            LogicalAxis::Aileron => "aileron",
            LogicalAxis::Elevator => "elevator",
            LogicalAxis::Throttle => "throttle",
        }
    }
}

/// Assignment of logical axes to device-native absolute axis codes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AxisDescriptor {
    codes: [u16; AXIS_COUNT],
    rudder: u16,
}

impl Default for AxisDescriptor {
    fn default() -> Self {
        Self {
            codes: [Self::AILERON, Self::ELEVATOR, Self::THROTTLE],
            rudder: Self::RUDDER,
        }
    }
}

impl AxisDescriptor {
    /// ABS_X
    pub const RUDDER: u16 = 0x00;
    /// ABS_Y
    pub const ELEVATOR: u16 = 0x01;
    /// ABS_Z
    pub const AILERON: u16 = 0x02;
    /// ABS_RZ
    pub const THROTTLE: u16 = 0x05;

    /// Native code sampled for `axis`.
    #[must_use]
    pub fn code(&self, axis: LogicalAxis) -> u16 {
        self.codes[axis.index()]
    }

    /// Logical axis fed by native `code`, if any.
    #[must_use]
    pub fn axis_for(&self, code: u16) -> Option<LogicalAxis> {
        LogicalAxis::ALL.into_iter().find(|&axis| self.code(axis) == code)
    }

    /// Every absolute axis a device must expose, rudder first.
    ///
    /// The rudder axis is gated on but never sampled.
    pub fn required_axes(&self) -> impl Iterator<Item = (&'static str, u16)> + '_ {
        std::iter::once(("rudder", self.rudder)).chain(
            LogicalAxis::ALL
                .into_iter()
                .map(|axis| (axis.name(), self.code(axis))),
        )
    }
}

/// One evdev input record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawEvent {
    pub event_type: u16,
    pub code: u16,
    pub value: i32,
}

impl RawEvent {
    #[must_use]
    pub const fn new(event_type: u16, code: u16, value: i32) -> Self {
        Self { event_type, code, value }
    }

    /// An absolute axis event.
    #[must_use]
    pub const fn absolute(code: u16, value: i32) -> Self {
        Self::new(EV_ABS, code, value)
    }
}

impl From<evdev::InputEvent> for RawEvent {
    fn from(event: evdev::InputEvent) -> Self {
        Self::new(event.event_type().0, event.code(), event.value())
    }
}

/// Latest normalized value of every logical axis.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NormalizedPosition([i32; AXIS_COUNT]);

impl NormalizedPosition {
    #[must_use]
    pub const fn new(values: [i32; AXIS_COUNT]) -> Self {
        Self(values)
    }

    #[must_use]
    pub fn get(&self, axis: LogicalAxis) -> i32 {
        self.0[axis.index()]
    }

    pub fn set(&mut self, axis: LogicalAxis, value: i32) {
        self.0[axis.index()] = value;
    }

    #[must_use]
    pub const fn as_array(&self) -> [i32; AXIS_COUNT] {
        self.0
    }
}

impl fmt::Display for NormalizedPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.0[0], self.0[1], self.0[2])
    }
}

/// Applies raw events to the calibrated axes and holds the current position.
///
/// Not thread-safe; owned by the sampling loop.
#[derive(Debug, Clone)]
pub struct PositionMapper {
    descriptor: AxisDescriptor,
    calibration: AxisCalibration,
    mode: NormalizationMode,
    position: NormalizedPosition,
}

impl PositionMapper {
    /// Starts with every axis at 0.
    #[must_use]
    pub fn new(
        descriptor: AxisDescriptor,
        calibration: AxisCalibration,
        mode: NormalizationMode,
    ) -> Self {
        Self {
            descriptor,
            calibration,
            mode,
            position: NormalizedPosition::default(),
        }
    }

    #[must_use]
    pub fn position(&self) -> NormalizedPosition {
        self.position
    }

    #[must_use]
    pub fn calibration(&self) -> &AxisCalibration {
        &self.calibration
    }

    /// Updates the matching axis from an absolute event.
    ///
    /// Returns the axis that changed; every other event type or code is
    /// ignored.
    pub fn process_event(&mut self, event: &RawEvent) -> Option<LogicalAxis> {
        if event.event_type != EV_ABS {
            return None;
        }
        let axis = self.descriptor.axis_for(event.code)?;
        let value = self.calibration.normalize(axis, event.value, self.mode);
        self.position.set(axis, value);
        Some(axis)
    }
}
