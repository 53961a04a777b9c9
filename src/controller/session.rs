//! # Device Session
//!
//! The single owner of the accepted device, its calibration and the current
//! normalized position. Built by the prober, then driven by the sampling loop
//! one tick at a time.

use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::calibration::AxisCalibration;
use super::device::InputDevice;
use super::mapper::{NormalizedPosition, PositionMapper};

/// Name reported for devices that do not provide one.
pub const UNKNOWN_DEVICE_NAME: &str = "Unknown";

/// Outcome of draining the device queue once.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainReport {
    /// Events read from the device, of any type.
    pub events: usize,
    /// Events that updated a logical axis.
    pub updates: usize,
    /// The drain stopped on a read error other than would-block.
    pub read_error: bool,
}

/// An opened, calibrated input device and its current position.
pub struct DeviceSession<D> {
    device: D,
    path: PathBuf,
    name: String,
    mapper: PositionMapper,
}

impl<D: InputDevice> DeviceSession<D> {
    pub fn new(device: D, path: PathBuf, mapper: PositionMapper) -> Self {
        let name = device.name().unwrap_or(UNKNOWN_DEVICE_NAME).to_string();
        Self {
            device,
            path,
            name,
            mapper,
        }
    }

    /// Path the device was opened from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Human-readable device name.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn calibration(&self) -> &AxisCalibration {
        self.mapper.calibration()
    }

    /// Latest position; unchanged until new axis events arrive.
    pub fn position(&self) -> NormalizedPosition {
        self.mapper.position()
    }

    /// Applies every event currently queued on the device.
    ///
    /// Reads until the queue reports would-block. Any other read error ends
    /// the drain for this tick and is otherwise ignored; events already read
    /// keep their effect.
    pub fn drain_events(&mut self) -> DrainReport {
        let mut report = DrainReport::default();

        loop {
            match self.device.fetch_events() {
                Ok(batch) if batch.is_empty() => break,
                Ok(batch) => {
                    report.events += batch.len();
                    for event in &batch {
                        if self.mapper.process_event(event).is_some() {
                            report.updates += 1;
                        }
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(e) => {
                    debug!("Read from {} failed: {}", self.path.display(), e);
                    report.read_error = true;
                    break;
                }
            }
        }

        report
    }
}

impl<D> std::fmt::Debug for DeviceSession<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceSession")
            .field("path", &self.path)
            .field("name", &self.name)
            .field("position", &self.mapper.position())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::calibration::{AxisRange, NormalizationMode};
    use crate::controller::device::mocks::*;
    use crate::controller::mapper::{AxisDescriptor, RawEvent, AXIS_COUNT};

    fn session_with(device: FakeDevice) -> DeviceSession<FakeDevice> {
        let calibration = AxisCalibration::new([AxisRange::new(0, 255); AXIS_COUNT]).unwrap();
        let mapper = PositionMapper::new(
            AxisDescriptor::default(),
            calibration,
            NormalizationMode::Unclamped,
        );
        DeviceSession::new(device, PathBuf::from("/dev/input/event3"), mapper)
    }

    #[test]
    fn test_session_metadata() {
        let session = session_with(FakeDevice::joystick());
        assert_eq!(session.name(), "Fake Joystick");
        assert_eq!(session.path(), Path::new("/dev/input/event3"));
        assert_eq!(session.position(), NormalizedPosition::default());
    }

    #[test]
    fn test_unnamed_device_is_unknown() {
        let mut device = FakeDevice::joystick();
        device.name = None;
        let session = session_with(device);
        assert_eq!(session.name(), UNKNOWN_DEVICE_NAME);
    }

    #[test]
    fn test_drain_empty_queue() {
        let mut session = session_with(FakeDevice::joystick());
        let report = session.drain_events();
        assert_eq!(report, DrainReport::default());
    }

    #[test]
    fn test_drain_reads_every_batch() {
        let device = FakeDevice::joystick();
        let queue = device.event_queue();
        let mut session = session_with(device);

        push_batch(&queue, vec![RawEvent::absolute(AxisDescriptor::AILERON, 0)]);
        push_batch(
            &queue,
            vec![
                RawEvent::absolute(AxisDescriptor::THROTTLE, 255),
                RawEvent::new(0x00, 0, 0),
            ],
        );

        let report = session.drain_events();
        assert_eq!(report.events, 3);
        assert_eq!(report.updates, 2);
        assert!(!report.read_error);
        assert_eq!(session.position().as_array(), [-127, 0, 127]);
        assert!(queue.lock().unwrap().is_empty());
    }

    #[test]
    fn test_drain_last_value_wins() {
        let device = FakeDevice::joystick();
        let queue = device.event_queue();
        let mut session = session_with(device);

        push_batch(&queue, vec![RawEvent::absolute(AxisDescriptor::ELEVATOR, 0)]);
        push_batch(&queue, vec![RawEvent::absolute(AxisDescriptor::ELEVATOR, 255)]);
        push_batch(&queue, vec![RawEvent::absolute(AxisDescriptor::ELEVATOR, 129)]);

        session.drain_events();
        assert_eq!(session.position().as_array(), [0, 1, 0]);
    }

    #[test]
    fn test_drain_stops_on_read_error() {
        let device = FakeDevice::joystick();
        let queue = device.event_queue();
        let mut session = session_with(device);

        push_batch(&queue, vec![RawEvent::absolute(AxisDescriptor::AILERON, 255)]);
        push_error(&queue, io::ErrorKind::Other);
        push_batch(&queue, vec![RawEvent::absolute(AxisDescriptor::AILERON, 0)]);

        let report = session.drain_events();
        assert!(report.read_error);
        assert_eq!(session.position().as_array(), [127, 0, 0]);

        // The rest is picked up on the next drain
        let report = session.drain_events();
        assert!(!report.read_error);
        assert_eq!(session.position().as_array(), [-127, 0, 0]);
    }

    #[test]
    fn test_drain_without_events_keeps_position() {
        let device = FakeDevice::joystick();
        let queue = device.event_queue();
        let mut session = session_with(device);

        push_batch(&queue, vec![RawEvent::absolute(AxisDescriptor::THROTTLE, 200)]);
        session.drain_events();
        let before = session.position();

        session.drain_events();
        assert_eq!(session.position(), before);
    }
}
