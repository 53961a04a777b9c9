//! # Device Prober
//!
//! Finds the first usable joystick among `{base_path}0 .. {base_path}N-1`.
//!
//! A candidate is accepted when it:
//! 1. opens read-only and non-blocking,
//! 2. answers both capability queries (`EV_KEY`, `EV_ABS`),
//! 3. exposes every required absolute axis (rudder, aileron, elevator, throttle),
//! 4. reports a valid `min < max` range for each sampled axis.
//!
//! Any failure rejects the candidate and probing moves on. Only running out
//! of candidates is an error.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::calibration::{calibrate, NormalizationMode};
use super::device::{DeviceOpener, InputDevice};
use super::mapper::{AxisDescriptor, PositionMapper};
use super::session::DeviceSession;
use crate::error::{Rejection, Result, StickBridgeError};

/// Candidate limit used when none is configured.
pub const DEFAULT_MAX_CANDIDATES: usize = 15;

/// Candidate device paths in probing order.
///
/// # Examples
///
/// ```
/// use stick_bridge::controller::prober::candidate_paths;
///
/// let paths: Vec<_> = candidate_paths("/dev/input/event", 2).collect();
/// assert_eq!(paths[1].to_str(), Some("/dev/input/event1"));
/// ```
pub fn candidate_paths(
    base_path: &str,
    max_candidates: usize,
) -> impl Iterator<Item = PathBuf> + '_ {
    (0..max_candidates).map(move |index| PathBuf::from(format!("{}{}", base_path, index)))
}

/// Checks that the device answers both capability queries and exposes every
/// required absolute axis.
///
/// # Errors
///
/// - [`Rejection::CapabilityQuery`]: a bitmap query failed
/// - [`Rejection::MissingAxis`]: a required axis is absent
pub fn check_capabilities<D: InputDevice + ?Sized>(
    device: &D,
    descriptor: &AxisDescriptor,
) -> std::result::Result<(), Rejection> {
    let keys = device
        .key_capabilities()
        .map_err(|source| Rejection::CapabilityQuery { kind: "key", source })?;
    let axes = device
        .absolute_capabilities()
        .map_err(|source| Rejection::CapabilityQuery { kind: "abs", source })?;

    debug!("Device reports {} keys and {} absolute axes", keys.len(), axes.len());

    for (axis, code) in descriptor.required_axes() {
        if !axes.supports(code) {
            return Err(Rejection::MissingAxis { axis, code });
        }
    }
    Ok(())
}

/// Discovers and calibrates the input device.
#[derive(Debug, Clone)]
pub struct DeviceProber<O> {
    opener: O,
    base_path: String,
    max_candidates: usize,
    descriptor: AxisDescriptor,
    mode: NormalizationMode,
}

impl<O: DeviceOpener> DeviceProber<O> {
    /// Creates a prober over `{base_path}0 ..` with the default axis layout,
    /// unclamped normalization and [`DEFAULT_MAX_CANDIDATES`] candidates.
    pub fn new(opener: O, base_path: impl Into<String>) -> Self {
        Self {
            opener,
            base_path: base_path.into(),
            max_candidates: DEFAULT_MAX_CANDIDATES,
            descriptor: AxisDescriptor::default(),
            mode: NormalizationMode::default(),
        }
    }

    #[must_use]
    pub fn with_max_candidates(mut self, max_candidates: usize) -> Self {
        self.max_candidates = max_candidates;
        self
    }

    #[must_use]
    pub fn with_mode(mut self, mode: NormalizationMode) -> Self {
        self.mode = mode;
        self
    }

    #[must_use]
    pub fn with_descriptor(mut self, descriptor: AxisDescriptor) -> Self {
        self.descriptor = descriptor;
        self
    }

    /// Tries candidates in index order and returns the first accepted one.
    ///
    /// # Errors
    ///
    /// Returns [`StickBridgeError::NoSuitableDevice`] once every candidate
    /// has been rejected.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use stick_bridge::controller::device::EvdevOpener;
    /// use stick_bridge::controller::prober::DeviceProber;
    ///
    /// let session = DeviceProber::new(EvdevOpener, "/dev/input/event").probe()?;
    /// println!("Using {} at {}", session.name(), session.path().display());
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn probe(&self) -> Result<DeviceSession<O::Device>> {
        for path in candidate_paths(&self.base_path, self.max_candidates) {
            match self.try_candidate(&path) {
                Ok(session) => {
                    info!("Input device name: \"{}\"", session.name());
                    info!("Using input device at {}", session.path().display());
                    return Ok(session);
                }
                Err(rejection) => {
                    debug!("Rejected {}: {}", path.display(), rejection);
                }
            }
        }

        Err(StickBridgeError::NoSuitableDevice {
            base_path: self.base_path.clone(),
            candidates: self.max_candidates,
        })
    }

    /// Opens, gates and calibrates a single candidate.
    ///
    /// # Errors
    ///
    /// Returns the [`Rejection`] explaining why the candidate is unusable.
    pub fn try_candidate(
        &self,
        path: &Path,
    ) -> std::result::Result<DeviceSession<O::Device>, Rejection> {
        let device = self.opener.open(path).map_err(Rejection::Open)?;
        check_capabilities(&device, &self.descriptor)?;
        let calibration = calibrate(&device, &self.descriptor)?;

        let mapper = PositionMapper::new(self.descriptor.clone(), calibration, self.mode);
        Ok(DeviceSession::new(device, path.to_path_buf(), mapper))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::calibration::AxisRange;
    use crate::controller::device::mocks::{push_batch, EventQueue, FakeDevice};
    use crate::controller::device::MockDeviceOpener;
    use crate::controller::mapper::{LogicalAxis, RawEvent};
    use mockall::predicate::eq;
    use std::collections::VecDeque;
    use std::io;
    use std::sync::{Arc, Mutex};

    fn not_found() -> io::Error {
        io::Error::new(io::ErrorKind::NotFound, "No such file or directory")
    }

    #[test]
    fn test_candidate_paths() {
        let paths: Vec<_> = candidate_paths("/dev/input/event", 15).collect();
        assert_eq!(paths.len(), 15);
        assert_eq!(paths[0], PathBuf::from("/dev/input/event0"));
        assert_eq!(paths[14], PathBuf::from("/dev/input/event14"));
    }

    #[test]
    fn test_check_capabilities_accepts_joystick() {
        let device = FakeDevice::joystick();
        assert!(check_capabilities(&device, &AxisDescriptor::default()).is_ok());
    }

    #[test]
    fn test_check_capabilities_requires_every_axis() {
        for code in [
            AxisDescriptor::RUDDER,
            AxisDescriptor::AILERON,
            AxisDescriptor::ELEVATOR,
            AxisDescriptor::THROTTLE,
        ] {
            let mut device = FakeDevice::without_axis(code);
            // Plenty of other axes must not compensate for the missing one
            for extra in 0x06..0x20 {
                device.axes.insert(extra);
            }
            match check_capabilities(&device, &AxisDescriptor::default()) {
                Err(Rejection::MissingAxis { code: missing, .. }) => assert_eq!(missing, code),
                other => panic!("Expected MissingAxis for {}, got: {:?}", code, other),
            }
        }
    }

    #[test]
    fn test_check_capabilities_key_query_failure() {
        let mut device = FakeDevice::joystick();
        device.fail_key_query = true;
        let result = check_capabilities(&device, &AxisDescriptor::default());
        assert!(matches!(result, Err(Rejection::CapabilityQuery { kind: "key", .. })));
    }

    #[test]
    fn test_check_capabilities_abs_query_failure() {
        let mut device = FakeDevice::joystick();
        device.fail_abs_query = true;
        let result = check_capabilities(&device, &AxisDescriptor::default());
        assert!(matches!(result, Err(Rejection::CapabilityQuery { kind: "abs", .. })));
    }

    #[test]
    fn test_probe_accepts_first_device() {
        let mut opener = MockDeviceOpener::new();
        opener
            .expect_open()
            .with(eq(PathBuf::from("/dev/input/event0")))
            .times(1)
            .returning(|_| Ok(FakeDevice::joystick()));

        let session = DeviceProber::new(opener, "/dev/input/event").probe().unwrap();
        assert_eq!(session.path(), Path::new("/dev/input/event0"));
        assert_eq!(session.name(), "Fake Joystick");
    }

    #[test]
    fn test_probe_skips_rejected_candidates() {
        let mut opener = MockDeviceOpener::new();
        opener.expect_open().times(4).returning(|path| match path.to_str() {
            Some("/dev/input/event0") => Err(not_found()),
            Some("/dev/input/event1") => Ok(FakeDevice::without_axis(AxisDescriptor::THROTTLE)),
            Some("/dev/input/event2") => Ok(FakeDevice::joystick()
                .with_range(AxisDescriptor::ELEVATOR, AxisRange::new(5, 5))),
            _ => Ok(FakeDevice::joystick()
                .with_range(AxisDescriptor::ELEVATOR, AxisRange::new(0, 1023))),
        });

        let session = DeviceProber::new(opener, "/dev/input/event").probe().unwrap();
        assert_eq!(session.path(), Path::new("/dev/input/event3"));
        assert_eq!(
            session.calibration().range(LogicalAxis::Elevator),
            AxisRange::new(0, 1023)
        );
    }

    #[test]
    fn test_probe_exhaustion() {
        let mut opener = MockDeviceOpener::new();
        opener.expect_open().times(15).returning(|_| Err(not_found()));

        let result = DeviceProber::new(opener, "/dev/input/event").probe();
        match result {
            Err(StickBridgeError::NoSuitableDevice { base_path, candidates }) => {
                assert_eq!(base_path, "/dev/input/event");
                assert_eq!(candidates, 15);
            }
            other => panic!("Expected NoSuitableDevice, got: {:?}", other),
        }
    }

    #[test]
    fn test_probe_never_accepts_bad_calibration() {
        let mut opener = MockDeviceOpener::new();
        opener.expect_open().times(4).returning(|_| {
            Ok(FakeDevice::joystick().with_range(AxisDescriptor::AILERON, AxisRange::new(10, -10)))
        });

        let result = DeviceProber::new(opener, "/dev/input/event")
            .with_max_candidates(4)
            .probe();
        assert!(matches!(result, Err(StickBridgeError::NoSuitableDevice { candidates: 4, .. })));
    }

    #[test]
    fn test_try_candidate_reports_open_failure() {
        let mut opener = MockDeviceOpener::new();
        opener.expect_open().returning(|_| Err(not_found()));

        let prober = DeviceProber::new(opener, "/dev/input/event");
        let result = prober.try_candidate(Path::new("/dev/input/event9"));
        assert!(matches!(result, Err(Rejection::Open(_))));
    }

    #[test]
    fn test_probe_uses_configured_mode() {
        let queue: EventQueue = Arc::new(Mutex::new(VecDeque::new()));
        let device_queue = Arc::clone(&queue);

        let mut opener = MockDeviceOpener::new();
        opener.expect_open().returning(move |_| {
            let mut device = FakeDevice::joystick();
            device.events = Arc::clone(&device_queue);
            Ok(device)
        });

        let mut session = DeviceProber::new(opener, "/dev/input/event")
            .with_mode(NormalizationMode::Clamped)
            .probe()
            .unwrap();

        push_batch(&queue, vec![RawEvent::absolute(AxisDescriptor::AILERON, 400)]);
        session.drain_events();
        assert_eq!(session.position().as_array(), [127, 0, 0]);
    }
}
