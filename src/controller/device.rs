//! Trait abstraction for input device operations to enable testing
//!
//! [`InputDevice`] covers the handful of evdev operations the bridge needs:
//! the two capability bitmaps (`EVIOCGBIT` for `EV_KEY` and `EV_ABS`), the
//! per-axis range query (`EVIOCGABS`), the device name and a non-blocking
//! event read. [`EvdevDevice`] implements it on top of the `evdev` crate.

use std::fs::{File, OpenOptions};
use std::io;
use std::os::fd::OwnedFd;
use std::os::unix::fs::OpenOptionsExt;
use std::path::Path;

use evdev::Device;

use super::calibration::AxisRange;
use super::capabilities::CapabilitySet;
use super::mapper::RawEvent;

/// Operations the prober and sampling loop perform on an opened device.
pub trait InputDevice {
    /// Human-readable device name, if the driver reports one.
    fn name(&self) -> Option<&str>;

    /// Supported `EV_KEY` codes.
    fn key_capabilities(&self) -> io::Result<CapabilitySet>;

    /// Supported `EV_ABS` codes.
    fn absolute_capabilities(&self) -> io::Result<CapabilitySet>;

    /// Native value range of absolute axis `code`.
    fn axis_range(&self, code: u16) -> io::Result<AxisRange>;

    /// Reads the next batch of pending events.
    ///
    /// Never blocks: fails with [`io::ErrorKind::WouldBlock`] once the
    /// kernel queue is empty.
    fn fetch_events(&mut self) -> io::Result<Vec<RawEvent>>;
}

/// Opens candidate device paths.
#[cfg_attr(test, mockall::automock(type Device = mocks::FakeDevice;))]
pub trait DeviceOpener {
    type Device: InputDevice;

    /// Opens `path` read-only and non-blocking.
    fn open(&self, path: &Path) -> io::Result<Self::Device>;
}

/// Input device backed by a Linux evdev node.
pub struct EvdevDevice {
    device: Device,
}

impl std::fmt::Debug for EvdevDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EvdevDevice")
            .field("name", &self.device.name())
            .finish_non_exhaustive()
    }
}

impl EvdevDevice {
    /// Opens an evdev node read-only and non-blocking.
    ///
    /// # Errors
    ///
    /// Returns error if the node is missing, unreadable or not an evdev device.
    pub fn open<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let file = open_read_only(path.as_ref())?;
        let device = Device::from_fd(OwnedFd::from(file))?;
        Ok(Self { device })
    }
}

impl InputDevice for EvdevDevice {
    fn name(&self) -> Option<&str> {
        self.device.name()
    }

    fn key_capabilities(&self) -> io::Result<CapabilitySet> {
        // evdev caches the EVIOCGBIT results when the device is opened
        Ok(self
            .device
            .supported_keys()
            .map(|keys| keys.iter().map(|key| key.code()).collect())
            .unwrap_or_default())
    }

    fn absolute_capabilities(&self) -> io::Result<CapabilitySet> {
        Ok(self
            .device
            .supported_absolute_axes()
            .map(|axes| axes.iter().map(|axis| axis.0).collect())
            .unwrap_or_default())
    }

    fn axis_range(&self, code: u16) -> io::Result<AxisRange> {
        let state = self.device.get_abs_state()?;
        let info = state.get(usize::from(code)).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("absolute axis code {} out of range", code),
            )
        })?;
        Ok(AxisRange::new(info.minimum, info.maximum))
    }

    fn fetch_events(&mut self) -> io::Result<Vec<RawEvent>> {
        Ok(self.device.fetch_events()?.map(RawEvent::from).collect())
    }
}

/// Opens [`EvdevDevice`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct EvdevOpener;

impl DeviceOpener for EvdevOpener {
    type Device = EvdevDevice;

    fn open(&self, path: &Path) -> io::Result<EvdevDevice> {
        EvdevDevice::open(path)
    }
}

/// Opens `path` for reading only, with `O_NONBLOCK` set.
fn open_read_only(path: &Path) -> io::Result<File> {
    OpenOptions::new()
        .read(true)
        .custom_flags(libc::O_NONBLOCK)
        .open(path)
}
