//! # Stick Bridge Library
//!
//! Publish the position of an evdev joystick to a ground-control message bus.
//!
//! The bridge probes `/dev/input/eventN` for a device with the required
//! absolute axes, learns each axis's native range, then samples the device at
//! a fixed period and broadcasts `dl JOYSTICK_RAW` messages for one aircraft.

pub mod bus;
pub mod config;
pub mod controller;
pub mod error;
pub mod sampler;
