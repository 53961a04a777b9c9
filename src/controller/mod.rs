//! # Controller Module
//!
//! Joystick input handling.
//!
//! This module handles:
//! - Joystick discovery and capability checks via evdev
//! - Reading each axis's native range (calibration)
//! - Draining pending input events without blocking
//! - Normalizing raw axis values to `[-127, 127]`

pub mod calibration;
pub mod capabilities;
pub mod device;
pub mod mapper;
pub mod prober;
pub mod session;
