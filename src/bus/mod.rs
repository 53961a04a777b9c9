//! # Bus Module
//!
//! Ground-control message bus.
//!
//! This module handles:
//! - The outbound `JOYSTICK_RAW` and inbound `DL_SETTING` message formats
//! - The [`gateway::BusGateway`] seam used by the sampling loop
//! - A UDP broadcast transport

pub mod gateway;
pub mod message;
pub mod udp;
