//! # Error Types
//!
//! Custom error types for Stick Bridge using `thiserror`.
//!
//! Failures come in two tiers. A [`Rejection`] disqualifies one candidate
//! device during probing and never leaves the prober. Everything that does
//! leave the core is a [`StickBridgeError`].

use thiserror::Error;

/// Main error type for Stick Bridge
#[derive(Debug, Error)]
pub enum StickBridgeError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Every candidate device was tried and rejected
    #[error("no suitable joystick found ({candidates} candidates tried at {base_path}N)")]
    NoSuitableDevice {
        /// Path prefix the candidate index was appended to
        base_path: String,
        /// Number of candidates tried
        candidates: usize,
    },

    /// Message bus errors
    #[error("Bus error: {0}")]
    Bus(String),

    /// Inbound message pattern that does not compile
    #[error("Invalid message pattern: {0}")]
    Pattern(#[from] regex::Error),
}

/// Why a candidate device was turned down by the prober.
#[derive(Debug, Error)]
pub enum Rejection {
    #[error("can not open device: {0}")]
    Open(#[source] std::io::Error),

    #[error("can not get {kind} capability bits: {source}")]
    CapabilityQuery {
        kind: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("no suitable {axis} axis found (code {code})")]
    MissingAxis { axis: &'static str, code: u16 },

    #[error("can not get {axis} axis value range: {source}")]
    RangeQuery {
        axis: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("bad {axis} axis value range ({min},{max})")]
    BadRange {
        axis: &'static str,
        min: i32,
        max: i32,
    },
}

/// Result type alias for Stick Bridge
pub type Result<T> = std::result::Result<T, StickBridgeError>;
