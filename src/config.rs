//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.
//!
//! Every field has a default, so an empty file (or no file at all) yields a
//! working bridge for aircraft 1 that probes `/dev/input/event0..14`.

use serde::de::Error;
use serde::Deserialize;
use std::fs;
use std::net::SocketAddr;
use std::path::Path;

use crate::error::{Result, StickBridgeError};

/// Main configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub device: DeviceConfig,
    #[serde(default)]
    pub vehicle: VehicleConfig,
    #[serde(default)]
    pub sampling: SamplingConfig,
    #[serde(default)]
    pub bus: BusConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Input device discovery configuration
#[derive(Debug, Deserialize, Clone)]
pub struct DeviceConfig {
    /// Candidate paths are `{base_path}{index}`
    #[serde(default = "default_base_path")]
    pub base_path: String,

    #[serde(default = "default_max_candidates")]
    pub max_candidates: usize,
}

/// Target vehicle configuration
#[derive(Debug, Deserialize, Clone)]
pub struct VehicleConfig {
    #[serde(default = "default_aircraft_id")]
    pub aircraft_id: u32,
}

/// Sampling loop configuration
#[derive(Debug, Deserialize, Clone)]
pub struct SamplingConfig {
    #[serde(default = "default_period_ms")]
    pub period_ms: u64,

    /// Clamp normalized positions to [-127, 127]
    #[serde(default)]
    pub clamp: bool,

    #[serde(default = "default_status_interval_ticks")]
    pub status_interval_ticks: u64,
}

/// Message bus configuration
#[derive(Debug, Deserialize, Clone)]
pub struct BusConfig {
    #[serde(default = "default_broadcast_address")]
    pub broadcast_address: String,

    #[serde(default = "default_listen_port")]
    pub listen_port: u16,

    #[serde(default = "default_application_name")]
    pub application_name: String,
}

/// Log output configuration
#[derive(Debug, Deserialize, Clone, Default)]
pub struct LoggingConfig {
    /// Directory for daily rolling log files; stdout only when unset
    #[serde(default)]
    pub log_dir: Option<String>,
}

// Default value functions
fn default_base_path() -> String { "/dev/input/event".to_string() }
fn default_max_candidates() -> usize { 15 }

fn default_aircraft_id() -> u32 { 1 }

fn default_period_ms() -> u64 { 100 }
fn default_status_interval_ticks() -> u64 { 600 }

fn default_broadcast_address() -> String { "127.255.255.255:2010".to_string() }
fn default_listen_port() -> u16 { 2010 }
fn default_application_name() -> String { "IvyCtrlJoystick".to_string() }

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            base_path: default_base_path(),
            max_candidates: default_max_candidates(),
        }
    }
}

impl Default for VehicleConfig {
    fn default() -> Self {
        Self { aircraft_id: default_aircraft_id() }
    }
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            period_ms: default_period_ms(),
            clamp: false,
            status_interval_ticks: default_status_interval_ticks(),
        }
    }
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            broadcast_address: default_broadcast_address(),
            listen_port: default_listen_port(),
            application_name: default_application_name(),
        }
    }
}

fn invalid(msg: impl std::fmt::Display) -> StickBridgeError {
    StickBridgeError::Config(toml::de::Error::custom(msg))
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use stick_bridge::config::Config;
    ///
    /// let config = Config::load("config/default.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Parsed bus broadcast address.
    ///
    /// Only fails on a config that skipped validation.
    pub fn broadcast_addr(&self) -> Result<SocketAddr> {
        self.bus.broadcast_address.parse().map_err(|_| {
            invalid(format!(
                "broadcast_address '{}' is not a valid socket address",
                self.bus.broadcast_address
            ))
        })
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range
    pub fn validate(&self) -> Result<()> {
        if self.device.base_path.is_empty() {
            return Err(invalid("device base_path cannot be empty"));
        }

        if self.device.max_candidates == 0 || self.device.max_candidates > 64 {
            return Err(invalid("max_candidates must be between 1 and 64"));
        }

        // Aircraft ids are a single byte on the datalink
        if self.vehicle.aircraft_id > 255 {
            return Err(invalid("aircraft_id must be between 0 and 255"));
        }

        if self.sampling.period_ms == 0 || self.sampling.period_ms > 10000 {
            return Err(invalid("period_ms must be between 1 and 10000"));
        }

        if self.sampling.status_interval_ticks == 0 {
            return Err(invalid("status_interval_ticks must be greater than 0"));
        }

        self.broadcast_addr()?;

        if self.bus.application_name.trim().is_empty() {
            return Err(invalid("bus application_name cannot be empty"));
        }

        if let Some(dir) = &self.logging.log_dir {
            if dir.is_empty() {
                return Err(invalid("logging log_dir cannot be empty when set"));
            }
        }

        Ok(())
    }
}
