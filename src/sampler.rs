//! # Sampling Loop
//!
//! Once per period: drain the device, publish the current position to the
//! bus. Inbound bus messages are dispatched between ticks on the same task,
//! so a tick and an inbound handler never run at the same time.

use std::time::Duration;

use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, trace};

use crate::bus::gateway::BusGateway;
use crate::bus::message::{ControlMessage, MessagePattern, SettingCommand};
use crate::config::SamplingConfig;
use crate::controller::device::InputDevice;
use crate::controller::session::DeviceSession;
use crate::error::Result;

/// Timing and addressing of the sampling loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SamplerSettings {
    pub aircraft_id: u32,
    pub period: Duration,
    /// Ticks between status log lines
    pub status_interval_ticks: u64,
}

impl SamplerSettings {
    pub fn new(aircraft_id: u32, sampling: &SamplingConfig) -> Self {
        Self {
            aircraft_id,
            period: Duration::from_millis(sampling.period_ms),
            status_interval_ticks: sampling.status_interval_ticks.max(1),
        }
    }
}

/// Registers the `DL_SETTING` observer on `bus`.
///
/// Each command is logged and otherwise has no effect.
pub fn observe_settings<B: BusGateway + ?Sized>(bus: &mut B) -> Result<()> {
    bus.subscribe(
        MessagePattern::dl_setting()?,
        Box::new(|captures| {
            let cmd = SettingCommand::from_captures(captures);
            info!(
                "DL_SETTING from {}: aircraft {} index {} value {}",
                cmd.sender, cmd.aircraft_id, cmd.index, cmd.value
            );
        }),
    );
    Ok(())
}

/// Drives one device session and one bus.
pub struct Sampler<D, B> {
    session: DeviceSession<D>,
    bus: B,
    settings: SamplerSettings,
    ticks: u64,
    read_errors: u64,
}

impl<D: InputDevice, B: BusGateway> Sampler<D, B> {
    pub fn new(session: DeviceSession<D>, bus: B, settings: SamplerSettings) -> Self {
        Self {
            session,
            bus,
            settings,
            ticks: 0,
            read_errors: 0,
        }
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }

    /// Number of messages published so far.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// One tick: drain pending events, then publish exactly one message.
    ///
    /// Without new events the previous position is published again.
    pub fn tick(&mut self) -> ControlMessage {
        let report = self.session.drain_events();
        if report.read_error {
            self.read_errors += 1;
        }

        let message = ControlMessage::new(self.settings.aircraft_id, self.session.position());
        trace!("pos {}", message.position);
        self.bus.publish(&message);
        self.ticks += 1;

        if self.ticks % self.settings.status_interval_ticks == 0 {
            info!(
                "Published {} positions (last: {}, read errors: {})",
                self.ticks, message.position, self.read_errors
            );
        }

        message
    }

    /// Runs until Ctrl+C.
    ///
    /// The first tick fires immediately. Late ticks are delayed rather than
    /// bunched up.
    pub async fn run(mut self) -> Result<()> {
        let mut ticker = interval(self.settings.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            "Sampling {} every {:?} for aircraft {}",
            self.session.path().display(),
            self.settings.period,
            self.settings.aircraft_id
        );
        info!("Press Ctrl+C to exit");

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.tick();
                }

                result = self.bus.dispatch_next() => {
                    if let Err(e) = result {
                        debug!("Inbound bus error: {}", e);
                    }
                }

                _ = tokio::signal::ctrl_c() => {
                    info!("Received Ctrl+C, shutting down...");
                    info!("Total positions published: {}", self.ticks);
                    break;
                }
            }
        }

        Ok(())
    }
}

impl<D, B> std::fmt::Debug for Sampler<D, B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sampler")
            .field("session", &self.session)
            .field("settings", &self.settings)
            .field("ticks", &self.ticks)
            .finish_non_exhaustive()
    }
}
