//! # Stick Bridge
//!
//! Fly a ground-control-stack aircraft with a USB joystick.
//!
//! Probes for a joystick, then publishes its aileron, elevator and throttle
//! axes on the ground-control bus until interrupted.
//!
//! # Exit status
//!
//! - `0` after Ctrl+C
//! - `1` on invalid arguments or configuration, when no suitable joystick is
//!   found, or when the bus cannot be joined
//!
//! # Examples
//!
//! ```bash
//! stick-bridge -a 5
//! stick-bridge -c config/default.toml -d /dev/input/event -v
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use stick_bridge::bus::udp::UdpTextBus;
use stick_bridge::config::Config;
use stick_bridge::controller::calibration::NormalizationMode;
use stick_bridge::controller::device::EvdevOpener;
use stick_bridge::controller::prober::DeviceProber;
use stick_bridge::sampler::{observe_settings, Sampler, SamplerSettings};

/// Log file name prefix inside `logging.log_dir`
const LOG_FILE_PREFIX: &str = "stick-bridge.log";

/// Command-line options
#[derive(Debug, Parser)]
#[command(
    name = "stick-bridge",
    version,
    about = "Publish joystick axes to the ground-control bus"
)]
struct Cli {
    /// Configuration file (TOML)
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Device path prefix; candidates are <PREFIX>0, <PREFIX>1, ...
    #[arg(short = 'd', long = "device-base", value_name = "PREFIX")]
    device_base: Option<String>,

    /// Target aircraft id
    #[arg(short, long, value_name = "ID")]
    aircraft_id: Option<u32>,

    /// Debug logging for the bridge
    #[arg(short, long)]
    verbose: bool,

    /// Ignored; kept so existing launch scripts keep working
    #[arg(short = 'o', hide = true)]
    dummy: bool,
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // --help and --version
            if !e.use_stderr() {
                e.exit();
            }
            let _ = e.print();
            return ExitCode::FAILURE;
        }
    };

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            return ExitCode::FAILURE;
        }
    };

    let _guard = init_logging(cli.verbose, config.logging.log_dir.as_deref());
    info!("Stick Bridge v{} starting...", env!("CARGO_PKG_VERSION"));

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to start runtime: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(config)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

/// Loads the config file (or defaults) and applies command-line overrides.
fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => Config::default(),
    };

    if let Some(base) = &cli.device_base {
        config.device.base_path = base.clone();
    }
    if let Some(id) = cli.aircraft_id {
        config.vehicle.aircraft_id = id;
    }

    config.validate().context("Invalid configuration")?;
    Ok(config)
}

/// Console logging, plus a daily file when `log_dir` is set.
///
/// The returned guard flushes the file writer on drop.
fn init_logging(verbose: bool, log_dir: Option<&str>) -> Option<WorkerGuard> {
    let default_directives = if verbose { "info,stick_bridge=debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives));

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (Some(fmt::layer().with_writer(writer).with_ansi(false)), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .with(file_layer)
        .init();

    guard
}

async fn run(config: Config) -> Result<()> {
    let session = DeviceProber::new(EvdevOpener, config.device.base_path.clone())
        .with_max_candidates(config.device.max_candidates)
        .with_mode(NormalizationMode::from_clamp(config.sampling.clamp))
        .probe()?;

    let broadcast = config.broadcast_addr()?;
    let mut bus = UdpTextBus::bind(config.bus.listen_port, broadcast, &config.bus.application_name)
        .await
        .context("Failed to join the bus")?;
    observe_settings(&mut bus)?;

    let settings = SamplerSettings::new(config.vehicle.aircraft_id, &config.sampling);
    Sampler::new(session, bus, settings).run().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use std::io::Write;

    fn parse(args: &[&str]) -> std::result::Result<Cli, clap::Error> {
        Cli::try_parse_from(std::iter::once("stick-bridge").chain(args.iter().copied()))
    }

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_cli_legacy_dummy_option() {
        let cli = parse(&["-o"]).unwrap();
        assert!(cli.dummy);
        assert!(cli.aircraft_id.is_none());
    }

    #[test]
    fn test_cli_overrides() {
        let cli = parse(&["-a", "12", "-d", "/tmp/event", "-v"]).unwrap();
        let config = load_config(&cli).unwrap();
        assert_eq!(config.vehicle.aircraft_id, 12);
        assert_eq!(config.device.base_path, "/tmp/event");
        assert!(cli.verbose);
    }

    #[test]
    fn test_cli_rejects_bad_arguments() {
        assert!(parse(&["-a", "twelve"]).is_err());
        assert!(parse(&["-a", "-3"]).is_err());
        assert!(parse(&["--unknown"]).is_err());
    }

    #[test]
    fn test_out_of_range_aircraft_id_fails_validation() {
        let cli = parse(&["-a", "256"]).unwrap();
        assert!(load_config(&cli).is_err());
    }

    #[test]
    fn test_cli_overrides_config_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[vehicle]\naircraft_id = 4\n[sampling]\nperiod_ms = 50").unwrap();

        let path = file.path().to_str().unwrap().to_string();
        let from_file = load_config(&parse(&["-c", path.as_str()]).unwrap()).unwrap();
        assert_eq!(from_file.vehicle.aircraft_id, 4);
        assert_eq!(from_file.sampling.period_ms, 50);

        let overridden = load_config(&parse(&["-c", path.as_str(), "-a", "9"]).unwrap()).unwrap();
        assert_eq!(overridden.vehicle.aircraft_id, 9);
        assert_eq!(overridden.sampling.period_ms, 50);
    }

    #[test]
    fn test_missing_config_file() {
        let cli = parse(&["-c", "/nonexistent/stick-bridge.toml"]).unwrap();
        let err = load_config(&cli).unwrap_err();
        assert!(format!("{:#}", err).contains("Failed to load config"));
    }
}
