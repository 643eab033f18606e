//! # Transit Sign Application Entry Point
//!
//! This binary wires the library to real devices: it loads the configuration,
//! picks a panel, builds the network, telemetry and departures clients, runs
//! the boot sequence and then hands control to the scheduler for good.
//!
//! ## Output modes
//! - `--stdout`: development mode, every page is printed to the terminal in
//!   true color
//! - default with the `simulator` feature: an embedded-graphics simulator
//!   window at panel resolution
//! - default without it: falls back to terminal output
//!
//! `--config <path>` overrides the default `transit-sign.toml`.


use std::env;
use std::path::PathBuf;

use transit_sign_lib::{
    boot::boot,
    clock::wait_for_clock_sync,
    config::{Config, DEFAULT_CONFIG_PATH},
    connectivity::Connectivity,
    departures::HttpDepartureSource,
    network::HostNetwork,
    panel::{ConsolePanel, Panel},
    scheduler::{Scheduler, Timing},
    telemetry::MqttTelemetry,
};

/// Command line options
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Args {
    /// Print pages to the terminal instead of a panel
    pub development_mode: bool,
    pub config_path: PathBuf,
}

impl Default for Args {
    fn default() -> Self {
        Self {
            development_mode: false,
            config_path: PathBuf::from(DEFAULT_CONFIG_PATH),
        }
    }
}

/// Parse arguments (without the program name). Unknown flags are ignored
/// with a warning.
pub fn parse_args<I>(args: I) -> Args
where
    I: IntoIterator<Item = String>,
{
    let mut parsed = Args::default();
    let mut args = args.into_iter();

    while let Some(arg) = args.next() {
        if arg == "--stdout" {
            parsed.development_mode = true;
        } else if arg == "--config" {
            match args.next() {
                Some(path) => parsed.config_path = PathBuf::from(path),
                None => tracing::warn!("--config needs a path, using {}", DEFAULT_CONFIG_PATH),
            }
        } else if let Some(path) = arg.strip_prefix("--config=") {
            parsed.config_path = PathBuf::from(path);
        } else {
            tracing::warn!("Ignoring unknown argument: {}", arg);
        }
    }

    parsed
}

/// Stop making progress without exiting, so a supervisor does not restart
/// the process into the same failure.
fn halt() -> ! {
    tracing::error!("Halted");
    loop {
        std::thread::park();
    }
}

/// Network, plus telemetry when the configuration enables it.
///
/// Unreadable credentials disable telemetry rather than stopping the sign.
pub fn build_connectivity(config: &Config) -> Connectivity<HostNetwork, MqttTelemetry> {
    let connectivity = Connectivity::new(HostNetwork::for_api(&config.api.url));

    let Some(telemetry) = config.telemetry.as_ref().filter(|t| t.enabled) else {
        return connectivity;
    };

    match MqttTelemetry::from_config(telemetry) {
        Ok(link) => connectivity.with_telemetry(link, &telemetry.thing_name, &telemetry.log_topic),
        Err(e) => {
            tracing::error!("Telemetry setup failed, continuing without it: {}", e);
            connectivity
        }
    }
}

/// Boot, then run the scheduler forever.
async fn run<P: Panel>(mut panel: P, config: &Config) {
    let mut connectivity = build_connectivity(config);

    let report = boot(&mut panel, &mut connectivity, &config.wifi, wait_for_clock_sync()).await;
    tracing::info!(
        "Boot complete after {} association round(s)",
        report.association_rounds
    );

    let source = HttpDepartureSource::new(&config.api, &config.geo);
    let mut scheduler = Scheduler::new(source, panel, connectivity, Timing::from(&config.display));
    scheduler.run().await;
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_target(false).init();

    let args = parse_args(env::args().skip(1));

    let config = match Config::load_from_path(&args.config_path) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Config init failed: {}", e);
            halt();
        }
    };

    // One cooperative thread drives everything
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    if args.development_mode {
        rt.block_on(run(ConsolePanel::stdout(), &config));
        return Ok(());
    }

    #[cfg(feature = "simulator")]
    {
        use transit_sign_lib::panel::{simulator::SimulatorSurface, GraphicsPanel};

        let surface = SimulatorSurface::new(config.display.width, config.display.height);
        rt.block_on(run(GraphicsPanel::new(surface), &config));
    }

    #[cfg(not(feature = "simulator"))]
    {
        tracing::warn!(
            "No panel output compiled in. Rebuild with --features simulator for a window."
        );
        tracing::warn!("Showing pages on stdout instead:");
        rt.block_on(run(ConsolePanel::stdout(), &config));
    }

    Ok(())
}
