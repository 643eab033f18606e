//! Startup sequence.
//!
//! Runs once before the scheduler takes over:
//! 1. Join the network, showing an error page and retrying forever on failure
//! 2. Show the connected page
//! 3. Wait (bounded) for the wall clock to be set
//! 4. Bring up telemetry, if enabled
//! 5. Show a warnings page for 3 s if the clock or telemetry failed
//!
//! Only the network is mandatory. A sign with a wrong clock or no telemetry
//! still shows departures.

use std::future::Future;
use std::time::Duration;

use crate::config::WifiConfig;
use crate::connectivity::{Connectivity, NetworkLink, Severity, TelemetryLink};
use crate::panel::Panel;
use crate::renderer::{render_startup_warnings, render_wifi_connected, render_wifi_error};
use crate::wait::{hold, POLL_TICK};

/// Error page hold between association rounds
pub const WIFI_ERROR_HOLD: Duration = Duration::from_secs(5);
/// Warnings page hold
pub const WARNINGS_HOLD: Duration = Duration::from_secs(3);

/// Outcome of the startup sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BootReport {
    /// Association rounds it took to join the network (at least 1)
    pub association_rounds: usize,
    pub clock_synced: bool,
    /// `None` when telemetry is disabled
    pub telemetry_connected: Option<bool>,
}

impl BootReport {
    pub fn clock_failed(&self) -> bool {
        !self.clock_synced
    }

    pub fn telemetry_failed(&self) -> bool {
        self.telemetry_connected == Some(false)
    }
}

/// Bring the sign from power-on to ready.
///
/// `clock_sync` resolves to whether the wall clock got set; it is only polled
/// once the network is up.
pub async fn boot<P, N, T, C>(
    panel: &mut P,
    connectivity: &mut Connectivity<N, T>,
    wifi: &WifiConfig,
    clock_sync: C,
) -> BootReport
where
    P: Panel,
    N: NetworkLink,
    T: TelemetryLink,
    C: Future<Output = bool>,
{
    let mut association_rounds = 1;
    while !connectivity.associate(&wifi.ssid, &wifi.password).await {
        render_wifi_error(panel, &wifi.ssid);
        hold(WIFI_ERROR_HOLD, POLL_TICK, &mut ()).await;
        association_rounds += 1;
    }
    render_wifi_connected(panel, &wifi.ssid);

    let clock_synced = clock_sync.await;
    if clock_synced {
        connectivity.log(Severity::Info, "NTP sync successful");
    } else {
        connectivity.log(Severity::Error, "NTP sync failed");
    }

    let telemetry_connected = if connectivity.telemetry_enabled() {
        let connected = connectivity.connect_telemetry().await;
        if connected {
            connectivity.log(Severity::Info, "Telemetry connected");
        } else {
            connectivity.log(Severity::Error, "Telemetry connection failed");
        }
        Some(connected)
    } else {
        None
    };

    let report = BootReport {
        association_rounds,
        clock_synced,
        telemetry_connected,
    };

    if render_startup_warnings(panel, report.clock_failed(), report.telemetry_failed()) {
        hold(WARNINGS_HOLD, POLL_TICK, &mut ()).await;
    }

    panel.clear();
    panel.set_cursor(0, 0);
    report
}
