//! Network association on a Linux host.
//!
//! On the host the operating system owns the WiFi radio (wpa_supplicant or
//! NetworkManager joins the configured SSID). What the sign needs to know is
//! whether the network is usable, so association is checked by opening a TCP
//! connection to the departures API host.

use reqwest::Url;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::timeout;

use crate::connectivity::NetworkLink;

/// Upper bound on one reachability probe
const PROBE_TIMEOUT: Duration = Duration::from_millis(400);

/// Reachability-based association check.
#[derive(Debug, Clone)]
pub struct HostNetwork {
    /// `host:port` probed on each check, `None` when the API URL has no host
    probe: Option<String>,
}

impl HostNetwork {
    /// Probe the host and port of the departures API base URL.
    pub fn for_api(api_url: &str) -> Self {
        let probe = Url::parse(api_url).ok().and_then(|url| {
            let host = url.host_str()?.to_string();
            let port = url.port_or_known_default()?;
            Some(format!("{host}:{port}"))
        });
        Self { probe }
    }

    /// The `host:port` this link probes
    pub fn probe_target(&self) -> Option<&str> {
        self.probe.as_deref()
    }
}

impl NetworkLink for HostNetwork {
    async fn begin(&mut self, ssid: &str, _password: &str) {
        // Joining is the OS's job
        tracing::debug!("Expecting host network '{}' to be joined by the OS", ssid);
    }

    async fn is_associated(&mut self) -> bool {
        let Some(target) = self.probe.as_deref() else {
            return false;
        };
        matches!(
            timeout(PROBE_TIMEOUT, TcpStream::connect(target)).await,
            Ok(Ok(_))
        )
    }
}
