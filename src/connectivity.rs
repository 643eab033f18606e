//! # Connectivity Maintenance and Logging
//!
//! The sign keeps two independent links alive:
//!
//! - **Network association**: joined once at boot with a short bounded retry.
//!   The boot sequence loops on it forever, since the sign is useless offline.
//! - **Telemetry link**: an optional publish channel for log records. It is
//!   serviced on every scheduler iteration and every wait tick through
//!   [`Connectivity::maintain`], which reconnects with a single attempt when the
//!   link is down and otherwise runs the protocol keepalive. After a failed
//!   attempt, further attempts wait out [`RECONNECT_BACKOFF`].
//!
//! [`Connectivity::log`] is the one logging entry point for operational
//! events: it always writes to the console through `tracing`, then publishes a
//! JSON [`LogRecord`] when the telemetry link is enabled and connected.
//! Publishing is fire-and-forget; a failed publish is neither logged nor
//! reported, which keeps a broken link from feeding back into the logger.

use serde::Serialize;
use std::future::Future;
use std::time::Duration;
use tokio::time::{sleep, Instant};

use crate::wait::Upkeep;

/// Association checks before giving up on one attempt
pub const ASSOCIATION_ATTEMPTS: usize = 10;
/// Delay between association checks
pub const ASSOCIATION_RETRY: Duration = Duration::from_millis(500);
/// Minimum gap between telemetry connect attempts while the link is down
pub const RECONNECT_BACKOFF: Duration = Duration::from_secs(5);

/// Severity of a log record, as published on the wire.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Severity {
    Debug,
    Info,
    Warning,
    Error,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Debug => "DEBUG",
            Severity::Info => "INFO",
            Severity::Warning => "WARNING",
            Severity::Error => "ERROR",
        }
    }
}

/// Payload published to the telemetry log topic.
#[derive(Debug, Serialize)]
pub struct LogRecord<'a> {
    /// Unix seconds; meaningless until the wall clock has synced
    pub timestamp: i64,
    pub thing_name: &'a str,
    pub level: &'static str,
    pub message: &'a str,
}

/// The host's network association.
pub trait NetworkLink {
    /// Start joining the network; returns without waiting for the result.
    fn begin(&mut self, ssid: &str, password: &str) -> impl Future<Output = ()>;

    /// Whether the network is currently usable.
    fn is_associated(&mut self) -> impl Future<Output = bool>;
}

/// A publish channel for log records.
pub trait TelemetryLink {
    /// Whether the link currently reports a live session.
    fn is_connected(&self) -> bool;

    /// One bounded connection attempt. Must not retry internally.
    fn connect(&mut self) -> impl Future<Output = bool>;

    /// Protocol housekeeping (pings, acks). Must return promptly.
    fn keepalive(&mut self) -> impl Future<Output = ()>;

    /// Queue a message for delivery. `false` when it could not be queued.
    fn publish(&mut self, topic: &str, payload: Vec<u8>) -> bool;
}

/// Result of the most recent telemetry (re)connect attempt.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ReconnectOutcome {
    #[default]
    NotAttempted,
    Connected,
    Failed,
}

/// Snapshot of both links, for callers deciding what to show or publish.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ConnectivityState {
    pub wifi_associated: bool,
    pub telemetry_connected: bool,
    pub last_reconnect: ReconnectOutcome,
}

struct Telemetry<T> {
    link: T,
    thing_name: String,
    log_topic: String,
}

/// Owner of the network association and the telemetry link.
///
/// Built once at startup and passed by reference to whatever needs to log,
/// publish, or reconnect.
pub struct Connectivity<N, T> {
    network: N,
    telemetry: Option<Telemetry<T>>,
    wifi_associated: bool,
    last_reconnect: ReconnectOutcome,
    /// Earliest time the next reconnect may be tried, set after a failure
    retry_after: Option<Instant>,
}

impl<N: NetworkLink, T: TelemetryLink> Connectivity<N, T> {
    /// Connectivity with telemetry disabled.
    pub fn new(network: N) -> Self {
        Self {
            network,
            telemetry: None,
            wifi_associated: false,
            last_reconnect: ReconnectOutcome::NotAttempted,
            retry_after: None,
        }
    }

    /// Enable telemetry over `link`. `thing_name` is the durable device
    /// identity stamped on every record.
    pub fn with_telemetry(
        mut self,
        link: T,
        thing_name: impl Into<String>,
        log_topic: impl Into<String>,
    ) -> Self {
        self.telemetry = Some(Telemetry {
            link,
            thing_name: thing_name.into(),
            log_topic: log_topic.into(),
        });
        self
    }

    pub fn telemetry_enabled(&self) -> bool {
        self.telemetry.is_some()
    }

    pub fn state(&self) -> ConnectivityState {
        ConnectivityState {
            wifi_associated: self.wifi_associated,
            telemetry_connected: self
                .telemetry
                .as_ref()
                .is_some_and(|t| t.link.is_connected()),
            last_reconnect: self.last_reconnect,
        }
    }

    pub fn network(&self) -> &N {
        &self.network
    }

    pub fn telemetry_link(&self) -> Option<&T> {
        self.telemetry.as_ref().map(|t| &t.link)
    }

    pub fn telemetry_link_mut(&mut self) -> Option<&mut T> {
        self.telemetry.as_mut().map(|t| &mut t.link)
    }

    /// Join the network, checking up to [`ASSOCIATION_ATTEMPTS`] times.
    ///
    /// There is no delay after the final check, so a failed attempt takes
    /// `(ASSOCIATION_ATTEMPTS - 1) * ASSOCIATION_RETRY`.
    pub async fn associate(&mut self, ssid: &str, password: &str) -> bool {
        tracing::info!("Attempting to connect to SSID: {}", ssid);
        self.network.begin(ssid, password).await;

        for attempt in 0..ASSOCIATION_ATTEMPTS {
            if self.network.is_associated().await {
                tracing::info!("Connected to network");
                self.wifi_associated = true;
                return true;
            }
            if attempt + 1 < ASSOCIATION_ATTEMPTS {
                sleep(ASSOCIATION_RETRY).await;
            }
        }

        tracing::warn!("Network connection failed");
        self.wifi_associated = false;
        false
    }

    /// First telemetry connection at boot. `false` when disabled or refused.
    pub async fn connect_telemetry(&mut self) -> bool {
        let Some(telemetry) = self.telemetry.as_mut() else {
            tracing::info!("Telemetry disabled in config");
            return false;
        };

        tracing::info!("Connecting to telemetry broker as {}", telemetry.thing_name);
        let connected = telemetry.link.connect().await;
        self.record_attempt(connected);
        connected
    }

    /// Keep the telemetry link alive; cheap enough to call every tick.
    ///
    /// Returns `false` when telemetry is disabled, a reconnect attempt
    /// failed, or the link is down and still inside [`RECONNECT_BACKOFF`].
    /// Never blocks beyond one bounded connect attempt.
    pub async fn maintain(&mut self) -> bool {
        let connected = match self.telemetry.as_ref() {
            None => return false,
            Some(telemetry) => telemetry.link.is_connected(),
        };

        if !connected {
            if self.retry_after.is_some_and(|at| Instant::now() < at) {
                return false;
            }
            self.log(Severity::Warning, "Telemetry disconnected, reconnecting");
            let Some(telemetry) = self.telemetry.as_mut() else {
                return false;
            };
            let reconnected = telemetry.link.connect().await;
            self.record_attempt(reconnected);
            if !reconnected {
                return false;
            }
        }

        if let Some(telemetry) = self.telemetry.as_mut() {
            telemetry.link.keepalive().await;
        }
        true
    }

    /// Log to the console and, when connected, to the telemetry topic.
    pub fn log(&mut self, severity: Severity, message: &str) {
        match severity {
            Severity::Debug => tracing::debug!("{}", message),
            Severity::Info => tracing::info!("{}", message),
            Severity::Warning => tracing::warn!("{}", message),
            Severity::Error => tracing::error!("{}", message),
        }

        let Some(telemetry) = self.telemetry.as_mut() else {
            return;
        };
        if !telemetry.link.is_connected() {
            return;
        }

        let record = LogRecord {
            timestamp: chrono::Utc::now().timestamp(),
            thing_name: &telemetry.thing_name,
            level: severity.as_str(),
            message,
        };
        // Fire-and-forget: neither a serialization nor a publish failure is reported
        if let Ok(payload) = serde_json::to_vec(&record) {
            let _ = telemetry.link.publish(&telemetry.log_topic, payload);
        }
    }

    fn record_attempt(&mut self, connected: bool) {
        if connected {
            self.last_reconnect = ReconnectOutcome::Connected;
            self.retry_after = None;
        } else {
            self.last_reconnect = ReconnectOutcome::Failed;
            self.retry_after = Some(Instant::now() + RECONNECT_BACKOFF);
        }
    }
}

impl<N: NetworkLink, T: TelemetryLink> Upkeep for Connectivity<N, T> {
    async fn upkeep(&mut self) {
        self.maintain().await;
    }
}
