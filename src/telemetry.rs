//! MQTT telemetry link.
//!
//! Log records are published over MQTT with mutual TLS (device certificate and
//! key, broker CA), the same shape as an AWS IoT thing connection. The client
//! id is the thing name, which broker-side policy matches against.
//!
//! Nothing here spawns a task: the rumqttc event loop only advances when the
//! scheduler calls [`TelemetryLink::connect`] or [`TelemetryLink::keepalive`].

use rumqttc::{
    AsyncClient, ConnectReturnCode, Event, EventLoop, Incoming, MqttOptions, QoS,
    TlsConfiguration, Transport,
};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tokio::time::timeout;

use crate::config::TelemetryConfig;
use crate::connectivity::TelemetryLink;

/// MQTT keepalive interval
const KEEP_ALIVE: Duration = Duration::from_secs(60);
/// Largest packet accepted or sent
const MAX_PACKET_SIZE: usize = 512;
/// Upper bound on one connect attempt (TCP + TLS + CONNACK)
const CONNECT_TIMEOUT: Duration = Duration::from_secs(3);
/// Outgoing request queue depth; publishes beyond it are dropped
const REQUEST_CAPACITY: usize = 10;
/// Events drained per keepalive call
const MAX_EVENTS_PER_KEEPALIVE: usize = 16;

/// Errors raised while setting up the telemetry link.
#[derive(Error, Debug)]
pub enum TelemetryError {
    /// A certificate or key file could not be read
    #[error("cannot read {path}: {source}")]
    Credential {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Telemetry link backed by a rumqttc event loop.
pub struct MqttTelemetry {
    client: AsyncClient,
    eventloop: EventLoop,
    connected: bool,
}

impl MqttTelemetry {
    /// Build a TLS link from the telemetry section of the configuration.
    pub fn from_config(config: &TelemetryConfig) -> Result<Self, TelemetryError> {
        let ca = read_pem(&config.root_ca)?;
        let cert = read_pem(&config.cert_pem)?;
        let key = read_pem(&config.private_key)?;

        let mut options = MqttOptions::new(&config.thing_name, &config.endpoint, config.port);
        options.set_transport(Transport::tls_with_config(TlsConfiguration::Simple {
            ca,
            alpn: None,
            client_auth: Some((cert, key)),
        }));

        Ok(Self::with_options(options))
    }

    /// Build a link from explicit options (plain TCP unless a transport is set).
    pub fn with_options(mut options: MqttOptions) -> Self {
        options
            .set_keep_alive(KEEP_ALIVE)
            .set_max_packet_size(MAX_PACKET_SIZE, MAX_PACKET_SIZE)
            .set_clean_session(true);

        let (client, eventloop) = AsyncClient::new(options, REQUEST_CAPACITY);
        Self {
            client,
            eventloop,
            connected: false,
        }
    }
}

impl TelemetryLink for MqttTelemetry {
    fn is_connected(&self) -> bool {
        self.connected
    }

    async fn connect(&mut self) -> bool {
        let eventloop = &mut self.eventloop;
        let attempt = timeout(CONNECT_TIMEOUT, async {
            loop {
                match eventloop.poll().await {
                    Ok(Event::Incoming(Incoming::ConnAck(ack))) => {
                        return ack.code == ConnectReturnCode::Success;
                    }
                    Ok(_) => continue,
                    Err(e) => {
                        tracing::warn!("Telemetry connection failed: {}", e);
                        return false;
                    }
                }
            }
        })
        .await;

        self.connected = matches!(attempt, Ok(true));
        self.connected
    }

    async fn keepalive(&mut self) {
        // A zero timeout polls the event loop once without waiting
        for _ in 0..MAX_EVENTS_PER_KEEPALIVE {
            match timeout(Duration::ZERO, self.eventloop.poll()).await {
                Ok(Ok(Event::Incoming(Incoming::Disconnect))) => {
                    self.connected = false;
                    break;
                }
                Ok(Ok(_)) => continue,
                Ok(Err(e)) => {
                    tracing::debug!("Telemetry link dropped: {}", e);
                    self.connected = false;
                    break;
                }
                Err(_) => break,
            }
        }
    }

    fn publish(&mut self, topic: &str, payload: Vec<u8>) -> bool {
        // An oversized packet would fail inside the event loop and tear the session down
        if publish_packet_len(topic, payload.len()) > MAX_PACKET_SIZE {
            return false;
        }
        self.client
            .try_publish(topic, QoS::AtMostOnce, false, payload)
            .is_ok()
    }
}

/// Bytes on the wire for a QoS 0 PUBLISH, fixed header included.
fn publish_packet_len(topic: &str, payload_len: usize) -> usize {
    let remaining = 2 + topic.len() + payload_len;
    let length_bytes = match remaining {
        0..=127 => 1,
        128..=16_383 => 2,
        16_384..=2_097_151 => 3,
        _ => 4,
    };
    1 + length_bytes + remaining
}

fn read_pem(path: &Path) -> Result<Vec<u8>, TelemetryError> {
    fs::read(path).map_err(|source| TelemetryError::Credential {
        path: path.to_path_buf(),
        source,
    })
}
