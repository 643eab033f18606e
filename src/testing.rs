//! Test doubles shared by the unit tests.

use std::cell::RefCell;
use std::collections::VecDeque;

use crate::connectivity::{NetworkLink, TelemetryLink};
use crate::departures::{DepartureSource, FetchError};
use crate::DepartureSnapshot;

/// Network that associates on the n-th check (`None` = never).
#[derive(Debug, Default)]
pub struct FakeNetwork {
    pub associate_on: Option<usize>,
    pub checks: usize,
    pub begun: Option<String>,
}

impl FakeNetwork {
    pub fn associated() -> Self {
        Self::after(1)
    }

    pub fn never() -> Self {
        Self::default()
    }

    pub fn after(checks: usize) -> Self {
        Self {
            associate_on: Some(checks),
            ..Self::default()
        }
    }
}

impl NetworkLink for FakeNetwork {
    async fn begin(&mut self, ssid: &str, _password: &str) {
        self.begun = Some(ssid.to_string());
    }

    async fn is_associated(&mut self) -> bool {
        self.checks += 1;
        self.associate_on.is_some_and(|n| self.checks >= n)
    }
}

/// Telemetry link with scripted connect results and a publish log.
#[derive(Debug)]
pub struct FakeTelemetry {
    pub connected: bool,
    pub connect_results: VecDeque<bool>,
    pub connect_attempts: usize,
    pub keepalives: usize,
    pub accept_publish: bool,
    pub publish_attempts: usize,
    pub published: Vec<(String, Vec<u8>)>,
}

impl Default for FakeTelemetry {
    fn default() -> Self {
        Self {
            connected: false,
            connect_results: VecDeque::new(),
            connect_attempts: 0,
            keepalives: 0,
            accept_publish: true,
            publish_attempts: 0,
            published: Vec::new(),
        }
    }
}

impl FakeTelemetry {
    /// Messages published so far, decoded as JSON.
    pub fn records(&self) -> Vec<serde_json::Value> {
        self.published
            .iter()
            .filter_map(|(_, payload)| serde_json::from_slice(payload).ok())
            .collect()
    }
}

impl TelemetryLink for FakeTelemetry {
    fn is_connected(&self) -> bool {
        self.connected
    }

    async fn connect(&mut self) -> bool {
        self.connect_attempts += 1;
        self.connected = self.connect_results.pop_front().unwrap_or(false);
        self.connected
    }

    async fn keepalive(&mut self) {
        self.keepalives += 1;
    }

    fn publish(&mut self, topic: &str, payload: Vec<u8>) -> bool {
        self.publish_attempts += 1;
        if self.accept_publish {
            self.published.push((topic.to_string(), payload));
        }
        self.accept_publish
    }
}

/// Scripted departure source. `None` entries fail with HTTP 500; once the
/// script runs out the last entry repeats.
#[derive(Debug, Default)]
pub struct FakeSource {
    script: RefCell<VecDeque<Option<DepartureSnapshot>>>,
    last: RefCell<Option<Option<DepartureSnapshot>>>,
    pub calls: RefCell<usize>,
}

impl FakeSource {
    pub fn new(script: impl IntoIterator<Item = Option<DepartureSnapshot>>) -> Self {
        Self {
            script: RefCell::new(script.into_iter().collect()),
            ..Self::default()
        }
    }

    pub fn always(snapshot: DepartureSnapshot) -> Self {
        Self::new([Some(snapshot)])
    }

    pub fn calls(&self) -> usize {
        *self.calls.borrow()
    }
}

impl DepartureSource for FakeSource {
    fn endpoint(&self) -> &str {
        "fake://departures"
    }

    async fn fetch(&self) -> Result<DepartureSnapshot, FetchError> {
        *self.calls.borrow_mut() += 1;

        let next = self.script.borrow_mut().pop_front();
        let entry = match next {
            Some(entry) => {
                *self.last.borrow_mut() = Some(entry.clone());
                entry
            }
            None => self.last.borrow().clone().flatten(),
        };

        entry.ok_or(FetchError::Status {
            status: 500,
            body: "Internal Server Error".to_string(),
        })
    }
}

/// A snapshot of `n` routes named "R0", "R1", ... with one direction each.
pub fn routes(n: usize) -> DepartureSnapshot {
    use crate::{Departure, DepartureKind, Direction, Route};

    DepartureSnapshot {
        routes: (0..n)
            .map(|i| Route {
                name: format!("R{i}"),
                mode: "Bus".to_string(),
                color: "3ac364".to_string(),
                directions: vec![Direction {
                    headsign: "North".to_string(),
                    departures: vec![Departure {
                        kind: DepartureKind::Scheduled,
                        minutes: i as u32,
                    }],
                }],
            })
            .collect(),
        message: None,
    }
}
