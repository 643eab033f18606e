//! # Transit Sign Core Library
//!
//! This library holds everything the departure board does between power-on and
//! the pixels: the data model for one departure snapshot, the fetch/render/hold
//! cycle, and the upkeep of the network and telemetry links. It is designed to
//! run as a single cooperative loop on a small Linux host driving a 96×48 HUB75
//! LED matrix.
//!
//! ## Design Philosophy
//!
//! ### One Loop, No Threads
//! - **Single thread of control**: the scheduler runs on a current-thread tokio
//!   runtime; nothing executes concurrently with it
//! - **Bounded holds**: every long wait is split into 100 ms ticks so the
//!   telemetry link gets serviced while a page stays on screen
//! - **Explicit context**: the scheduler owns the snapshot, the cycle state and
//!   the connectivity object, and hands them to each component by reference
//!
//! ### Data Flow
//! 1. **Fetch**: GET `{api}/departures?lat=..&lon=..` → typed [`DepartureSnapshot`]
//! 2. **Rotate**: two routes per page, page index advances by 2 and wraps to 0
//! 3. **Replace**: a new snapshot is accepted only at the start of a rotation,
//!    so a page never mixes routes from two fetches
//!
//! ## Core Types
//!
//! - [`DepartureSnapshot`]: one parsed API response
//! - [`Route`]: one transit line with its accent color
//! - [`Direction`]: one travel direction with its headsign
//! - [`Departure`]: one upcoming arrival, scheduled or real-time

use serde::{Deserialize, Serialize};

// Module declarations
pub mod boot;
pub mod clock;
pub mod color;
pub mod config;
pub mod connectivity;
pub mod departures;
pub mod message;
pub mod network;
pub mod panel;
pub mod renderer;
pub mod scheduler;
pub mod telemetry;
pub mod wait;

#[cfg(test)]
mod testing;

/// How a departure time was obtained.
///
/// The kind only affects rendering: real-time predictions are drawn in the
/// transit accent color, scheduled times in white.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DepartureKind {
    /// Timetable value, no live vehicle data
    Scheduled,
    /// Live prediction from vehicle tracking
    RealTime,
}

/// One upcoming arrival.
///
/// Wire format: `{"type": "RealTime", "minutes": 4}`. Minutes are unsigned, so
/// a negative value in the response is a parse failure rather than something
/// the renderer could ever print.
///
/// # Example
/// ```
/// use transit_sign_lib::{Departure, DepartureKind};
///
/// let dep: Departure = serde_json::from_str(r#"{"type":"RealTime","minutes":4}"#).unwrap();
/// assert_eq!(dep.kind, DepartureKind::RealTime);
/// assert_eq!(dep.minutes, 4);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Departure {
    /// Scheduled or real-time
    #[serde(rename = "type")]
    pub kind: DepartureKind,
    /// Minutes until arrival
    pub minutes: u32,
}

/// One travel direction of a route.
///
/// Departures keep the order the API sent them in; nothing sorts them.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Direction {
    /// Destination label shown on the vehicle
    pub headsign: String,
    /// Upcoming arrivals, source order
    pub departures: Vec<Departure>,
}

/// One transit line.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Route {
    /// Short route name, e.g. "22" or "Red"
    pub name: String,
    /// Mode label, e.g. "Bus" or "Subway"
    pub mode: String,
    /// Accent color as six hex digits without a leading `#`
    pub color: String,
    /// Travel directions; the display uses at most the first two
    pub directions: Vec<Direction>,
}

/// The full parsed response for one fetch cycle.
///
/// Owned by the scheduler and replaced wholesale on each accepted fetch; it is
/// never patched in place.
///
/// # Example
/// ```
/// use transit_sign_lib::DepartureSnapshot;
///
/// let json = r#"{"routes": [], "message": ["Have a", "nice day"]}"#;
/// let snapshot: DepartureSnapshot = serde_json::from_str(json).unwrap();
///
/// assert!(snapshot.routes.is_empty());
/// assert_eq!(snapshot.message_lines().len(), 2);
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepartureSnapshot {
    /// Routes in display order
    pub routes: Vec<Route>,
    /// Optional operator message, one entry per panel line
    #[serde(default)]
    pub message: Option<Vec<String>>,
}

impl DepartureSnapshot {
    /// Message lines, or an empty slice when the response carried none.
    pub fn message_lines(&self) -> &[String] {
        self.message.as_deref().unwrap_or(&[])
    }
}
