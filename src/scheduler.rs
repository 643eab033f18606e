//! # Cycle Scheduler
//!
//! The main loop of the sign. Each iteration is one pass through a small
//! cyclic state machine:
//!
//! ```text
//!            ┌──────── page_index == 0 ────────┐
//!            ▼                                 │
//!   Fetching ──ok──▶ (message?) ──▶ Rendering ──▶ Waiting ──▶ advance
//!      │                                 ▲                     │
//!      └─fail: 10 s backoff, retry       └─── page_index != 0 ─┘
//! ```
//!
//! A fresh snapshot is only accepted while `page_index` is 0, so the routes on
//! screen always come from a single fetch. Between ticks of every hold the
//! connectivity maintainer runs, which is all that keeps the telemetry link
//! alive.

use std::ops::Range;
use std::time::Duration;
use tokio::time::Instant;

use crate::config::DisplayConfig;
use crate::connectivity::{Connectivity, NetworkLink, Severity, TelemetryLink};
use crate::departures::{fetch_departures, DepartureSource};
use crate::message::inject_message;
use crate::panel::Panel;
use crate::renderer::{render_page, ROUTES_PER_PAGE};
use crate::wait::{hold, POLL_TICK};
use crate::DepartureSnapshot;

/// Pause before retrying a failed fetch
pub const FETCH_BACKOFF: Duration = Duration::from_secs(10);

/// State carried from one iteration to the next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleState {
    /// First route on the current page; always even
    pub page_index: usize,
    /// Route count of the active snapshot
    pub total_routes: usize,
    /// When the operator message was last shown
    pub last_message_at: Instant,
}

impl CycleState {
    /// Fresh state at boot. The message timer starts now, so a message first
    /// appears one full interval after startup.
    pub fn new() -> Self {
        Self {
            page_index: 0,
            total_routes: 0,
            last_message_at: Instant::now(),
        }
    }

    /// Whether the next iteration starts a rotation (and so fetches)
    pub fn at_rotation_start(&self) -> bool {
        self.page_index == 0
    }

    /// Move to the next pair of routes, wrapping to 0 at the end.
    pub fn advance(&mut self) {
        self.page_index += ROUTES_PER_PAGE;
        if self.page_index >= self.total_routes {
            self.page_index = 0;
        }
    }
}

impl Default for CycleState {
    fn default() -> Self {
        Self::new()
    }
}

/// How long things stay on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timing {
    pub page_interval: Duration,
    pub message_interval: Duration,
    /// Upkeep tick inside every hold
    pub tick: Duration,
}

impl From<&DisplayConfig> for Timing {
    fn from(display: &DisplayConfig) -> Self {
        Self {
            page_interval: display.page_interval(),
            message_interval: display.message_interval(),
            tick: POLL_TICK,
        }
    }
}

/// What one iteration did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Iteration {
    /// The fetch failed; the backoff has already been waited out
    FetchFailed,
    /// A page was drawn and held
    Rendered {
        /// Route indices on the page
        routes: Range<usize>,
        /// Whether the operator message ran before the page
        message_shown: bool,
    },
}

/// Owner of everything the main loop touches.
pub struct Scheduler<S, P, N, T> {
    source: S,
    panel: P,
    connectivity: Connectivity<N, T>,
    timing: Timing,
    snapshot: Option<DepartureSnapshot>,
    cycle: CycleState,
}

impl<S, P, N, T> Scheduler<S, P, N, T>
where
    S: DepartureSource,
    P: Panel,
    N: NetworkLink,
    T: TelemetryLink,
{
    pub fn new(source: S, panel: P, connectivity: Connectivity<N, T>, timing: Timing) -> Self {
        Self {
            source,
            panel,
            connectivity,
            timing,
            snapshot: None,
            cycle: CycleState::new(),
        }
    }

    pub fn cycle(&self) -> &CycleState {
        &self.cycle
    }

    /// The snapshot currently on display, `None` until the first good fetch
    pub fn snapshot(&self) -> Option<&DepartureSnapshot> {
        self.snapshot.as_ref()
    }

    pub fn panel(&self) -> &P {
        &self.panel
    }

    pub fn connectivity(&self) -> &Connectivity<N, T> {
        &self.connectivity
    }

    /// Run one iteration of the loop.
    pub async fn tick(&mut self) -> Iteration {
        self.connectivity.maintain().await;

        let mut message_shown = false;
        if self.cycle.at_rotation_start() {
            self.connectivity
                .log(Severity::Info, "Fetching departures from API");

            if !fetch_departures(&self.source, &mut self.snapshot, &mut self.connectivity).await {
                self.connectivity.log(
                    Severity::Error,
                    "Failed to fetch departures, retrying in 10s",
                );
                hold(FETCH_BACKOFF, self.timing.tick, &mut self.connectivity).await;
                return Iteration::FetchFailed;
            }

            self.cycle.total_routes = self.snapshot.as_ref().map_or(0, |s| s.routes.len());
            tracing::info!("Total routes: {}", self.cycle.total_routes);
            self.connectivity
                .log(Severity::Info, "Departures fetched successfully");

            if let Some(snapshot) = self.snapshot.as_ref() {
                message_shown = inject_message(
                    &mut self.panel,
                    snapshot,
                    self.timing.message_interval,
                    &mut self.cycle.last_message_at,
                    &mut self.connectivity,
                )
                .await;
            }
        }

        let empty = DepartureSnapshot::default();
        let snapshot = self.snapshot.as_ref().unwrap_or(&empty);
        let routes = render_page(&mut self.panel, snapshot, self.cycle.page_index);

        hold(self.timing.page_interval, self.timing.tick, &mut self.connectivity).await;
        self.cycle.advance();

        Iteration::Rendered {
            routes,
            message_shown,
        }
    }

    /// Run the loop forever.
    pub async fn run(&mut self) {
        loop {
            self.tick().await;
        }
    }
}
