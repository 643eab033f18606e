//! # Departure Page Rendering
//!
//! This module turns a [`DepartureSnapshot`] into text on the LED matrix. The
//! 96×48 panel fits six lines of sixteen-ish characters, which is exactly two
//! routes of three lines each:
//!
//! ```text
//! RED Subway
//! |HOWARD 7,2,15
//! |95TH/D 4,12
//! 22 Bus
//! |CLARK  1,11
//! |HARRIS 9
//! ```
//!
//! The route header and headsigns use the route's accent color, real-time
//! minutes the transit green, and everything else white. It also draws the
//! plain status pages shown during boot.

use std::ops::Range;

use crate::color::{hex_to_color565, white, ERROR_COLOR, TRANSIT_COLOR};
use crate::panel::Panel;
use crate::{DepartureKind, DepartureSnapshot, Direction, Route};

/// Characters reserved for a headsign
pub const HEADSIGN_WIDTH: usize = 6;
/// Routes drawn per page
pub const ROUTES_PER_PAGE: usize = 2;
/// Directions drawn per route
pub const MAX_DIRECTIONS: usize = 2;
/// Departures drawn per direction
pub const MAX_DEPARTURES: usize = 3;

/// Fit a headsign into exactly [`HEADSIGN_WIDTH`] characters.
///
/// Uppercased first, then truncated or right-padded with spaces.
pub fn format_headsign(headsign: &str) -> String {
    format!(
        "{:<width$.width$}",
        headsign.to_uppercase(),
        width = HEADSIGN_WIDTH
    )
}

/// Route indices a page starting at `page_index` shows.
pub fn page_routes(page_index: usize, total_routes: usize) -> Range<usize> {
    let start = page_index.min(total_routes);
    start..(start + ROUTES_PER_PAGE).min(total_routes)
}

/// Draw one page: up to two routes starting at `page_index`.
///
/// Clears the panel first and presents it afterwards. Returns the range of
/// route indices drawn.
pub fn render_page<P: Panel>(
    panel: &mut P,
    snapshot: &DepartureSnapshot,
    page_index: usize,
) -> Range<usize> {
    panel.clear();
    panel.set_cursor(0, 0);
    panel.set_text_color(white(panel));

    let shown = page_routes(page_index, snapshot.routes.len());
    for route in &snapshot.routes[shown.clone()] {
        render_route(panel, route);
    }

    panel.present();
    shown
}

/// Draw a route header followed by two direction lines.
pub fn render_route<P: Panel>(panel: &mut P, route: &Route) {
    let accent = hex_to_color565(panel, &route.color);

    panel.set_text_color(accent);
    panel.print(&route.name.to_uppercase());
    panel.print(" ");
    panel.print(&route.mode);
    panel.print("\n");

    for slot in 0..MAX_DIRECTIONS {
        match route.directions.get(slot) {
            Some(direction) => render_direction(panel, direction, accent),
            // Keep the next route on its usual line
            None => panel.print("\n"),
        }
    }
}

/// Draw one direction line: bullet, headsign, then up to three departures.
pub fn render_direction<P: Panel>(panel: &mut P, direction: &Direction, accent: u16) {
    let white = white(panel);
    let realtime = hex_to_color565(panel, TRANSIT_COLOR);

    panel.set_text_color(white);
    panel.print("|");

    panel.set_text_color(accent);
    panel.print(&format_headsign(&direction.headsign));

    panel.set_text_color(white);
    panel.print(" ");

    for (i, departure) in direction.departures.iter().take(MAX_DEPARTURES).enumerate() {
        if i > 0 {
            panel.set_text_color(white);
            panel.print(",");
        }
        panel.set_text_color(match departure.kind {
            DepartureKind::RealTime => realtime,
            DepartureKind::Scheduled => white,
        });
        panel.print(&departure.minutes.to_string());
    }
    panel.print("\n");
}

/// Boot page shown while the network cannot be joined.
pub fn render_wifi_error<P: Panel>(panel: &mut P, ssid: &str) {
    panel.clear();
    panel.set_cursor(0, 0);
    panel.set_text_color(hex_to_color565(panel, ERROR_COLOR));
    panel.println("WiFi error: ");
    panel.println("");
    panel.set_text_color(white(panel));
    panel.println(ssid);
    panel.present();
}

/// Boot page shown once the network is joined.
pub fn render_wifi_connected<P: Panel>(panel: &mut P, ssid: &str) {
    panel.clear();
    panel.set_cursor(0, 0);
    panel.set_text_color(white(panel));
    panel.println("WiFi connected:");
    panel.println("");
    panel.set_text_color(hex_to_color565(panel, TRANSIT_COLOR));
    panel.println(ssid);
    panel.present();
}

/// Boot page listing degraded-mode warnings. Returns `false` (and draws
/// nothing) when there is nothing to warn about.
pub fn render_startup_warnings<P: Panel>(
    panel: &mut P,
    clock_failed: bool,
    telemetry_failed: bool,
) -> bool {
    if !clock_failed && !telemetry_failed {
        return false;
    }

    panel.clear();
    panel.set_cursor(0, 0);
    panel.set_text_color(hex_to_color565(panel, ERROR_COLOR));
    if clock_failed {
        panel.println("NTP sync failed!");
    }
    if telemetry_failed {
        panel.println("Telemetry failed");
    }
    panel.present();
    true
}
