//! # Hex Color Mapping
//!
//! Route colors arrive from the API as six hex digits (`"3ac364"`). The panel
//! wants its native packed 5-6-5 value, so every string goes through
//! [`hex_to_color565`] which defers the actual packing to the panel driver.

use crate::panel::Panel;

/// Error text on boot pages
pub const ERROR_COLOR: &str = "D70000";
/// Real-time departures and the connected-SSID line
pub const TRANSIT_COLOR: &str = "3ac364";
/// Operator message pages
pub const MESSAGE_COLOR: &str = "FF7B9C";

/// Split a hex color string into its red, green and blue bytes.
///
/// Parsing mirrors C `strtol(hex, NULL, 16)`: leading whitespace and an
/// optional sign are accepted, digits are consumed until the first non-hex
/// character, an empty digit run yields 0, and overflow saturates. Nothing is
/// validated, but the result is deterministic for every input.
pub fn hex_to_rgb(hex: &str) -> (u8, u8, u8) {
    let value = parse_hex_prefix(hex);
    (
        ((value >> 16) & 0xFF) as u8,
        ((value >> 8) & 0xFF) as u8,
        (value & 0xFF) as u8,
    )
}

/// Convert a hex color string to the panel's packed color.
pub fn hex_to_color565<P: Panel + ?Sized>(panel: &P, hex: &str) -> u16 {
    let (r, g, b) = hex_to_rgb(hex);
    panel.color565(r, g, b)
}

/// White, via the panel's own conversion.
pub fn white<P: Panel + ?Sized>(panel: &P) -> u16 {
    panel.color565(255, 255, 255)
}

fn parse_hex_prefix(text: &str) -> i64 {
    let trimmed = text.trim_start();
    let (negative, digits) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };

    let magnitude = digits
        .chars()
        .map_while(|c| c.to_digit(16))
        .fold(0i64, |acc, digit| {
            acc.saturating_mul(16).saturating_add(i64::from(digit))
        });

    if negative {
        -magnitude
    } else {
        magnitude
    }
}
