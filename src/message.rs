//! Operator message injection.
//!
//! A snapshot may carry a short message (one string per panel line). At the
//! start of a rotation, if the message is non-empty and enough time has passed
//! since it was last shown, it takes over the panel for a fixed 20 seconds:
//!
//! - up to [`MESSAGE_LINES_PER_PAGE`] lines: one page for 20 s
//! - more lines: the first six for 15 s, then the rest for 5 s

use std::time::Duration;
use tokio::time::Instant;

use crate::color::{hex_to_color565, MESSAGE_COLOR};
use crate::connectivity::{Connectivity, NetworkLink, Severity, TelemetryLink};
use crate::panel::Panel;
use crate::wait::{hold, POLL_TICK};
use crate::DepartureSnapshot;

/// Lines that fit on one message page
pub const MESSAGE_LINES_PER_PAGE: usize = 6;
/// Hold for a message that fits on one page
pub const SINGLE_PAGE_HOLD: Duration = Duration::from_secs(20);
/// Hold for the first page of a two-page message
pub const FIRST_PAGE_HOLD: Duration = Duration::from_secs(15);
/// Hold for the second page of a two-page message
pub const SECOND_PAGE_HOLD: Duration = Duration::from_secs(5);

/// One screenful of a message and how long it stays up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessagePage<'a> {
    pub lines: &'a [String],
    pub hold: Duration,
}

/// Split message lines into pages.
///
/// An empty message has no pages. Anything past the first six lines goes on
/// the second page, even if that overflows the panel.
pub fn message_pages(lines: &[String]) -> Vec<MessagePage<'_>> {
    if lines.is_empty() {
        return Vec::new();
    }
    if lines.len() <= MESSAGE_LINES_PER_PAGE {
        return vec![MessagePage {
            lines,
            hold: SINGLE_PAGE_HOLD,
        }];
    }

    let (first, rest) = lines.split_at(MESSAGE_LINES_PER_PAGE);
    vec![
        MessagePage {
            lines: first,
            hold: FIRST_PAGE_HOLD,
        },
        MessagePage {
            lines: rest,
            hold: SECOND_PAGE_HOLD,
        },
    ]
}

/// Whether the message may be shown again at `now`.
pub fn message_due(now: Instant, last_shown: Instant, interval: Duration) -> bool {
    now.saturating_duration_since(last_shown) >= interval
}

/// Draw one message page in the message color.
pub fn render_message_page<P: Panel>(panel: &mut P, lines: &[String]) {
    panel.clear();
    panel.set_cursor(0, 0);
    panel.set_text_color(hex_to_color565(panel, MESSAGE_COLOR));
    for line in lines {
        panel.println(line);
    }
    panel.present();
}

/// Show every page of a message, keeping the telemetry link alive meanwhile.
pub async fn show_message<P, N, T>(
    panel: &mut P,
    lines: &[String],
    connectivity: &mut Connectivity<N, T>,
) where
    P: Panel,
    N: NetworkLink,
    T: TelemetryLink,
{
    tracing::info!("Message to display:");
    for line in lines {
        tracing::info!("  {}", line);
    }

    for page in message_pages(lines) {
        render_message_page(panel, page.lines);
        hold(page.hold, POLL_TICK, connectivity).await;
    }
}

/// Show the snapshot's message if it has one and it is due.
///
/// `last_shown` is moved to the end of the display when the message is shown
/// and left untouched when it is skipped. Returns whether the message was shown.
pub async fn inject_message<P, N, T>(
    panel: &mut P,
    snapshot: &DepartureSnapshot,
    interval: Duration,
    last_shown: &mut Instant,
    connectivity: &mut Connectivity<N, T>,
) -> bool
where
    P: Panel,
    N: NetworkLink,
    T: TelemetryLink,
{
    let lines = snapshot.message_lines();
    if lines.is_empty() {
        return false;
    }

    let now = Instant::now();
    if !message_due(now, *last_shown, interval) {
        tracing::debug!(
            "Skipping message, elapsed: {}ms, interval: {}ms",
            now.saturating_duration_since(*last_shown).as_millis(),
            interval.as_millis()
        );
        return false;
    }

    show_message(panel, lines, connectivity).await;
    *last_shown = Instant::now();
    connectivity.log(Severity::Info, "Message displayed");
    true
}
