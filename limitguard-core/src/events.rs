//! Event identifiers and severities
//!
//! Every operator-visible occurrence in the engine - command acceptance,
//! command rejection, actionpoint failures, evaluation faults - is
//! reported through the [`EventSink`](crate::traits::EventSink) seam with
//! a stable event ID and a severity. IDs are part of the mission
//! interface; renumbering them breaks ground displays.
//!
//! Event text is rendered into a fixed-capacity buffer so the hot path
//! stays allocation-free; text that would overflow is truncated.

use core::fmt::{self, Write as _};

use heapless::String;

use crate::config::MAX_EVENT_TEXT;

/// Event severity, mirroring the host event service's classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum Severity {
    /// Developer diagnostics
    Debug = 0,
    /// Nominal operational notices
    Info = 1,
    /// Recoverable faults
    Error = 2,
    /// Faults requiring host intervention
    Critical = 3,
}

impl Severity {
    /// Decode a severity from its wire value
    pub const fn from_raw(raw: u16) -> Option<Self> {
        match raw {
            0 => Some(Self::Debug),
            1 => Some(Self::Info),
            2 => Some(Self::Error),
            3 => Some(Self::Critical),
            _ => None,
        }
    }
}

/// Bounded event text buffer
pub type EventText = String<MAX_EVENT_TEXT>;

/// Writer that keeps whatever fits instead of rejecting a whole chunk
struct Truncating<'a>(&'a mut EventText);

impl fmt::Write for Truncating<'_> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        for c in s.chars() {
            if self.0.push(c).is_err() {
                return Err(fmt::Error);
            }
        }
        Ok(())
    }
}

/// Render format arguments into a bounded event text, truncating on
/// overflow rather than failing.
pub(crate) fn render(args: fmt::Arguments<'_>) -> EventText {
    let mut text = EventText::new();
    // The error only signals truncation; the prefix is still delivered.
    let _ = Truncating(&mut text).write_fmt(args);
    text
}

/// No-op command accepted
pub const NOOP_INF_EID: u16 = 1;
/// Counter reset command accepted
pub const RESET_DBG_EID: u16 = 2;
/// Application monitoring state changed by command
pub const LC_STATE_INF_EID: u16 = 3;
/// Application monitoring state command carried an invalid state
pub const LC_STATE_ERR_EID: u16 = 4;
/// Actionpoint state changed by command
pub const AP_STATE_INF_EID: u16 = 5;
/// Actionpoint state command carried an invalid state
pub const AP_STATE_NEW_ERR_EID: u16 = 6;
/// Actionpoint state command rejected by the current state
pub const AP_STATE_CURR_ERR_EID: u16 = 7;
/// Actionpoint state command carried an invalid index
pub const AP_STATE_INDEX_ERR_EID: u16 = 8;
/// Actionpoint set permanently off
pub const AP_PERMOFF_INF_EID: u16 = 9;
/// Permanently-off command carried an invalid index
pub const AP_PERMOFF_INDEX_ERR_EID: u16 = 10;
/// Permanently-off command rejected: actionpoint not disabled
pub const AP_PERMOFF_CURR_ERR_EID: u16 = 11;
/// Actionpoint statistics reset
pub const AP_STATS_INF_EID: u16 = 12;
/// Statistics reset command carried an invalid actionpoint index
pub const AP_STATS_INDEX_ERR_EID: u16 = 13;
/// Watchpoint statistics reset
pub const WP_STATS_INF_EID: u16 = 14;
/// Statistics reset command carried an invalid watchpoint index
pub const WP_STATS_INDEX_ERR_EID: u16 = 15;
/// Sample request carried an invalid index range
pub const SAMPLE_INDEX_ERR_EID: u16 = 16;
/// Message payload length did not match the fixed size for its code
pub const CMD_LEN_ERR_EID: u16 = 17;
/// Unknown command function code
pub const CMD_CODE_ERR_EID: u16 = 18;
/// Failure trigger reached while monitoring was passive
pub const AP_PASSIVE_INF_EID: u16 = 19;
/// Actionpoint recovered from failure to pass
pub const AP_RECOVERED_INF_EID: u16 = 20;
/// Actionpoint equation evaluation fault
pub const AP_EVAL_ERR_EID: u16 = 21;
/// Custom watchpoint predicate fault
pub const WP_CUSTOM_ERR_EID: u16 = 22;
/// Bus receive failure terminating the application loop
pub const BUS_FATAL_CRIT_EID: u16 = 23;
