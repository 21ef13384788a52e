//! Command handling
//!
//! Ground commands arrive as a one-byte function code followed by a
//! fixed-size argument block, multi-byte fields big-endian. Every
//! handler verifies the exact payload length before touching any state;
//! a rejected command moves nothing but the error counter.
//!
//! The sticky states are enforced here: entries that are not used or
//! permanently off ignore state commands (only a table load revives
//! them), and permanently-off can only be entered from disabled.

use crate::action;
use crate::config::{ALL_ACTIONPOINTS, ALL_WATCHPOINTS, MAX_ACTIONPOINTS, MAX_WATCHPOINTS};
use crate::errors::MonitorError;
use crate::events::{
    self, Severity, AP_PERMOFF_CURR_ERR_EID, AP_PERMOFF_INDEX_ERR_EID, AP_PERMOFF_INF_EID,
    AP_STATE_CURR_ERR_EID, AP_STATE_INDEX_ERR_EID, AP_STATE_INF_EID, AP_STATE_NEW_ERR_EID,
    AP_STATS_INDEX_ERR_EID, AP_STATS_INF_EID, CMD_CODE_ERR_EID, CMD_LEN_ERR_EID, LC_STATE_ERR_EID,
    LC_STATE_INF_EID, NOOP_INF_EID, RESET_DBG_EID, SAMPLE_INDEX_ERR_EID, WP_STATS_INDEX_ERR_EID,
    WP_STATS_INF_EID,
};
use crate::tables::{ApState, ApplicationState, LcState, TableSet};
use crate::traits::{EventSink, RtsExecutor};

/// Command function codes (mission interface)
pub mod fc {
    /// Report liveness and version
    pub const NOOP: u8 = 0;
    /// Zero the scalar counters
    pub const RESET: u8 = 1;
    /// Set the application monitoring state
    pub const SET_LC_STATE: u8 = 2;
    /// Set one or all actionpoint states
    pub const SET_AP_STATE: u8 = 3;
    /// Set one actionpoint permanently off
    pub const SET_AP_PERMOFF: u8 = 4;
    /// Reset actionpoint statistics
    pub const RESET_AP_STATS: u8 = 5;
    /// Reset watchpoint statistics
    pub const RESET_WP_STATS: u8 = 6;
}

/// Total command payload length per function code, code byte included
const NOOP_LEN: usize = 1;
const RESET_LEN: usize = 1;
const SET_LC_STATE_LEN: usize = 3;
const SET_AP_STATE_LEN: usize = 5;
const SET_AP_PERMOFF_LEN: usize = 3;
const RESET_AP_STATS_LEN: usize = 3;
const RESET_WP_STATS_LEN: usize = 3;

/// Sample request payload length (start, end, update-age)
pub const SAMPLE_REQUEST_LEN: usize = 6;

/// Housekeeping request payload length
pub const HK_REQUEST_LEN: usize = 0;

fn u16_at(payload: &[u8], offset: usize) -> u16 {
    u16::from_be_bytes([payload[offset], payload[offset + 1]])
}

/// Count a rejection and report it with its classified error
fn reject<E: EventSink>(
    event_id: u16,
    context: &str,
    err: MonitorError,
    app: &mut ApplicationState,
    events: &mut E,
) {
    app.cmd_err_count = app.cmd_err_count.saturating_add(1);
    events.emit(
        event_id,
        Severity::Error,
        &events::render(format_args!("{context}: {err}")),
    );
}

/// Check a payload against its fixed size; a mismatch is reported and
/// counted, and the caller must drop the message.
pub(crate) fn verify_length<E: EventSink>(
    payload: &[u8],
    expected: usize,
    app: &mut ApplicationState,
    events: &mut E,
) -> bool {
    if payload.len() == expected {
        return true;
    }

    reject(
        CMD_LEN_ERR_EID,
        "Invalid message length",
        MonitorError::LengthMismatch {
            expected,
            actual: payload.len(),
        },
        app,
        events,
    );
    false
}

/// Dispatch one command message by its function code
pub(crate) fn handle_command<E: EventSink>(
    payload: &[u8],
    tables: &mut TableSet,
    app: &mut ApplicationState,
    events: &mut E,
) {
    let Some(&code) = payload.first() else {
        // Too short to carry a function code
        verify_length(payload, NOOP_LEN, app, events);
        return;
    };

    match code {
        fc::NOOP => noop(payload, app, events),
        fc::RESET => reset(payload, app, events),
        fc::SET_LC_STATE => set_lc_state(payload, app, events),
        fc::SET_AP_STATE => set_ap_state(payload, tables, app, events),
        fc::SET_AP_PERMOFF => set_ap_permoff(payload, tables, app, events),
        fc::RESET_AP_STATS => reset_ap_stats(payload, tables, app, events),
        fc::RESET_WP_STATS => reset_wp_stats(payload, tables, app, events),
        _ => reject(
            CMD_CODE_ERR_EID,
            "Invalid command code",
            MonitorError::InvalidEnum { value: code as u16 },
            app,
            events,
        ),
    }
}

fn noop<E: EventSink>(payload: &[u8], app: &mut ApplicationState, events: &mut E) {
    if !verify_length(payload, NOOP_LEN, app, events) {
        return;
    }

    app.cmd_count = app.cmd_count.saturating_add(1);
    events.emit(
        NOOP_INF_EID,
        Severity::Info,
        &events::render(format_args!("No-op command: Version {}", crate::VERSION)),
    );
}

fn reset<E: EventSink>(payload: &[u8], app: &mut ApplicationState, events: &mut E) {
    if !verify_length(payload, RESET_LEN, app, events) {
        return;
    }

    // Heritage behavior: the command counter is zeroed along with the
    // rest, so this command reports a count of zero afterwards.
    app.reset_counters();
    events.emit(
        RESET_DBG_EID,
        Severity::Debug,
        &events::render(format_args!("Reset counters command")),
    );
}

fn set_lc_state<E: EventSink>(payload: &[u8], app: &mut ApplicationState, events: &mut E) {
    if !verify_length(payload, SET_LC_STATE_LEN, app, events) {
        return;
    }

    let raw = u16_at(payload, 1);
    match LcState::from_raw(raw) {
        Some(state) => {
            app.lc_state = state;
            app.cmd_count = app.cmd_count.saturating_add(1);
            events.emit(
                LC_STATE_INF_EID,
                Severity::Info,
                &events::render(format_args!("Set monitoring state command: new state = {raw}")),
            );
        }
        None => reject(
            LC_STATE_ERR_EID,
            "Set monitoring state error",
            MonitorError::InvalidEnum { value: raw },
            app,
            events,
        ),
    }
}

fn set_ap_state<E: EventSink>(
    payload: &[u8],
    tables: &mut TableSet,
    app: &mut ApplicationState,
    events: &mut E,
) {
    if !verify_length(payload, SET_AP_STATE_LEN, app, events) {
        return;
    }

    let ap = u16_at(payload, 1);
    let raw_state = u16_at(payload, 3);

    let Some(new_state) = ApState::from_command_raw(raw_state) else {
        reject(
            AP_STATE_NEW_ERR_EID,
            "Set AP state error",
            MonitorError::InvalidEnum { value: raw_state },
            app,
            events,
        );
        return;
    };

    let success = if ap == ALL_ACTIONPOINTS {
        // Entries that are not used or permanently off keep their state;
        // the command still counts as accepted.
        for entry in tables.art.iter_mut() {
            if entry.current_state != ApState::NotUsed && entry.current_state != ApState::PermOff {
                entry.current_state = new_state;
            }
        }
        true
    } else if (ap as usize) < MAX_ACTIONPOINTS {
        let entry = &mut tables.art[ap as usize];
        if entry.current_state != ApState::NotUsed && entry.current_state != ApState::PermOff {
            entry.current_state = new_state;
            true
        } else {
            let current = entry.current_state as u8;
            reject(
                AP_STATE_CURR_ERR_EID,
                "Set AP state error",
                MonitorError::InvalidStateTransition { current },
                app,
                events,
            );
            false
        }
    } else {
        reject(
            AP_STATE_INDEX_ERR_EID,
            "Set AP state error",
            MonitorError::InvalidIndex {
                index: ap,
                limit: MAX_ACTIONPOINTS as u16,
            },
            app,
            events,
        );
        false
    };

    if success {
        app.cmd_count = app.cmd_count.saturating_add(1);
        events.emit(
            AP_STATE_INF_EID,
            Severity::Info,
            &events::render(format_args!(
                "Set AP state command: AP = {ap}, new state = {raw_state}"
            )),
        );
    }
}

fn set_ap_permoff<E: EventSink>(
    payload: &[u8],
    tables: &mut TableSet,
    app: &mut ApplicationState,
    events: &mut E,
) {
    if !verify_length(payload, SET_AP_PERMOFF_LEN, app, events) {
        return;
    }

    let ap = u16_at(payload, 1);

    // The wildcard is deliberately invalid here: turning every
    // actionpoint permanently off is not a single-command operation.
    if ap == ALL_ACTIONPOINTS || (ap as usize) >= MAX_ACTIONPOINTS {
        reject(
            AP_PERMOFF_INDEX_ERR_EID,
            "Set AP perm off error",
            MonitorError::InvalidIndex {
                index: ap,
                limit: MAX_ACTIONPOINTS as u16,
            },
            app,
            events,
        );
        return;
    }

    let entry = &mut tables.art[ap as usize];
    if entry.current_state != ApState::Disabled {
        let current = entry.current_state as u8;
        reject(
            AP_PERMOFF_CURR_ERR_EID,
            "Set AP perm off error, AP not disabled",
            MonitorError::InvalidStateTransition { current },
            app,
            events,
        );
        return;
    }

    entry.current_state = ApState::PermOff;
    app.cmd_count = app.cmd_count.saturating_add(1);
    events.emit(
        AP_PERMOFF_INF_EID,
        Severity::Info,
        &events::render(format_args!("Set AP permanently off command: AP = {ap}")),
    );
}

fn reset_ap_stats<E: EventSink>(
    payload: &[u8],
    tables: &mut TableSet,
    app: &mut ApplicationState,
    events: &mut E,
) {
    if !verify_length(payload, RESET_AP_STATS_LEN, app, events) {
        return;
    }

    let ap = u16_at(payload, 1);
    let range = if ap == ALL_ACTIONPOINTS {
        Some(0..MAX_ACTIONPOINTS)
    } else if (ap as usize) < MAX_ACTIONPOINTS {
        Some(ap as usize..ap as usize + 1)
    } else {
        None
    };

    match range {
        Some(range) => {
            for entry in &mut tables.art[range] {
                entry.reset_stats();
            }
            app.cmd_count = app.cmd_count.saturating_add(1);
            events.emit(
                AP_STATS_INF_EID,
                Severity::Info,
                &events::render(format_args!("Reset AP stats command: AP = {ap}")),
            );
        }
        None => reject(
            AP_STATS_INDEX_ERR_EID,
            "Reset AP stats error",
            MonitorError::InvalidIndex {
                index: ap,
                limit: MAX_ACTIONPOINTS as u16,
            },
            app,
            events,
        ),
    }
}

fn reset_wp_stats<E: EventSink>(
    payload: &[u8],
    tables: &mut TableSet,
    app: &mut ApplicationState,
    events: &mut E,
) {
    if !verify_length(payload, RESET_WP_STATS_LEN, app, events) {
        return;
    }

    let wp = u16_at(payload, 1);
    let range = if wp == ALL_WATCHPOINTS {
        Some(0..MAX_WATCHPOINTS)
    } else if (wp as usize) < MAX_WATCHPOINTS {
        Some(wp as usize..wp as usize + 1)
    } else {
        None
    };

    match range {
        Some(range) => {
            for entry in &mut tables.wrt[range] {
                entry.reset_stats();
            }
            app.cmd_count = app.cmd_count.saturating_add(1);
            events.emit(
                WP_STATS_INF_EID,
                Severity::Info,
                &events::render(format_args!("Reset WP stats command: WP = {wp}")),
            );
        }
        None => reject(
            WP_STATS_INDEX_ERR_EID,
            "Reset WP stats error",
            MonitorError::InvalidIndex {
                index: wp,
                limit: MAX_WATCHPOINTS as u16,
            },
            app,
            events,
        ),
    }
}

/// Handle a sample request: run the actionpoint sampler over the given
/// range, then optionally age the watchpoint freshness countdowns.
///
/// Ignored entirely while monitoring is disabled at the application
/// level. Aging runs only after a valid sample, so an operator typo
/// cannot silently stale the whole watchpoint table.
pub(crate) fn handle_sample_request<E: EventSink, R: RtsExecutor>(
    payload: &[u8],
    tables: &mut TableSet,
    app: &mut ApplicationState,
    events: &mut E,
    rts: &mut R,
) {
    if !verify_length(payload, SAMPLE_REQUEST_LEN, app, events) {
        return;
    }

    if app.lc_state == LcState::Disabled {
        return;
    }

    let start = u16_at(payload, 0);
    let end = u16_at(payload, 2);
    let update_age = u16_at(payload, 4);

    let valid = if start == ALL_ACTIONPOINTS && end == ALL_ACTIONPOINTS {
        action::sample_range(0, MAX_ACTIONPOINTS as u16 - 1, tables, app, events, rts);
        true
    } else if start <= end && (end as usize) < MAX_ACTIONPOINTS {
        action::sample_range(start, end, tables, app, events, rts);
        true
    } else {
        events.emit(
            SAMPLE_INDEX_ERR_EID,
            Severity::Error,
            &events::render(format_args!(
                "Sample AP error: invalid AP number, start = {start}, end = {end}"
            )),
        );
        false
    };

    if update_age != 0 && valid {
        for entry in tables.wrt.iter_mut() {
            if entry.countdown_to_stale > 0 {
                entry.countdown_to_stale -= 1;
                if entry.countdown_to_stale == 0 {
                    entry.watch_result = crate::tables::WatchResult::Stale;
                }
            }
        }
    }
}
