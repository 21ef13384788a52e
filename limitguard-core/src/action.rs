//! Actionpoint sampling
//!
//! Sampling runs an actionpoint's postfix equation against the current
//! watchpoint results and folds the outcome into the per-actionpoint
//! state machine: failure streak tracking, transition counters, and the
//! trigger that requests a stored command sequence after the configured
//! number of consecutive failures.
//!
//! The state machine itself never changes `current_state` here - only
//! commands and table loads move an actionpoint between states. Sampling
//! moves counters and the result code.
//!
//! Whether a trigger requests the sequence or is suppressed depends on
//! both the application state and the actionpoint state: both must be
//! active for a request; if either is passive the trigger is counted and
//! reported but nothing runs.

use crate::config::MAX_ACTIONPOINTS;
use crate::events::{
    self, Severity, AP_EVAL_ERR_EID, AP_PASSIVE_INF_EID, AP_RECOVERED_INF_EID,
};
use crate::rpn;
use crate::tables::{
    ActionResult, ActionpointDefinition, ActionpointResult, ApState, ApplicationState, LcState,
    TableSet, WatchpointResult,
};
use crate::traits::{EventSink, RtsExecutor};

/// Sample every actionpoint in `[first, last]`, ascending.
///
/// The caller has already checked the range against the table size and
/// confirmed monitoring is not disabled at the application level;
/// indices are clamped defensively anyway. Entries that are not used,
/// disabled, or permanently off are skipped without counter movement.
pub fn sample_range<E: EventSink, R: RtsExecutor>(
    first: u16,
    last: u16,
    tables: &mut TableSet,
    app: &mut ApplicationState,
    events: &mut E,
    rts: &mut R,
) {
    let (adt, art, wrt) = tables.split_for_sampling();
    let last = (last as usize).min(MAX_ACTIONPOINTS - 1);

    for index in first as usize..=last {
        let def = &adt[index];
        let result = &mut art[index];

        match result.current_state {
            ApState::Active | ApState::Passive => {}
            ApState::NotUsed | ApState::Disabled | ApState::PermOff => continue,
        }

        sample_single(index as u16, def, result, wrt, app, events, rts);
        app.ap_sample_count = app.ap_sample_count.saturating_add(1);
    }
}

fn sample_single<E: EventSink, R: RtsExecutor>(
    index: u16,
    def: &ActionpointDefinition,
    result: &mut ActionpointResult,
    wrt: &[WatchpointResult],
    app: &mut ApplicationState,
    events: &mut E,
    rts: &mut R,
) {
    let previous = result.action_result;
    let outcome = match rpn::evaluate(&def.equation, wrt) {
        Ok(outcome) => outcome,
        Err(err) => {
            result.action_result = ActionResult::Error;
            // Edge-triggered so a persistently broken equation does not
            // flood the event service once per sample.
            if previous != ActionResult::Error {
                events.emit(
                    AP_EVAL_ERR_EID,
                    Severity::Error,
                    &events::render(format_args!("AP evaluation error: AP = {index}, {err}")),
                );
            }
            return;
        }
    };
    result.action_result = outcome;

    match outcome {
        ActionResult::Fail => {
            result.cumulative_fail_count = result.cumulative_fail_count.saturating_add(1);

            if previous == ActionResult::Pass || previous == ActionResult::Stale {
                result.pass_to_fail_count = result.pass_to_fail_count.saturating_add(1);
                result.consecutive_fail_count = 1;
                result.events_since_transition = 0;
            } else {
                result.consecutive_fail_count = result.consecutive_fail_count.saturating_add(1);
            }

            if result.consecutive_fail_count == def.max_fails_before_rts as u32 {
                trigger(index, def, result, app, events, rts);
            }
        }
        ActionResult::Pass => {
            if previous == ActionResult::Fail {
                result.fail_to_pass_count = result.fail_to_pass_count.saturating_add(1);

                if result.fail_to_pass_count <= def.max_fail_pass_events as u32 {
                    events.emit(
                        AP_RECOVERED_INF_EID,
                        Severity::Info,
                        &events::render(format_args!(
                            "AP result changed from FAIL to PASS: AP = {index}"
                        )),
                    );
                    result.cumulative_event_msgs_sent =
                        result.cumulative_event_msgs_sent.saturating_add(1);
                }
            }
            result.consecutive_fail_count = 0;
        }
        // A stale sample stores the result and moves nothing else;
        // Error never comes back through the Ok path.
        ActionResult::Stale | ActionResult::Error => {}
    }
}

/// The consecutive-failure threshold was just reached
fn trigger<E: EventSink, R: RtsExecutor>(
    index: u16,
    def: &ActionpointDefinition,
    result: &mut ActionpointResult,
    app: &mut ApplicationState,
    events: &mut E,
    rts: &mut R,
) {
    if (result.events_since_transition as u32) < def.max_pass_fail_events as u32 {
        events.emit(
            def.event_id,
            def.event_type,
            &events::render(format_args!(
                "{}: AP = {}, FailCount = {}, RTS = {}",
                def.event_text.as_str(),
                index,
                result.consecutive_fail_count,
                def.rts_id
            )),
        );
        result.events_since_transition = result.events_since_transition.saturating_add(1);
        result.cumulative_event_msgs_sent = result.cumulative_event_msgs_sent.saturating_add(1);
    }

    if app.lc_state == LcState::Active && result.current_state == ApState::Active {
        rts.request_rts(def.rts_id);
        result.cumulative_rts_exec_count = result.cumulative_rts_exec_count.saturating_add(1);
        app.rts_exec_count = app.rts_exec_count.saturating_add(1);
    } else {
        result.passive_ap_count = result.passive_ap_count.saturating_add(1);
        app.passive_rts_exec_count = app.passive_rts_exec_count.saturating_add(1);

        if result.passive_ap_count <= def.max_passive_events as u32 {
            events.emit(
                AP_PASSIVE_INF_EID,
                Severity::Info,
                &events::render(format_args!(
                    "AP failed while passive: AP = {index}, FailCount = {}",
                    result.consecutive_fail_count
                )),
            );
            result.cumulative_event_msgs_sent =
                result.cumulative_event_msgs_sent.saturating_add(1);
        }
    }
}
