//! Watchpoint evaluation and message routing
//!
//! A watchpoint is evaluated only when a message carrying its field
//! arrives. [`MessageMap`] is the precomputed reverse index from message
//! ID to the watchpoints that reference it, built once at table load so
//! the per-message lookup is a single bounded map probe.
//!
//! [`evaluate`] runs one watchpoint against one payload: decode the
//! field, mask it, compare, then update the results entry. A field-read
//! fault records ERROR without touching the transition counters; a
//! comparison fault (NaN, custom predicate) still counts as an
//! evaluation.

use heapless::{FnvIndexMap, Vec};

use crate::config::{MAX_WATCHPOINTS, MESSAGE_MAP_CAPACITY};
use crate::errors::{MonitorError, TableError};
use crate::events::{self, Severity, WP_CUSTOM_ERR_EID};
use crate::tables::{
    MessageId, TransitionRecord, WatchResult, WatchpointDefinition, WatchpointResult,
};
use crate::time::MissionTime;
use crate::traits::{CustomPredicate, EventSink};
use crate::value::{self, OperatorId};

// Diagnostics only; faults are already recorded in the results table
#[cfg(feature = "log")]
macro_rules! log_warn {
    ($($arg:tt)*) => { log::warn!($($arg)*) };
}

#[cfg(not(feature = "log"))]
macro_rules! log_warn {
    ($($arg:tt)*) => {};
}

/// Reverse index from message ID to the watchpoints that reference it
#[derive(Debug, Clone)]
pub struct MessageMap {
    map: FnvIndexMap<u16, Vec<u16, MAX_WATCHPOINTS>, MESSAGE_MAP_CAPACITY>,
}

impl MessageMap {
    /// Build the index from a validated definition table.
    ///
    /// Watchpoint indices stay in ascending order per message so
    /// evaluation order matches table order.
    pub fn build(wdt: &[WatchpointDefinition; MAX_WATCHPOINTS]) -> Result<Self, TableError> {
        let mut map: FnvIndexMap<u16, Vec<u16, MAX_WATCHPOINTS>, MESSAGE_MAP_CAPACITY> =
            FnvIndexMap::new();

        for (index, def) in wdt.iter().enumerate() {
            if !def.is_used() {
                continue;
            }
            let key = def.message_id.raw();
            if let Some(list) = map.get_mut(&key) {
                if list.push(index as u16).is_err() {
                    return Err(TableError::MessageMapFull);
                }
            } else {
                let mut list = Vec::new();
                if list.push(index as u16).is_err() || map.insert(key, list).is_err() {
                    return Err(TableError::MessageMapFull);
                }
            }
        }

        Ok(Self { map })
    }

    /// Watchpoint indices referencing the given message; empty for
    /// unmonitored traffic.
    pub fn watchpoints_for(&self, message_id: MessageId) -> &[u16] {
        self.map
            .get(&message_id.raw())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Number of distinct monitored message IDs
    pub fn distinct_messages(&self) -> usize {
        self.map.len()
    }
}

/// Evaluate one watchpoint against a message payload and update its
/// results entry.
pub fn evaluate<E: EventSink>(
    wp_index: u16,
    def: &WatchpointDefinition,
    result: &mut WatchpointResult,
    payload: &[u8],
    stamp: MissionTime,
    custom: Option<CustomPredicate>,
    events: &mut E,
) {
    let raw = match value::read_field(payload, def.offset as usize, def.data_type) {
        Ok(raw) => raw,
        Err(_fault) => {
            // No comparison happened: record the fault, leave the
            // transition counters alone, and kill the freshness budget.
            log_warn!("WP {wp_index}: {}", MonitorError::FieldReadFault(_fault));
            result.watch_result = WatchResult::Error;
            result.countdown_to_stale = 0;
            return;
        }
    };

    // Floats are compared on their decoded value; integers are masked
    // first.
    let masked = if def.data_type.is_float() {
        raw
    } else {
        raw & def.bit_mask
    };

    let outcome = compare_masked(wp_index, def, masked, custom, events);

    apply(def, result, masked, stamp, outcome);
}

/// Run the configured comparison on an already-masked value
fn compare_masked<E: EventSink>(
    wp_index: u16,
    def: &WatchpointDefinition,
    masked: u32,
    custom: Option<CustomPredicate>,
    events: &mut E,
) -> WatchResult {
    let decoded = value::classify(masked, def.data_type);

    if def.operator == OperatorId::Custom {
        let verdict = match custom {
            Some(predicate) => predicate(wp_index, decoded, def.custom_arg),
            None => Err("no custom predicate registered"),
        };
        return match verdict {
            Ok(true) => WatchResult::True,
            Ok(false) => WatchResult::False,
            Err(reason) => {
                events.emit(
                    WP_CUSTOM_ERR_EID,
                    Severity::Error,
                    &events::render(format_args!(
                        "WP = {wp_index}: {}",
                        MonitorError::CustomPredicateFault { reason }
                    )),
                );
                WatchResult::Error
            }
        };
    }

    match value::compare(def.operator, decoded, def.comparison) {
        Ok(true) => WatchResult::True,
        Ok(false) => WatchResult::False,
        Err(_) => WatchResult::Error,
    }
}

/// Fold a comparison outcome into the results entry
fn apply(
    def: &WatchpointDefinition,
    result: &mut WatchpointResult,
    masked: u32,
    stamp: MissionTime,
    outcome: WatchResult,
) {
    let previous = result.watch_result;
    result.evaluation_count = result.evaluation_count.saturating_add(1);

    match outcome {
        WatchResult::True => {
            result.watch_result = WatchResult::True;
            result.cumulative_true_count = result.cumulative_true_count.saturating_add(1);

            if previous == WatchResult::False || previous == WatchResult::Stale {
                result.false_to_true_count = result.false_to_true_count.saturating_add(1);
                result.consecutive_true_count = 1;
                result.last_false_to_true = TransitionRecord {
                    value: masked,
                    data_type: def.data_type,
                    timestamp: stamp,
                };
            } else {
                result.consecutive_true_count = result.consecutive_true_count.saturating_add(1);
            }

            result.countdown_to_stale = def.result_age_when_stale;
        }
        WatchResult::False => {
            result.watch_result = WatchResult::False;

            if previous == WatchResult::True {
                result.last_true_to_false = TransitionRecord {
                    value: masked,
                    data_type: def.data_type,
                    timestamp: stamp,
                };
            }
            result.consecutive_true_count = 0;
            result.countdown_to_stale = def.result_age_when_stale;
        }
        _ => {
            result.watch_result = WatchResult::Error;
            result.countdown_to_stale = 0;
        }
    }
}
