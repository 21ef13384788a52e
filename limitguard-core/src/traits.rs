//! Collaborator seams for the monitoring engine
//!
//! The engine runs inside a larger flight-software system and reaches its
//! collaborators - the event service, the stored-sequence executor, and
//! the clock - through these traits. The traits keep the engine free of
//! any bus or OS dependency: the host wires real services in, tests wire
//! in recorders.
//!
//! All three are object-safe but the engine takes them as generic
//! parameters so calls compile to direct dispatch.

use crate::events::Severity;
use crate::time::MissionTime;
use crate::value::WatchValue;

/// Receives classified event messages from the engine.
///
/// Maps onto an event/telemetry service with `emit(id, severity, text)`
/// semantics. The engine formats text into a bounded buffer before the
/// call; implementations must not assume the text outlives the call.
pub trait EventSink {
    /// Deliver one event message
    fn emit(&mut self, event_id: u16, severity: Severity, text: &str);
}

/// Requests execution of a stored command sequence.
///
/// Fire-and-forget: the engine never learns whether the sequence ran.
pub trait RtsExecutor {
    /// Request the sequence with the given ID
    fn request_rts(&mut self, rts_id: u16);
}

/// Provides the current mission time for transition records.
pub trait TimeSource {
    /// Current time
    fn now(&self) -> MissionTime;
}

/// Signature of a mission-supplied custom watchpoint predicate.
///
/// Invoked in place of a relational operator when a watchpoint selects the
/// custom comparison. Receives the watchpoint index, the decoded (masked)
/// value, and the 32-bit argument from the definition entry. `Ok(bool)`
/// maps onto TRUE/FALSE; `Err` maps onto an ERROR result and an event.
pub type CustomPredicate = fn(wp_index: u16, value: WatchValue, arg: u32) -> Result<bool, &'static str>;

/// No-op sink for hosts that discard events
impl EventSink for () {
    fn emit(&mut self, _event_id: u16, _severity: Severity, _text: &str) {}
}

/// No-op executor for hosts without stored sequences
impl RtsExecutor for () {
    fn request_rts(&mut self, _rts_id: u16) {}
}
