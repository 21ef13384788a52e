//! Compile-time sizing for the monitoring engine
//!
//! Every table in the engine is a fixed array sized here. Nothing in the
//! evaluation path allocates; changing a limit means recompiling, which is
//! intentional for flight loads where memory budgets are fixed at
//! integration time.
//!
//! ## Memory impact
//!
//! ```text
//! Per-watchpoint:  definition 32 B + results 48 B
//! Per-actionpoint: definition ~140 B + results 36 B
//! 176 + 176 entries ≈ 45 KB of table state
//! ```

/// Number of watchpoint table entries.
pub const MAX_WATCHPOINTS: usize = 176;

/// Number of actionpoint table entries.
pub const MAX_ACTIONPOINTS: usize = 176;

/// Maximum tokens in one actionpoint postfix equation, terminator included.
/// Also bounds the evaluation stack depth.
pub const MAX_RPN_EQU_SIZE: usize = 20;

/// Maximum bytes of per-actionpoint failure event text.
pub const MAX_ACTION_TEXT: usize = 32;

/// Maximum bytes of formatted event text handed to the event sink.
pub const MAX_EVENT_TEXT: usize = 124;

/// Maximum number of distinct monitored message IDs.
///
/// Must be a power of two (index-map requirement).
pub const MESSAGE_MAP_CAPACITY: usize = 32;

/// Wildcard actionpoint index meaning "every actionpoint".
pub const ALL_ACTIONPOINTS: u16 = 0xFFFF;

/// Wildcard watchpoint index meaning "every watchpoint".
pub const ALL_WATCHPOINTS: u16 = 0xFFFF;

/// Bytes of packed watch results in the housekeeping payload (4 per byte).
pub const WP_PACK_BYTES: usize = MAX_WATCHPOINTS / 4;

/// Bytes of packed action state/result pairs in the housekeeping payload
/// (2 per byte).
pub const AP_PACK_BYTES: usize = MAX_ACTIONPOINTS / 2;

const _: () = assert!(
    MAX_WATCHPOINTS % 4 == 0,
    "watch results pack 4 per housekeeping byte"
);

const _: () = assert!(
    MAX_ACTIONPOINTS % 2 == 0,
    "action results pack 2 per housekeeping byte"
);

const _: () = assert!(
    MESSAGE_MAP_CAPACITY.is_power_of_two(),
    "message map capacity must be a power of 2"
);

const _: () = assert!(
    MAX_WATCHPOINTS < ALL_WATCHPOINTS as usize && MAX_ACTIONPOINTS < ALL_ACTIONPOINTS as usize,
    "wildcard index must not collide with a real table index"
);
