//! Error types for the monitoring engine
//!
//! Keep errors small - they're returned in the message hot path.
//! Evaluation faults never propagate out of the engine; they are folded
//! into ERROR result codes. These types exist for command rejection
//! reporting, table validation, and the host shell.

use thiserror_no_std::Error;

/// Result type for engine operations
pub type MonitorResult<T> = Result<T, MonitorError>;

/// Engine error taxonomy
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorError {
    /// Command payload size does not match the fixed size for its code
    #[error("Payload length {actual} does not match expected {expected}")]
    LengthMismatch { expected: usize, actual: usize },

    /// Table index out of range
    #[error("Index {index} outside table of {limit} entries")]
    InvalidIndex { index: u16, limit: u16 },

    /// Raw value outside an enumeration domain
    #[error("Value {value} outside enumeration domain")]
    InvalidEnum { value: u16 },

    /// Commanded state change rejected by the current state
    #[error("State transition rejected from current state {current}")]
    InvalidStateTransition { current: u8 },

    /// Typed-field read failed
    #[error("Field read fault: {0}")]
    FieldReadFault(FieldFault),

    /// Postfix program structurally invalid
    #[error("Malformed postfix program at token {position}")]
    RpnMalformed { position: usize },

    /// Postfix program failed during evaluation
    #[error("Postfix evaluation fault at token {position}")]
    RpnRuntime { position: usize },

    /// Registered custom predicate reported a fault
    #[error("Custom predicate fault: {reason}")]
    CustomPredicateFault { reason: &'static str },
}

/// Why a typed-field read failed
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldFault {
    /// Offset plus type width runs past the end of the payload
    #[error("offset {offset} + {size} bytes exceeds payload of {len}")]
    OutOfBounds {
        offset: usize,
        size: usize,
        len: usize,
    },

    /// Offset violates the natural alignment of the declared type
    #[error("offset {offset} misaligned for {align}-byte type")]
    Misaligned { offset: usize, align: usize },

    /// Entry has no defined data type
    #[error("undefined data type")]
    Undefined,
}

/// Table image rejected during validation
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableError {
    /// Watchpoint definition entry invalid
    #[error("watchpoint entry {index}: {reason}")]
    Watchpoint { index: u16, reason: &'static str },

    /// Actionpoint definition entry invalid
    #[error("actionpoint entry {index}: {reason}")]
    Actionpoint { index: u16, reason: &'static str },

    /// More distinct monitored message IDs than the reverse index can hold
    #[error("monitored message set exceeds reverse index capacity")]
    MessageMapFull,
}

#[cfg(feature = "defmt")]
impl defmt::Format for MonitorError {
    fn format(&self, fmt: defmt::Formatter) {
        match self {
            Self::LengthMismatch { expected, actual } => {
                defmt::write!(fmt, "length {} != expected {}", actual, expected)
            }
            Self::InvalidIndex { index, limit } => {
                defmt::write!(fmt, "index {} outside {}", index, limit)
            }
            Self::InvalidEnum { value } => defmt::write!(fmt, "bad enum value {}", value),
            Self::InvalidStateTransition { current } => {
                defmt::write!(fmt, "transition rejected from {}", current)
            }
            Self::FieldReadFault(_) => defmt::write!(fmt, "field read fault"),
            Self::RpnMalformed { position } => defmt::write!(fmt, "malformed rpn @{}", position),
            Self::RpnRuntime { position } => defmt::write!(fmt, "rpn fault @{}", position),
            Self::CustomPredicateFault { .. } => defmt::write!(fmt, "custom predicate fault"),
        }
    }
}
