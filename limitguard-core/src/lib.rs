//! LIMITGUARD Core - Telemetry Limit-Checking Engine
//!
//! ## Overview
//!
//! LIMITGUARD Core monitors typed fields inside messages flowing over a
//! flight-software bus. Watchpoints decode and compare individual fields;
//! actionpoints combine watchpoint results through small postfix boolean
//! equations; a configured streak of consecutive failures requests a
//! stored command sequence. A command interface adjusts monitoring at the
//! application, actionpoint, or watchpoint level, and a housekeeping
//! packer compresses the whole results picture into one telemetry packet.
//!
//! ## Architecture
//!
//! ```text
//! bus message ──▶ dispatch ──▶ watchpoint evaluate ──▶ results table
//!                    │                                      │
//!                    ├──▶ sample request ──▶ rpn ───────────┘
//!                    │         │
//!                    │         └──▶ state machine ──▶ RTS request / events
//!                    ├──▶ housekeeping ──▶ packed results packet
//!                    └──▶ commands ──▶ state + counters
//! ```
//!
//! ## Design Constraints
//!
//! - **No allocation in the hot path**: tables are fixed arrays sized at
//!   compile time, equations evaluate on a bounded stack, event text
//!   renders into a fixed buffer.
//! - **Single task**: one message is processed to completion before the
//!   next; counters and transitions need no synchronization.
//! - **Fail safe**: a fault anywhere in evaluation is recorded as an
//!   ERROR result for that entry alone and never stops monitoring of the
//!   rest of the tables.
//!
//! ## Collaborators
//!
//! The bus itself, the event service, the stored-sequence executor, and
//! the clock are external. The engine reaches them through the seams in
//! [`traits`]; hosts wire real services, tests wire recorders.
//!
//! ## Feature Flags
//!
//! - `std` (default): standard library support and the system clock
//! - `log`: route engine diagnostics through the `log` facade
//! - `serde`: derives on definition/result types for table images and
//!   persisted snapshots
//! - `defmt`: defmt formatting for embedded targets

#![cfg_attr(not(feature = "std"), no_std)]
#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod action;
pub mod cmds;
pub mod config;
pub mod errors;
pub mod events;
pub mod hk;
pub mod monitor;
pub mod rpn;
pub mod tables;
pub mod time;
pub mod traits;
pub mod value;
pub mod watch;

// Public API
pub use errors::{FieldFault, MonitorError, MonitorResult, TableError};
pub use monitor::{Dispatch, LimitChecker, ReservedIds, Snapshot};
pub use tables::{
    ActionResult, ActionpointDefinition, ActionpointResult, ApState, ApplicationState, LcState,
    MessageId, TableSet, WatchResult, WatchpointDefinition, WatchpointResult,
};
pub use traits::{CustomPredicate, EventSink, RtsExecutor, TimeSource};
pub use value::{DataType, OperatorId, WatchValue};

/// Library version, reported by the no-op command
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_exists() {
        assert!(!VERSION.is_empty());
    }
}
