//! The limit checker container and message dispatcher
//!
//! [`LimitChecker`] owns the four tables, the application counters, the
//! message reverse index, and the collaborator seams. The host feeds it
//! one bus message at a time through [`LimitChecker::dispatch`]; every
//! message is processed to completion before the next, so no locking is
//! needed anywhere in the engine.
//!
//! Three reserved message IDs route to the sampler, the housekeeping
//! packer, and the command handler. Everything else is treated as
//! candidate telemetry: if any watchpoint references the ID, those
//! watchpoints are evaluated in ascending index order; unrelated traffic
//! is a silent no-op.

use crate::cmds;
use crate::config::{MAX_ACTIONPOINTS, MAX_WATCHPOINTS};
use crate::errors::TableError;
use crate::hk::{self, HkPacket};
use crate::tables::{
    ActionpointDefinition, ActionpointResult, ApplicationState, LcState, MessageId, TableSet,
    WatchpointDefinition, WatchpointResult,
};
use crate::traits::{CustomPredicate, EventSink, RtsExecutor, TimeSource};
use crate::watch::{self, MessageMap};

#[cfg(feature = "log")]
macro_rules! log_debug {
    ($($arg:tt)*) => { log::debug!($($arg)*) };
}

#[cfg(not(feature = "log"))]
macro_rules! log_debug {
    ($($arg:tt)*) => {};
}

/// The three bus message IDs the application claims for itself
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReservedIds {
    /// Actionpoint sample requests
    pub sample: MessageId,
    /// Housekeeping requests
    pub send_hk: MessageId,
    /// Ground commands
    pub cmd: MessageId,
}

/// What one dispatched message turned out to be
#[derive(Debug, Clone, PartialEq)]
pub enum Dispatch {
    /// A sample request was processed
    Sample,
    /// A housekeeping request was processed; the packet is present
    /// unless the request itself was malformed. Either way this marks
    /// the quiescent window for host maintenance.
    Housekeeping(Option<HkPacket>),
    /// A ground command was processed (accepted or rejected)
    Command,
    /// Telemetry matched this many watchpoints
    Monitored(usize),
    /// Traffic no watchpoint references
    Ignored,
}

/// Restorable mutable state for a critical-data store
#[derive(Debug, Clone)]
pub struct Snapshot {
    /// Watchpoint results
    pub wrt: [WatchpointResult; MAX_WATCHPOINTS],
    /// Actionpoint results
    pub art: [ActionpointResult; MAX_ACTIONPOINTS],
    /// Application state and counters
    pub app: ApplicationState,
}

/// The monitoring engine: tables, counters, reverse index, and
/// collaborators, owned by a single task.
pub struct LimitChecker<E, R, T> {
    tables: TableSet,
    app: ApplicationState,
    messages: MessageMap,
    reserved: ReservedIds,
    custom: Option<CustomPredicate>,
    events: E,
    rts: R,
    clock: T,
}

impl<E: EventSink, R: RtsExecutor, T: TimeSource> LimitChecker<E, R, T> {
    /// Validate the definition images and bring the engine up with
    /// result tables in their cold-start state.
    ///
    /// Fails if either table is invalid, if the monitored message set
    /// does not fit the reverse index, or if a watchpoint claims one of
    /// the reserved message IDs.
    pub fn new(
        wdt: [WatchpointDefinition; MAX_WATCHPOINTS],
        adt: [ActionpointDefinition; MAX_ACTIONPOINTS],
        reserved: ReservedIds,
        events: E,
        rts: R,
        clock: T,
    ) -> Result<Self, TableError> {
        check_reserved(&wdt, &reserved)?;
        let tables = TableSet::new(wdt, adt)?;
        let messages = MessageMap::build(&tables.wdt)?;

        Ok(Self {
            tables,
            app: ApplicationState::new(LcState::Active),
            messages,
            reserved,
            custom: None,
            events,
            rts,
            clock,
        })
    }

    /// Register the mission's custom watchpoint predicate
    pub fn with_custom_predicate(mut self, predicate: CustomPredicate) -> Self {
        self.custom = Some(predicate);
        self
    }

    /// Start monitoring in the given state instead of active
    pub fn with_initial_state(mut self, state: LcState) -> Self {
        self.app.lc_state = state;
        self
    }

    /// Process one bus message to completion.
    pub fn dispatch(&mut self, message_id: MessageId, payload: &[u8]) -> Dispatch {
        if message_id == self.reserved.sample {
            cmds::handle_sample_request(
                payload,
                &mut self.tables,
                &mut self.app,
                &mut self.events,
                &mut self.rts,
            );
            return Dispatch::Sample;
        }

        if message_id == self.reserved.send_hk {
            let packet = if cmds::verify_length(
                payload,
                cmds::HK_REQUEST_LEN,
                &mut self.app,
                &mut self.events,
            ) {
                Some(hk::build(&self.tables, &self.app))
            } else {
                None
            };
            return Dispatch::Housekeeping(packet);
        }

        if message_id == self.reserved.cmd {
            cmds::handle_command(payload, &mut self.tables, &mut self.app, &mut self.events);
            return Dispatch::Command;
        }

        self.check_message_for_watchpoints(message_id, payload)
    }

    /// Evaluate every watchpoint referencing this message, ascending.
    fn check_message_for_watchpoints(
        &mut self,
        message_id: MessageId,
        payload: &[u8],
    ) -> Dispatch {
        let indices = self.messages.watchpoints_for(message_id);
        if indices.is_empty() {
            return Dispatch::Ignored;
        }

        // One timestamp per message: every transition this message
        // causes carries the same detection time.
        let stamp = self.clock.now();
        let (wdt, wrt) = self.tables.split_for_watch();

        for &index in indices {
            watch::evaluate(
                index,
                &wdt[index as usize],
                &mut wrt[index as usize],
                payload,
                stamp,
                self.custom,
                &mut self.events,
            );
        }

        self.app.monitored_msg_count = self.app.monitored_msg_count.saturating_add(1);
        log_debug!(
            "message {:#06x} matched {} watchpoint(s)",
            message_id.raw(),
            indices.len()
        );
        Dispatch::Monitored(indices.len())
    }

    /// Replace both definition tables during the quiescent window.
    ///
    /// This is the table-load path: result tables reinitialize to their
    /// cold-start state, which is also the only way an entry leaves
    /// NOT_USED or permanently-off. Counters in the application state
    /// survive.
    pub fn replace_tables(
        &mut self,
        wdt: [WatchpointDefinition; MAX_WATCHPOINTS],
        adt: [ActionpointDefinition; MAX_ACTIONPOINTS],
    ) -> Result<(), TableError> {
        check_reserved(&wdt, &self.reserved)?;
        let tables = TableSet::new(wdt, adt)?;
        let messages = MessageMap::build(&tables.wdt)?;
        self.tables = tables;
        self.messages = messages;
        Ok(())
    }

    /// Copy the restorable state for a critical-data store
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            wrt: self.tables.wrt,
            art: self.tables.art,
            app: self.app,
        }
    }

    /// Restore state saved before a warm restart
    pub fn restore(&mut self, snapshot: &Snapshot) {
        self.tables.wrt = snapshot.wrt;
        self.tables.art = snapshot.art;
        self.app = snapshot.app;
    }

    /// The owned tables
    pub fn tables(&self) -> &TableSet {
        &self.tables
    }

    /// Application state and counters
    pub fn app_state(&self) -> &ApplicationState {
        &self.app
    }

    /// The event sink, for hosts that need it back
    pub fn events(&self) -> &E {
        &self.events
    }

    /// Mutable event sink access, for host-level events that share the
    /// engine's sink (e.g. the fatal bus event)
    pub fn events_mut(&mut self) -> &mut E {
        &mut self.events
    }

    /// The sequence executor, for hosts that need it back
    pub fn rts(&self) -> &R {
        &self.rts
    }

    /// Mutable clock access (test clocks advance through this)
    pub fn clock_mut(&mut self) -> &mut T {
        &mut self.clock
    }
}

fn check_reserved(
    wdt: &[WatchpointDefinition; MAX_WATCHPOINTS],
    reserved: &ReservedIds,
) -> Result<(), TableError> {
    for (index, def) in wdt.iter().enumerate() {
        if def.is_used()
            && (def.message_id == reserved.sample
                || def.message_id == reserved.send_hk
                || def.message_id == reserved.cmd)
        {
            return Err(TableError::Watchpoint {
                index: index as u16,
                reason: "watchpoint claims a reserved message id",
            });
        }
    }
    Ok(())
}
