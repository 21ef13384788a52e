//! The application shell
//!
//! [`App`] wires the engine to its host: the blocking bus loop, the
//! housekeeping transmit, the maintenance window, and the critical-data
//! store. Each received message is processed to completion; the loop
//! ends only when the bus fails, which is reported as a critical event
//! before the error propagates to the host's restart policy.
//!
//! Table replacement is deferred to the maintenance window that follows
//! each housekeeping response - the one point where the engine is
//! guaranteed not to be mid-sample.

use limitguard_core::events::{Severity, BUS_FATAL_CRIT_EID};
use limitguard_core::{Dispatch, EventSink, LimitChecker, RtsExecutor, TimeSource};

use crate::bus::{BusError, SoftwareBus};
use crate::store::{CriticalStore, SnapshotImage};
use crate::tables::{self, TableImages};

/// The running application: engine, bus, and store
pub struct App<B, S, E, R, T> {
    checker: LimitChecker<E, R, T>,
    bus: B,
    store: S,
    pending_tables: Option<TableImages>,
}

impl<B, S, E, R, T> App<B, S, E, R, T>
where
    B: SoftwareBus,
    S: CriticalStore,
    E: EventSink,
    R: RtsExecutor,
    T: TimeSource,
{
    /// Assemble the application, restoring persisted state if the store
    /// holds a usable snapshot (warm start).
    pub fn new(mut checker: LimitChecker<E, R, T>, bus: B, mut store: S) -> Self {
        if let Some(image) = store.restore() {
            match image.into_snapshot() {
                Some(snapshot) => {
                    checker.restore(&snapshot);
                    log::info!("warm start: results and counters restored");
                }
                None => log::warn!("snapshot does not match this build, cold starting"),
            }
        }

        Self {
            checker,
            bus,
            store,
            pending_tables: None,
        }
    }

    /// Stage new definition tables; they install at the next
    /// maintenance window.
    pub fn queue_table_update(&mut self, images: TableImages) {
        self.pending_tables = Some(images);
    }

    /// Run the message loop until the bus fails.
    ///
    /// The error is returned after the critical event goes out so the
    /// host's restart policy sees both.
    pub fn run(&mut self) -> Result<(), BusError> {
        loop {
            let message = match self.bus.receive() {
                Ok(message) => message,
                Err(err) => {
                    log::error!("bus receive failed, exiting: {err}");
                    self.checker.events_mut().emit(
                        BUS_FATAL_CRIT_EID,
                        Severity::Critical,
                        "Bus receive failed, application exiting",
                    );
                    return Err(err);
                }
            };

            if let Dispatch::Housekeeping(packet) =
                self.checker.dispatch(message.message_id, &message.payload)
            {
                if let Some(packet) = packet {
                    self.bus.transmit_hk(&packet.encode())?;
                }
                self.maintenance();
            }
        }
    }

    /// The quiescent window after each housekeeping response: install
    /// staged tables and persist a snapshot.
    fn maintenance(&mut self) {
        if let Some(images) = self.pending_tables.take() {
            match tables::into_arrays(&images) {
                Ok((wdt, adt)) => match self.checker.replace_tables(wdt, adt) {
                    Ok(()) => log::info!("definition tables replaced"),
                    Err(err) => log::error!("staged tables rejected: {err}"),
                },
                Err(err) => log::error!("staged table images unusable: {err}"),
            }
        }

        self.store
            .save(&SnapshotImage::from_snapshot(&self.checker.snapshot()));
    }

    /// The engine
    pub fn checker(&self) -> &LimitChecker<E, R, T> {
        &self.checker
    }

    /// Mutable engine access
    pub fn checker_mut(&mut self) -> &mut LimitChecker<E, R, T> {
        &mut self.checker
    }

    /// The bus
    pub fn bus(&self) -> &B {
        &self.bus
    }

    /// The critical-data store
    pub fn store(&self) -> &S {
        &self.store
    }
}
