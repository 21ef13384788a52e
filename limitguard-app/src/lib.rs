//! LIMITGUARD App - Host Shell for the Monitoring Engine
//!
//! ## Overview
//!
//! This crate is the thin layer between `limitguard-core` and the rest
//! of the flight system: the blocking software-bus loop, definition
//! table images on disk, and the critical-data store that lets a warm
//! restart resume monitoring with its counters intact.
//!
//! The engine does all the work; this crate only moves bytes to and
//! from it. That split keeps the engine testable without any bus and
//! keeps this crate small enough to audit in one sitting.
//!
//! ## Startup sequence
//!
//! 1. Load and parse both table images ([`tables::load_images`])
//! 2. Build the engine - validation happens here, and the application
//!    refuses to start monitoring if either table is rejected
//! 3. Wrap engine, bus, and store in an [`App`]; a usable snapshot in
//!    the store turns this into a warm start
//! 4. [`App::run`] blocks on the bus until the host shuts it down

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod app;
pub mod bus;
pub mod store;
pub mod tables;

pub use app::App;
pub use bus::{BusError, BusMessage, MemoryBus, SoftwareBus};
pub use store::{CriticalStore, FileStore, MemoryStore, NullStore, SnapshotImage};
pub use tables::{load_images, TableImages, TableLoadError};
