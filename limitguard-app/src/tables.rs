//! Table image loading
//!
//! Definition tables arrive as JSON images: two flat lists of entries,
//! shorter than or equal to the compiled table sizes. Loading pads the
//! remainder with unused entries; semantic validation happens in the
//! engine when the tables are installed, so an image that parses here
//! can still be rejected there.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use limitguard_core::config::{MAX_ACTIONPOINTS, MAX_WATCHPOINTS};
use limitguard_core::{ActionpointDefinition, WatchpointDefinition};

/// A pair of definition table images as stored on disk
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableImages {
    /// Watchpoint definitions, table order
    pub watchpoints: Vec<WatchpointDefinition>,
    /// Actionpoint definitions, table order
    pub actionpoints: Vec<ActionpointDefinition>,
}

/// Why a table image could not be turned into engine tables
#[derive(Debug, Error)]
pub enum TableLoadError {
    /// The image file could not be read
    #[error("cannot read table image: {0}")]
    Io(#[from] std::io::Error),

    /// The image is not valid JSON for the expected shape
    #[error("cannot parse table image: {0}")]
    Parse(#[from] serde_json::Error),

    /// The image holds more entries than the compiled table
    #[error("{table} image has {count} entries, table holds {capacity}")]
    TooManyEntries {
        /// Which table overflowed
        table: &'static str,
        /// Entries in the image
        count: usize,
        /// Compiled capacity
        capacity: usize,
    },
}

/// Read and parse a table image file
pub fn load_images(path: &Path) -> Result<TableImages, TableLoadError> {
    let text = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}

/// Expand images into the fixed arrays the engine owns, padding the
/// remainder with unused entries.
pub fn into_arrays(
    images: &TableImages,
) -> Result<
    (
        [WatchpointDefinition; MAX_WATCHPOINTS],
        [ActionpointDefinition; MAX_ACTIONPOINTS],
    ),
    TableLoadError,
> {
    if images.watchpoints.len() > MAX_WATCHPOINTS {
        return Err(TableLoadError::TooManyEntries {
            table: "watchpoint",
            count: images.watchpoints.len(),
            capacity: MAX_WATCHPOINTS,
        });
    }
    if images.actionpoints.len() > MAX_ACTIONPOINTS {
        return Err(TableLoadError::TooManyEntries {
            table: "actionpoint",
            count: images.actionpoints.len(),
            capacity: MAX_ACTIONPOINTS,
        });
    }

    let mut wdt = [WatchpointDefinition::unused(); MAX_WATCHPOINTS];
    for (slot, def) in wdt.iter_mut().zip(images.watchpoints.iter()) {
        *slot = *def;
    }

    let mut adt: [ActionpointDefinition; MAX_ACTIONPOINTS] =
        core::array::from_fn(|_| ActionpointDefinition::unused());
    for (slot, def) in adt.iter_mut().zip(images.actionpoints.iter()) {
        *slot = def.clone();
    }

    Ok((wdt, adt))
}
