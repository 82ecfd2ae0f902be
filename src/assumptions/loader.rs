//! JSON content loader
//!
//! Reads authored assumption bundles and user override snapshots from
//! data/ and validates them before they reach the engine.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use log::debug;

use super::{AssumptionOverrides, Assumptions};
use crate::error::LoadError;

/// Default path to the assumption bundle
pub const DEFAULT_ASSUMPTIONS_PATH: &str = "data/assumptions.json";

/// Load and validate an assumption bundle from a file
pub fn load_assumptions(path: &Path) -> Result<Assumptions, LoadError> {
    let file = File::open(path)?;
    let assumptions = parse_assumptions(BufReader::new(file))?;
    debug!("loaded assumptions from {}", path.display());
    Ok(assumptions)
}

/// Parse and validate an assumption bundle from any reader
pub fn parse_assumptions<R: Read>(reader: R) -> Result<Assumptions, LoadError> {
    let assumptions: Assumptions = serde_json::from_reader(reader)?;
    assumptions.validate()?;
    debug!(
        "parsed {} categories, {} recipients",
        assumptions.categories.len(),
        assumptions.recipients.len()
    );
    Ok(assumptions)
}

/// Load a user override snapshot
///
/// Overrides are only checked for shape here; they are validated against
/// the base assumptions when merged.
pub fn load_overrides(path: &Path) -> Result<AssumptionOverrides, LoadError> {
    let file = File::open(path)?;
    Ok(serde_json::from_reader(BufReader::new(file))?)
}
