//! `blocked-hash` commands: list, add, and remove content hashes that must
//! never re-enter the library.

use crate::error::CliResult;
use crate::output::CliOutput;
use crate::utils::build_engine;
use abop_core::PageRequest;
use std::path::PathBuf;

/// # Errors
///
/// Returns an error if the engine can't be built.
pub fn list(limit: usize, offset: usize, database: Option<PathBuf>) -> CliResult<CliOutput> {
    let engine = build_engine(database)?;
    let page = engine.list_blocked_hashes(PageRequest::new(limit, offset))?;
    Ok(CliOutput::blocked_hash_list(page))
}

/// # Errors
///
/// Returns an error if `hash` isn't 64 lowercase hex characters, or the
/// engine can't be built.
pub fn add(hash: String, reason: String, database: Option<PathBuf>) -> CliResult<CliOutput> {
    let engine = build_engine(database)?;
    engine.add_blocked_hash(&hash, &reason)?;
    Ok(CliOutput::ok())
}

/// # Errors
///
/// Returns an error if the engine can't be built.
pub fn remove(hash: String, database: Option<PathBuf>) -> CliResult<CliOutput> {
    let engine = build_engine(database)?;
    engine.remove_blocked_hash(&hash)?;
    Ok(CliOutput::ok())
}
