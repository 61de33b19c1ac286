//! `wanted` commands: mark a book, author, or series as wanted.

use crate::error::CliResult;
use crate::output::CliOutput;
use crate::utils::build_engine;
use abop_core::engine::WantedKind;
use std::path::PathBuf;

/// # Errors
///
/// Returns an error if the engine can't be built or the write fails.
pub fn book(title: String, author: Option<String>, database: Option<PathBuf>) -> CliResult<CliOutput> {
    let engine = build_engine(database)?;
    let ids = engine.add_wanted(WantedKind::Book { title, author })?;
    Ok(CliOutput::wanted(ids))
}

/// # Errors
///
/// Returns an error if the engine can't be built or the write fails.
pub fn author(name: String, database: Option<PathBuf>) -> CliResult<CliOutput> {
    let engine = build_engine(database)?;
    let ids = engine.add_wanted(WantedKind::Author { name })?;
    Ok(CliOutput::wanted(ids))
}

/// # Errors
///
/// Returns an error if the engine can't be built or the write fails.
pub fn series(title: String, author: Option<String>, database: Option<PathBuf>) -> CliResult<CliOutput> {
    let engine = build_engine(database)?;
    let ids = engine.add_wanted(WantedKind::Series { title, author })?;
    Ok(CliOutput::wanted(ids))
}
