//! `organize` command: queues the organizer for one book.

use crate::error::CliResult;
use crate::output::CliOutput;
use crate::utils::build_engine;
use std::path::PathBuf;

/// # Errors
///
/// Returns an error if the engine can't be built or the operation can't be
/// queued.
pub fn run(book_id: String, database: Option<PathBuf>) -> CliResult<CliOutput> {
    let engine = build_engine(database)?;
    let operation_id = engine.start_organize(&book_id)?;
    Ok(CliOutput::operation_started(operation_id))
}
