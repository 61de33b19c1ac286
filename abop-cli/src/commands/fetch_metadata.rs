//! `fetch-metadata` command: queues a bulk metadata fetch over one or more
//! books.

use crate::error::CliResult;
use crate::output::CliOutput;
use crate::utils::build_engine;
use std::path::PathBuf;

/// # Errors
///
/// Returns an error if the engine can't be built or the operation can't be
/// queued.
pub fn run(book_ids: Vec<String>, refresh_all: bool, database: Option<PathBuf>) -> CliResult<CliOutput> {
    let engine = build_engine(database)?;
    let operation_id = engine.bulk_fetch_metadata(book_ids, refresh_all)?;
    Ok(CliOutput::operation_started(operation_id))
}
