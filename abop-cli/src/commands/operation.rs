//! `operation` commands: inspect, cancel, and tail a queued operation's log.

use crate::error::CliResult;
use crate::output::CliOutput;
use crate::utils::build_engine;
use std::path::PathBuf;
use tokio_stream::StreamExt;

/// # Errors
///
/// Returns an error if `id` doesn't resolve, or the engine can't be built.
pub fn get(id: String, database: Option<PathBuf>) -> CliResult<CliOutput> {
    let engine = build_engine(database)?;
    let operation = engine.get_operation(&id)?;
    Ok(CliOutput::operation(operation))
}

/// Cancellation is fire-and-forget (§6.2): this always reports success
/// even if the operation already finished.
///
/// # Errors
///
/// Returns an error if the engine can't be built.
pub fn cancel(id: String, database: Option<PathBuf>) -> CliResult<CliOutput> {
    let engine = build_engine(database)?;
    engine.cancel_operation(&id);
    Ok(CliOutput::ok())
}

/// Prints each log record as it arrives, one JSON line at a time, until the
/// operation reaches a terminal status.
///
/// # Errors
///
/// Returns an error if `id` doesn't resolve, or the engine can't be built.
pub async fn logs(id: String, database: Option<PathBuf>) -> CliResult<CliOutput> {
    let engine = build_engine(database)?;
    let mut stream = engine.stream_operation_logs(&id)?;
    while let Some(record) = stream.next().await {
        println!("{}", serde_json::to_string(&record)?);
    }
    Ok(CliOutput::ok())
}
