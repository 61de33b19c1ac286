//! `browse` command: read-only filesystem listing for UI navigation.

use crate::error::CliResult;
use crate::output::CliOutput;
use crate::utils::build_engine;
use std::path::PathBuf;

/// # Errors
///
/// Returns an error if `path` can't be read, or the engine can't be built.
pub async fn run(path: PathBuf, database: Option<PathBuf>) -> CliResult<CliOutput> {
    let engine = build_engine(database)?;
    let entries = engine.browse_filesystem(&path).await?;
    Ok(CliOutput::browse(entries))
}
