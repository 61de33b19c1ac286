//! `import` command: synchronously ingests a single file.

use crate::error::CliResult;
use crate::output::CliOutput;
use crate::utils::build_engine;
use abop_core::engine::ImportOptions;
use std::path::PathBuf;

/// # Errors
///
/// Returns an error if the file can't be read, or the engine can't be
/// built.
pub async fn run(path: PathBuf, organize_after: bool, database: Option<PathBuf>) -> CliResult<CliOutput> {
    let engine = build_engine(database)?;
    let book_id = engine.import_file(&path, ImportOptions { organize_after }).await?;
    let book = engine.get_book(&book_id)?;
    Ok(CliOutput::book(book))
}
