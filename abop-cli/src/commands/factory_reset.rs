//! `factory-reset` command: wipes the store. Does not touch files on disk.

use crate::error::CliResult;
use crate::output::CliOutput;
use crate::utils::build_engine;
use std::path::PathBuf;

/// # Errors
///
/// Returns an error if `confirm` is `false`, or the store can't be wiped.
pub fn run(confirm: bool, database: Option<PathBuf>) -> CliResult<CliOutput> {
    if !confirm {
        return Err(anyhow::anyhow!(
            "factory-reset wipes the entire library database; pass --yes to confirm"
        ));
    }
    let engine = build_engine(database)?;
    engine.factory_reset()?;
    Ok(CliOutput::ok())
}
