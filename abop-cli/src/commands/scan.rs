//! `scan` command: queues a filesystem scan of one or more root directories.

use crate::error::{validate_directory, CliResult};
use crate::output::CliOutput;
use crate::utils::build_engine;
use std::path::PathBuf;
use tracing::info;

/// # Errors
///
/// Returns an error if any root doesn't exist, or the engine can't be
/// built or queue the scan.
pub fn run(roots: Vec<PathBuf>, database: Option<PathBuf>) -> CliResult<CliOutput> {
    for root in &roots {
        validate_directory(root)?;
    }
    let engine = build_engine(database)?;
    let roots: Vec<String> = roots.into_iter().map(|p| p.to_string_lossy().into_owned()).collect();
    info!("queuing scan over {} root(s)", roots.len());
    let operation_id = engine.start_scan(roots)?;
    Ok(CliOutput::operation_started(operation_id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_a_root_that_does_not_exist() {
        let result = run(vec![PathBuf::from("/definitely/not/a/real/path")], None);
        assert!(result.is_err());
    }
}
