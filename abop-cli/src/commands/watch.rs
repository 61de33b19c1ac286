//! `watch` command: runs the `AutoWatcher` in the foreground over one or
//! more directories, queuing a debounced scan whenever files change, and
//! spawns the `PurgeScheduler` alongside it so soft-deleted books still
//! get purged while the process is sitting in watch mode.

use crate::error::{validate_directory, CliResult};
use crate::output::CliOutput;
use crate::utils::build_engine;
use std::path::PathBuf;
use std::sync::Arc;

/// # Errors
///
/// Returns an error if any path doesn't exist, or the engine can't build
/// the filesystem watcher. Runs until the watch stream ends (in practice,
/// forever, until the process is killed).
pub async fn run(paths: Vec<PathBuf>, database: Option<PathBuf>) -> CliResult<CliOutput> {
    for path in &paths {
        validate_directory(path)?;
    }
    let engine = build_engine(database)?;
    let watcher = Arc::new(engine.auto_watcher()?);
    for path in &paths {
        watcher.watch(path).await?;
    }

    let purge_scheduler = engine.purge_scheduler();
    tokio::spawn(purge_scheduler.run());

    tracing::info!(count = paths.len(), "watching director{}", if paths.len() == 1 { "y" } else { "ies" });
    watcher.run().await;
    Ok(CliOutput::ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn rejects_a_path_that_does_not_exist() {
        let result = run(vec![PathBuf::from("/definitely/not/a/real/path")], None).await;
        assert!(result.is_err());
    }
}
