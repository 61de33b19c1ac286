//! Application-level error types for ABOP CLI
//!
//! This module defines the error types used throughout the CLI application,
//! following modern Rust error handling practices with anyhow for application
//! code and clear error messages for users.

use anyhow::{Context, Result};
use std::path::Path;

/// Result type used throughout the CLI. Lower-level errors from `abop_core`
/// are wrapped with context using anyhow.
pub type CliResult<T> = Result<T>;

/// Extension trait for adding CLI-specific context to errors
pub trait CliResultExt<T> {
    /// Add context for engine operation errors
    fn with_engine_context(self, operation: &str) -> CliResult<T>;
}

impl<T, E> CliResultExt<T> for std::result::Result<T, E>
where
    E: Into<anyhow::Error>,
{
    fn with_engine_context(self, operation: &str) -> CliResult<T> {
        self.map_err(|e| e.into())
            .with_context(|| format!("'{operation}' failed"))
    }
}

/// Validate that a directory path exists and is a directory (used for scan
/// and import roots)
pub fn validate_directory(path: &Path) -> CliResult<()> {
    if !path.exists() {
        return Err(anyhow::anyhow!(
            "path does not exist: {}",
            path.display()
        ));
    }

    if !path.is_dir() {
        return Err(anyhow::anyhow!(
            "path is not a directory: {}",
            path.display()
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_validate_directory_success() {
        let temp_dir = TempDir::new().unwrap();
        let result = validate_directory(temp_dir.path());
        assert!(result.is_ok());
    }

    #[test]
    fn test_validate_directory_not_exists() {
        let path = std::path::Path::new("/nonexistent/path");
        let result = validate_directory(path);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("does not exist"));
    }

    #[test]
    fn test_validate_directory_not_a_directory() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("not_a_directory.txt");
        std::fs::write(&file_path, "test content").unwrap();

        let result = validate_directory(&file_path);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("not a directory"));
    }

    #[test]
    fn test_with_engine_context() {
        let error: std::result::Result<(), std::io::Error> =
            Err(std::io::Error::new(std::io::ErrorKind::Other, "test error"));
        let result = error.with_engine_context("test operation");
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("'test operation' failed"));
    }
}
