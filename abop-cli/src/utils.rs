//! Shared utilities for ABOP CLI
//!
//! This module contains utility functions used across different command
//! implementations: building an [`Engine`] from the `--database` flag, and
//! parsing the `FIELD=VALUE` syntax `book update` accepts.

use crate::constants::{APP_DIR_NAME, DEFAULT_DB_FILE};
use crate::error::{CliResult, CliResultExt};
use abop_core::models::provenance::FieldName;
use abop_core::store::{SqliteStore, Store};
use abop_core::{Config, Engine};
use anyhow::Context;
use std::path::PathBuf;
use std::sync::Arc;

/// Builds an engine over a `SQLite` store at `database`, or the platform
/// data directory's default database if `database` is `None`.
///
/// # Errors
///
/// Returns an error if the store can't be opened or the engine can't
/// recover its operation queue.
pub fn build_engine(database: Option<PathBuf>) -> CliResult<Engine> {
    let config = Config::load().with_engine_context("load config")?;
    let db_path = database.unwrap_or_else(default_db_path);
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating database directory {}", parent.display()))?;
    }
    tracing::info!("using database: {}", db_path.display());
    let store = SqliteStore::open_path(&db_path).with_engine_context("open database")?;
    let store: Arc<dyn Store> = Arc::new(store);
    Engine::with_defaults(store, config).with_engine_context("build engine")
}

/// The default database path: `<platform data dir>/abop/library.db`.
#[must_use]
pub fn default_db_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR_NAME)
        .join(DEFAULT_DB_FILE)
}

/// Parses one of the 11 tracked field names, case-insensitively.
///
/// # Errors
///
/// Returns an error if `name` doesn't match a known field.
pub fn parse_field_name(name: &str) -> CliResult<FieldName> {
    match name.to_lowercase().as_str() {
        "title" => Ok(FieldName::Title),
        "author" => Ok(FieldName::Author),
        "series" => Ok(FieldName::Series),
        "narrator" => Ok(FieldName::Narrator),
        "publisher" => Ok(FieldName::Publisher),
        "language" => Ok(FieldName::Language),
        "isbn10" => Ok(FieldName::Isbn10),
        "isbn13" => Ok(FieldName::Isbn13),
        "published_year" => Ok(FieldName::PublishedYear),
        "description" => Ok(FieldName::Description),
        "cover_ref" => Ok(FieldName::CoverRef),
        other => Err(anyhow::anyhow!(
            "unknown field '{other}' (expected one of: title, author, series, narrator, \
             publisher, language, isbn10, isbn13, published_year, description, cover_ref)"
        )),
    }
}

/// Splits a CLI `FIELD=VALUE` argument into its field name and raw value.
///
/// # Errors
///
/// Returns an error if `assignment` has no `=`, or the field name isn't
/// recognized.
pub fn parse_field_assignment(assignment: &str) -> CliResult<(FieldName, String)> {
    let (field, value) = assignment
        .split_once('=')
        .ok_or_else(|| anyhow::anyhow!("expected FIELD=VALUE, got '{assignment}'"))?;
    Ok((parse_field_name(field)?, value.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_every_known_field_name_case_insensitively() {
        assert_eq!(parse_field_name("Title").unwrap(), FieldName::Title);
        assert_eq!(parse_field_name("ISBN13").unwrap(), FieldName::Isbn13);
        assert_eq!(parse_field_name("published_year").unwrap(), FieldName::PublishedYear);
    }

    #[test]
    fn rejects_unknown_field_name() {
        assert!(parse_field_name("genre").is_err());
    }

    #[test]
    fn parses_field_assignment() {
        let (field, value) = parse_field_assignment("title=Neural Wraith").unwrap();
        assert_eq!(field, FieldName::Title);
        assert_eq!(value, "Neural Wraith");
    }

    #[test]
    fn rejects_assignment_without_equals() {
        assert!(parse_field_assignment("title").is_err());
    }

    #[test]
    fn default_db_path_ends_with_expected_components() {
        let path = default_db_path();
        assert_eq!(path.file_name().unwrap(), DEFAULT_DB_FILE);
        assert_eq!(path.parent().unwrap().file_name().unwrap(), APP_DIR_NAME);
    }
}
