//! `book` commands: list, get, update, delete, restore.

use crate::error::CliResult;
use crate::output::CliOutput;
use crate::utils::build_engine;
use abop_core::engine::{BookFilter, BookUpdate, FieldUpdate};
use abop_core::models::provenance::FieldName;
use abop_core::{LibraryState, PageRequest};
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;

/// One `--set`/`--clear-stored`/`--override`/`--clear-override` edit parsed
/// from the command line.
#[derive(Debug, Clone)]
pub enum FieldEdit {
    Set(FieldName, String),
    ClearStored(FieldName),
    Override(FieldName, String),
    ClearOverride(FieldName),
}

/// # Errors
///
/// Returns an error if the engine can't be built or the listing fails.
pub fn list(
    library_state: Option<String>,
    author_id: Option<String>,
    series_id: Option<String>,
    search: Option<String>,
    limit: usize,
    offset: usize,
    database: Option<PathBuf>,
) -> CliResult<CliOutput> {
    let engine = build_engine(database)?;
    let library_state = library_state.map(|s| parse_library_state(&s)).transpose()?;
    let filter = BookFilter { library_state, author_id, series_id, search };
    let page = engine.list_books(&filter, PageRequest::new(limit, offset))?;
    Ok(CliOutput::book_list(page))
}

/// # Errors
///
/// Returns an error if `id` doesn't resolve, or the engine can't be built.
pub fn get(id: String, database: Option<PathBuf>) -> CliResult<CliOutput> {
    let engine = build_engine(database)?;
    let book = engine.get_book(&id)?;
    Ok(CliOutput::book(book))
}

/// # Errors
///
/// Returns an error if `id` doesn't resolve, an edit names an unknown
/// field, or the engine can't be built.
pub async fn update(
    id: String,
    edits: Vec<FieldEdit>,
    tags: Option<Vec<String>>,
    database: Option<PathBuf>,
) -> CliResult<CliOutput> {
    let engine = build_engine(database)?;
    let mut fields: HashMap<FieldName, FieldUpdate> = HashMap::new();
    for edit in edits {
        match edit {
            FieldEdit::Set(field, value) => {
                fields.insert(field, FieldUpdate { value: Some(value), as_override: false });
            }
            FieldEdit::ClearStored(field) => {
                fields.insert(field, FieldUpdate { value: None, as_override: false });
            }
            FieldEdit::Override(field, value) => {
                fields.insert(field, FieldUpdate { value: Some(value), as_override: true });
            }
            FieldEdit::ClearOverride(field) => {
                fields.insert(field, FieldUpdate { value: None, as_override: true });
            }
        }
    }
    let update = BookUpdate { fields, tags: tags.map(|t| t.into_iter().collect::<HashSet<_>>()) };
    let book = engine.update_book(&id, update).await?;
    Ok(CliOutput::book(book))
}

/// # Errors
///
/// Returns an error if `id` doesn't resolve, or the engine can't be built.
pub async fn delete(
    id: String,
    prevent_reimport: bool,
    reason: Option<String>,
    database: Option<PathBuf>,
) -> CliResult<CliOutput> {
    let engine = build_engine(database)?;
    engine.delete_book(&id, true, prevent_reimport, reason).await?;
    Ok(CliOutput::ok())
}

/// # Errors
///
/// Returns an error if `id` isn't currently deleted, or the engine can't
/// be built.
pub async fn restore(id: String, database: Option<PathBuf>) -> CliResult<CliOutput> {
    let engine = build_engine(database)?;
    let book = engine.restore_book(&id).await?;
    Ok(CliOutput::book(book))
}

fn parse_library_state(state: &str) -> CliResult<LibraryState> {
    match state.to_lowercase().as_str() {
        "wanted" => Ok(LibraryState::Wanted),
        "imported" => Ok(LibraryState::Imported),
        "organized" => Ok(LibraryState::Organized),
        "deleted" => Ok(LibraryState::Deleted),
        other => Err(anyhow::anyhow!(
            "unknown library state '{other}' (expected one of: wanted, imported, organized, deleted)"
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_every_known_library_state() {
        assert_eq!(parse_library_state("Wanted").unwrap(), LibraryState::Wanted);
        assert_eq!(parse_library_state("deleted").unwrap(), LibraryState::Deleted);
    }

    #[test]
    fn rejects_unknown_library_state() {
        assert!(parse_library_state("archived").is_err());
    }
}
