//! The Organizer (§4.7): computes a canonical on-disk layout for a book's
//! active segments and, unless running as a dry run, carries it out.

use crate::error::{AppError, Result};
use crate::models::provenance::FieldName;
use crate::models::{Book, FileSegment, LibraryState, SourcePath};
use crate::repo;
use crate::state_machine;
use crate::store::Store;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// How a planned file move is physically carried out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrganizeStrategy {
    Move,
    Copy,
    Hardlink,
    /// Copy-on-write clone. Most filesystems exposed through `std::fs` don't
    /// have a portable reflink call, so this strategy falls back to a plain
    /// copy; a dedicated reflink crate would be a drop-in upgrade.
    Reflink,
}

/// The inputs the organizer needs beyond the book itself (§6.4).
#[derive(Debug, Clone)]
pub struct OrganizeConfig {
    pub root_dir: PathBuf,
    pub folder_pattern: String,
    pub file_pattern: String,
    pub strategy: OrganizeStrategy,
}

impl Default for OrganizeConfig {
    fn default() -> Self {
        Self {
            root_dir: PathBuf::new(),
            folder_pattern: "{author}/{series}/{title} ({year})".to_string(),
            file_pattern: "{title} - {author} - read by {narrator}".to_string(),
            strategy: OrganizeStrategy::Move,
        }
    }
}

/// One planned (or completed) file action.
#[derive(Debug, Clone)]
pub struct PlannedAction {
    pub segment_id: String,
    pub from: PathBuf,
    pub to: PathBuf,
    pub strategy: OrganizeStrategy,
}

/// The output of `Organize` (§4.7 contract): a list of actions, empty for
/// segments already at their canonical location.
#[derive(Debug, Clone, Default)]
pub struct OrganizePlan {
    pub actions: Vec<PlannedAction>,
}

/// Computes the organize plan for `book_id` and, unless `dry_run`, performs
/// it: creates destination directories, moves/copies/links each segment,
/// updates `FileSegment.path`, attaches a new `SourcePath`, marks the old
/// one `still_exists = false`, and transitions `imported -> organized`.
///
/// # Errors
///
/// Returns [`AppError::DestinationCollision`] if two segments would land on
/// the same path, a store error, or an I/O error (partial completion is
/// left in place per §4.7 "Failure semantics" — already-applied actions are
/// not rolled back).
pub fn organize(
    store: &dyn Store,
    book_id: &str,
    config: &OrganizeConfig,
    dry_run: bool,
) -> Result<OrganizePlan> {
    let book = repo::require_book(store, book_id)?;
    let segments = repo::list_segments_for_book(store, book_id)?
        .into_iter()
        .filter(|s| s.active)
        .collect::<Vec<_>>();

    let plan = build_plan(&book, &segments, config)?;

    if dry_run {
        return Ok(plan);
    }

    for dir in plan
        .actions
        .iter()
        .filter_map(|a| a.to.parent())
        .collect::<std::collections::BTreeSet<_>>()
    {
        std::fs::create_dir_all(dir).map_err(|e| AppError::io(dir.display().to_string(), e))?;
    }

    for action in &plan.actions {
        apply_action(action)?;
        relocate_segment(store, book_id, action)?;
    }

    if book.library_state != LibraryState::Organized {
        state_machine::transition(store, book_id, LibraryState::Organized)?;
    }
    Ok(plan)
}

fn build_plan(
    book: &Book,
    segments: &[FileSegment],
    config: &OrganizeConfig,
) -> Result<OrganizePlan> {
    let fields = field_map(book);
    let folder = render_path_template(&config.folder_pattern, &fields, '/');

    let mut actions = Vec::new();
    let mut seen_destinations: HashMap<PathBuf, String> = HashMap::new();

    for segment in segments {
        let extension = segment
            .path
            .extension()
            .map(|e| e.to_string_lossy().into_owned())
            .unwrap_or_else(|| segment.format.clone());
        let file_stem = render_path_template(&config.file_pattern, &fields, '-');
        let file_name = format!("{file_stem}.{extension}");

        let mut to = config.root_dir.clone();
        if !folder.is_empty() {
            to.push(&folder);
        }
        to.push(sanitize_component(&file_name));

        if let Some(first_segment_id) = seen_destinations.get(&to) {
            return Err(AppError::DestinationCollision {
                first: first_segment_id.clone(),
                second: segment.id.clone(),
                destination: to.display().to_string(),
            });
        }
        seen_destinations.insert(to.clone(), segment.id.clone());

        if to != segment.path {
            actions.push(PlannedAction {
                segment_id: segment.id.clone(),
                from: segment.path.clone(),
                to,
                strategy: config.strategy,
            });
        }
    }

    Ok(OrganizePlan { actions })
}

fn field_map(book: &Book) -> HashMap<&'static str, String> {
    let mut fields = HashMap::new();
    if let Some(v) = book.effective(FieldName::Author) {
        fields.insert("author", v);
    }
    if let Some(v) = book.effective(FieldName::Series) {
        fields.insert("series", v);
    }
    fields.insert("title", book.title.clone());
    if let Some(v) = book.effective(FieldName::Narrator) {
        fields.insert("narrator", v);
    }
    if let Some(v) = book.effective(FieldName::PublishedYear) {
        let year: String = v.chars().take(4).collect();
        if !year.is_empty() {
            fields.insert("year", year);
        }
    }
    fields
}

/// Renders a `{token}` pattern against `fields`, collapsing any path
/// segment (split on `component_sep`) whose sole clause references a
/// missing token, and dropping parenthetical groups whose token is missing
/// (§4.7 step 1: "missing fields collapse — no `//`, no trailing `-`").
fn render_path_template(pattern: &str, fields: &HashMap<&'static str, String>, component_sep: char) -> String {
    pattern
        .split(component_sep)
        .filter_map(|component| render_component(component, fields))
        .collect::<Vec<_>>()
        .join(&component_sep.to_string())
}

fn render_component(component: &str, fields: &HashMap<&'static str, String>) -> Option<String> {
    let without_parens = drop_unresolved_parens(component, fields);
    let rendered = without_parens
        .split(" - ")
        .filter(|clause| clause_resolves(clause, fields))
        .map(|clause| substitute_tokens(clause, fields))
        .collect::<Vec<_>>()
        .join(" - ");
    let trimmed = rendered.trim();
    (!trimmed.is_empty()).then(|| sanitize_component(trimmed))
}

/// Removes any `(...)` group whose placeholder doesn't resolve, along with
/// one leading space, e.g. `"{title} ({year})"` with no year becomes
/// `"{title}"`.
fn drop_unresolved_parens(text: &str, fields: &HashMap<&'static str, String>) -> String {
    let Some(open) = text.find('(') else {
        return text.to_string();
    };
    let Some(close) = text[open..].find(')').map(|i| open + i) else {
        return text.to_string();
    };
    let inner = &text[open + 1..close];
    if clause_resolves(inner, fields) {
        return text.to_string();
    }
    let before = text[..open].trim_end();
    let after = &text[close + 1..];
    format!("{before}{after}")
}

fn clause_resolves(clause: &str, fields: &HashMap<&'static str, String>) -> bool {
    token_names(clause).iter().all(|name| fields.contains_key(name.as_str()))
}

fn token_names(clause: &str) -> Vec<String> {
    let mut names = Vec::new();
    let mut rest = clause;
    while let Some(open) = rest.find('{') {
        let Some(close) = rest[open..].find('}').map(|i| open + i) else {
            break;
        };
        names.push(rest[open + 1..close].to_string());
        rest = &rest[close + 1..];
    }
    names
}

fn substitute_tokens(clause: &str, fields: &HashMap<&'static str, String>) -> String {
    let mut result = clause.to_string();
    for name in token_names(clause) {
        if let Some(value) = fields.get(name.as_str()) {
            result = result.replace(&format!("{{{name}}}"), value);
        }
    }
    result
}

/// Replaces characters illegal in a path component on common filesystems
/// with `_` (§4.7 step 1).
fn sanitize_component(component: &str) -> String {
    component
        .chars()
        .map(|c| if matches!(c, '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*') || c.is_control() {
            '_'
        } else {
            c
        })
        .collect::<String>()
        .trim_end_matches(['.', ' '])
        .to_string()
}

fn apply_action(action: &PlannedAction) -> Result<()> {
    let to_err = |e: std::io::Error| AppError::io(action.to.display().to_string(), e);
    match action.strategy {
        OrganizeStrategy::Move => {
            if std::fs::rename(&action.from, &action.to).is_err() {
                std::fs::copy(&action.from, &action.to).map_err(to_err)?;
                std::fs::remove_file(&action.from).map_err(to_err)?;
            }
        }
        OrganizeStrategy::Copy | OrganizeStrategy::Reflink => {
            std::fs::copy(&action.from, &action.to).map_err(to_err)?;
        }
        OrganizeStrategy::Hardlink => {
            std::fs::hard_link(&action.from, &action.to).map_err(to_err)?;
        }
    }
    Ok(())
}

fn relocate_segment(store: &dyn Store, book_id: &str, action: &PlannedAction) -> Result<()> {
    let mut segment = repo::get_segment(store, &action.segment_id)?
        .ok_or_else(|| AppError::not_found("segment", &action.segment_id))?;
    segment.path = action.to.clone();
    repo::put_segment(store, &segment)?;

    if let Some(mut old) = repo::get_source_path_by_path(store, &action.from)? {
        old.still_exists = false;
        repo::put_source_path(store, &old)?;
    }
    let new_source = SourcePath::new(book_id, action.to.clone());
    repo::insert_source_path(store, &new_source)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use tempfile::tempdir;

    fn book_with_fields(title: &str, author: Option<&str>, narrator: Option<&str>) -> Book {
        let mut book = Book::new_imported(title);
        if let Some(a) = author {
            book.fields.entry(FieldName::Author).or_default().set_file(Some(a.to_string()));
        }
        if let Some(n) = narrator {
            book.fields.entry(FieldName::Narrator).or_default().set_file(Some(n.to_string()));
        }
        book
    }

    #[test]
    fn missing_series_and_narrator_collapse_without_stray_separators() {
        let book = book_with_fields("Neural Wraith", Some("K.D. Robertson"), None);
        let fields = field_map(&book);
        let folder = render_path_template("{author}/{series}/{title} ({year})", &fields, '/');
        assert_eq!(folder, "K.D. Robertson/Neural Wraith");

        let file = render_path_template("{title} - {author} - read by {narrator}", &fields, '-');
        assert_eq!(file, "Neural Wraith - K.D. Robertson");
    }

    #[test]
    fn illegal_characters_are_replaced() {
        assert_eq!(sanitize_component("Who: What?"), "Who_ What_");
    }

    #[test]
    fn two_segments_mapping_to_the_same_destination_is_a_collision() {
        let store = MemoryStore::default();
        let dir = tempdir().unwrap();
        let book = Book::new_imported("Same Title");
        repo::put_book(&store, &book).unwrap();

        for name in ["a.mp3", "b.mp3"] {
            let segment = FileSegment::new(
                &book.id,
                dir.path().join(name),
                "mp3".to_string(),
                10,
                format!("{:0<64}", name),
            );
            repo::insert_segment(&store, &segment).unwrap();
        }

        let config = OrganizeConfig {
            root_dir: dir.path().to_path_buf(),
            ..OrganizeConfig::default()
        };
        let result = organize(&store, &book.id, &config, true);
        assert!(matches!(result, Err(AppError::DestinationCollision { .. })));
    }

    #[test]
    fn dry_run_does_not_touch_the_filesystem_or_transition_state() {
        let store = MemoryStore::default();
        let dir = tempdir().unwrap();
        let source = dir.path().join("source.mp3");
        std::fs::write(&source, b"audio").unwrap();

        let book = book_with_fields("Neural Wraith", Some("K.D. Robertson"), None);
        repo::put_book(&store, &book).unwrap();
        let segment = FileSegment::new(&book.id, source.clone(), "mp3".to_string(), 5, "a".repeat(64));
        repo::insert_segment(&store, &segment).unwrap();

        let config = OrganizeConfig {
            root_dir: dir.path().join("library"),
            ..OrganizeConfig::default()
        };
        let plan = organize(&store, &book.id, &config, true).unwrap();
        assert_eq!(plan.actions.len(), 1);
        assert!(source.exists());

        let reloaded = repo::require_book(&store, &book.id).unwrap();
        assert_eq!(reloaded.library_state, LibraryState::Imported);
    }

    #[test]
    fn organizing_moves_the_file_and_transitions_to_organized() {
        let store = MemoryStore::default();
        let dir = tempdir().unwrap();
        let source = dir.path().join("source.mp3");
        std::fs::write(&source, b"audio").unwrap();

        let book = book_with_fields("Neural Wraith", Some("K.D. Robertson"), None);
        repo::put_book(&store, &book).unwrap();
        let segment = FileSegment::new(&book.id, source.clone(), "mp3".to_string(), 5, "b".repeat(64));
        repo::insert_segment(&store, &segment).unwrap();
        let source_path = SourcePath::new(&book.id, source.clone());
        repo::insert_source_path(&store, &source_path).unwrap();

        let config = OrganizeConfig {
            root_dir: dir.path().join("library"),
            strategy: OrganizeStrategy::Move,
            ..OrganizeConfig::default()
        };
        organize(&store, &book.id, &config, false).unwrap();

        assert!(!source.exists());
        let reloaded = repo::require_book(&store, &book.id).unwrap();
        assert_eq!(reloaded.library_state, LibraryState::Organized);

        let moved_segment = repo::get_segment(&store, &segment.id).unwrap().unwrap();
        assert!(moved_segment.path.starts_with(dir.path().join("library")));

        let old_source = repo::get_source_path_by_path(&store, &source).unwrap().unwrap();
        assert!(!old_source.still_exists);
    }
}
