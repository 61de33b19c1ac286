//! Best-effort `(title, author, series, position)` extraction from a file
//! path (§4.2). Pure function — never touches the filesystem.

use crate::constants::PARENT_DIR_SKIP_SET;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ParsedFilename {
    pub title: String,
    pub author: Option<String>,
    pub series: Option<String>,
    pub position: Option<u32>,
}

/// Parses `path` into a best-effort `(title, author, series, position)`
/// tuple per §4.2's algorithm.
#[must_use]
pub fn parse(path: &Path) -> ParsedFilename {
    let file_stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let parent_dir = path
        .parent()
        .and_then(Path::file_name)
        .map(|s| s.to_string_lossy().into_owned());

    let (title, author_from_stem) = split_title_author(&file_stem);

    let author = author_from_stem.or_else(|| {
        parent_dir
            .as_deref()
            .filter(|dir| !PARENT_DIR_SKIP_SET.contains(&dir.to_lowercase().as_str()))
            .map(ToString::to_string)
    });

    let position = find_position_token(&file_stem);
    let series = find_series_name(&file_stem, position);

    ParsedFilename {
        title,
        author,
        series,
        position,
    }
}

/// Splits `stem` on " - " and decides, via the personal-name heuristic,
/// which half (if either) is the author.
fn split_title_author(stem: &str) -> (String, Option<String>) {
    let Some((left, right)) = stem.split_once(" - ") else {
        return (stem.trim().to_string(), None);
    };
    let left = left.trim();
    let right = right.trim();

    match (is_name_like(left), is_name_like(right)) {
        (true, true) | (false, true) => (left.to_string(), Some(right.to_string())),
        (true, false) => (right.to_string(), Some(left.to_string())),
        (false, false) => (stem.trim().to_string(), None),
    }
}

/// A half is "name-like" if it contains initials with dots (`J.K. Rowling`)
/// or is made of 2-4 capitalized tokens.
fn is_name_like(candidate: &str) -> bool {
    if candidate.is_empty() {
        return false;
    }
    if has_initials(candidate) {
        return true;
    }

    let tokens: Vec<&str> = candidate.split_whitespace().collect();
    if !(2..=4).contains(&tokens.len()) {
        return false;
    }
    tokens
        .iter()
        .all(|token| token.chars().next().is_some_and(char::is_uppercase))
}

fn has_initials(candidate: &str) -> bool {
    candidate
        .split_whitespace()
        .any(|token| token.len() <= 3 && token.contains('.') && token.chars().any(char::is_uppercase))
}

/// Detects a numeric position token (`Book 1`, `#1`, `Vol. 1`, `Series Name 02`).
fn find_position_token(stem: &str) -> Option<u32> {
    let lower = stem.to_lowercase();

    for marker in ["book", "vol.", "vol", "#"] {
        if let Some(idx) = lower.find(marker) {
            let after = &stem[idx + marker.len()..];
            if let Some(number) = leading_number(after) {
                return Some(number);
            }
        }
    }

    // Fall back to a trailing number anywhere in the stem, e.g.
    // "Series Name 02".
    stem.split(|c: char| !c.is_ascii_digit())
        .filter(|token| !token.is_empty())
        .next_back()
        .and_then(|token| token.parse::<u32>().ok())
}

fn leading_number(text: &str) -> Option<u32> {
    let trimmed = text.trim_start_matches(|c: char| c.is_whitespace() || c == '.' || c == '#');
    let digits: String = trimmed.chars().take_while(char::is_ascii_digit).collect();
    if digits.is_empty() {
        None
    } else {
        digits.parse().ok()
    }
}

/// If a position token was found, the text before it (minus the marker
/// word) is treated as the series name when non-empty.
fn find_series_name(stem: &str, position: Option<u32>) -> Option<String> {
    let position = position?;
    let lower = stem.to_lowercase();
    let position_str = position.to_string();
    let marker_idx = lower
        .find("book")
        .or_else(|| lower.find("vol"))
        .or_else(|| lower.find('#'))
        .or_else(|| lower.find(&position_str));

    marker_idx.and_then(|idx| {
        let candidate = stem[..idx].trim().trim_end_matches(['-', '_', ':']).trim();
        (!candidate.is_empty()).then(|| candidate.to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_dash_author_with_initials_picks_author_half() {
        let parsed = parse(Path::new("/library/Neural Wraith - J.K. Rowling.mp3"));
        assert_eq!(parsed.title, "Neural Wraith");
        assert_eq!(parsed.author.as_deref(), Some("J.K. Rowling"));
    }

    #[test]
    fn author_dash_title_when_author_half_is_first() {
        let parsed = parse(Path::new("/library/Brandon Sanderson - The Stormlight Archive.mp3"));
        assert_eq!(parsed.author.as_deref(), Some("Brandon Sanderson"));
        assert_eq!(parsed.title, "The Stormlight Archive");
    }

    #[test]
    fn neither_half_name_like_keeps_whole_stem_as_title() {
        let parsed = parse(Path::new("/library/chapter one - continued.mp3"));
        assert_eq!(parsed.title, "chapter one - continued");
        assert_eq!(parsed.author, None);
    }

    #[test]
    fn parent_dir_used_as_author_when_not_in_skip_set() {
        let parsed = parse(Path::new("/library/K.D. Robertson/Neural Wraith.mp3"));
        assert_eq!(parsed.author.as_deref(), Some("K.D. Robertson"));
    }

    #[test]
    fn parent_dir_in_skip_set_is_not_used_as_author() {
        let parsed = parse(Path::new("/downloads/Neural Wraith.mp3"));
        assert_eq!(parsed.author, None);
    }

    #[test]
    fn detects_book_number_position_token() {
        let parsed = parse(Path::new("/library/Mistborn Book 1.mp3"));
        assert_eq!(parsed.position, Some(1));
    }

    #[test]
    fn detects_hash_position_token() {
        let parsed = parse(Path::new("/library/Mistborn #2.mp3"));
        assert_eq!(parsed.position, Some(2));
    }

    #[test]
    fn no_position_token_when_stem_has_no_digits() {
        let parsed = parse(Path::new("/library/Neural Wraith.mp3"));
        assert_eq!(parsed.position, None);
    }
}
