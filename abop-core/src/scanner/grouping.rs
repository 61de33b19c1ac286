//! Groups discovered files into candidate audiobooks (§4.3 step 3). Pure
//! function over an already-ordered file list — no filesystem access.

use std::path::{Path, PathBuf};

const TRACK_WORD_MARKERS: &[&str] = &["track", "part", "disc", "cd", "chapter"];

/// Groups consecutive same-directory files whose names share a common
/// prefix and differ only by a trailing track-number token. A file with no
/// detectable track token, or one that breaks the run, starts a new group.
#[must_use]
pub fn group_files(files: &[PathBuf]) -> Vec<Vec<PathBuf>> {
    let mut groups: Vec<Vec<PathBuf>> = Vec::new();
    let mut current_dir: Option<&Path> = None;
    let mut current_base: Option<String> = None;

    for path in files {
        let dir = path.parent();
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let base = track_stripped_base(&stem);

        let continues_run = base.is_some()
            && dir == current_dir
            && base == current_base;

        if continues_run {
            groups.last_mut().expect("run implies a prior group").push(path.clone());
        } else {
            groups.push(vec![path.clone()]);
            current_dir = dir;
            current_base = base;
        }
    }

    groups
}

/// Strips a trailing track-number token (and an optional track-word marker
/// immediately before it, e.g. "Track 03") from `stem`, returning `None` if
/// `stem` has no trailing digit run at all — such a file can never
/// continue a group, it can only start one.
fn track_stripped_base(stem: &str) -> Option<String> {
    let trimmed = stem.trim_end();
    let digit_start = trimmed
        .char_indices()
        .rev()
        .take_while(|(_, c)| c.is_ascii_digit())
        .last()
        .map(|(i, _)| i)?;

    let mut head = trimmed[..digit_start].trim_end_matches(|c: char| {
        c == '-' || c == '_' || c == '.' || c == '#' || c.is_whitespace()
    });

    let lower_head = head.to_lowercase();
    for marker in TRACK_WORD_MARKERS {
        if lower_head.ends_with(marker) {
            head = &head[..head.len() - marker.len()];
            head = head.trim_end_matches(|c: char| {
                c == '-' || c == '_' || c == '.' || c == '#' || c.is_whitespace()
            });
            break;
        }
    }

    Some(head.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn groups_consecutive_tracks_in_same_directory() {
        let files = vec![
            PathBuf::from("/lib/Neural Wraith Track 01.mp3"),
            PathBuf::from("/lib/Neural Wraith Track 02.mp3"),
            PathBuf::from("/lib/Neural Wraith Track 03.mp3"),
        ];
        let groups = group_files(&files);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].len(), 3);
    }

    #[test]
    fn files_with_no_track_token_each_stand_alone() {
        let files = vec![
            PathBuf::from("/lib/Neural Wraith.mp3"),
            PathBuf::from("/lib/Other Book.mp3"),
        ];
        let groups = group_files(&files);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].len(), 1);
        assert_eq!(groups[1].len(), 1);
    }

    #[test]
    fn different_directories_never_share_a_group() {
        let files = vec![
            PathBuf::from("/lib/a/Book 01.mp3"),
            PathBuf::from("/lib/b/Book 02.mp3"),
        ];
        let groups = group_files(&files);
        assert_eq!(groups.len(), 2);
    }

    #[test]
    fn differing_prefixes_break_the_run() {
        let files = vec![
            PathBuf::from("/lib/Book A 01.mp3"),
            PathBuf::from("/lib/Book B 01.mp3"),
        ];
        let groups = group_files(&files);
        assert_eq!(groups.len(), 2);
    }
}
