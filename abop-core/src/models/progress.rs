//! Playback-progress records.
//!
//! The engine doesn't play audio (Non-goal, §1), but it owns the
//! bookkeeping a player would read: a progress record points at a specific
//! [`crate::models::file_segment::FileSegment`] plus an offset into it.
//! When a merge (§4.9) retires a segment, the merge operation rewrites
//! every progress record that pointed at it rather than leaving it
//! dangling.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Progress {
    pub id: String,
    pub book_id: String,
    pub segment_id: String,
    /// Offset into `segment_id`, in seconds.
    pub offset_seconds: f64,
    pub completed: bool,
    pub last_played: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Progress {
    #[must_use]
    pub fn new(book_id: &str, segment_id: &str, offset_seconds: f64) -> Self {
        let now = Utc::now();
        Self {
            id: crate::ids::new_id(),
            book_id: book_id.to_string(),
            segment_id: segment_id.to_string(),
            offset_seconds,
            completed: false,
            last_played: Some(now),
            created_at: now,
            updated_at: now,
        }
    }

    /// Rewrites this record onto a new segment, adding `cumulative_offset`
    /// (the duration of every segment that preceded the old one in merge
    /// order) to the existing offset — the rule in §4.9 step 3.
    pub fn rewrite_onto_merged_segment(&mut self, new_segment_id: &str, cumulative_offset: f64) {
        self.offset_seconds += cumulative_offset;
        self.segment_id = new_segment_id.to_string();
        self.updated_at = Utc::now();
    }

    pub fn mark_completed(&mut self) {
        self.completed = true;
        self.last_played = Some(Utc::now());
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rewrite_adds_cumulative_offset_and_repoints_segment() {
        let mut progress = Progress::new("book-1", "segment-a", 45.0);
        progress.rewrite_onto_merged_segment("segment-merged", 600.0);

        assert_eq!(progress.segment_id, "segment-merged");
        assert_eq!(progress.offset_seconds, 645.0);
    }
}
