//! The scanner's output type (§4.3 contract).

use crate::capabilities::TagValues;
use crate::filename_parser::ParsedFilename;
use std::path::PathBuf;

/// One physical file within a [`DiscoveredBook`], already hashed and tagged.
#[derive(Debug, Clone)]
pub struct DiscoveredFile {
    pub path: PathBuf,
    pub size_bytes: u64,
    /// Lowercase extension without the leading dot, e.g. `"mp3"`.
    pub format: String,
    pub content_hash: String,
    pub tags: TagValues,
}

/// A candidate audiobook produced by grouping, hashing, tagging, and
/// filename-parsing one directory run of files. Not yet reconciled against
/// the store — that's [`crate::dedup::DedupEngine`]'s job.
#[derive(Debug, Clone)]
pub struct DiscoveredBook {
    /// A freshly generated id, usable as the new `Book.id` if the dedup
    /// engine decides this candidate is genuinely new.
    pub candidate_id: String,
    pub files: Vec<DiscoveredFile>,
    pub parsed: ParsedFilename,
}

impl DiscoveredBook {
    #[must_use]
    pub fn total_bytes(&self) -> u64 {
        self.files.iter().map(|f| f.size_bytes).sum()
    }

    /// The hash used for dedup matching: the first file's content hash.
    /// Multi-file groups are matched as a unit by their first segment,
    /// consistent with how the merge operation treats segment order.
    #[must_use]
    pub fn primary_hash(&self) -> Option<&str> {
        self.files.first().map(|f| f.content_hash.as_str())
    }
}
