//! Series entity (§3.2).

use crate::models::book::normalize_title;
use serde::{Deserialize, Serialize};

/// A book series, shared by reference across many [`crate::models::book::Book`]s.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Series {
    pub id: String,
    pub title: String,
    pub normalized_title: String,
    pub author_id: Option<String>,
    /// If set, the user wants every book in this series (§3.2).
    pub wanted: bool,
}

impl Series {
    #[must_use]
    pub fn new(title: &str, author_id: Option<String>) -> Self {
        Self {
            id: crate::ids::new_id(),
            title: title.to_string(),
            normalized_title: normalize_title(title),
            author_id,
            wanted: false,
        }
    }
}
