//! Work entity: groups editions/narrations sharing a title+author (§3.2).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Work {
    pub id: String,
    pub title: String,
    pub author_id: Option<String>,
    pub alt_titles: Vec<String>,
}

impl Work {
    #[must_use]
    pub fn new(title: &str, author_id: Option<String>) -> Self {
        Self {
            id: crate::ids::new_id(),
            title: title.to_string(),
            author_id,
            alt_titles: Vec::new(),
        }
    }
}
