//! Author entity (§3.2).

use crate::models::book::normalize_title;
use serde::{Deserialize, Serialize};

/// A book author, shared by reference across many [`crate::models::book::Book`]s.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Author {
    pub id: String,
    pub name: String,
    pub normalized_name: String,
    /// If set, the user wants every book by this author (§3.2).
    pub wanted: bool,
}

impl Author {
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            id: crate::ids::new_id(),
            name: name.to_string(),
            normalized_name: normalize_title(name),
            wanted: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalized_name_is_derived_from_name() {
        let author = Author::new("K.D. Robertson");
        assert_eq!(author.normalized_name, "kd robertson");
    }
}
