//! Per-field metadata provenance (§3.6).
//!
//! Each tracked field on a [`crate::models::book::Book`] carries four
//! independent value slots plus a lock flag. The effective value is a pure,
//! deterministic function of those slots (§3.6, invariant #3 in §8) — there
//! is exactly one code path that computes it, [`FieldState::effective`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The fixed set of fields the provenance model tracks (§3.6). Modeled as
/// an enum rather than a string/JSON map so the effective-value rule stays
/// mechanically checkable (§9 "Provenance without dynamic typing").
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldName {
    Title,
    Author,
    Series,
    Narrator,
    Publisher,
    Language,
    Isbn10,
    Isbn13,
    PublishedYear,
    Description,
    CoverRef,
}

impl FieldName {
    /// All tracked fields, in the order they're usually displayed.
    pub const ALL: [Self; 11] = [
        Self::Title,
        Self::Author,
        Self::Series,
        Self::Narrator,
        Self::Publisher,
        Self::Language,
        Self::Isbn10,
        Self::Isbn13,
        Self::PublishedYear,
        Self::Description,
        Self::CoverRef,
    ];
}

/// Which slot produced the effective value, surfaced to the UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectiveSource {
    Override,
    Stored,
    Fetched,
    File,
    None,
}

/// The result of evaluating the §3.6 rule: either a value plus the slot it
/// came from, or nothing at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EffectiveValue {
    /// A non-null effective value, tagged with its source slot.
    Present(String),
    /// No slot held a value.
    Absent,
}

impl EffectiveValue {
    /// Converts to `Option<String>`, discarding source information.
    #[must_use]
    pub fn into_option(self) -> Option<String> {
        match self {
            Self::Present(v) => Some(v),
            Self::Absent => None,
        }
    }
}

/// The four provenance slots and lock flag for one field on one book.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FieldState {
    /// Value read from the audio file's tags at scan time.
    pub file_value: Option<String>,
    /// Value most recently returned by a metadata provider.
    pub fetched_value: Option<String>,
    /// Value written explicitly (scanner default, or a non-override edit).
    pub stored_value: Option<String>,
    /// Value the user pinned.
    pub override_value: Option<String>,
    /// When true, the effective value is frozen at `override_value` and no
    /// other operation (fetch, default scan write) may change what's
    /// displayed, though the other slots keep updating for comparison.
    pub override_locked: bool,
    pub updated_at: DateTime<Utc>,
}

impl FieldState {
    /// Computes the effective value per the §3.6 rule: override, then
    /// stored, then fetched, then file, then none. This is the *only* place
    /// that rule may be implemented (§8 invariant #3).
    #[must_use]
    pub fn effective(&self) -> EffectiveValue {
        self.override_value
            .clone()
            .or_else(|| self.stored_value.clone())
            .or_else(|| self.fetched_value.clone())
            .or_else(|| self.file_value.clone())
            .map_or(EffectiveValue::Absent, EffectiveValue::Present)
    }

    /// The slot that produced the current effective value.
    #[must_use]
    pub fn effective_source(&self) -> EffectiveSource {
        if self.override_value.is_some() {
            EffectiveSource::Override
        } else if self.stored_value.is_some() {
            EffectiveSource::Stored
        } else if self.fetched_value.is_some() {
            EffectiveSource::Fetched
        } else if self.file_value.is_some() {
            EffectiveSource::File
        } else {
            EffectiveSource::None
        }
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// `SetFile` (§4.4): scanner writes a tag-derived value. Refused if the
    /// field is locked.
    pub fn set_file(&mut self, value: Option<String>) {
        if self.override_locked {
            return;
        }
        self.file_value = value;
        self.touch();
    }

    /// `SetFetched` (§4.4): a provider result. Always updates `fetched_value`
    /// even when locked — only promotion to effective is blocked by the
    /// lock, not recording the candidate.
    pub fn set_fetched(&mut self, value: Option<String>) {
        self.fetched_value = value;
        self.touch();
    }

    /// `SetStored` (§4.4): default scan-time write or non-override user
    /// edit. Refused if locked.
    ///
    /// Returns `false` if the write was refused because the field is
    /// locked.
    pub fn set_stored(&mut self, value: Option<String>) -> bool {
        if self.override_locked {
            return false;
        }
        self.stored_value = value;
        self.touch();
        true
    }

    /// `SetOverride` (§4.4): always allowed; doesn't touch the other slots.
    pub fn set_override(&mut self, value: String) {
        self.override_value = Some(value);
        self.touch();
    }

    /// `ClearOverride` (§4.4): removes the override, optionally unlocking.
    pub fn clear_override(&mut self, unlock: bool) {
        self.override_value = None;
        if unlock {
            self.override_locked = false;
        }
        self.touch();
    }

    /// `Lock` (§4.4): toggles `override_locked`.
    pub fn set_locked(&mut self, locked: bool) {
        self.override_locked = locked;
        self.touch();
    }
}
