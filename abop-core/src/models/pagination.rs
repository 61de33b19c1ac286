//! Pagination helpers shared by every listing verb (§6.2, §8 boundary
//! behaviors: `limit=0` → 0 items, `limit=∞` clamps to 1000, negative
//! offset clamps to 0).

use crate::constants::{DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT};
use serde::{Deserialize, Serialize};

/// A requested page of results. `limit`/`offset` are clamped on
/// construction so downstream code never has to re-check boundaries.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PageRequest {
    pub limit: usize,
    pub offset: usize,
}

impl PageRequest {
    /// Builds a request, clamping `limit` to `[0, MAX_PAGE_LIMIT]`. There is
    /// no negative `usize`, so "negative offset clamps to 0" is automatic
    /// for any Rust caller; callers coming from a signed transport layer
    /// clamp before reaching this type.
    #[must_use]
    pub fn new(limit: usize, offset: usize) -> Self {
        Self {
            limit: limit.min(MAX_PAGE_LIMIT),
            offset,
        }
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            limit: DEFAULT_PAGE_LIMIT,
            offset: 0,
        }
    }
}

/// A page of results plus the total count available, for client-side
/// pagination controls.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: usize,
    pub limit: usize,
    pub offset: usize,
}

impl<T> Page<T> {
    /// Slices `all` according to `request`, preserving `all`'s order.
    #[must_use]
    pub fn slice(all: Vec<T>, request: PageRequest) -> Self {
        let total = all.len();
        let items = all
            .into_iter()
            .skip(request.offset)
            .take(request.limit)
            .collect();
        Self {
            items,
            total,
            limit: request.limit,
            offset: request.offset,
        }
    }
}
