// mcp-schema/src/pagination.rs
// ============================================================================
// Module: Pagination
// Description: Opaque cursor type shared by every list method.
// Purpose: Enforce cursor opacity: callers forward the value
//          byte-identically and never parse it.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! [`Cursor`] deliberately exposes no accessor beyond `Display`/equality —
//! the only legal operations on a cursor are "pass it back unchanged" and
//! "compare for equality in a test". Any list method accepts an optional
//! cursor and returns a [`Page`] with an optional `next_cursor`.

use serde::Deserialize;
use serde::Serialize;

/// An opaque pagination cursor. Equality and cloning are provided so tests
/// can assert round-trip behavior; no other inspection is exposed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cursor(String);

impl Cursor {
    /// Wraps a server-minted opaque token. Only the server that minted a
    /// cursor should call this; clients receive cursors already wrapped.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

impl std::fmt::Display for Cursor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One page of a list result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    /// Items in this page.
    pub items: Vec<T>,
    /// Cursor for the next page, absent when this is the last page.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<Cursor>,
}

impl<T> Page<T> {
    /// Builds a page with no further pages.
    #[must_use]
    pub fn last(items: Vec<T>) -> Self {
        Self {
            items,
            next_cursor: None,
        }
    }

    /// Builds a page followed by more pages.
    #[must_use]
    pub fn with_next(items: Vec<T>, next_cursor: Cursor) -> Self {
        Self {
            items,
            next_cursor: Some(next_cursor),
        }
    }
}
