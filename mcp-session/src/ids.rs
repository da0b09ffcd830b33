// mcp-session/src/ids.rs
// ============================================================================
// Module: Session Id Generator
// Description: Produces unique request ids of the form "<prefix>-<counter>".
// Purpose: Give each session a cheap, collision-free id stream without a
//          global registry.
// Dependencies: mcp-schema, rand
// ============================================================================

//! ## Overview
//! Ids are `"<session-prefix>-<n>"`, where `n` is a monotonically
//! increasing per-session counter. The prefix is a short random token so
//! that ids from distinct sessions sharing a log stream are visually
//! distinguishable; uniqueness across sessions is never required by the
//! protocol (ids only need to be unique for the lifetime of one session).

use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use mcp_schema::RequestId;
use rand::Rng;
use rand::distributions::Alphanumeric;

/// Generates `RequestId::Str` values unique within one session.
#[derive(Debug)]
pub struct SessionIdGenerator {
    prefix: String,
    counter: AtomicU64,
}

impl SessionIdGenerator {
    /// Builds a generator with a freshly-rolled random prefix.
    #[must_use]
    pub fn new() -> Self {
        let prefix: String =
            rand::thread_rng().sample_iter(&Alphanumeric).take(6).map(char::from).collect();
        Self::with_prefix(prefix)
    }

    /// Builds a generator with an explicit prefix, useful for tests and for
    /// servers that want the prefix to carry a session id.
    #[must_use]
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            counter: AtomicU64::new(0),
        }
    }

    /// Produces the next id in the sequence.
    pub fn next(&self) -> RequestId {
        let n = self.counter.fetch_add(1, Ordering::Relaxed);
        RequestId::Str(format!("{prefix}-{n}", prefix = self.prefix))
    }
}

impl Default for SessionIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_monotonic_and_prefixed() {
        let gen = SessionIdGenerator::with_prefix("c3f1a9");
        assert_eq!(gen.next().to_string(), "c3f1a9-0");
        assert_eq!(gen.next().to_string(), "c3f1a9-1");
    }

    #[test]
    fn default_prefixes_differ() {
        let a = SessionIdGenerator::new();
        let b = SessionIdGenerator::new();
        assert_ne!(a.next().to_string(), b.next().to_string());
    }
}
