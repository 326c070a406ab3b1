//! The session-tag codec that multiplexes one agent identity over several
//! concurrent instances.
//!
//! A session is a logical sub-identity of an agent's `client_id`: two
//! processes both claiming to be `alice` can still be addressed separately
//! by tagging their traffic with distinct session tags. The tag travels
//! with the message in two ways, chosen per §9 of the design:
//!
//! - as the indexed `messages.session_id` column (the primary path), and
//! - as a legacy `"[session:<tag>] "` prefix on `content`, decoded on read
//!   for rows written before the column existed.
//!
//! Both representations round-trip to the same tag; callers never need to
//! know which one a given row uses.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// A session tag: an opaque per-instance sub-identity of an agent.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionTag(String);

impl SessionTag {
    /// Wraps an existing tag value, e.g. one supplied explicitly by a caller.
    #[must_use]
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    /// Synthesises a fresh, collision-resistant tag.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Returns the tag as a plain string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for SessionTag {
    fn from(value: String) -> Self {
        Self(value)
    }
}

const PREFIX: &str = "[session:";

/// Prepends the legacy `"[session:<tag>] "` marker to `content`.
///
/// Used only when writing through a code path that still populates the
/// content prefix for backward compatibility; the primary path writes the
/// tag to the `session_id` column instead and leaves `content` untouched.
#[must_use]
pub fn encode(content: &str, tag: &SessionTag) -> String {
    format!("{PREFIX}{tag}] {content}")
}

/// Decodes a legacy content-prefix session tag, if present.
///
/// Returns the stripped content and the tag, or the original content
/// unchanged with no tag when `content` carries no recognisable prefix.
#[must_use]
pub fn decode(content: &str) -> (Option<SessionTag>, &str) {
    let Some(after_marker) = content.strip_prefix(PREFIX) else {
        return (None, content);
    };
    let Some((tag, rest)) = after_marker.split_once(']') else {
        return (None, content);
    };
    let rest = rest.strip_prefix(' ').unwrap_or(rest);
    (Some(SessionTag::new(tag)), rest)
}

/// Whether stored content carries the legacy prefix for `tag`, used by
/// adapters that still need to fall back to a substring match on rows
/// written before the `session_id` column existed.
#[must_use]
pub fn content_matches_tag(content: &str, tag: &SessionTag) -> bool {
    content.contains(&format!("{PREFIX}{tag}]"))
}
