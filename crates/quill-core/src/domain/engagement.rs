//! Denormalized engagement counters.

use serde::{Deserialize, Serialize};

/// Whether a write counts as a content edit.
///
/// `Bump` advances `updated_at`; `Quiet` leaves it alone, which is what
/// counter refreshes use so they never look like edits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Touch {
    Bump,
    Quiet,
}

/// Like and comment totals recounted from their source tables.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngagementCounts {
    pub like_count: i64,
    pub comment_count: i64,
}

/// Result of a like or unlike.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LikeOutcome {
    pub liked: bool,
    pub likes_count: i64,
}
