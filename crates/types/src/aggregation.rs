//! Derived community-wide needs views. Computed on demand, never persisted.

use crate::{ItemId, Priority};
use serde::{Deserialize, Serialize};

/// Which need family an aggregate row came from.
///
/// Rows from the two families are kept separate even when they cover the same
/// item; `Both` exists for callers that choose to merge per-item totals
/// themselves.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NeedSource {
    Member,
    Council,
    Both,
}

/// One aggregate row: all active needs for one item at one priority from one
/// source.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NeedAggregate {
    pub item_id: ItemId,
    pub item_name: String,
    pub priority: Priority,
    pub total_units_requested: u64,
    /// Distinct members (member rows) or distinct councils (council rows).
    pub participant_count: usize,
    pub source: NeedSource,
}

/// The community dashboard view: aggregate rows partitioned by priority.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct CommunityNeedsView {
    pub needs: Vec<NeedAggregate>,
    pub wants: Vec<NeedAggregate>,
}
