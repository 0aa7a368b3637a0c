//! The distribution ledger - immutable records of units granted from a pool.

use crate::{DistributionId, ItemId, MemberId, PoolId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One append-only ledger entry. Never mutated after creation.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Distribution {
    pub id: DistributionId,
    pub pool_id: PoolId,
    pub recipient_id: MemberId,
    pub item_id: ItemId,
    pub units_distributed: u32,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// True when produced by a mass-distribution execution rather than a
    /// single manual grant.
    pub mass_distribution: bool,
    pub created_by: MemberId,
    pub created_at: DateTime<Utc>,
}

/// The allocation policy used when pool inventory is distributed across
/// multiple claimants.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FulfillmentStrategy {
    /// All-or-nothing per claimant, in claimant order, until inventory runs out.
    Full,
    /// In claimant order; the boundary claimant receives whatever remains.
    Partial,
    /// Everyone receives the same floored share, capped individually.
    Equal,
}
