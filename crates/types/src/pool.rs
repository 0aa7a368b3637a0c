//! Pools - council-owned shared inventory.

use crate::{CommunityId, CouncilId, ItemId, MemberId, PoolId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How a pool hands inventory back out.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistributionType {
    /// Managers grant units one recipient at a time.
    Manual,
    /// Eligible for the needs-matching mass distribution pass.
    NeedsBased,
}

/// A council-owned pool accumulating contributed inventory.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Pool {
    pub id: PoolId,
    pub community_id: CommunityId,
    pub council_id: CouncilId,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub primary_item_id: Option<ItemId>,
    pub distribution_type: DistributionType,
    /// Per-recipient ceiling applied to every distribution from this pool.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_units_per_user: Option<u32>,
    /// Smallest contribution the pool accepts, in units.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minimum_contribution: Option<u32>,
    /// Items accepted into this pool. Empty means any community item.
    pub allowed_item_ids: Vec<ItemId>,
    pub created_by: MemberId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Pool {
    /// Whether the pool accepts `item_id` (empty whitelist accepts anything).
    pub fn accepts_item(&self, item_id: &ItemId) -> bool {
        self.allowed_item_ids.is_empty() || self.allowed_item_ids.contains(item_id)
    }
}

/// One line of a pool's current inventory.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryLine {
    pub item_id: ItemId,
    pub units_available: u32,
}
