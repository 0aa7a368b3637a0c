//! Contributions - offers of units into a pool, pending council confirmation.

use crate::{ContributionId, ItemId, MemberId, PoolId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Contribution intake state. `Pending` is the only non-terminal state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContributionStatus {
    Pending,
    Confirmed,
    Rejected,
}

/// An offer of units into a pool.
///
/// Confirmation is the only transition that credits pool inventory, and it
/// happens exactly once per contribution.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Contribution {
    pub id: ContributionId,
    pub pool_id: PoolId,
    pub contributor_id: MemberId,
    pub item_id: ItemId,
    pub units_offered: u32,
    pub status: ContributionStatus,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decided_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decided_by: Option<MemberId>,
}
