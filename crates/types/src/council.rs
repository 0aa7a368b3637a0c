//! Council records - the managing bodies that own pools and council needs.

use crate::{CommunityId, CouncilId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A council inside a community.
///
/// Only the fields the core needs for existence and community-membership
/// checks; membership rosters live behind the permission oracle.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Council {
    pub id: CouncilId,
    pub community_id: CommunityId,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}
