//! Needs published by members and councils.
//!
//! The two need families share one value object (`NeedCore`) and differ only
//! by owner: a member need belongs to its creator, a council need belongs to
//! the council's managers. Keeping them as distinct records avoids
//! nullable-owner ambiguity and keeps each family's invariants total.

use crate::{CommunityId, CouncilId, ItemId, MemberId, NeedId};
use chrono::{DateTime, Days, Months, Utc};
use serde::{Deserialize, Serialize};

/// Whether a need is essential or merely desired.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Need,
    Want,
}

/// Need lifecycle status.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NeedStatus {
    Active,
    Fulfilled,
    Cancelled,
}

/// Replenishment cadence for recurring needs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recurrence {
    Daily,
    Weekly,
    Monthly,
}

impl Recurrence {
    /// The next fulfillment date one cadence interval after `from`.
    ///
    /// Monthly uses calendar-month arithmetic; when the target month is
    /// shorter the date clamps to its last day.
    pub fn next_from(&self, from: DateTime<Utc>) -> DateTime<Utc> {
        match self {
            Recurrence::Daily => from + Days::new(1),
            Recurrence::Weekly => from + Days::new(7),
            Recurrence::Monthly => from + Months::new(1),
        }
    }
}

/// Fields shared by member and council needs.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NeedCore {
    pub community_id: CommunityId,
    pub item_id: ItemId,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub priority: Priority,
    pub units_needed: u32,
    pub status: NeedStatus,
    pub is_recurring: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recurrence: Option<Recurrence>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_fulfilled_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_fulfillment_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl NeedCore {
    /// Recurrence invariant: a recurring need carries a cadence, and the next
    /// fulfillment date is present exactly when the cadence is.
    pub fn recurrence_is_consistent(&self) -> bool {
        let configured = self.is_recurring && self.recurrence.is_some();
        if self.is_recurring && self.recurrence.is_none() {
            return false;
        }
        self.next_fulfillment_date.is_some() == configured
    }
}

/// A need published by an individual member.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Need {
    pub id: NeedId,
    pub created_by: MemberId,
    #[serde(flatten)]
    pub core: NeedCore,
}

/// A need published on behalf of a council.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CouncilNeed {
    pub id: NeedId,
    pub council_id: CouncilId,
    pub created_by: MemberId,
    #[serde(flatten)]
    pub core: NeedCore,
}
