use crate::StoreResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use communis_types::{
    CommunityId, Contribution, ContributionId, ContributionStatus, Council, CouncilId,
    CouncilNeed, Distribution, InventoryLine, ItemId, MemberId, Need, NeedId, NeedStatus, Pool,
    PoolId, Priority,
};

/// Filters for member-need listings. `None` means "any".
#[derive(Clone, Debug, Default)]
pub struct NeedFilters {
    pub community_id: Option<CommunityId>,
    pub created_by: Option<MemberId>,
    pub item_id: Option<ItemId>,
    pub status: Option<NeedStatus>,
    pub priority: Option<Priority>,
}

/// Filters for council-need listings.
#[derive(Clone, Debug, Default)]
pub struct CouncilNeedFilters {
    pub community_id: Option<CommunityId>,
    pub council_id: Option<CouncilId>,
    pub item_id: Option<ItemId>,
    pub status: Option<NeedStatus>,
    pub priority: Option<Priority>,
}

/// Storage interface for member needs.
#[async_trait]
pub trait NeedStore: Send + Sync {
    async fn create_need(&self, need: Need) -> StoreResult<()>;

    /// Fetch one need, soft-deleted rows included (callers filter).
    async fn need(&self, id: &NeedId) -> StoreResult<Option<Need>>;

    /// Replace a need record. Fails `NotFound` for unknown or deleted rows.
    async fn update_need(&self, need: Need) -> StoreResult<()>;

    /// Soft delete: stamps `deleted_at`, keeps the row.
    async fn soft_delete_need(&self, id: &NeedId, at: DateTime<Utc>) -> StoreResult<()>;

    /// Filtered listing of live rows, newest first.
    async fn list_needs(&self, filters: &NeedFilters) -> StoreResult<Vec<Need>>;

    /// Live, active, recurring needs whose next fulfillment date is due.
    async fn needs_due_for_replenishment(&self, now: DateTime<Utc>) -> StoreResult<Vec<Need>>;

    /// Atomically set `last_fulfilled_at` and `next_fulfillment_date`.
    async fn advance_need_fulfillment(
        &self,
        id: &NeedId,
        fulfilled_at: DateTime<Utc>,
        next: DateTime<Utc>,
    ) -> StoreResult<()>;
}

/// Storage interface for council needs. Mirrors [`NeedStore`].
#[async_trait]
pub trait CouncilNeedStore: Send + Sync {
    async fn create_council_need(&self, need: CouncilNeed) -> StoreResult<()>;
    async fn council_need(&self, id: &NeedId) -> StoreResult<Option<CouncilNeed>>;
    async fn update_council_need(&self, need: CouncilNeed) -> StoreResult<()>;
    async fn soft_delete_council_need(&self, id: &NeedId, at: DateTime<Utc>) -> StoreResult<()>;
    async fn list_council_needs(
        &self,
        filters: &CouncilNeedFilters,
    ) -> StoreResult<Vec<CouncilNeed>>;
    async fn council_needs_due_for_replenishment(
        &self,
        now: DateTime<Utc>,
    ) -> StoreResult<Vec<CouncilNeed>>;
    async fn advance_council_need_fulfillment(
        &self,
        id: &NeedId,
        fulfilled_at: DateTime<Utc>,
        next: DateTime<Utc>,
    ) -> StoreResult<()>;
}

/// Storage interface for council records.
#[async_trait]
pub trait CouncilStore: Send + Sync {
    async fn upsert_council(&self, council: Council) -> StoreResult<()>;
    async fn council(&self, id: &CouncilId) -> StoreResult<Option<Council>>;
}

/// Storage interface for pools and their inventory.
#[async_trait]
pub trait PoolStore: Send + Sync {
    async fn create_pool(&self, pool: Pool) -> StoreResult<()>;

    /// Fetch one pool, soft-deleted rows included (callers filter).
    async fn pool(&self, id: &PoolId) -> StoreResult<Option<Pool>>;

    async fn update_pool(&self, pool: Pool) -> StoreResult<()>;
    async fn soft_delete_pool(&self, id: &PoolId, at: DateTime<Utc>) -> StoreResult<()>;
    async fn list_pools_by_community(&self, community_id: &CommunityId) -> StoreResult<Vec<Pool>>;
    async fn list_pools_by_council(&self, council_id: &CouncilId) -> StoreResult<Vec<Pool>>;

    /// Current inventory of a pool, ordered by item id.
    async fn inventory(&self, pool_id: &PoolId) -> StoreResult<Vec<InventoryLine>>;

    /// Units currently available for one item (zero when never stocked).
    async fn inventory_for_item(&self, pool_id: &PoolId, item_id: &ItemId) -> StoreResult<u32>;
}

/// Storage interface for pool contributions.
#[async_trait]
pub trait ContributionStore: Send + Sync {
    async fn create_contribution(&self, contribution: Contribution) -> StoreResult<()>;
    async fn contribution(&self, id: &ContributionId) -> StoreResult<Option<Contribution>>;

    /// Contributions for a pool, optionally filtered by status, newest first.
    async fn list_contributions(
        &self,
        pool_id: &PoolId,
        status: Option<ContributionStatus>,
    ) -> StoreResult<Vec<Contribution>>;

    /// Atomically transition `Pending -> Confirmed` and credit the pool's
    /// inventory with the offered units. Fails `Conflict` when the
    /// contribution is no longer pending; inventory is credited exactly once.
    async fn confirm_contribution(
        &self,
        id: &ContributionId,
        decided_by: &MemberId,
        at: DateTime<Utc>,
    ) -> StoreResult<Contribution>;

    /// Transition `Pending -> Rejected`. Terminal; no inventory effect.
    async fn reject_contribution(
        &self,
        id: &ContributionId,
        decided_by: &MemberId,
        at: DateTime<Utc>,
    ) -> StoreResult<Contribution>;
}

/// Storage interface for the append-only distribution ledger.
#[async_trait]
pub trait DistributionStore: Send + Sync {
    /// Atomically debit the pool's inventory by `units_distributed` and
    /// append one ledger row. Fails `InsufficientInventory` without any
    /// partial effect.
    async fn record_distribution(&self, distribution: Distribution) -> StoreResult<()>;

    /// Atomically debit the pool's inventory by the sum of the rows and
    /// append them all. All-or-nothing: an insufficient balance writes
    /// nothing.
    async fn record_mass_distribution(
        &self,
        pool_id: &PoolId,
        item_id: &ItemId,
        rows: Vec<Distribution>,
    ) -> StoreResult<()>;

    /// Ledger rows for a pool, newest first.
    async fn list_distributions(&self, pool_id: &PoolId) -> StoreResult<Vec<Distribution>>;
}

/// Unified storage bundle used by the core services.
pub trait CommunisStore:
    NeedStore
    + CouncilNeedStore
    + CouncilStore
    + PoolStore
    + ContributionStore
    + DistributionStore
    + Send
    + Sync
{
}

impl<T> CommunisStore for T where
    T: NeedStore
        + CouncilNeedStore
        + CouncilStore
        + PoolStore
        + ContributionStore
        + DistributionStore
        + Send
        + Sync
{
}
