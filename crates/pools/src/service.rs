//! Pool lifecycle and manager-facing read views.

use crate::gate::{live_pool, require, resolve_community_item};
use chrono::Utc;
use communis_access::{Action, CatalogLookup, PermissionOracle, ResourceRef};
use communis_store::{CommunisStore, CouncilStore, NeedFilters, NeedStore, PoolStore};
use communis_types::{
    CommunityId, CoreError, CoreResult, Council, CouncilId, DistributionType, InventoryLine,
    ItemId, MemberId, NeedStatus, Pool, PoolId, Priority,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};

/// Request to open a new pool under a council.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CreatePoolRequest {
    pub community_id: CommunityId,
    pub council_id: CouncilId,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub primary_item_id: Option<ItemId>,
    pub distribution_type: DistributionType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_units_per_user: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minimum_contribution: Option<u32>,
    #[serde(default)]
    pub allowed_item_ids: Vec<ItemId>,
}

/// Partial pool update. `None` fields are left unchanged; a `Some` whitelist
/// replaces the previous one wholesale.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct UpdatePoolRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub distribution_type: Option<DistributionType>,
    pub max_units_per_user: Option<u32>,
    pub minimum_contribution: Option<u32>,
    pub allowed_item_ids: Option<Vec<ItemId>>,
}

/// One line of the manager's needs-vs-stock worksheet for a pool.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolNeedsLine {
    pub item_id: ItemId,
    pub item_name: String,
    pub needs_units: u64,
    pub wants_units: u64,
    pub units_available: u32,
}

/// Pool CRUD plus the inventory and needs read views.
pub struct PoolsService {
    store: Arc<dyn CommunisStore>,
    oracle: Arc<dyn PermissionOracle>,
    catalog: Arc<dyn CatalogLookup>,
}

impl PoolsService {
    pub fn new(
        store: Arc<dyn CommunisStore>,
        oracle: Arc<dyn PermissionOracle>,
        catalog: Arc<dyn CatalogLookup>,
    ) -> Self {
        Self {
            store,
            oracle,
            catalog,
        }
    }

    /// Open a pool. Caller must manage the owning council.
    pub async fn create_pool(
        &self,
        request: CreatePoolRequest,
        user: &MemberId,
    ) -> CoreResult<Pool> {
        require(
            self.oracle.as_ref(),
            user,
            ResourceRef::Council(request.council_id.clone()),
            Action::Manage,
            "you do not have permission to manage this council",
        )
        .await?;

        let council = self.live_council(&request.council_id).await?;
        if council.community_id != request.community_id {
            return Err(CoreError::InvalidArgument(
                "council does not belong to the specified community".to_string(),
            ));
        }
        validate_pool_config(&request.name, request.minimum_contribution, request.max_units_per_user)?;
        for item_id in &request.allowed_item_ids {
            resolve_community_item(self.catalog.as_ref(), item_id, &request.community_id).await?;
        }
        if let Some(primary) = &request.primary_item_id {
            resolve_community_item(self.catalog.as_ref(), primary, &request.community_id).await?;
        }

        let now = Utc::now();
        let pool = Pool {
            id: PoolId::generate(),
            community_id: request.community_id,
            council_id: request.council_id,
            name: request.name,
            description: request.description,
            primary_item_id: request.primary_item_id,
            distribution_type: request.distribution_type,
            max_units_per_user: request.max_units_per_user,
            minimum_contribution: request.minimum_contribution,
            allowed_item_ids: request.allowed_item_ids,
            created_by: user.clone(),
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        self.store.create_pool(pool.clone()).await?;
        info!(pool_id = %pool.id, council = %pool.council_id, "pool created");
        Ok(pool)
    }

    /// Fetch one pool, gated on the community's pool-view permission.
    pub async fn get_pool(&self, id: &PoolId, user: &MemberId) -> CoreResult<Pool> {
        let pool = live_pool(self.store.as_ref(), id).await?;
        require(
            self.oracle.as_ref(),
            user,
            ResourceRef::Community(pool.community_id.clone()),
            Action::ViewPools,
            "you do not have permission to view pools in this community",
        )
        .await?;
        Ok(pool)
    }

    /// List a community's live pools, newest first.
    pub async fn list_community_pools(
        &self,
        community_id: &CommunityId,
        user: &MemberId,
    ) -> CoreResult<Vec<Pool>> {
        require(
            self.oracle.as_ref(),
            user,
            ResourceRef::Community(community_id.clone()),
            Action::ViewPools,
            "you do not have permission to view pools in this community",
        )
        .await?;
        Ok(self.store.list_pools_by_community(community_id).await?)
    }

    /// List a council's live pools, newest first.
    pub async fn list_council_pools(
        &self,
        council_id: &CouncilId,
        user: &MemberId,
    ) -> CoreResult<Vec<Pool>> {
        let council = self.live_council(council_id).await?;
        require(
            self.oracle.as_ref(),
            user,
            ResourceRef::Community(council.community_id.clone()),
            Action::ViewPools,
            "you do not have permission to view pools in this community",
        )
        .await?;
        Ok(self.store.list_pools_by_council(council_id).await?)
    }

    /// Update a pool. Caller must manage the owning council.
    pub async fn update_pool(
        &self,
        id: &PoolId,
        request: UpdatePoolRequest,
        user: &MemberId,
    ) -> CoreResult<Pool> {
        let mut pool = live_pool(self.store.as_ref(), id).await?;
        require(
            self.oracle.as_ref(),
            user,
            ResourceRef::Council(pool.council_id.clone()),
            Action::Manage,
            "you do not have permission to manage this council",
        )
        .await?;

        if let Some(name) = request.name {
            pool.name = name;
        }
        if let Some(description) = request.description {
            pool.description = Some(description);
        }
        if let Some(distribution_type) = request.distribution_type {
            pool.distribution_type = distribution_type;
        }
        if let Some(max_units) = request.max_units_per_user {
            pool.max_units_per_user = Some(max_units);
        }
        if let Some(minimum) = request.minimum_contribution {
            pool.minimum_contribution = Some(minimum);
        }
        if let Some(allowed) = request.allowed_item_ids {
            for item_id in &allowed {
                resolve_community_item(self.catalog.as_ref(), item_id, &pool.community_id).await?;
            }
            pool.allowed_item_ids = allowed;
        }
        validate_pool_config(&pool.name, pool.minimum_contribution, pool.max_units_per_user)?;

        pool.updated_at = Utc::now();
        self.store.update_pool(pool.clone()).await?;
        Ok(pool)
    }

    /// Soft-delete a pool. Caller must manage the owning council.
    pub async fn delete_pool(&self, id: &PoolId, user: &MemberId) -> CoreResult<()> {
        let pool = live_pool(self.store.as_ref(), id).await?;
        require(
            self.oracle.as_ref(),
            user,
            ResourceRef::Council(pool.council_id.clone()),
            Action::Manage,
            "you do not have permission to manage this council",
        )
        .await?;
        self.store.soft_delete_pool(id, Utc::now()).await?;
        info!(pool_id = %id, "pool deleted");
        Ok(())
    }

    /// Current inventory of a pool.
    pub async fn pool_inventory(
        &self,
        id: &PoolId,
        user: &MemberId,
    ) -> CoreResult<Vec<InventoryLine>> {
        let pool = live_pool(self.store.as_ref(), id).await?;
        require(
            self.oracle.as_ref(),
            user,
            ResourceRef::Community(pool.community_id.clone()),
            Action::ViewPools,
            "you do not have permission to view pools in this community",
        )
        .await?;
        Ok(self.store.inventory(id).await?)
    }

    /// The manager's worksheet: active member demand for each item the pool
    /// accepts, next to what the pool currently holds.
    pub async fn pool_needs(&self, id: &PoolId, user: &MemberId) -> CoreResult<Vec<PoolNeedsLine>> {
        let pool = live_pool(self.store.as_ref(), id).await?;
        require(
            self.oracle.as_ref(),
            user,
            ResourceRef::Council(pool.council_id.clone()),
            Action::Manage,
            "you do not have permission to manage this council",
        )
        .await?;

        let needs = self
            .store
            .list_needs(&NeedFilters {
                community_id: Some(pool.community_id.clone()),
                status: Some(NeedStatus::Active),
                ..Default::default()
            })
            .await?;

        let mut totals: BTreeMap<ItemId, (u64, u64)> = BTreeMap::new();
        for need in needs {
            if !pool.accepts_item(&need.core.item_id) {
                continue;
            }
            let entry = totals.entry(need.core.item_id).or_default();
            match need.core.priority {
                Priority::Need => entry.0 += u64::from(need.core.units_needed),
                Priority::Want => entry.1 += u64::from(need.core.units_needed),
            }
        }

        let mut lines = Vec::with_capacity(totals.len());
        for (item_id, (needs_units, wants_units)) in totals {
            let Some(item) = self.catalog.item(&item_id).await? else {
                debug!(item = %item_id, "skipping pool needs line for unresolvable item");
                continue;
            };
            let units_available = self.store.inventory_for_item(id, &item_id).await?;
            lines.push(PoolNeedsLine {
                item_id,
                item_name: item.name,
                needs_units,
                wants_units,
                units_available,
            });
        }
        Ok(lines)
    }

    async fn live_council(&self, id: &CouncilId) -> CoreResult<Council> {
        self.store
            .council(id)
            .await?
            .filter(|c| c.deleted_at.is_none())
            .ok_or_else(|| CoreError::NotFound(format!("council {} not found", id)))
    }
}

fn validate_pool_config(
    name: &str,
    minimum_contribution: Option<u32>,
    max_units_per_user: Option<u32>,
) -> CoreResult<()> {
    if name.trim().is_empty() {
        return Err(CoreError::InvalidArgument(
            "pool name must not be empty".to_string(),
        ));
    }
    if minimum_contribution == Some(0) {
        return Err(CoreError::InvalidArgument(
            "minimum contribution must be positive when set".to_string(),
        ));
    }
    if max_units_per_user == Some(0) {
        return Err(CoreError::InvalidArgument(
            "max units per user must be positive when set".to_string(),
        ));
    }
    Ok(())
}
