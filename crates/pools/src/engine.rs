//! Pool distribution: manual grants and needs-matching mass distribution.
//!
//! Mass distribution runs in two phases over one shared allocation pass.
//! Preview is pure: it reads inventory and outstanding needs, computes the
//! plan, and mutates nothing. Execute recomputes the identical plan and
//! commits every non-zero grant plus the inventory debit in one atomic store
//! operation, so the ledger and the inventory can never drift apart.

use crate::allocation::{allocate, Candidate, Grant};
use crate::gate::{live_pool, require, resolve_community_item};
use chrono::{DateTime, Utc};
use communis_access::{
    Action, ActivityEvent, CatalogLookup, EventSink, EventType, PermissionOracle, ResourceRef,
};
use communis_store::{CommunisStore, DistributionStore, NeedFilters, NeedStore, PoolStore};
use communis_types::{
    CoreError, CoreResult, Distribution, DistributionId, DistributionType, FulfillmentStrategy,
    ItemId, MemberId, NeedId, NeedStatus, Pool, PoolId,
};
use serde::{Deserialize, Serialize};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

/// Request for a single manual grant out of a pool.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DistributeRequest {
    pub recipient_id: MemberId,
    pub item_id: ItemId,
    pub units_distributed: u32,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Request shared by the preview and execute phases of mass distribution.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MassDistributionRequest {
    pub item_id: ItemId,
    pub strategy: FulfillmentStrategy,
    /// Restrict the candidate pool to these claimants. `None` means every
    /// claimant with an outstanding need for the item.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected_user_ids: Option<Vec<MemberId>>,
    /// Request-level per-recipient ceiling; the tighter of this and the
    /// pool's own ceiling applies.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_units_per_user: Option<u32>,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// The proposed (preview) or committed (execute) outcome of one mass
/// distribution pass. Zero-unit grants are listed so unserved claimants are
/// visible.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MassDistributionPlan {
    pub pool_id: PoolId,
    pub item_id: ItemId,
    pub strategy: FulfillmentStrategy,
    pub total_available: u32,
    pub total_requested: u64,
    pub grants: Vec<Grant>,
}

impl MassDistributionPlan {
    pub fn total_allocated(&self) -> u64 {
        self.grants.iter().map(|g| u64::from(g.units)).sum()
    }
}

/// Manager-gated distribution of pool inventory.
pub struct DistributionEngine {
    store: Arc<dyn CommunisStore>,
    oracle: Arc<dyn PermissionOracle>,
    catalog: Arc<dyn CatalogLookup>,
    events: Arc<dyn EventSink>,
}

impl DistributionEngine {
    pub fn new(
        store: Arc<dyn CommunisStore>,
        oracle: Arc<dyn PermissionOracle>,
        catalog: Arc<dyn CatalogLookup>,
        events: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            store,
            oracle,
            catalog,
            events,
        }
    }

    /// Grant units to one recipient.
    pub async fn distribute_from_pool(
        &self,
        pool_id: &PoolId,
        request: DistributeRequest,
        user: &MemberId,
    ) -> CoreResult<Distribution> {
        let pool = self.managed_pool(pool_id, user).await?;
        resolve_community_item(self.catalog.as_ref(), &request.item_id, &pool.community_id)
            .await?;
        if !pool.accepts_item(&request.item_id) {
            return Err(CoreError::InvalidArgument(
                "this pool does not hold the requested item".to_string(),
            ));
        }
        if request.units_distributed == 0 {
            return Err(CoreError::InvalidArgument(
                "units distributed must be positive".to_string(),
            ));
        }
        if request.title.trim().is_empty() {
            return Err(CoreError::InvalidArgument(
                "title must not be empty".to_string(),
            ));
        }

        let distribution = Distribution {
            id: DistributionId::generate(),
            pool_id: pool_id.clone(),
            recipient_id: request.recipient_id,
            item_id: request.item_id,
            units_distributed: request.units_distributed,
            title: request.title,
            description: request.description,
            mass_distribution: false,
            created_by: user.clone(),
            created_at: Utc::now(),
        };
        self.store.record_distribution(distribution.clone()).await?;
        info!(
            pool_id = %pool_id,
            recipient = %distribution.recipient_id,
            units = distribution.units_distributed,
            "distribution recorded"
        );
        Ok(distribution)
    }

    /// Compute the allocation a mass distribution would commit, without
    /// committing anything.
    pub async fn preview_mass_distribution(
        &self,
        pool_id: &PoolId,
        request: MassDistributionRequest,
        user: &MemberId,
    ) -> CoreResult<MassDistributionPlan> {
        let pool = self.managed_pool(pool_id, user).await?;
        self.plan(&pool, &request).await
    }

    /// Commit a mass distribution: one ledger row per non-zero grant and the
    /// matching inventory debit, all-or-nothing.
    pub async fn execute_mass_distribution(
        &self,
        pool_id: &PoolId,
        request: MassDistributionRequest,
        user: &MemberId,
    ) -> CoreResult<MassDistributionPlan> {
        let pool = self.managed_pool(pool_id, user).await?;
        let plan = self.plan(&pool, &request).await?;
        if plan.grants.iter().all(|g| g.units == 0) {
            return Err(CoreError::InvalidArgument(
                "no units could be allocated to any claimant".to_string(),
            ));
        }

        let now = Utc::now();
        let rows: Vec<Distribution> = plan
            .grants
            .iter()
            .filter(|g| g.units > 0)
            .map(|g| Distribution {
                id: DistributionId::generate(),
                pool_id: pool_id.clone(),
                recipient_id: g.recipient_id.clone(),
                item_id: request.item_id.clone(),
                units_distributed: g.units,
                title: request.title.clone(),
                description: request.description.clone(),
                mass_distribution: true,
                created_by: user.clone(),
                created_at: now,
            })
            .collect();
        let recipients = rows.len();
        self.store
            .record_mass_distribution(pool_id, &request.item_id, rows)
            .await?;
        info!(
            pool_id = %pool_id,
            item = %request.item_id,
            recipients,
            total = plan.total_allocated(),
            "mass distribution executed"
        );
        self.emit_executed(&pool, &request, &plan, user).await;
        Ok(plan)
    }

    /// The pool's ledger, newest first.
    pub async fn list_distributions(
        &self,
        pool_id: &PoolId,
        user: &MemberId,
    ) -> CoreResult<Vec<Distribution>> {
        self.managed_pool(pool_id, user).await?;
        Ok(self.store.list_distributions(pool_id).await?)
    }

    async fn managed_pool(&self, pool_id: &PoolId, user: &MemberId) -> CoreResult<Pool> {
        let pool = live_pool(self.store.as_ref(), pool_id).await?;
        require(
            self.oracle.as_ref(),
            user,
            ResourceRef::Council(pool.council_id.clone()),
            Action::Manage,
            "you do not have permission to manage this council",
        )
        .await?;
        Ok(pool)
    }

    async fn plan(
        &self,
        pool: &Pool,
        request: &MassDistributionRequest,
    ) -> CoreResult<MassDistributionPlan> {
        if pool.distribution_type != DistributionType::NeedsBased {
            return Err(CoreError::Conflict(
                "mass distribution requires a needs-based pool".to_string(),
            ));
        }
        resolve_community_item(self.catalog.as_ref(), &request.item_id, &pool.community_id)
            .await?;
        if !pool.accepts_item(&request.item_id) {
            return Err(CoreError::InvalidArgument(
                "this pool does not hold the requested item".to_string(),
            ));
        }
        if request.title.trim().is_empty() {
            return Err(CoreError::InvalidArgument(
                "title must not be empty".to_string(),
            ));
        }
        if request.max_units_per_user == Some(0) {
            return Err(CoreError::InvalidArgument(
                "max units per user must be positive when set".to_string(),
            ));
        }

        let available = self
            .store
            .inventory_for_item(&pool.id, &request.item_id)
            .await?;
        let candidates = self.candidates(pool, request).await?;
        let total_requested = candidates.iter().map(|c| u64::from(c.demand)).sum();
        let grants = allocate(request.strategy, available, &candidates);
        Ok(MassDistributionPlan {
            pool_id: pool.id.clone(),
            item_id: request.item_id.clone(),
            strategy: request.strategy,
            total_available: available,
            total_requested,
            grants,
        })
    }

    /// One candidate per claimant: their outstanding active needs for the
    /// item summed, capped by the tighter per-user ceiling, ordered by each
    /// claimant's earliest need so the longest-waiting are served first.
    async fn candidates(
        &self,
        pool: &Pool,
        request: &MassDistributionRequest,
    ) -> CoreResult<Vec<Candidate>> {
        let needs = self
            .store
            .list_needs(&NeedFilters {
                community_id: Some(pool.community_id.clone()),
                item_id: Some(request.item_id.clone()),
                status: Some(NeedStatus::Active),
                ..Default::default()
            })
            .await?;

        struct Claim {
            earliest: DateTime<Utc>,
            tie: NeedId,
            total: u64,
        }
        let mut claims: HashMap<MemberId, Claim> = HashMap::new();
        for need in needs {
            match claims.entry(need.created_by) {
                Entry::Occupied(mut occupied) => {
                    let claim = occupied.get_mut();
                    claim.total += u64::from(need.core.units_needed);
                    if (need.core.created_at, &need.id) < (claim.earliest, &claim.tie) {
                        claim.earliest = need.core.created_at;
                        claim.tie = need.id;
                    }
                }
                Entry::Vacant(vacant) => {
                    vacant.insert(Claim {
                        earliest: need.core.created_at,
                        tie: need.id,
                        total: u64::from(need.core.units_needed),
                    });
                }
            }
        }
        if let Some(selected) = &request.selected_user_ids {
            claims.retain(|member, _| selected.contains(member));
        }

        let cap = match (request.max_units_per_user, pool.max_units_per_user) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };

        let mut ordered: Vec<(MemberId, Claim)> = claims.into_iter().collect();
        ordered.sort_by(|(_, a), (_, b)| (a.earliest, &a.tie).cmp(&(b.earliest, &b.tie)));
        Ok(ordered
            .into_iter()
            .map(|(recipient_id, claim)| {
                let capped = cap.map_or(claim.total, |c| claim.total.min(u64::from(c)));
                Candidate {
                    recipient_id,
                    demand: u32::try_from(capped).unwrap_or(u32::MAX),
                }
            })
            .collect())
    }

    async fn emit_executed(
        &self,
        pool: &Pool,
        request: &MassDistributionRequest,
        plan: &MassDistributionPlan,
        user: &MemberId,
    ) {
        let event = ActivityEvent {
            community_id: pool.community_id.clone(),
            user_id: user.clone(),
            event_type: EventType::PoolDistributionExecuted,
            entity_type: "pool".to_string(),
            entity_id: pool.id.to_string(),
            metadata: serde_json::json!({
                "itemId": request.item_id,
                "strategy": request.strategy,
                "totalDistributed": plan.total_allocated(),
                "recipientCount": plan.grants.iter().filter(|g| g.units > 0).count(),
            }),
            occurred_at: Utc::now(),
        };
        if let Err(err) = self.events.record(event).await {
            warn!(error = %err, pool_id = %pool.id, "activity event dropped");
        }
    }
}
