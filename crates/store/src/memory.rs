//! In-memory reference implementation for the Communis storage traits.
//!
//! Deterministic and test-friendly. One lock guards the whole state, so the
//! compound operations (confirm-and-credit, debit-and-append) are atomic by
//! construction, matching what a transactional backend must provide.

use crate::traits::{
    ContributionStore, CouncilNeedFilters, CouncilNeedStore, CouncilStore, DistributionStore,
    NeedFilters, NeedStore, PoolStore,
};
use crate::{StoreError, StoreResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use communis_types::{
    CommunityId, Contribution, ContributionId, ContributionStatus, Council, CouncilId,
    CouncilNeed, Distribution, InventoryLine, ItemId, MemberId, Need, NeedId, Pool, PoolId,
};
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Default)]
struct State {
    needs: HashMap<NeedId, Need>,
    council_needs: HashMap<NeedId, CouncilNeed>,
    councils: HashMap<CouncilId, Council>,
    pools: HashMap<PoolId, Pool>,
    inventory: HashMap<(PoolId, ItemId), u32>,
    contributions: HashMap<ContributionId, Contribution>,
    distributions: Vec<Distribution>,
}

/// In-memory Communis storage adapter.
#[derive(Default)]
pub struct InMemoryStore {
    state: RwLock<State>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, State>> {
        self.state
            .read()
            .map_err(|_| StoreError::Backend("store lock poisoned".to_string()))
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, State>> {
        self.state
            .write()
            .map_err(|_| StoreError::Backend("store lock poisoned".to_string()))
    }
}

fn newest_first<T>(mut rows: Vec<T>, created_at: impl Fn(&T) -> DateTime<Utc>) -> Vec<T> {
    rows.sort_by(|a, b| created_at(b).cmp(&created_at(a)));
    rows
}

#[async_trait]
impl NeedStore for InMemoryStore {
    async fn create_need(&self, need: Need) -> StoreResult<()> {
        let mut state = self.write()?;
        if state.needs.contains_key(&need.id) {
            return Err(StoreError::Conflict(format!(
                "need {} already exists",
                need.id
            )));
        }
        state.needs.insert(need.id.clone(), need);
        Ok(())
    }

    async fn need(&self, id: &NeedId) -> StoreResult<Option<Need>> {
        Ok(self.read()?.needs.get(id).cloned())
    }

    async fn update_need(&self, need: Need) -> StoreResult<()> {
        let mut state = self.write()?;
        match state.needs.get(&need.id) {
            Some(existing) if existing.core.deleted_at.is_none() => {
                state.needs.insert(need.id.clone(), need);
                Ok(())
            }
            _ => Err(StoreError::NotFound(format!("need {} not found", need.id))),
        }
    }

    async fn soft_delete_need(&self, id: &NeedId, at: DateTime<Utc>) -> StoreResult<()> {
        let mut state = self.write()?;
        let need = state
            .needs
            .get_mut(id)
            .filter(|n| n.core.deleted_at.is_none())
            .ok_or_else(|| StoreError::NotFound(format!("need {} not found", id)))?;
        need.core.deleted_at = Some(at);
        need.core.updated_at = at;
        Ok(())
    }

    async fn list_needs(&self, filters: &NeedFilters) -> StoreResult<Vec<Need>> {
        let state = self.read()?;
        let rows = state
            .needs
            .values()
            .filter(|n| n.core.deleted_at.is_none())
            .filter(|n| match &filters.community_id {
                Some(id) => n.core.community_id == *id,
                None => true,
            })
            .filter(|n| match &filters.created_by {
                Some(id) => n.created_by == *id,
                None => true,
            })
            .filter(|n| match &filters.item_id {
                Some(id) => n.core.item_id == *id,
                None => true,
            })
            .filter(|n| match filters.status {
                Some(status) => n.core.status == status,
                None => true,
            })
            .filter(|n| match filters.priority {
                Some(priority) => n.core.priority == priority,
                None => true,
            })
            .cloned()
            .collect::<Vec<_>>();
        Ok(newest_first(rows, |n| n.core.created_at))
    }

    async fn needs_due_for_replenishment(&self, now: DateTime<Utc>) -> StoreResult<Vec<Need>> {
        let state = self.read()?;
        Ok(state
            .needs
            .values()
            .filter(|n| n.core.deleted_at.is_none())
            .filter(|n| n.core.is_recurring)
            .filter(|n| n.core.status == communis_types::NeedStatus::Active)
            .filter(|n| matches!(n.core.next_fulfillment_date, Some(due) if due <= now))
            .cloned()
            .collect())
    }

    async fn advance_need_fulfillment(
        &self,
        id: &NeedId,
        fulfilled_at: DateTime<Utc>,
        next: DateTime<Utc>,
    ) -> StoreResult<()> {
        let mut state = self.write()?;
        let need = state
            .needs
            .get_mut(id)
            .filter(|n| n.core.deleted_at.is_none())
            .ok_or_else(|| StoreError::NotFound(format!("need {} not found", id)))?;
        need.core.last_fulfilled_at = Some(fulfilled_at);
        need.core.next_fulfillment_date = Some(next);
        need.core.updated_at = fulfilled_at;
        Ok(())
    }
}

#[async_trait]
impl CouncilNeedStore for InMemoryStore {
    async fn create_council_need(&self, need: CouncilNeed) -> StoreResult<()> {
        let mut state = self.write()?;
        if state.council_needs.contains_key(&need.id) {
            return Err(StoreError::Conflict(format!(
                "council need {} already exists",
                need.id
            )));
        }
        state.council_needs.insert(need.id.clone(), need);
        Ok(())
    }

    async fn council_need(&self, id: &NeedId) -> StoreResult<Option<CouncilNeed>> {
        Ok(self.read()?.council_needs.get(id).cloned())
    }

    async fn update_council_need(&self, need: CouncilNeed) -> StoreResult<()> {
        let mut state = self.write()?;
        match state.council_needs.get(&need.id) {
            Some(existing) if existing.core.deleted_at.is_none() => {
                state.council_needs.insert(need.id.clone(), need);
                Ok(())
            }
            _ => Err(StoreError::NotFound(format!(
                "council need {} not found",
                need.id
            ))),
        }
    }

    async fn soft_delete_council_need(&self, id: &NeedId, at: DateTime<Utc>) -> StoreResult<()> {
        let mut state = self.write()?;
        let need = state
            .council_needs
            .get_mut(id)
            .filter(|n| n.core.deleted_at.is_none())
            .ok_or_else(|| StoreError::NotFound(format!("council need {} not found", id)))?;
        need.core.deleted_at = Some(at);
        need.core.updated_at = at;
        Ok(())
    }

    async fn list_council_needs(
        &self,
        filters: &CouncilNeedFilters,
    ) -> StoreResult<Vec<CouncilNeed>> {
        let state = self.read()?;
        let rows = state
            .council_needs
            .values()
            .filter(|n| n.core.deleted_at.is_none())
            .filter(|n| match &filters.community_id {
                Some(id) => n.core.community_id == *id,
                None => true,
            })
            .filter(|n| match &filters.council_id {
                Some(id) => n.council_id == *id,
                None => true,
            })
            .filter(|n| match &filters.item_id {
                Some(id) => n.core.item_id == *id,
                None => true,
            })
            .filter(|n| match filters.status {
                Some(status) => n.core.status == status,
                None => true,
            })
            .filter(|n| match filters.priority {
                Some(priority) => n.core.priority == priority,
                None => true,
            })
            .cloned()
            .collect::<Vec<_>>();
        Ok(newest_first(rows, |n| n.core.created_at))
    }

    async fn council_needs_due_for_replenishment(
        &self,
        now: DateTime<Utc>,
    ) -> StoreResult<Vec<CouncilNeed>> {
        let state = self.read()?;
        Ok(state
            .council_needs
            .values()
            .filter(|n| n.core.deleted_at.is_none())
            .filter(|n| n.core.is_recurring)
            .filter(|n| n.core.status == communis_types::NeedStatus::Active)
            .filter(|n| matches!(n.core.next_fulfillment_date, Some(due) if due <= now))
            .cloned()
            .collect())
    }

    async fn advance_council_need_fulfillment(
        &self,
        id: &NeedId,
        fulfilled_at: DateTime<Utc>,
        next: DateTime<Utc>,
    ) -> StoreResult<()> {
        let mut state = self.write()?;
        let need = state
            .council_needs
            .get_mut(id)
            .filter(|n| n.core.deleted_at.is_none())
            .ok_or_else(|| StoreError::NotFound(format!("council need {} not found", id)))?;
        need.core.last_fulfilled_at = Some(fulfilled_at);
        need.core.next_fulfillment_date = Some(next);
        need.core.updated_at = fulfilled_at;
        Ok(())
    }
}

#[async_trait]
impl CouncilStore for InMemoryStore {
    async fn upsert_council(&self, council: Council) -> StoreResult<()> {
        let mut state = self.write()?;
        state.councils.insert(council.id.clone(), council);
        Ok(())
    }

    async fn council(&self, id: &CouncilId) -> StoreResult<Option<Council>> {
        Ok(self.read()?.councils.get(id).cloned())
    }
}

#[async_trait]
impl PoolStore for InMemoryStore {
    async fn create_pool(&self, pool: Pool) -> StoreResult<()> {
        let mut state = self.write()?;
        if state.pools.contains_key(&pool.id) {
            return Err(StoreError::Conflict(format!(
                "pool {} already exists",
                pool.id
            )));
        }
        state.pools.insert(pool.id.clone(), pool);
        Ok(())
    }

    async fn pool(&self, id: &PoolId) -> StoreResult<Option<Pool>> {
        Ok(self.read()?.pools.get(id).cloned())
    }

    async fn update_pool(&self, pool: Pool) -> StoreResult<()> {
        let mut state = self.write()?;
        match state.pools.get(&pool.id) {
            Some(existing) if existing.deleted_at.is_none() => {
                state.pools.insert(pool.id.clone(), pool);
                Ok(())
            }
            _ => Err(StoreError::NotFound(format!("pool {} not found", pool.id))),
        }
    }

    async fn soft_delete_pool(&self, id: &PoolId, at: DateTime<Utc>) -> StoreResult<()> {
        let mut state = self.write()?;
        let pool = state
            .pools
            .get_mut(id)
            .filter(|p| p.deleted_at.is_none())
            .ok_or_else(|| StoreError::NotFound(format!("pool {} not found", id)))?;
        pool.deleted_at = Some(at);
        pool.updated_at = at;
        Ok(())
    }

    async fn list_pools_by_community(&self, community_id: &CommunityId) -> StoreResult<Vec<Pool>> {
        let state = self.read()?;
        let rows = state
            .pools
            .values()
            .filter(|p| p.deleted_at.is_none() && p.community_id == *community_id)
            .cloned()
            .collect();
        Ok(newest_first(rows, |p: &Pool| p.created_at))
    }

    async fn list_pools_by_council(&self, council_id: &CouncilId) -> StoreResult<Vec<Pool>> {
        let state = self.read()?;
        let rows = state
            .pools
            .values()
            .filter(|p| p.deleted_at.is_none() && p.council_id == *council_id)
            .cloned()
            .collect();
        Ok(newest_first(rows, |p: &Pool| p.created_at))
    }

    async fn inventory(&self, pool_id: &PoolId) -> StoreResult<Vec<InventoryLine>> {
        let state = self.read()?;
        let mut lines: Vec<InventoryLine> = state
            .inventory
            .iter()
            .filter(|((pool, _), units)| pool == pool_id && **units > 0)
            .map(|((_, item), units)| InventoryLine {
                item_id: item.clone(),
                units_available: *units,
            })
            .collect();
        lines.sort_by(|a, b| a.item_id.cmp(&b.item_id));
        Ok(lines)
    }

    async fn inventory_for_item(&self, pool_id: &PoolId, item_id: &ItemId) -> StoreResult<u32> {
        let state = self.read()?;
        Ok(state
            .inventory
            .get(&(pool_id.clone(), item_id.clone()))
            .copied()
            .unwrap_or(0))
    }
}

#[async_trait]
impl ContributionStore for InMemoryStore {
    async fn create_contribution(&self, contribution: Contribution) -> StoreResult<()> {
        let mut state = self.write()?;
        if state.contributions.contains_key(&contribution.id) {
            return Err(StoreError::Conflict(format!(
                "contribution {} already exists",
                contribution.id
            )));
        }
        state
            .contributions
            .insert(contribution.id.clone(), contribution);
        Ok(())
    }

    async fn contribution(&self, id: &ContributionId) -> StoreResult<Option<Contribution>> {
        Ok(self.read()?.contributions.get(id).cloned())
    }

    async fn list_contributions(
        &self,
        pool_id: &PoolId,
        status: Option<ContributionStatus>,
    ) -> StoreResult<Vec<Contribution>> {
        let state = self.read()?;
        let rows = state
            .contributions
            .values()
            .filter(|c| c.pool_id == *pool_id)
            .filter(|c| match status {
                Some(status) => c.status == status,
                None => true,
            })
            .cloned()
            .collect();
        Ok(newest_first(rows, |c: &Contribution| c.created_at))
    }

    async fn confirm_contribution(
        &self,
        id: &ContributionId,
        decided_by: &MemberId,
        at: DateTime<Utc>,
    ) -> StoreResult<Contribution> {
        let mut state = self.write()?;
        let contribution = state
            .contributions
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(format!("contribution {} not found", id)))?;
        if contribution.status != ContributionStatus::Pending {
            return Err(StoreError::Conflict(format!(
                "contribution {} has already been processed",
                id
            )));
        }
        contribution.status = ContributionStatus::Confirmed;
        contribution.decided_at = Some(at);
        contribution.decided_by = Some(decided_by.clone());
        let confirmed = contribution.clone();

        // Same write guard: status flip and inventory credit land together.
        let key = (confirmed.pool_id.clone(), confirmed.item_id.clone());
        *state.inventory.entry(key).or_insert(0) += confirmed.units_offered;
        Ok(confirmed)
    }

    async fn reject_contribution(
        &self,
        id: &ContributionId,
        decided_by: &MemberId,
        at: DateTime<Utc>,
    ) -> StoreResult<Contribution> {
        let mut state = self.write()?;
        let contribution = state
            .contributions
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(format!("contribution {} not found", id)))?;
        if contribution.status != ContributionStatus::Pending {
            return Err(StoreError::Conflict(format!(
                "contribution {} has already been processed",
                id
            )));
        }
        contribution.status = ContributionStatus::Rejected;
        contribution.decided_at = Some(at);
        contribution.decided_by = Some(decided_by.clone());
        Ok(contribution.clone())
    }
}

#[async_trait]
impl DistributionStore for InMemoryStore {
    async fn record_distribution(&self, distribution: Distribution) -> StoreResult<()> {
        let mut state = self.write()?;
        let key = (distribution.pool_id.clone(), distribution.item_id.clone());
        let available = state.inventory.get(&key).copied().unwrap_or(0);
        if available < distribution.units_distributed {
            return Err(StoreError::InsufficientInventory {
                requested: distribution.units_distributed,
                available,
            });
        }
        state
            .inventory
            .insert(key, available - distribution.units_distributed);
        state.distributions.push(distribution);
        Ok(())
    }

    async fn record_mass_distribution(
        &self,
        pool_id: &PoolId,
        item_id: &ItemId,
        rows: Vec<Distribution>,
    ) -> StoreResult<()> {
        if rows.is_empty() {
            return Err(StoreError::InvalidInput(
                "mass distribution requires at least one row".to_string(),
            ));
        }
        if rows
            .iter()
            .any(|r| r.pool_id != *pool_id || r.item_id != *item_id)
        {
            return Err(StoreError::InvalidInput(
                "mass distribution rows must all target the same pool and item".to_string(),
            ));
        }

        let mut state = self.write()?;
        let key = (pool_id.clone(), item_id.clone());
        let available = state.inventory.get(&key).copied().unwrap_or(0);
        let total: u32 = rows.iter().map(|r| r.units_distributed).sum();
        if available < total {
            return Err(StoreError::InsufficientInventory {
                requested: total,
                available,
            });
        }
        state.inventory.insert(key, available - total);
        state.distributions.extend(rows);
        Ok(())
    }

    async fn list_distributions(&self, pool_id: &PoolId) -> StoreResult<Vec<Distribution>> {
        let state = self.read()?;
        let rows = state
            .distributions
            .iter()
            .filter(|d| d.pool_id == *pool_id)
            .cloned()
            .collect();
        Ok(newest_first(rows, |d: &Distribution| d.created_at))
    }
}
