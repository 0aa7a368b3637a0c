//! Contribution intake: pending offers, council confirmation, rejection.
//!
//! A contribution is `pending` until a manager of the pool's owning council
//! decides it. Confirmation is the only path that credits pool inventory,
//! and the store performs the status flip and the credit as one atomic
//! operation, so a double confirmation can never double-credit.

use crate::gate::{live_pool, require, resolve_community_item};
use chrono::Utc;
use communis_access::{Action, CatalogLookup, PermissionOracle, ResourceRef};
use communis_store::{CommunisStore, ContributionStore};
use communis_types::{
    Contribution, ContributionId, ContributionStatus, CoreError, CoreResult, ItemId, MemberId,
    Pool, PoolId,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

/// Request to offer units into a pool.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ContributeRequest {
    pub item_id: ItemId,
    pub units_offered: u32,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// The contribution state machine over a pool's intake queue.
pub struct ContributionWorkflow {
    store: Arc<dyn CommunisStore>,
    oracle: Arc<dyn PermissionOracle>,
    catalog: Arc<dyn CatalogLookup>,
}

impl ContributionWorkflow {
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

    /// Offer units into a pool. Any member who can view the pool may
    /// contribute.
    pub async fn contribute(
        &self,
        pool_id: &PoolId,
        request: ContributeRequest,
        contributor: &MemberId,
    ) -> CoreResult<Contribution> {
        let pool = live_pool(self.store.as_ref(), pool_id).await?;
        require(
            self.oracle.as_ref(),
            contributor,
            ResourceRef::Community(pool.community_id.clone()),
            Action::ViewPools,
            "you do not have permission to contribute to pools in this community",
        )
        .await?;

        resolve_community_item(self.catalog.as_ref(), &request.item_id, &pool.community_id)
            .await?;
        if !pool.accepts_item(&request.item_id) {
            return Err(CoreError::InvalidArgument(
                "this pool does not accept the offered item".to_string(),
            ));
        }
        if request.units_offered == 0 {
            return Err(CoreError::InvalidArgument(
                "units offered must be positive".to_string(),
            ));
        }
        if request.title.trim().is_empty() {
            return Err(CoreError::InvalidArgument(
                "title must not be empty".to_string(),
            ));
        }
        if let Some(minimum) = pool.minimum_contribution {
            if request.units_offered < minimum {
                return Err(CoreError::InvalidArgument(format!(
                    "this pool accepts contributions of at least {} units",
                    minimum
                )));
            }
        }

        let contribution = Contribution {
            id: ContributionId::generate(),
            pool_id: pool_id.clone(),
            contributor_id: contributor.clone(),
            item_id: request.item_id,
            units_offered: request.units_offered,
            status: ContributionStatus::Pending,
            title: request.title,
            description: request.description,
            message: request.message,
            created_at: Utc::now(),
            decided_at: None,
            decided_by: None,
        };
        self.store.create_contribution(contribution.clone()).await?;
        info!(
            contribution_id = %contribution.id,
            pool_id = %pool_id,
            units = contribution.units_offered,
            "contribution offered"
        );
        Ok(contribution)
    }

    /// List a pool's contributions, newest first.
    ///
    /// Council managers see every contribution; other members see only their
    /// own.
    pub async fn list_contributions(
        &self,
        pool_id: &PoolId,
        status: Option<ContributionStatus>,
        user: &MemberId,
    ) -> CoreResult<Vec<Contribution>> {
        let pool = live_pool(self.store.as_ref(), pool_id).await?;
        if self.is_manager(&pool, user).await? {
            return Ok(self.store.list_contributions(pool_id, status).await?);
        }

        require(
            self.oracle.as_ref(),
            user,
            ResourceRef::Community(pool.community_id.clone()),
            Action::ViewPools,
            "you do not have permission to view pools in this community",
        )
        .await?;
        let mut rows = self.store.list_contributions(pool_id, status).await?;
        rows.retain(|c| c.contributor_id == *user);
        Ok(rows)
    }

    /// Confirm a pending contribution, crediting the pool's inventory.
    ///
    /// Fails `Conflict` when the contribution has already been decided; the
    /// first confirmation's credit stands untouched.
    pub async fn confirm_contribution(
        &self,
        id: &ContributionId,
        user: &MemberId,
    ) -> CoreResult<Contribution> {
        let pool = self.decidable_pool(id, user).await?;
        let confirmed = self.store.confirm_contribution(id, user, Utc::now()).await?;
        info!(
            contribution_id = %id,
            pool_id = %pool.id,
            units = confirmed.units_offered,
            "contribution confirmed"
        );
        Ok(confirmed)
    }

    /// Reject a pending contribution. Terminal, no inventory effect.
    pub async fn reject_contribution(
        &self,
        id: &ContributionId,
        user: &MemberId,
    ) -> CoreResult<Contribution> {
        let pool = self.decidable_pool(id, user).await?;
        let rejected = self.store.reject_contribution(id, user, Utc::now()).await?;
        info!(contribution_id = %id, pool_id = %pool.id, "contribution rejected");
        Ok(rejected)
    }

    /// Look up the contribution's pool and check the caller manages it.
    async fn decidable_pool(&self, id: &ContributionId, user: &MemberId) -> CoreResult<Pool> {
        let contribution = self
            .store
            .contribution(id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("contribution {} not found", id)))?;
        let pool = live_pool(self.store.as_ref(), &contribution.pool_id).await?;
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

    async fn is_manager(&self, pool: &Pool, user: &MemberId) -> CoreResult<bool> {
        Ok(self
            .oracle
            .has_capability(
                user,
                &ResourceRef::Council(pool.council_id.clone()),
                Action::Manage,
            )
            .await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use communis_access::{InMemoryCatalog, StaticPermissions};
    use communis_store::{InMemoryStore, PoolStore};
    use communis_types::{CommunityId, CouncilId, DistributionType, Pool};

    struct Fixture {
        workflow: ContributionWorkflow,
        store: Arc<InMemoryStore>,
        oracle: Arc<StaticPermissions>,
        community: CommunityId,
        pool: PoolId,
        item: ItemId,
        manager: MemberId,
        member: MemberId,
    }

    async fn setup() -> Fixture {
        setup_with(|_| {}).await
    }

    async fn setup_with(tweak: impl FnOnce(&mut Pool)) -> Fixture {
        let store = Arc::new(InMemoryStore::new());
        let oracle = Arc::new(StaticPermissions::new());
        let catalog = Arc::new(InMemoryCatalog::new());

        let community = CommunityId::new("c-1");
        let council = CouncilId::new("council-1");
        let manager = MemberId::new("mgr");
        let member = MemberId::new("m-1");
        oracle.allow_manager(&manager, &council);
        oracle.allow_member(&member, &community);
        let item = catalog.add_object(&community, "rice");

        let now = Utc::now();
        let mut pool = Pool {
            id: PoolId::new("p-1"),
            community_id: community.clone(),
            council_id: council,
            name: "food pool".into(),
            description: None,
            primary_item_id: None,
            distribution_type: DistributionType::Manual,
            max_units_per_user: None,
            minimum_contribution: None,
            allowed_item_ids: vec![],
            created_by: manager.clone(),
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        tweak(&mut pool);
        let pool_id = pool.id.clone();
        store.create_pool(pool).await.unwrap();

        let workflow =
            ContributionWorkflow::new(store.clone(), oracle.clone(), catalog.clone());
        Fixture {
            workflow,
            store,
            oracle,
            community,
            pool: pool_id,
            item,
            manager,
            member,
        }
    }

    fn offer(fx: &Fixture, units: u32) -> ContributeRequest {
        ContributeRequest {
            item_id: fx.item.clone(),
            units_offered: units,
            title: "a bag of rice".into(),
            description: None,
            message: None,
        }
    }

    #[tokio::test]
    async fn contribution_starts_pending() {
        let fx = setup().await;
        let contribution = fx
            .workflow
            .contribute(&fx.pool, offer(&fx, 5), &fx.member)
            .await
            .unwrap();
        assert_eq!(contribution.status, ContributionStatus::Pending);
        // Pending offers never touch inventory.
        assert_eq!(
            fx.store.inventory_for_item(&fx.pool, &fx.item).await.unwrap(),
            0
        );
    }

    #[tokio::test]
    async fn contribution_below_the_minimum_is_rejected() {
        let fx = setup_with(|pool| pool.minimum_contribution = Some(3)).await;
        let result = fx
            .workflow
            .contribute(&fx.pool, offer(&fx, 2), &fx.member)
            .await;
        assert!(matches!(result, Err(CoreError::InvalidArgument(_))));
        assert!(fx
            .workflow
            .contribute(&fx.pool, offer(&fx, 3), &fx.member)
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn whitelisted_pool_rejects_other_items() {
        let fx = setup_with(|pool| {
            pool.allowed_item_ids = vec![ItemId::new("something-else")];
        })
        .await;
        let result = fx
            .workflow
            .contribute(&fx.pool, offer(&fx, 5), &fx.member)
            .await;
        assert!(matches!(result, Err(CoreError::InvalidArgument(_))));
    }

    #[tokio::test]
    async fn confirm_credits_inventory_and_double_confirm_conflicts() {
        let fx = setup().await;
        let contribution = fx
            .workflow
            .contribute(&fx.pool, offer(&fx, 5), &fx.member)
            .await
            .unwrap();

        let confirmed = fx
            .workflow
            .confirm_contribution(&contribution.id, &fx.manager)
            .await
            .unwrap();
        assert_eq!(confirmed.status, ContributionStatus::Confirmed);
        assert_eq!(confirmed.decided_by.as_ref(), Some(&fx.manager));
        assert_eq!(
            fx.store.inventory_for_item(&fx.pool, &fx.item).await.unwrap(),
            5
        );

        let second = fx
            .workflow
            .confirm_contribution(&contribution.id, &fx.manager)
            .await;
        assert!(matches!(second, Err(CoreError::Conflict(_))));
        assert_eq!(
            fx.store.inventory_for_item(&fx.pool, &fx.item).await.unwrap(),
            5
        );
    }

    #[tokio::test]
    async fn reject_is_terminal_and_leaves_inventory_alone() {
        let fx = setup().await;
        let contribution = fx
            .workflow
            .contribute(&fx.pool, offer(&fx, 5), &fx.member)
            .await
            .unwrap();

        let rejected = fx
            .workflow
            .reject_contribution(&contribution.id, &fx.manager)
            .await
            .unwrap();
        assert_eq!(rejected.status, ContributionStatus::Rejected);
        assert_eq!(
            fx.store.inventory_for_item(&fx.pool, &fx.item).await.unwrap(),
            0
        );

        let confirm_after = fx
            .workflow
            .confirm_contribution(&contribution.id, &fx.manager)
            .await;
        assert!(matches!(confirm_after, Err(CoreError::Conflict(_))));
    }

    #[tokio::test]
    async fn deciding_requires_council_manager() {
        let fx = setup().await;
        let contribution = fx
            .workflow
            .contribute(&fx.pool, offer(&fx, 5), &fx.member)
            .await
            .unwrap();
        let result = fx
            .workflow
            .confirm_contribution(&contribution.id, &fx.member)
            .await;
        assert!(matches!(result, Err(CoreError::Forbidden(_))));
    }

    #[tokio::test]
    async fn members_see_only_their_own_contributions() {
        let fx = setup().await;
        let other = MemberId::new("m-2");
        fx.oracle.allow_member(&other, &fx.community);

        fx.workflow
            .contribute(&fx.pool, offer(&fx, 5), &fx.member)
            .await
            .unwrap();
        fx.workflow
            .contribute(&fx.pool, offer(&fx, 7), &other)
            .await
            .unwrap();

        let mine = fx
            .workflow
            .list_contributions(&fx.pool, None, &fx.member)
            .await
            .unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].contributor_id, fx.member);

        let all = fx
            .workflow
            .list_contributions(&fx.pool, Some(ContributionStatus::Pending), &fx.manager)
            .await
            .unwrap();
        assert_eq!(all.len(), 2);
    }
}
