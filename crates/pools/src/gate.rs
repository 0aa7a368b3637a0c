//! Shared gating helpers for the pool services.

use communis_access::{Action, CatalogLookup, ItemSummary, PermissionOracle, ResourceRef};
use communis_store::{CommunisStore, PoolStore};
use communis_types::{CommunityId, CoreError, CoreResult, ItemId, MemberId, Pool, PoolId};

pub(crate) async fn require(
    oracle: &dyn PermissionOracle,
    user: &MemberId,
    resource: ResourceRef,
    action: Action,
    denied: &str,
) -> CoreResult<()> {
    if oracle.has_capability(user, &resource, action).await? {
        Ok(())
    } else {
        Err(CoreError::Forbidden(denied.to_string()))
    }
}

pub(crate) async fn live_pool(store: &dyn CommunisStore, id: &PoolId) -> CoreResult<Pool> {
    store
        .pool(id)
        .await?
        .filter(|p| p.deleted_at.is_none())
        .ok_or_else(|| CoreError::NotFound(format!("pool {} not found", id)))
}

/// Resolve an item and check it belongs to the community.
pub(crate) async fn resolve_community_item(
    catalog: &dyn CatalogLookup,
    item_id: &ItemId,
    community_id: &CommunityId,
) -> CoreResult<ItemSummary> {
    let item = catalog
        .item(item_id)
        .await?
        .ok_or_else(|| CoreError::NotFound(format!("item {} not found", item_id)))?;
    if item.community_id != *community_id {
        return Err(CoreError::InvalidArgument(
            "item does not belong to this community".to_string(),
        ));
    }
    Ok(item)
}
