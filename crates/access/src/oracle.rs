//! The permission oracle contract.

use crate::AccessResult;
use async_trait::async_trait;
use communis_types::{CommunityId, CouncilId, MemberId, PoolId};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::RwLock;

/// A resource the oracle can answer capability questions about.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type", content = "id")]
pub enum ResourceRef {
    Community(CommunityId),
    Council(CouncilId),
    Pool(PoolId),
}

/// Capability actions the core asks about.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// Publish needs into a community.
    PublishNeeds,
    /// View the needs of a community.
    ViewNeeds,
    /// View pools, inventory, and contribute into pools.
    ViewPools,
    /// Manage a council: its needs, pools, confirmations, distributions.
    Manage,
}

/// Yes/no capability checks against the external permission graph.
#[async_trait]
pub trait PermissionOracle: Send + Sync {
    /// Does `user` hold `action` on `resource`?
    async fn has_capability(
        &self,
        user: &MemberId,
        resource: &ResourceRef,
        action: Action,
    ) -> AccessResult<bool>;

    /// Every community in which `user` holds `action`. Used by the
    /// cross-community listing fan-out.
    async fn accessible_community_ids(
        &self,
        user: &MemberId,
        action: Action,
    ) -> AccessResult<Vec<CommunityId>>;
}

/// A fixed grant table. Deterministic and test-friendly.
#[derive(Default)]
pub struct StaticPermissions {
    grants: RwLock<HashSet<(MemberId, ResourceRef, Action)>>,
}

impl StaticPermissions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Grant `action` on `resource` to `user`.
    pub fn allow(&self, user: &MemberId, resource: ResourceRef, action: Action) {
        if let Ok(mut grants) = self.grants.write() {
            grants.insert((user.clone(), resource, action));
        }
    }

    /// Grant the full member bundle for a community: publish, view needs,
    /// view pools.
    pub fn allow_member(&self, user: &MemberId, community: &CommunityId) {
        for action in [Action::PublishNeeds, Action::ViewNeeds, Action::ViewPools] {
            self.allow(user, ResourceRef::Community(community.clone()), action);
        }
    }

    /// Grant council-manager rights.
    pub fn allow_manager(&self, user: &MemberId, council: &CouncilId) {
        self.allow(user, ResourceRef::Council(council.clone()), Action::Manage);
    }
}

#[async_trait]
impl PermissionOracle for StaticPermissions {
    async fn has_capability(
        &self,
        user: &MemberId,
        resource: &ResourceRef,
        action: Action,
    ) -> AccessResult<bool> {
        let grants = match self.grants.read() {
            Ok(grants) => grants,
            Err(_) => return Ok(false),
        };
        Ok(grants.contains(&(user.clone(), resource.clone(), action)))
    }

    async fn accessible_community_ids(
        &self,
        user: &MemberId,
        action: Action,
    ) -> AccessResult<Vec<CommunityId>> {
        let grants = match self.grants.read() {
            Ok(grants) => grants,
            Err(_) => return Ok(Vec::new()),
        };
        let mut ids: Vec<CommunityId> = grants
            .iter()
            .filter(|(grantee, _, granted)| grantee == user && *granted == action)
            .filter_map(|(_, resource, _)| match resource {
                ResourceRef::Community(id) => Some(id.clone()),
                _ => None,
            })
            .collect();
        ids.sort();
        ids.dedup();
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn grants_are_exact() {
        let oracle = StaticPermissions::new();
        let user = MemberId::new("m-1");
        let community = CommunityId::new("c-1");
        oracle.allow_member(&user, &community);

        assert!(oracle
            .has_capability(
                &user,
                &ResourceRef::Community(community.clone()),
                Action::ViewNeeds
            )
            .await
            .unwrap());
        assert!(!oracle
            .has_capability(
                &user,
                &ResourceRef::Community(community.clone()),
                Action::Manage
            )
            .await
            .unwrap());
        assert!(!oracle
            .has_capability(
                &MemberId::new("m-2"),
                &ResourceRef::Community(community),
                Action::ViewNeeds
            )
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn accessible_ids_cover_only_community_grants() {
        let oracle = StaticPermissions::new();
        let user = MemberId::new("m-1");
        oracle.allow_member(&user, &CommunityId::new("c-1"));
        oracle.allow_member(&user, &CommunityId::new("c-2"));
        oracle.allow_manager(&user, &CouncilId::new("council-1"));

        let ids = oracle
            .accessible_community_ids(&user, Action::ViewNeeds)
            .await
            .unwrap();
        assert_eq!(ids.len(), 2);
    }
}
