//! Community-wide needs aggregation.
//!
//! Member and council needs are aggregated independently, grouped by item
//! and priority, then concatenated and partitioned into needs vs wants.
//! Rows from the two sources are never merged, even for the same item:
//! provenance is preserved and callers wanting a single per-item total sum
//! across source rows themselves.

use communis_access::{Action, CatalogLookup, PermissionOracle, ResourceRef};
use communis_store::{
    CommunisStore, CouncilNeedFilters, CouncilNeedStore, NeedFilters, NeedStore,
};
use communis_types::{
    CommunityId, CommunityNeedsView, CoreError, CoreResult, ItemId, MemberId, NeedAggregate,
    NeedSource, NeedStatus, Priority,
};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// Builds the priority-split community needs view.
pub struct NeedsAggregator {
    store: Arc<dyn CommunisStore>,
    oracle: Arc<dyn PermissionOracle>,
    catalog: Arc<dyn CatalogLookup>,
}

impl NeedsAggregator {
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

    /// Aggregate all active needs of a community, gated by one view check.
    pub async fn aggregated_needs(
        &self,
        community_id: &CommunityId,
        viewer: &MemberId,
    ) -> CoreResult<CommunityNeedsView> {
        let allowed = self
            .oracle
            .has_capability(
                viewer,
                &ResourceRef::Community(community_id.clone()),
                Action::ViewNeeds,
            )
            .await?;
        if !allowed {
            return Err(CoreError::Forbidden(
                "you do not have permission to view needs in this community".to_string(),
            ));
        }

        let member_rows = self.aggregate_member_needs(community_id).await?;
        let council_rows = self.aggregate_council_needs(community_id).await?;

        let mut view = CommunityNeedsView::default();
        for row in member_rows.into_iter().chain(council_rows) {
            match row.priority {
                Priority::Need => view.needs.push(row),
                Priority::Want => view.wants.push(row),
            }
        }
        Ok(view)
    }

    async fn aggregate_member_needs(
        &self,
        community_id: &CommunityId,
    ) -> CoreResult<Vec<NeedAggregate>> {
        let needs = self
            .store
            .list_needs(&NeedFilters {
                community_id: Some(community_id.clone()),
                status: Some(NeedStatus::Active),
                ..Default::default()
            })
            .await?;

        // BTreeMap keys keep the output order deterministic.
        let mut groups: BTreeMap<(ItemId, Priority), (u64, Vec<MemberId>)> = BTreeMap::new();
        for need in &needs {
            let entry = groups
                .entry((need.core.item_id.clone(), need.core.priority))
                .or_default();
            entry.0 += u64::from(need.core.units_needed);
            if !entry.1.contains(&need.created_by) {
                entry.1.push(need.created_by.clone());
            }
        }
        self.rows_from_groups(groups, NeedSource::Member).await
    }

    async fn aggregate_council_needs(
        &self,
        community_id: &CommunityId,
    ) -> CoreResult<Vec<NeedAggregate>> {
        let needs = self
            .store
            .list_council_needs(&CouncilNeedFilters {
                community_id: Some(community_id.clone()),
                status: Some(NeedStatus::Active),
                ..Default::default()
            })
            .await?;

        let mut groups: BTreeMap<(ItemId, Priority), (u64, Vec<String>)> = BTreeMap::new();
        for need in &needs {
            let entry = groups
                .entry((need.core.item_id.clone(), need.core.priority))
                .or_default();
            entry.0 += u64::from(need.core.units_needed);
            let council = need.council_id.to_string();
            if !entry.1.contains(&council) {
                entry.1.push(council);
            }
        }
        self.rows_from_groups(groups, NeedSource::Council).await
    }

    async fn rows_from_groups<P>(
        &self,
        groups: BTreeMap<(ItemId, Priority), (u64, Vec<P>)>,
        source: NeedSource,
    ) -> CoreResult<Vec<NeedAggregate>> {
        let mut rows = Vec::with_capacity(groups.len());
        for ((item_id, priority), (total_units, participants)) in groups {
            // A need whose item no longer resolves is dropped from the view,
            // mirroring the inner join the persisted aggregation performs.
            let Some(item) = self.catalog.item(&item_id).await? else {
                debug!(item = %item_id, "skipping aggregate row for unresolvable item");
                continue;
            };
            rows.push(NeedAggregate {
                item_id,
                item_name: item.name,
                priority,
                total_units_requested: total_units,
                participant_count: participants.len(),
                source,
            });
        }
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use communis_access::{InMemoryCatalog, StaticPermissions};
    use communis_store::{CouncilNeedStore, InMemoryStore, NeedStore};
    use communis_types::{CouncilId, CouncilNeed, Need, NeedCore, NeedId};

    struct Fixture {
        aggregator: NeedsAggregator,
        store: Arc<InMemoryStore>,
        catalog: Arc<InMemoryCatalog>,
        community: CommunityId,
        viewer: MemberId,
    }

    fn setup() -> Fixture {
        let store = Arc::new(InMemoryStore::new());
        let oracle = Arc::new(StaticPermissions::new());
        let catalog = Arc::new(InMemoryCatalog::new());
        let community = CommunityId::new("c-1");
        let viewer = MemberId::new("viewer");
        oracle.allow_member(&viewer, &community);

        let aggregator = NeedsAggregator::new(store.clone(), oracle, catalog.clone());
        Fixture {
            aggregator,
            store,
            catalog,
            community,
            viewer,
        }
    }

    fn core(
        community: &CommunityId,
        item: &ItemId,
        priority: Priority,
        units: u32,
    ) -> NeedCore {
        let now = Utc::now();
        NeedCore {
            community_id: community.clone(),
            item_id: item.clone(),
            title: "need".into(),
            description: None,
            priority,
            units_needed: units,
            status: NeedStatus::Active,
            is_recurring: false,
            recurrence: None,
            last_fulfilled_at: None,
            next_fulfillment_date: None,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    async fn add_member_need(fx: &Fixture, member: &str, item: &ItemId, priority: Priority, units: u32) {
        fx.store
            .create_need(Need {
                id: NeedId::generate(),
                created_by: MemberId::new(member),
                core: core(&fx.community, item, priority, units),
            })
            .await
            .unwrap();
    }

    async fn add_council_need(fx: &Fixture, council: &str, item: &ItemId, priority: Priority, units: u32) {
        fx.store
            .create_council_need(CouncilNeed {
                id: NeedId::generate(),
                council_id: CouncilId::new(council),
                created_by: MemberId::new("mgr"),
                core: core(&fx.community, item, priority, units),
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn groups_by_item_and_priority_with_distinct_participants() {
        let fx = setup();
        let rice = fx.catalog.add_object(&fx.community, "rice");

        add_member_need(&fx, "m-1", &rice, Priority::Need, 5).await;
        add_member_need(&fx, "m-2", &rice, Priority::Need, 3).await;
        add_member_need(&fx, "m-1", &rice, Priority::Need, 2).await;

        let view = fx
            .aggregator
            .aggregated_needs(&fx.community, &fx.viewer)
            .await
            .unwrap();
        assert_eq!(view.needs.len(), 1);
        let row = &view.needs[0];
        assert_eq!(row.total_units_requested, 10);
        assert_eq!(row.participant_count, 2);
        assert_eq!(row.item_name, "rice");
        assert_eq!(row.source, NeedSource::Member);
        assert!(view.wants.is_empty());
    }

    #[tokio::test]
    async fn same_item_from_both_sources_stays_two_rows() {
        let fx = setup();
        let rice = fx.catalog.add_object(&fx.community, "rice");

        add_member_need(&fx, "m-1", &rice, Priority::Need, 5).await;
        add_council_need(&fx, "council-1", &rice, Priority::Need, 7).await;

        let view = fx
            .aggregator
            .aggregated_needs(&fx.community, &fx.viewer)
            .await
            .unwrap();
        assert_eq!(view.needs.len(), 2);
        let sources: Vec<NeedSource> = view.needs.iter().map(|r| r.source).collect();
        assert!(sources.contains(&NeedSource::Member));
        assert!(sources.contains(&NeedSource::Council));
    }

    #[tokio::test]
    async fn partition_law_holds() {
        let fx = setup();
        let rice = fx.catalog.add_object(&fx.community, "rice");
        let beans = fx.catalog.add_object(&fx.community, "beans");

        add_member_need(&fx, "m-1", &rice, Priority::Need, 5).await;
        add_member_need(&fx, "m-2", &beans, Priority::Want, 2).await;
        add_council_need(&fx, "council-1", &rice, Priority::Want, 4).await;
        add_council_need(&fx, "council-2", &beans, Priority::Need, 1).await;

        let view = fx
            .aggregator
            .aggregated_needs(&fx.community, &fx.viewer)
            .await
            .unwrap();
        // Two member groups + two council groups, split across the partition.
        assert_eq!(view.needs.len() + view.wants.len(), 4);
    }

    #[tokio::test]
    async fn view_permission_is_required() {
        let fx = setup();
        let stranger = MemberId::new("stranger");
        let result = fx
            .aggregator
            .aggregated_needs(&fx.community, &stranger)
            .await;
        assert!(matches!(result, Err(CoreError::Forbidden(_))));
    }
}
