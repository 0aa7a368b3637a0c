//! Needs lifecycle manager.
//!
//! Member needs are owned by their creator; council needs by the council's
//! managers. Every mutating operation is permission-gated up front, and the
//! activity events emitted afterwards are strictly best-effort: a failing
//! event sink never fails the operation that triggered it.

use chrono::Utc;
use communis_access::{
    Action, ActivityEvent, CatalogLookup, EventSink, EventType, ItemSummary, PermissionOracle,
    ResourceRef,
};
use communis_store::{
    CommunisStore, CouncilNeedFilters, CouncilNeedStore, CouncilStore, NeedFilters, NeedStore,
};
use communis_types::{
    CommunityId, CoreError, CoreResult, Council, CouncilId, CouncilNeed, ItemId, MemberId, Need,
    NeedCore, NeedId, NeedStatus, Priority, Recurrence,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Request to publish a member need.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CreateNeedRequest {
    pub community_id: CommunityId,
    pub item_id: ItemId,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub priority: Priority,
    pub units_needed: u32,
    pub is_recurring: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recurrence: Option<Recurrence>,
}

/// Request to publish a council need.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CreateCouncilNeedRequest {
    pub council_id: CouncilId,
    #[serde(flatten)]
    pub need: CreateNeedRequest,
}

/// Partial update of either need family. `None` fields are left unchanged.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct UpdateNeedRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub priority: Option<Priority>,
    pub units_needed: Option<u32>,
    pub status: Option<NeedStatus>,
    pub is_recurring: Option<bool>,
    pub recurrence: Option<Recurrence>,
}

impl UpdateNeedRequest {
    fn touches_recurrence(&self) -> bool {
        self.is_recurring.is_some() || self.recurrence.is_some()
    }
}

/// Caller-facing filters for member-need listings.
#[derive(Clone, Debug, Default)]
pub struct NeedListFilters {
    pub community_id: Option<CommunityId>,
    pub created_by: Option<MemberId>,
    pub item_id: Option<ItemId>,
    pub status: Option<NeedStatus>,
    pub priority: Option<Priority>,
}

/// Caller-facing filters for council-need listings.
#[derive(Clone, Debug, Default)]
pub struct CouncilNeedListFilters {
    pub community_id: Option<CommunityId>,
    pub council_id: Option<CouncilId>,
    pub item_id: Option<ItemId>,
    pub status: Option<NeedStatus>,
    pub priority: Option<Priority>,
}

/// Validates and mutates need records for both ownership families.
pub struct NeedsService {
    store: Arc<dyn CommunisStore>,
    oracle: Arc<dyn PermissionOracle>,
    catalog: Arc<dyn CatalogLookup>,
    events: Arc<dyn EventSink>,
}

impl NeedsService {
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

    // --- Member needs ---

    /// Publish a new member need.
    pub async fn create_need(
        &self,
        request: CreateNeedRequest,
        user: &MemberId,
    ) -> CoreResult<Need> {
        self.require(
            user,
            ResourceRef::Community(request.community_id.clone()),
            Action::PublishNeeds,
            "you do not have permission to publish needs in this community",
        )
        .await?;

        let item = self
            .resolve_community_item(&request.item_id, &request.community_id)
            .await?;
        let core = build_core(&request)?;

        let need = Need {
            id: NeedId::generate(),
            created_by: user.clone(),
            core,
        };
        self.store.create_need(need.clone()).await?;

        info!(need_id = %need.id, community = %need.core.community_id, "need created");
        self.emit(
            &need.core,
            user,
            EventType::NeedCreated,
            &need.id,
            Some(&item),
        )
        .await;
        Ok(need)
    }

    /// Fetch one member need, gated on the community's view permission.
    pub async fn get_need(&self, id: &NeedId, user: &MemberId) -> CoreResult<Need> {
        let need = self.live_need(id).await?;
        self.require(
            user,
            ResourceRef::Community(need.core.community_id.clone()),
            Action::ViewNeeds,
            "you do not have permission to view needs in this community",
        )
        .await?;
        Ok(need)
    }

    /// List member needs.
    ///
    /// With a community filter one permission check gates the whole query.
    /// Without one, the view-permission model is per-community, so the
    /// listing fans out over every community the caller may view and merges
    /// the results newest-first.
    pub async fn list_needs(
        &self,
        filters: NeedListFilters,
        user: &MemberId,
    ) -> CoreResult<Vec<Need>> {
        if let Some(community_id) = &filters.community_id {
            self.require(
                user,
                ResourceRef::Community(community_id.clone()),
                Action::ViewNeeds,
                "you do not have permission to view needs in this community",
            )
            .await?;
            return Ok(self.store.list_needs(&store_filters(&filters)).await?);
        }

        let community_ids = self
            .oracle
            .accessible_community_ids(user, Action::ViewNeeds)
            .await?;
        let mut all = Vec::new();
        for community_id in community_ids {
            let mut scoped = store_filters(&filters);
            scoped.community_id = Some(community_id);
            all.extend(self.store.list_needs(&scoped).await?);
        }
        all.sort_by(|a, b| b.core.created_at.cmp(&a.core.created_at));
        Ok(all)
    }

    /// Update a member need. Only the creator may mutate it.
    pub async fn update_need(
        &self,
        id: &NeedId,
        request: UpdateNeedRequest,
        user: &MemberId,
    ) -> CoreResult<Need> {
        let need = self.live_need(id).await?;
        if need.created_by != *user {
            return Err(CoreError::Forbidden(
                "you can only update your own needs".to_string(),
            ));
        }

        let previous_status = need.core.status;
        let mut updated = need;
        apply_update(&mut updated.core, &request)?;
        self.store.update_need(updated.clone()).await?;

        let event_type = if updated.core.status == NeedStatus::Fulfilled
            && previous_status != NeedStatus::Fulfilled
        {
            EventType::NeedFulfilled
        } else {
            EventType::NeedUpdated
        };
        let item = self.item_for_metadata(&updated.core.item_id).await;
        self.emit(&updated.core, user, event_type, &updated.id, item.as_ref())
            .await;
        Ok(updated)
    }

    /// Soft-delete a member need. Only the creator may delete it.
    pub async fn delete_need(&self, id: &NeedId, user: &MemberId) -> CoreResult<()> {
        let need = self.live_need(id).await?;
        if need.created_by != *user {
            return Err(CoreError::Forbidden(
                "you can only delete your own needs".to_string(),
            ));
        }

        self.store.soft_delete_need(id, Utc::now()).await?;
        info!(need_id = %id, "need deleted");

        // Deletion events always carry a snapshot of the need at delete time.
        let item = self.item_for_metadata(&need.core.item_id).await;
        self.emit(&need.core, user, EventType::NeedDeleted, &need.id, item.as_ref())
            .await;
        Ok(())
    }

    // --- Council needs ---

    /// Publish a new council need. Caller must manage the council.
    pub async fn create_council_need(
        &self,
        request: CreateCouncilNeedRequest,
        user: &MemberId,
    ) -> CoreResult<CouncilNeed> {
        self.require(
            user,
            ResourceRef::Council(request.council_id.clone()),
            Action::Manage,
            "you do not have permission to manage this council",
        )
        .await?;

        let council = self.live_council(&request.council_id).await?;
        if council.community_id != request.need.community_id {
            return Err(CoreError::InvalidArgument(
                "council does not belong to the specified community".to_string(),
            ));
        }

        self.resolve_community_item(&request.need.item_id, &request.need.community_id)
            .await?;
        let core = build_core(&request.need)?;

        let need = CouncilNeed {
            id: NeedId::generate(),
            council_id: request.council_id,
            created_by: user.clone(),
            core,
        };
        self.store.create_council_need(need.clone()).await?;
        info!(need_id = %need.id, council = %need.council_id, "council need created");
        Ok(need)
    }

    /// Fetch one council need, gated on the community's view permission.
    pub async fn get_council_need(&self, id: &NeedId, user: &MemberId) -> CoreResult<CouncilNeed> {
        let need = self.live_council_need(id).await?;
        self.require(
            user,
            ResourceRef::Community(need.core.community_id.clone()),
            Action::ViewNeeds,
            "you do not have permission to view needs in this community",
        )
        .await?;
        Ok(need)
    }

    /// List council needs, with the same per-community fan-out as
    /// [`NeedsService::list_needs`] when no community or council is given.
    pub async fn list_council_needs(
        &self,
        filters: CouncilNeedListFilters,
        user: &MemberId,
    ) -> CoreResult<Vec<CouncilNeed>> {
        if let Some(community_id) = &filters.community_id {
            self.require(
                user,
                ResourceRef::Community(community_id.clone()),
                Action::ViewNeeds,
                "you do not have permission to view needs in this community",
            )
            .await?;
            return Ok(self
                .store
                .list_council_needs(&council_store_filters(&filters))
                .await?);
        }

        if let Some(council_id) = &filters.council_id {
            let council = self.live_council(council_id).await?;
            self.require(
                user,
                ResourceRef::Community(council.community_id.clone()),
                Action::ViewNeeds,
                "you do not have permission to view needs in this community",
            )
            .await?;
            return Ok(self
                .store
                .list_council_needs(&council_store_filters(&filters))
                .await?);
        }

        let community_ids = self
            .oracle
            .accessible_community_ids(user, Action::ViewNeeds)
            .await?;
        let mut all = Vec::new();
        for community_id in community_ids {
            let mut scoped = council_store_filters(&filters);
            scoped.community_id = Some(community_id);
            all.extend(self.store.list_council_needs(&scoped).await?);
        }
        all.sort_by(|a, b| b.core.created_at.cmp(&a.core.created_at));
        Ok(all)
    }

    /// Update a council need. Caller must manage the council.
    pub async fn update_council_need(
        &self,
        id: &NeedId,
        request: UpdateNeedRequest,
        user: &MemberId,
    ) -> CoreResult<CouncilNeed> {
        let need = self.live_council_need(id).await?;
        self.require(
            user,
            ResourceRef::Council(need.council_id.clone()),
            Action::Manage,
            "you do not have permission to manage this council",
        )
        .await?;

        let mut updated = need;
        apply_update(&mut updated.core, &request)?;
        self.store.update_council_need(updated.clone()).await?;
        Ok(updated)
    }

    /// Soft-delete a council need. Caller must manage the council.
    pub async fn delete_council_need(&self, id: &NeedId, user: &MemberId) -> CoreResult<()> {
        let need = self.live_council_need(id).await?;
        self.require(
            user,
            ResourceRef::Council(need.council_id.clone()),
            Action::Manage,
            "you do not have permission to manage this council",
        )
        .await?;
        self.store.soft_delete_council_need(id, Utc::now()).await?;
        info!(need_id = %id, council = %need.council_id, "council need deleted");
        Ok(())
    }

    // --- Helpers ---

    async fn require(
        &self,
        user: &MemberId,
        resource: ResourceRef,
        action: Action,
        denied: &str,
    ) -> CoreResult<()> {
        if self.oracle.has_capability(user, &resource, action).await? {
            Ok(())
        } else {
            Err(CoreError::Forbidden(denied.to_string()))
        }
    }

    async fn live_need(&self, id: &NeedId) -> CoreResult<Need> {
        self.store
            .need(id)
            .await?
            .filter(|n| n.core.deleted_at.is_none())
            .ok_or_else(|| CoreError::NotFound(format!("need {} not found", id)))
    }

    async fn live_council_need(&self, id: &NeedId) -> CoreResult<CouncilNeed> {
        self.store
            .council_need(id)
            .await?
            .filter(|n| n.core.deleted_at.is_none())
            .ok_or_else(|| CoreError::NotFound(format!("council need {} not found", id)))
    }

    async fn live_council(&self, id: &CouncilId) -> CoreResult<Council> {
        self.store
            .council(id)
            .await?
            .filter(|c| c.deleted_at.is_none())
            .ok_or_else(|| CoreError::NotFound(format!("council {} not found", id)))
    }

    /// Resolve an item and check it belongs to the community.
    async fn resolve_community_item(
        &self,
        item_id: &ItemId,
        community_id: &CommunityId,
    ) -> CoreResult<ItemSummary> {
        let item = self
            .catalog
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

    /// Item lookup for event metadata only: collaborator failures are
    /// tolerated here because events themselves are best-effort.
    async fn item_for_metadata(&self, item_id: &ItemId) -> Option<ItemSummary> {
        match self.catalog.item(item_id).await {
            Ok(item) => item,
            Err(err) => {
                debug!(error = %err, item = %item_id, "item lookup for event metadata failed");
                None
            }
        }
    }

    async fn emit(
        &self,
        core: &NeedCore,
        user: &MemberId,
        event_type: EventType,
        need_id: &NeedId,
        item: Option<&ItemSummary>,
    ) {
        let event = ActivityEvent {
            community_id: core.community_id.clone(),
            user_id: user.clone(),
            event_type,
            entity_type: "need".to_string(),
            entity_id: need_id.to_string(),
            metadata: serde_json::json!({
                "itemName": item.map(|i| i.name.clone()),
                "itemKind": item.map(|i| i.kind),
                "priority": core.priority,
                "unitsNeeded": core.units_needed,
                "isRecurring": core.is_recurring,
                "recurrence": core.recurrence,
                "status": core.status,
            }),
            occurred_at: Utc::now(),
        };
        if let Err(err) = self.events.record(event).await {
            warn!(error = %err, need_id = %need_id, "activity event dropped");
        }
    }
}

fn build_core(request: &CreateNeedRequest) -> CoreResult<NeedCore> {
    if request.units_needed == 0 {
        return Err(CoreError::InvalidArgument(
            "units needed must be positive".to_string(),
        ));
    }
    if request.title.trim().is_empty() {
        return Err(CoreError::InvalidArgument(
            "title must not be empty".to_string(),
        ));
    }
    if request.is_recurring && request.recurrence.is_none() {
        return Err(CoreError::InvalidArgument(
            "recurrence frequency is required when the need is recurring".to_string(),
        ));
    }

    let now = Utc::now();
    let next_fulfillment_date = match (request.is_recurring, request.recurrence) {
        (true, Some(recurrence)) => Some(recurrence.next_from(now)),
        _ => None,
    };

    Ok(NeedCore {
        community_id: request.community_id.clone(),
        item_id: request.item_id.clone(),
        title: request.title.clone(),
        description: request.description.clone(),
        priority: request.priority,
        units_needed: request.units_needed,
        status: NeedStatus::Active,
        is_recurring: request.is_recurring,
        recurrence: if request.is_recurring {
            request.recurrence
        } else {
            None
        },
        last_fulfilled_at: None,
        next_fulfillment_date,
        created_at: now,
        updated_at: now,
        deleted_at: None,
    })
}

fn apply_update(core: &mut NeedCore, request: &UpdateNeedRequest) -> CoreResult<()> {
    if let Some(units) = request.units_needed {
        if units == 0 {
            return Err(CoreError::InvalidArgument(
                "units needed must be positive".to_string(),
            ));
        }
    }
    if request.is_recurring == Some(true)
        && request.recurrence.is_none()
        && core.recurrence.is_none()
    {
        return Err(CoreError::InvalidArgument(
            "recurrence frequency is required when the need is recurring".to_string(),
        ));
    }

    if let Some(title) = &request.title {
        core.title = title.clone();
    }
    if let Some(description) = &request.description {
        core.description = Some(description.clone());
    }
    if let Some(priority) = request.priority {
        core.priority = priority;
    }
    if let Some(units) = request.units_needed {
        core.units_needed = units;
    }
    if let Some(status) = request.status {
        core.status = status;
    }

    if request.touches_recurrence() {
        let is_recurring = request.is_recurring.unwrap_or(core.is_recurring);
        let recurrence = request.recurrence.or(core.recurrence);
        core.is_recurring = is_recurring;
        core.recurrence = recurrence;
        // Recompute from now, or clear when recurrence is disabled.
        core.next_fulfillment_date = match (is_recurring, recurrence) {
            (true, Some(recurrence)) => Some(recurrence.next_from(Utc::now())),
            _ => None,
        };
    }

    core.updated_at = Utc::now();
    Ok(())
}

fn store_filters(filters: &NeedListFilters) -> NeedFilters {
    NeedFilters {
        community_id: filters.community_id.clone(),
        created_by: filters.created_by.clone(),
        item_id: filters.item_id.clone(),
        status: filters.status,
        priority: filters.priority,
    }
}

fn council_store_filters(filters: &CouncilNeedListFilters) -> CouncilNeedFilters {
    CouncilNeedFilters {
        community_id: filters.community_id.clone(),
        council_id: filters.council_id.clone(),
        item_id: filters.item_id.clone(),
        status: filters.status,
        priority: filters.priority,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use communis_access::{InMemoryCatalog, RecordingEventSink, StaticPermissions};
    use communis_store::{CouncilStore, InMemoryStore, NeedStore};

    struct Fixture {
        service: NeedsService,
        store: Arc<InMemoryStore>,
        oracle: Arc<StaticPermissions>,
        catalog: Arc<InMemoryCatalog>,
        events: Arc<RecordingEventSink>,
        community: CommunityId,
        item: ItemId,
        member: MemberId,
    }

    async fn setup() -> Fixture {
        let store = Arc::new(InMemoryStore::new());
        let oracle = Arc::new(StaticPermissions::new());
        let catalog = Arc::new(InMemoryCatalog::new());
        let events = Arc::new(RecordingEventSink::new());

        let community = CommunityId::new("c-1");
        let member = MemberId::new("m-1");
        oracle.allow_member(&member, &community);
        let item = catalog.add_object(&community, "rice");

        let service = NeedsService::new(
            store.clone(),
            oracle.clone(),
            catalog.clone(),
            events.clone(),
        );
        Fixture {
            service,
            store,
            oracle,
            catalog,
            events,
            community,
            item,
            member,
        }
    }

    fn create_request(fx: &Fixture) -> CreateNeedRequest {
        CreateNeedRequest {
            community_id: fx.community.clone(),
            item_id: fx.item.clone(),
            title: "rice for the week".into(),
            description: None,
            priority: Priority::Need,
            units_needed: 5,
            is_recurring: false,
            recurrence: None,
        }
    }

    #[tokio::test]
    async fn create_requires_publish_permission() {
        let fx = setup().await;
        let outsider = MemberId::new("outsider");
        let result = fx.service.create_need(create_request(&fx), &outsider).await;
        assert!(matches!(result, Err(CoreError::Forbidden(_))));
    }

    #[tokio::test]
    async fn create_rejects_missing_item() {
        let fx = setup().await;
        let mut request = create_request(&fx);
        request.item_id = ItemId::new("ghost");
        let result = fx.service.create_need(request, &fx.member).await;
        assert!(matches!(result, Err(CoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn create_rejects_recurring_without_cadence() {
        let fx = setup().await;
        let mut request = create_request(&fx);
        request.is_recurring = true;
        let result = fx.service.create_need(request, &fx.member).await;
        assert!(matches!(result, Err(CoreError::InvalidArgument(_))));
    }

    #[tokio::test]
    async fn create_computes_next_fulfillment_and_emits_event() {
        let fx = setup().await;
        let mut request = create_request(&fx);
        request.is_recurring = true;
        request.recurrence = Some(Recurrence::Weekly);

        let need = fx.service.create_need(request, &fx.member).await.unwrap();
        assert_eq!(need.core.status, NeedStatus::Active);
        assert!(need.core.last_fulfilled_at.is_none());
        assert!(need.core.next_fulfillment_date.is_some());
        assert!(need.core.recurrence_is_consistent());
        assert_eq!(fx.events.event_types(), vec![EventType::NeedCreated]);
    }

    #[tokio::test]
    async fn create_succeeds_even_when_event_sink_fails() {
        let fx = setup().await;
        fx.events.fail_from_now_on();
        let need = fx
            .service
            .create_need(create_request(&fx), &fx.member)
            .await
            .unwrap();
        assert!(fx.store.need(&need.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn only_creator_may_update() {
        let fx = setup().await;
        let need = fx
            .service
            .create_need(create_request(&fx), &fx.member)
            .await
            .unwrap();

        let other = MemberId::new("m-2");
        let result = fx
            .service
            .update_need(&need.id, UpdateNeedRequest::default(), &other)
            .await;
        assert!(matches!(result, Err(CoreError::Forbidden(_))));
    }

    #[tokio::test]
    async fn disabling_recurrence_clears_next_date() {
        let fx = setup().await;
        let mut request = create_request(&fx);
        request.is_recurring = true;
        request.recurrence = Some(Recurrence::Daily);
        let need = fx.service.create_need(request, &fx.member).await.unwrap();

        let updated = fx
            .service
            .update_need(
                &need.id,
                UpdateNeedRequest {
                    is_recurring: Some(false),
                    ..Default::default()
                },
                &fx.member,
            )
            .await
            .unwrap();
        assert!(updated.core.next_fulfillment_date.is_none());
        assert!(updated.core.recurrence_is_consistent());
    }

    #[tokio::test]
    async fn fulfilling_classifies_the_event() {
        let fx = setup().await;
        let need = fx
            .service
            .create_need(create_request(&fx), &fx.member)
            .await
            .unwrap();

        fx.service
            .update_need(
                &need.id,
                UpdateNeedRequest {
                    status: Some(NeedStatus::Fulfilled),
                    ..Default::default()
                },
                &fx.member,
            )
            .await
            .unwrap();

        assert_eq!(
            fx.events.event_types(),
            vec![EventType::NeedCreated, EventType::NeedFulfilled]
        );
    }

    #[tokio::test]
    async fn delete_is_soft_and_emits_snapshot_event() {
        let fx = setup().await;
        let need = fx
            .service
            .create_need(create_request(&fx), &fx.member)
            .await
            .unwrap();

        fx.service.delete_need(&need.id, &fx.member).await.unwrap();

        // Row survives with a deletion stamp; reads treat it as gone.
        let raw = fx.store.need(&need.id).await.unwrap().unwrap();
        assert!(raw.core.deleted_at.is_some());
        let result = fx.service.get_need(&need.id, &fx.member).await;
        assert!(matches!(result, Err(CoreError::NotFound(_))));
        assert_eq!(
            fx.events.event_types(),
            vec![EventType::NeedCreated, EventType::NeedDeleted]
        );
    }

    #[tokio::test]
    async fn listing_without_community_fans_out() {
        let fx = setup().await;
        let second_community = CommunityId::new("c-2");
        fx.oracle.allow_member(&fx.member, &second_community);
        let second_item = fx.catalog.add_object(&second_community, "beans");

        fx.service
            .create_need(create_request(&fx), &fx.member)
            .await
            .unwrap();
        fx.service
            .create_need(
                CreateNeedRequest {
                    community_id: second_community,
                    item_id: second_item,
                    title: "beans".into(),
                    description: None,
                    priority: Priority::Want,
                    units_needed: 2,
                    is_recurring: false,
                    recurrence: None,
                },
                &fx.member,
            )
            .await
            .unwrap();

        let all = fx
            .service
            .list_needs(NeedListFilters::default(), &fx.member)
            .await
            .unwrap();
        assert_eq!(all.len(), 2);
        // Newest first.
        assert!(all[0].core.created_at >= all[1].core.created_at);
    }

    #[tokio::test]
    async fn council_need_requires_matching_community() {
        let fx = setup().await;
        let council = CouncilId::new("council-1");
        fx.store
            .upsert_council(Council {
                id: council.clone(),
                community_id: CommunityId::new("elsewhere"),
                name: "council".into(),
                deleted_at: None,
            })
            .await
            .unwrap();
        fx.oracle.allow_manager(&fx.member, &council);

        let result = fx
            .service
            .create_council_need(
                CreateCouncilNeedRequest {
                    council_id: council,
                    need: create_request(&fx),
                },
                &fx.member,
            )
            .await;
        assert!(matches!(result, Err(CoreError::InvalidArgument(_))));
    }

    #[tokio::test]
    async fn council_need_crud_round_trip() {
        let fx = setup().await;
        let council = CouncilId::new("council-1");
        fx.store
            .upsert_council(Council {
                id: council.clone(),
                community_id: fx.community.clone(),
                name: "food council".into(),
                deleted_at: None,
            })
            .await
            .unwrap();
        fx.oracle.allow_manager(&fx.member, &council);

        let need = fx
            .service
            .create_council_need(
                CreateCouncilNeedRequest {
                    council_id: council.clone(),
                    need: create_request(&fx),
                },
                &fx.member,
            )
            .await
            .unwrap();

        // A non-manager member can read but not mutate.
        let reader = MemberId::new("reader");
        fx.oracle.allow_member(&reader, &fx.community);
        assert!(fx.service.get_council_need(&need.id, &reader).await.is_ok());
        let denied = fx
            .service
            .update_council_need(&need.id, UpdateNeedRequest::default(), &reader)
            .await;
        assert!(matches!(denied, Err(CoreError::Forbidden(_))));

        fx.service
            .delete_council_need(&need.id, &fx.member)
            .await
            .unwrap();
        let gone = fx.service.get_council_need(&need.id, &fx.member).await;
        assert!(matches!(gone, Err(CoreError::NotFound(_))));
    }
}
