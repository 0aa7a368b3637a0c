//! The item catalog contract.

use crate::AccessResult;
use async_trait::async_trait;
use communis_types::{CommunityId, ItemId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::RwLock;

/// What a catalog item is.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    Object,
    Service,
}

/// The catalog's view of an item.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ItemSummary {
    pub id: ItemId,
    pub community_id: CommunityId,
    pub name: String,
    pub kind: ItemKind,
}

/// Resolves item ids against the external catalog.
#[async_trait]
pub trait CatalogLookup: Send + Sync {
    /// Look up one item. `None` means the item does not exist.
    async fn item(&self, id: &ItemId) -> AccessResult<Option<ItemSummary>>;
}

/// A fixed in-memory catalog.
#[derive(Default)]
pub struct InMemoryCatalog {
    items: RwLock<HashMap<ItemId, ItemSummary>>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, item: ItemSummary) {
        if let Ok(mut items) = self.items.write() {
            items.insert(item.id.clone(), item);
        }
    }

    /// Convenience: register an object item and return its id.
    pub fn add_object(&self, community_id: &CommunityId, name: &str) -> ItemId {
        let id = ItemId::generate();
        self.insert(ItemSummary {
            id: id.clone(),
            community_id: community_id.clone(),
            name: name.to_string(),
            kind: ItemKind::Object,
        });
        id
    }
}

#[async_trait]
impl CatalogLookup for InMemoryCatalog {
    async fn item(&self, id: &ItemId) -> AccessResult<Option<ItemSummary>> {
        let items = match self.items.read() {
            Ok(items) => items,
            Err(_) => return Ok(None),
        };
        Ok(items.get(id).cloned())
    }
}
