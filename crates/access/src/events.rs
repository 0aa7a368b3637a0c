//! The fire-and-forget activity event sink.

use crate::{AccessError, AccessResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use communis_types::{CommunityId, MemberId};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

/// Activity event classification.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    NeedCreated,
    NeedUpdated,
    NeedFulfilled,
    NeedDeleted,
    PoolDistributionExecuted,
}

/// One activity record handed to the sink.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ActivityEvent {
    pub community_id: CommunityId,
    pub user_id: MemberId,
    pub event_type: EventType,
    pub entity_type: String,
    pub entity_id: String,
    pub metadata: Value,
    pub occurred_at: DateTime<Utc>,
}

/// Fire-and-forget event recording.
///
/// Callers must treat failures as non-fatal: catch, log, move on. Business
/// transactions never depend on the sink succeeding.
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn record(&self, event: ActivityEvent) -> AccessResult<()>;
}

/// Discards every event.
#[derive(Default)]
pub struct NullEventSink;

#[async_trait]
impl EventSink for NullEventSink {
    async fn record(&self, _event: ActivityEvent) -> AccessResult<()> {
        Ok(())
    }
}

/// Captures events for assertions; can be switched into a failing mode to
/// exercise the swallow-and-continue paths.
#[derive(Default)]
pub struct RecordingEventSink {
    events: Mutex<Vec<ActivityEvent>>,
    failing: AtomicBool,
}

impl RecordingEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `record` call fail.
    pub fn fail_from_now_on(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }

    pub fn events(&self) -> Vec<ActivityEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    pub fn event_types(&self) -> Vec<EventType> {
        self.events().iter().map(|e| e.event_type).collect()
    }
}

#[async_trait]
impl EventSink for RecordingEventSink {
    async fn record(&self, event: ActivityEvent) -> AccessResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(AccessError::Unavailable("event sink offline".to_string()));
        }
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
        Ok(())
    }
}
