//! Recurrence replenishment scheduler.
//!
//! An external timer invokes [`ReplenishmentScheduler::replenish_due_needs`]
//! once per scheduling period. Each due need is advanced independently:
//! a malformed or failing record lands in the run summary and the batch
//! moves on. The summary is the batch's sole contract with its caller.

use chrono::Utc;
use communis_store::{CommunisStore, CouncilNeedStore, NeedStore};
use communis_types::{CoreResult, NeedCore, NeedId};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

/// One failed need in a replenishment run.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ReplenishmentError {
    pub need_id: NeedId,
    pub error: String,
}

/// Result summary of one replenishment run.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ReplenishmentSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub errors: Vec<ReplenishmentError>,
}

/// Outcome of asking the scheduler to run.
#[derive(Clone, Debug)]
pub enum ReplenishmentOutcome {
    Completed(ReplenishmentSummary),
    /// A previous run is still in flight; nothing was touched.
    AlreadyRunning,
}

/// Advances due recurring needs on a cadence.
pub struct ReplenishmentScheduler {
    store: Arc<dyn CommunisStore>,
    // Single-flight guard: overlapping runs could double-advance a need's
    // next fulfillment date.
    running: Mutex<()>,
}

impl ReplenishmentScheduler {
    pub fn new(store: Arc<dyn CommunisStore>) -> Self {
        Self {
            store,
            running: Mutex::new(()),
        }
    }

    /// Advance every due recurring need, member and council alike.
    ///
    /// Per-need failures never abort the batch. Only a failure of the due
    /// queries themselves surfaces as an error.
    pub async fn replenish_due_needs(&self) -> CoreResult<ReplenishmentOutcome> {
        let _guard = match self.running.try_lock() {
            Ok(guard) => guard,
            Err(_) => {
                warn!("replenishment requested while a run is in flight; skipping");
                return Ok(ReplenishmentOutcome::AlreadyRunning);
            }
        };

        let now = Utc::now();
        let (due_member, due_council) = futures::try_join!(
            self.store.needs_due_for_replenishment(now),
            self.store.council_needs_due_for_replenishment(now),
        )?;

        let mut summary = ReplenishmentSummary {
            total: due_member.len() + due_council.len(),
            ..Default::default()
        };

        for need in due_member {
            match next_date(&need.core, &need.id) {
                Ok(next) => {
                    match self
                        .store
                        .advance_need_fulfillment(&need.id, now, next)
                        .await
                    {
                        Ok(()) => summary.succeeded += 1,
                        Err(err) => {
                            error!(need_id = %need.id, error = %err, "failed to replenish need");
                            record_failure(&mut summary, need.id, err.to_string());
                        }
                    }
                }
                Err(reason) => record_failure(&mut summary, need.id, reason),
            }
        }

        for need in due_council {
            match next_date(&need.core, &need.id) {
                Ok(next) => {
                    match self
                        .store
                        .advance_council_need_fulfillment(&need.id, now, next)
                        .await
                    {
                        Ok(()) => summary.succeeded += 1,
                        Err(err) => {
                            error!(need_id = %need.id, error = %err, "failed to replenish council need");
                            record_failure(&mut summary, need.id, err.to_string());
                        }
                    }
                }
                Err(reason) => record_failure(&mut summary, need.id, reason),
            }
        }

        info!(
            total = summary.total,
            succeeded = summary.succeeded,
            failed = summary.failed,
            "replenishment run complete"
        );
        Ok(ReplenishmentOutcome::Completed(summary))
    }
}

fn next_date(
    core: &NeedCore,
    need_id: &NeedId,
) -> Result<chrono::DateTime<Utc>, String> {
    match core.recurrence {
        Some(recurrence) => Ok(recurrence.next_from(Utc::now())),
        None => {
            warn!(need_id = %need_id, "due need has no recurrence configuration");
            Err("missing recurrence configuration".to_string())
        }
    }
}

fn record_failure(summary: &mut ReplenishmentSummary, need_id: NeedId, error: String) {
    summary.failed += 1;
    summary.errors.push(ReplenishmentError { need_id, error });
}

#[cfg(test)]
mod tests {
    use super::*;
    use communis_store::{InMemoryStore, NeedStore};
    use communis_types::{
        CommunityId, CouncilNeed, CouncilId, ItemId, MemberId, Need, NeedStatus, Priority,
        Recurrence,
    };
    use chrono::{DateTime, Days};
    use communis_store::CouncilNeedStore;

    fn recurring_core(due: Option<DateTime<Utc>>, recurrence: Option<Recurrence>) -> NeedCore {
        let now = Utc::now();
        NeedCore {
            community_id: CommunityId::new("c-1"),
            item_id: ItemId::new("rice"),
            title: "rice".into(),
            description: None,
            priority: Priority::Need,
            units_needed: 3,
            status: NeedStatus::Active,
            is_recurring: true,
            recurrence,
            last_fulfilled_at: None,
            next_fulfillment_date: due,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    fn due_need(id: &str, recurrence: Option<Recurrence>) -> Need {
        Need {
            id: NeedId::new(id),
            created_by: MemberId::new("m-1"),
            core: recurring_core(Some(Utc::now() - Days::new(1)), recurrence),
        }
    }

    #[tokio::test]
    async fn advances_due_needs_and_reports_summary() {
        let store = Arc::new(InMemoryStore::new());
        store
            .create_need(due_need("n-1", Some(Recurrence::Daily)))
            .await
            .unwrap();
        store
            .create_council_need(CouncilNeed {
                id: NeedId::new("cn-1"),
                council_id: CouncilId::new("council-1"),
                created_by: MemberId::new("m-1"),
                core: recurring_core(Some(Utc::now() - Days::new(2)), Some(Recurrence::Weekly)),
            })
            .await
            .unwrap();

        let scheduler = ReplenishmentScheduler::new(store.clone());
        let outcome = scheduler.replenish_due_needs().await.unwrap();
        let summary = match outcome {
            ReplenishmentOutcome::Completed(summary) => summary,
            ReplenishmentOutcome::AlreadyRunning => panic!("run should have started"),
        };
        assert_eq!(summary.total, 2);
        assert_eq!(summary.succeeded, 2);
        assert_eq!(summary.failed, 0);

        let advanced = store.need(&NeedId::new("n-1")).await.unwrap().unwrap();
        assert!(advanced.core.last_fulfilled_at.is_some());
        assert!(advanced.core.next_fulfillment_date.unwrap() > Utc::now());
        assert!(advanced.core.recurrence_is_consistent());
    }

    #[tokio::test]
    async fn one_malformed_record_does_not_block_the_batch() {
        let store = Arc::new(InMemoryStore::new());
        for i in 0..4 {
            store
                .create_need(due_need(&format!("n-{i}"), Some(Recurrence::Daily)))
                .await
                .unwrap();
        }
        // Illegal but possible: recurring without a cadence.
        store.create_need(due_need("n-bad", None)).await.unwrap();

        let scheduler = ReplenishmentScheduler::new(store);
        let outcome = scheduler.replenish_due_needs().await.unwrap();
        let summary = match outcome {
            ReplenishmentOutcome::Completed(summary) => summary,
            ReplenishmentOutcome::AlreadyRunning => panic!("run should have started"),
        };
        assert_eq!(summary.total, 5);
        assert_eq!(summary.succeeded, 4);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.errors[0].need_id, NeedId::new("n-bad"));
        assert_eq!(summary.errors[0].error, "missing recurrence configuration");
    }

    #[tokio::test]
    async fn replenishment_is_idempotent_within_a_period() {
        let store = Arc::new(InMemoryStore::new());
        store
            .create_need(due_need("n-1", Some(Recurrence::Daily)))
            .await
            .unwrap();

        let scheduler = ReplenishmentScheduler::new(store);
        let first = scheduler.replenish_due_needs().await.unwrap();
        if let ReplenishmentOutcome::Completed(summary) = first {
            assert_eq!(summary.succeeded, 1);
        } else {
            panic!("first run should complete");
        }

        // The first run moved the due date past now; nothing is due anymore.
        let second = scheduler.replenish_due_needs().await.unwrap();
        if let ReplenishmentOutcome::Completed(summary) = second {
            assert_eq!(summary.total, 0);
        } else {
            panic!("second run should complete");
        }
    }
}
