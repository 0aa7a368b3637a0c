//! Communis needs core - lifecycle, replenishment, aggregation.
//!
//! Three surfaces over the same need records:
//!
//! - [`NeedsService`] validates and mutates member and council needs, with
//!   permission gating and best-effort activity events
//! - [`ReplenishmentScheduler`] advances due recurring needs in a
//!   partial-failure-tolerant batch, one summary per run
//! - [`NeedsAggregator`] merges both need families into the priority-split
//!   community view

#![deny(unsafe_code)]

mod aggregate;
mod lifecycle;
mod replenish;

pub use aggregate::NeedsAggregator;
pub use lifecycle::{
    CouncilNeedListFilters, CreateCouncilNeedRequest, CreateNeedRequest, NeedListFilters,
    NeedsService, UpdateNeedRequest,
};
pub use replenish::{
    ReplenishmentError, ReplenishmentOutcome, ReplenishmentScheduler, ReplenishmentSummary,
};
