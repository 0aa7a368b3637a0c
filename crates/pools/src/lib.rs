//! Communis pools - council-owned inventory and its two flows.
//!
//! Inventory only ever enters a pool through a confirmed contribution and
//! only ever leaves through a distribution, so the ledger plus the
//! contribution log fully explain any pool's balance.
//!
//! - [`PoolsService`] owns pool lifecycle and the manager read views
//! - [`ContributionWorkflow`] runs the `pending -> confirmed | rejected`
//!   intake state machine
//! - [`DistributionEngine`] grants units out, manually or via the
//!   needs-matching mass distribution pass built on [`allocate`]

#![deny(unsafe_code)]

mod allocation;
mod engine;
mod gate;
mod service;
mod workflow;

pub use allocation::{allocate, Candidate, Grant};
pub use engine::{
    DistributeRequest, DistributionEngine, MassDistributionPlan, MassDistributionRequest,
};
pub use service::{CreatePoolRequest, PoolNeedsLine, PoolsService, UpdatePoolRequest};
pub use workflow::{ContributeRequest, ContributionWorkflow};
