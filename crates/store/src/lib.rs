//! Communis persistence abstractions.
//!
//! This crate defines the storage contract for the needs and pools core:
//! - member and council need records with filtered listing and the atomic
//!   fulfillment-date advancement the replenishment scheduler relies on
//! - councils, pools, and per-pool inventory
//! - contribution intake records with atomic confirm-and-credit
//! - the append-only distribution ledger with atomic debit-and-append,
//!   single-row and batch
//!
//! Design stance:
//! - A transactional backend remains the source of truth in production.
//! - The in-memory adapter is deterministic and serializes every compound
//!   inventory mutation, so it honors the same atomicity the contract
//!   demands from real backends.

#![deny(unsafe_code)]

mod error;
pub mod memory;
mod traits;

pub use error::{StoreError, StoreResult};
pub use memory::InMemoryStore;
pub use traits::{
    CommunisStore, ContributionStore, CouncilNeedFilters, CouncilNeedStore, CouncilStore,
    DistributionStore, NeedFilters, NeedStore, PoolStore,
};
