//! Communis domain types
//!
//! This crate defines the domain types for the needs lifecycle and pool
//! distribution core: needs published by members and councils, pools of
//! shared inventory owned by councils, contributions flowing into pools,
//! and the append-only distribution ledger flowing back out.
//!
//! This is a pure types crate with no runtime dependencies. All types
//! implement `Clone`, `Debug`, `Serialize`, `Deserialize`. IDs use the
//! newtype pattern and implement `Display`, `generate()`, and `new()`.

#![deny(unsafe_code)]

mod aggregation;
mod contribution;
mod council;
mod distribution;
mod errors;
mod ids;
mod need;
mod pool;

pub use aggregation::*;
pub use contribution::*;
pub use council::*;
pub use distribution::*;
pub use errors::*;
pub use ids::*;
pub use need::*;
pub use pool::*;
