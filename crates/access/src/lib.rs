//! Communis external collaborator contracts.
//!
//! The core never talks to the permission graph, the item catalog, or the
//! activity feed directly. It goes through the narrow async traits defined
//! here:
//!
//! - [`PermissionOracle`] - yes/no capability checks plus the accessible-id
//!   listing used by cross-community fan-out
//! - [`CatalogLookup`] - item id to name/kind resolution
//! - [`EventSink`] - fire-and-forget activity recording
//!
//! Each trait ships a deterministic in-memory implementation so the core is
//! testable without any of the real collaborators. Collaborator failures are
//! infrastructure errors, never silently coerced into "denied" or "missing".

#![deny(unsafe_code)]

mod catalog;
mod error;
mod events;
mod oracle;

pub use catalog::{CatalogLookup, InMemoryCatalog, ItemKind, ItemSummary};
pub use error::{AccessError, AccessResult};
pub use events::{ActivityEvent, EventSink, EventType, NullEventSink, RecordingEventSink};
pub use oracle::{Action, PermissionOracle, ResourceRef, StaticPermissions};
