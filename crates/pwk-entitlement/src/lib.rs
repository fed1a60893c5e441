//! pwk-entitlement
//!
//! Owns the single "is premium" flag.
//!
//! - Initialized from persistence at construction (`false` if absent).
//! - `set_status` is the only mutation path; equal values are suppressed
//!   (no write, no notification).
//! - Changes fan out synchronously to registered observers and to an async
//!   broadcast bus.
//!
//! The store never references the reconciler that feeds it.

mod kv;
mod store;

pub use kv::{JsonFileKv, KeyValueStore, MemoryKv};
pub use store::{
    EntitlementObserver, EntitlementStore, ObserverId, StatusChange, Tier, DEFAULT_STATUS_KEY,
};
