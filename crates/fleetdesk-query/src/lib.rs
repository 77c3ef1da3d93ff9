//! Fleetdesk Query Layer
//!
//! Generic fetch/cache pattern shared by every entity page:
//! - `QueryCache`: keyed entries with explicit get/set/invalidate/remove,
//!   staleness and eviction, change events, in-flight request sharing
//! - `ResourceQuery`: list/get/create/update/delete for one entity family,
//!   with the cache invalidation each mutation triggers
//! - `Notifier`: user-visible transient messages for mutation outcomes
//!
//! # Invalidation triggers
//! | Mutation | Detail slot | Lists | Sub-resources |
//! |----------|-------------|-------|---------------|
//! | create   | set to the returned record | invalidated | invalidated |
//! | update   | set to the returned record | invalidated | invalidated |
//! | delete   | removed | invalidated | removed for that id, others invalidated |
//!
//! A failed mutation touches nothing.

pub mod cache;
pub mod key;
pub mod notify;
pub mod resource;
pub mod result;

pub use cache::{CacheConfig, CacheEntry, CacheEvent, CacheEventKind, QueryCache};
pub use fleetdesk_api::ListParams;
pub use key::{QueryKey, QueryScope};
pub use notify::{MemoryNotifier, Notification, NotificationLevel, Notifier, TracingNotifier};
pub use resource::ResourceQuery;
pub use result::{QueryError, QueryResult, QueryStatus};
