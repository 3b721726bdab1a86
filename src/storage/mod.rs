//! In-memory, bounded per-entity event history and feature cache.

mod history;
mod store;

pub use history::History;
pub use store::{EntityEntry, EntityState, EventStore, StoreStats};
