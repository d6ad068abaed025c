//! Core of the curriculum builder: units, activities and the reactive
//! document model that keeps them in sync with storage.
//! This crate is the single source of truth for document invariants.

pub mod config;
pub mod db;
pub mod entity;
pub mod logging;
pub mod model;
pub mod service;
pub mod store;
pub mod sync;

pub use config::{ConfigError, CoreConfig, StoreBackend};
pub use entity::{
    Activity, ActivityInput, ActivitySummary, ActivityType, Criterion, CriterionInput,
    CriterionType, Location, LocationInput, Resource, ResourceInput, ResourceType, SyncMode,
    SyncedEntity, Unit, UnitSummary,
};
pub use logging::{default_log_level, init_logging, LogError, LogResult, LogTarget};
pub use model::observable::{Observable, ObserverId};
pub use model::path::{ElementKey, FieldPath};
pub use model::record::{FieldUpdate, FieldValue, Record};
pub use service::{CatalogService, Details, TextFilter};
pub use store::{
    DocRef, DocumentStore, LiveSubscription, MemoryStore, SqliteStore, StoreError, StoreResult,
};
pub use sync::{
    Document, ListElement, OrderedCollection, Prop, PropRef, SyncError, SyncResult, UndoDelete,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
