//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate store and entity calls into catalog-level APIs.
//! - Keep callers (CLI, UI bindings) decoupled from storage details.

pub mod catalog;
mod fixtures;

pub use catalog::{CatalogService, Details, TextFilter};
