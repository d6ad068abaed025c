//! Storage-independent building blocks of the curriculum document model.
//!
//! # Responsibility
//! - Typed field paths into nested document records.
//! - Raw records and multi-field partial updates.
//! - Observable single-value cells for the view layer.
//!
//! # Invariants
//! - Paths are built from typed segments, never parsed from dotted strings.
//! - A `FieldUpdate` keeps insertion order when applied.

pub mod observable;
pub mod path;
pub mod record;
