//! Field-level bidirectional sync between stored documents and reactive
//! properties.
//!
//! # Responsibility
//! - `Prop`: one observable, editable and synced field.
//! - `Document`: the property set of one stored record, echo suppression and
//!   edit sessions.
//! - `OrderedCollection`: nested element maps with a self-repairing order.
//!
//! # Invariants
//! - Reads from storage never write back to storage.
//! - Local writes are last-write-wins per field; there is no merge.

mod collection;
mod document;
mod error;
mod prop;

pub use collection::{ListElement, OrderedCollection, UndoDelete};
pub use document::{Document, EchoGuard};
pub use error::{FieldWriteFailure, SyncError, SyncResult};
pub use prop::{Prop, PropRef, PropValue};
