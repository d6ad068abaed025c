//! Errors surfaced by the document sync layer.

use crate::model::path::ElementKey;
use crate::store::{DocRef, StoreError};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type SyncResult<T> = Result<T, SyncError>;

/// One field write that failed during a multi-field commit.
#[derive(Debug)]
pub struct FieldWriteFailure {
    /// Dotted path of the field.
    pub path: String,
    pub error: SyncError,
}

/// Sync-layer error.
#[derive(Debug)]
pub enum SyncError {
    /// Storage rejected or failed a read/write.
    Store(StoreError),
    /// Document does not exist in storage.
    NotFound(DocRef),
    /// Stored value at `path` cannot be decoded into the field type.
    Decode { path: String, message: String },
    /// Local value at `path` cannot be encoded for storage.
    Encode { path: String, message: String },
    /// Collection operation targeted a key that is not present.
    UnknownElement {
        collection: String,
        key: ElementKey,
    },
    /// No numeric key is left above the largest one in the collection.
    KeysExhausted { collection: String },
    /// Some fields of a commit failed to write; the others were written.
    PartialCommit(Vec<FieldWriteFailure>),
}

impl Display for SyncError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Store(err) => write!(f, "{err}"),
            Self::NotFound(doc) => write!(f, "document not found: {doc}"),
            Self::Decode { path, message } => {
                write!(f, "cannot decode stored field `{path}`: {message}")
            }
            Self::Encode { path, message } => {
                write!(f, "cannot encode field `{path}`: {message}")
            }
            Self::UnknownElement { collection, key } => {
                write!(f, "no element `{key}` in collection `{collection}`")
            }
            Self::KeysExhausted { collection } => {
                write!(f, "no element key left in collection `{collection}`")
            }
            Self::PartialCommit(failures) => {
                write!(f, "{} field write(s) failed:", failures.len())?;
                for failure in failures {
                    write!(f, " {}: {};", failure.path, failure.error)?;
                }
                Ok(())
            }
        }
    }
}

impl Error for SyncError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Store(err) => Some(err),
            Self::PartialCommit(failures) => failures
                .first()
                .map(|failure| &failure.error as &(dyn Error + 'static)),
            Self::NotFound(_) => None,
            Self::Decode { .. } => None,
            Self::Encode { .. } => None,
            Self::UnknownElement { .. } => None,
            Self::KeysExhausted { .. } => None,
        }
    }
}

impl From<StoreError> for SyncError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::NotFound(doc) => Self::NotFound(doc),
            other => Self::Store(other),
        }
    }
}
