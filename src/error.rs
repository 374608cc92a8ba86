//! Error types for buffer pool and page storage operations.

use std::fmt;

use thiserror::Error;

use crate::storage::page::{FileId, PageId};

/// Result type alias using [`PoolError`].
pub type Result<T> = std::result::Result<T, PoolError>;

/// Why a release was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolReason {
    /// The page is not bound to any frame.
    NotResident,
    /// The page is resident but nobody holds a pin on it.
    NotPinned,
}

impl fmt::Display for ProtocolReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtocolReason::NotResident => f.write_str("not resident"),
            ProtocolReason::NotPinned => f.write_str("not pinned"),
        }
    }
}

/// Errors surfaced by the buffer pool.
#[derive(Debug, Error)]
pub enum PoolError {
    /// Operation issued before `initialize` or after `shutdown`.
    #[error("Buffer pool is not initialized")]
    NotInitialized,

    /// Frame allocation or configuration failed during setup.
    #[error("Buffer pool initialization failed: {0}")]
    InitializationFailure(String),

    /// Every resident page is pinned, so no frame can be reclaimed.
    #[error("Buffer pool exhausted: all {capacity} frames are pinned")]
    ResourceExhausted { capacity: usize },

    /// Writing a dirty frame back to storage failed.
    #[error("Write-back of {page_id} failed: {source}")]
    WriteBackFailure {
        page_id: PageId,
        #[source]
        source: StorageError,
    },

    /// Loading a page from storage failed.
    #[error("Load of {page_id} failed: {source}")]
    LoadFailure {
        page_id: PageId,
        #[source]
        source: StorageError,
    },

    /// Release without a matching acquire.
    #[error("Protocol violation on {page_id}: {reason}")]
    ProtocolViolation {
        page_id: PageId,
        reason: ProtocolReason,
    },

    /// A page view holds the frame's buffer, so it cannot be written back yet.
    #[error("{page_id} is being written and cannot be flushed")]
    PageBusy { page_id: PageId },

    /// Caller-supplied buffer does not fit the pool's page size.
    #[error("Page size mismatch: page holds {expected} bytes, got {actual}")]
    PageSizeMismatch { expected: usize, actual: usize },
}

impl PoolError {
    /// Returns true for errors a caller should treat as backpressure or a
    /// possibly transient storage fault rather than a programming error.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            PoolError::ResourceExhausted { .. }
                | PoolError::PageBusy { .. }
                | PoolError::WriteBackFailure { .. }
                | PoolError::LoadFailure { .. }
        )
    }
}

/// Errors reported by a [`PageStore`](crate::storage::PageStore) implementation.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Underlying file I/O failed.
    #[error("I/O error while {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    /// No file with this name exists in the store.
    #[error("File not found: {0}")]
    FileNotFound(String),

    /// A file with this name already exists.
    #[error("File already exists: {0}")]
    FileExists(String),

    /// The file id does not refer to an open file.
    #[error("File {0} is not open")]
    FileNotOpen(FileId),

    /// The buffer handed to the store is not exactly one page.
    #[error("Buffer is {actual} bytes, page size is {expected}")]
    BufferSize { expected: usize, actual: usize },

    /// Failure raised on purpose by a test store.
    #[error("Injected failure: {0}")]
    Injected(String),
}

impl StorageError {
    pub(crate) fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        StorageError::Io {
            context: context.into(),
            source,
        }
    }
}
