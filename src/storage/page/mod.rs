//! Page-level storage primitives.
//!
//! This module defines the interface the buffer pool consumes from the
//! durable layer below it:
//! - `PageId` / `FileId`: Identity of a page
//! - `PageStore`: Read and write whole pages
//! - `DiskManager`: Directory-backed store, one file per `FileId`
//! - `MemoryStore`: Volatile store used for tests and benchmarks

mod disk_manager;
mod memory;
mod page_id;

pub use disk_manager::DiskManager;
pub use memory::MemoryStore;
pub use page_id::{FileId, PageId};

use crate::error::StorageError;

/// Default page size in bytes (4KB).
pub const PAGE_SIZE: usize = 4096;

/// Durable page storage underneath the buffer pool.
///
/// Implementations own page allocation and file lifecycle; the pool only
/// reads and writes whole pages. Buffers are always exactly one page long.
pub trait PageStore {
    /// Size in bytes of every page this store reads and writes.
    fn page_size(&self) -> usize;

    /// Fills `buf` with the durable contents of `page_id`.
    ///
    /// # Errors
    ///
    /// Returns an error if the page cannot be read.
    fn read_page(&mut self, page_id: PageId, buf: &mut [u8]) -> Result<(), StorageError>;

    /// Persists `data` as the contents of `page_id`.
    ///
    /// A successful write must be visible to every later `read_page`.
    ///
    /// # Errors
    ///
    /// Returns an error if the page cannot be written.
    fn write_page(&mut self, page_id: PageId, data: &[u8]) -> Result<(), StorageError>;
}

impl<S: PageStore + ?Sized> PageStore for &mut S {
    fn page_size(&self) -> usize {
        (**self).page_size()
    }

    fn read_page(&mut self, page_id: PageId, buf: &mut [u8]) -> Result<(), StorageError> {
        (**self).read_page(page_id, buf)
    }

    fn write_page(&mut self, page_id: PageId, data: &[u8]) -> Result<(), StorageError> {
        (**self).write_page(page_id, data)
    }
}

impl<S: PageStore + ?Sized> PageStore for Box<S> {
    fn page_size(&self) -> usize {
        (**self).page_size()
    }

    fn read_page(&mut self, page_id: PageId, buf: &mut [u8]) -> Result<(), StorageError> {
        (**self).read_page(page_id, buf)
    }

    fn write_page(&mut self, page_id: PageId, data: &[u8]) -> Result<(), StorageError> {
        (**self).write_page(page_id, data)
    }
}
