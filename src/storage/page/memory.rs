//! In-memory page store.

use std::collections::{HashMap, HashSet};

use crate::error::StorageError;
use crate::storage::page::{FileId, PageId, PageStore, PAGE_SIZE};

/// Volatile [`PageStore`] backed by a hash map.
///
/// Pages that were never written read back as zeros. The store counts
/// every read and write it serves and can be told to fail I/O on chosen
/// pages, which makes it the store of choice for exercising the pool's
/// error paths.
#[derive(Debug)]
pub struct MemoryStore {
    page_size: usize,
    pages: HashMap<PageId, Box<[u8]>>,
    /// Number of allocated pages per file.
    files: HashMap<FileId, u32>,
    next_file_id: u32,
    reads: u64,
    writes: u64,
    writes_per_page: HashMap<PageId, u64>,
    failing_reads: HashSet<PageId>,
    failing_writes: HashSet<PageId>,
}

impl MemoryStore {
    /// Creates an empty store for pages of `page_size` bytes.
    #[must_use]
    pub fn new(page_size: usize) -> Self {
        Self {
            page_size,
            pages: HashMap::new(),
            files: HashMap::new(),
            next_file_id: 0,
            reads: 0,
            writes: 0,
            writes_per_page: HashMap::new(),
            failing_reads: HashSet::new(),
            failing_writes: HashSet::new(),
        }
    }

    /// Registers a new, empty file and returns its id.
    pub fn create_file(&mut self) -> FileId {
        let file_id = FileId(self.next_file_id);
        self.next_file_id += 1;
        self.files.insert(file_id, 0);
        file_id
    }

    /// Appends a zeroed page to `file_id`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file was never created.
    pub fn allocate_page(&mut self, file_id: FileId) -> Result<PageId, StorageError> {
        let count = self
            .files
            .get_mut(&file_id)
            .ok_or(StorageError::FileNotOpen(file_id))?;
        let page_id = PageId::new(file_id, *count);
        *count += 1;
        self.pages
            .insert(page_id, vec![0u8; self.page_size].into_boxed_slice());
        Ok(page_id)
    }

    /// Returns the number of pages allocated in `file_id`.
    #[must_use]
    pub fn num_pages(&self, file_id: FileId) -> Option<u32> {
        self.files.get(&file_id).copied()
    }

    /// Returns the stored bytes of a page, if it was ever allocated or written.
    #[must_use]
    pub fn page(&self, page_id: PageId) -> Option<&[u8]> {
        self.pages.get(&page_id).map(|data| &**data)
    }

    /// Total `read_page` calls served.
    #[must_use]
    pub fn reads(&self) -> u64 {
        self.reads
    }

    /// Total `write_page` calls served.
    #[must_use]
    pub fn writes(&self) -> u64 {
        self.writes
    }

    /// Number of successful writes of one page.
    #[must_use]
    pub fn writes_to(&self, page_id: PageId) -> u64 {
        self.writes_per_page.get(&page_id).copied().unwrap_or(0)
    }

    /// Makes every subsequent read of `page_id` fail.
    pub fn fail_reads_of(&mut self, page_id: PageId) {
        self.failing_reads.insert(page_id);
    }

    /// Makes every subsequent write of `page_id` fail.
    pub fn fail_writes_of(&mut self, page_id: PageId) {
        self.failing_writes.insert(page_id);
    }

    /// Removes all injected failures.
    pub fn clear_failures(&mut self) {
        self.failing_reads.clear();
        self.failing_writes.clear();
    }

    fn check_len(&self, len: usize) -> Result<(), StorageError> {
        if len == self.page_size {
            Ok(())
        } else {
            Err(StorageError::BufferSize {
                expected: self.page_size,
                actual: len,
            })
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(PAGE_SIZE)
    }
}

impl PageStore for MemoryStore {
    fn page_size(&self) -> usize {
        self.page_size
    }

    fn read_page(&mut self, page_id: PageId, buf: &mut [u8]) -> Result<(), StorageError> {
        self.check_len(buf.len())?;
        if self.failing_reads.contains(&page_id) {
            return Err(StorageError::Injected(format!("read of {page_id}")));
        }
        match self.pages.get(&page_id) {
            Some(data) => buf.copy_from_slice(data),
            None => buf.fill(0),
        }
        self.reads += 1;
        Ok(())
    }

    fn write_page(&mut self, page_id: PageId, data: &[u8]) -> Result<(), StorageError> {
        self.check_len(data.len())?;
        if self.failing_writes.contains(&page_id) {
            return Err(StorageError::Injected(format!("write of {page_id}")));
        }
        self.pages.insert(page_id, data.into());
        self.writes += 1;
        *self.writes_per_page.entry(page_id).or_insert(0) += 1;
        Ok(())
    }
}
