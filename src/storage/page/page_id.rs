//! Page and file identifier types.

use serde::{Deserialize, Serialize};

/// Identifier of a file handed out by the storage layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FileId(pub u32);

impl std::fmt::Display for FileId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Unique identifier for a page cached by the buffer pool.
///
/// A page is identified by:
/// - `file_id`: Which file the page belongs to
/// - `page_num`: The page number within the file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PageId {
    /// File the page lives in.
    pub file_id: FileId,
    /// Page number within the file.
    pub page_num: u32,
}

impl PageId {
    /// Creates a new page ID.
    #[must_use]
    pub const fn new(file_id: FileId, page_num: u32) -> Self {
        Self { file_id, page_num }
    }

    /// Returns the byte offset of this page within its file.
    #[must_use]
    pub const fn offset(&self, page_size: usize) -> u64 {
        (self.page_num as u64) * (page_size as u64)
    }

    /// Returns the next page ID (same file, incremented page number).
    #[must_use]
    pub const fn next(&self) -> Self {
        Self {
            file_id: self.file_id,
            page_num: self.page_num + 1,
        }
    }
}

impl std::fmt::Display for PageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Page({}/{})", self.file_id.0, self.page_num)
    }
}
