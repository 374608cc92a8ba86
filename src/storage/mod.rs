//! Storage module for page caching.
//!
//! This module provides:
//! - Buffer pool management ([`buffer_pool`])
//! - Page-level I/O and the store interface ([`page`])

pub mod buffer_pool;
pub mod page;

// Re-export commonly used types
pub use buffer_pool::{
    BufferFrame, BufferPool, EvictionPolicy, FrameId, PageHandle, PoolConfig, PoolStats,
};
pub use page::{DiskManager, FileId, MemoryStore, PageId, PageStore, PAGE_SIZE};
