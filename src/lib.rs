//! pagepool - fixed-capacity page buffer pool
//!
//! Caches fixed-size pages keyed by `(file, page number)` in front of a
//! [`PageStore`], with pin counting, LRU/MRU replacement and deferred
//! write-back of dirty pages.
//!
//! ```ignore
//! use pagepool::{BufferPool, EvictionPolicy, MemoryStore, PageId, FileId, PoolConfig};
//!
//! let mut store = MemoryStore::default();
//! let file = store.create_file();
//! let page_id = store.allocate_page(file)?;
//!
//! let pool = BufferPool::with_config(store, PoolConfig::new(8, EvictionPolicy::Lru))?;
//! pool.write_page(page_id, b"hello")?;
//! println!("{}", pool.stats()?);
//! ```

pub mod error;
pub mod storage;

pub use error::{PoolError, ProtocolReason, Result, StorageError};
pub use storage::{
    BufferFrame, BufferPool, DiskManager, EvictionPolicy, FileId, FrameId, MemoryStore,
    PageHandle, PageId, PageStore, PoolConfig, PoolStats, PAGE_SIZE,
};
