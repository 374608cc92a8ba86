//! Buffer pool management for page caching.
//!
//! This module implements a fixed-capacity buffer pool that caches pages
//! read from a [`PageStore`]. It provides:
//! - Page pinning and releasing with reference counting
//! - LRU or MRU victim selection among unpinned frames
//! - Deferred write-back of dirty pages before their frame is reused
//! - RAII guards (`PageHandle`) for scoped page access
//! - Hit/miss and logical/physical I/O counters
//!
//! # Locking
//!
//! The frame table, page index, clock and counters sit behind one mutex that
//! every operation takes for its whole duration, including store I/O. Page
//! bytes sit behind a per-frame read/write lock that only page views take.
//! A pinned frame is never chosen as a victim, so a live view never blocks
//! a miss. Flushing a page with a live write view fails with `PageBusy`.
//! Two views of the same page where one is a write view must not overlap
//! on one thread.
//!
//! # Example
//!
//! ```ignore
//! let pool = BufferPool::with_config(store, PoolConfig::default())?;
//! let mut handle = pool.acquire(page_id)?;
//! handle.data_mut()[0] = 1;
//! // Page released (and marked dirty) when handle drops
//! ```

mod buffer_frame;
mod config;
mod eviction;
mod stats;

pub use buffer_frame::{BufferFrame, FrameId};
pub use config::{PoolConfig, DEFAULT_CAPACITY};
pub use eviction::EvictionPolicy;
pub use stats::PoolStats;

use std::collections::HashMap;
use std::fmt;
use std::mem::ManuallyDrop;

use parking_lot::{
    MappedMutexGuard, MappedRwLockReadGuard, MappedRwLockWriteGuard, Mutex, MutexGuard, RwLock,
    RwLockReadGuard, RwLockWriteGuard,
};
use tracing::{debug, warn};

use crate::error::{PoolError, ProtocolReason, Result};
use crate::storage::page::{PageId, PageStore};

/// Frame table, page index and counters of an initialized pool.
struct PoolCore {
    /// One entry per frame, indexed by `FrameId`.
    frames: Vec<BufferFrame>,
    /// Maps resident pages to their frame.
    page_index: HashMap<PageId, FrameId>,
    policy: EvictionPolicy,
    /// Logical clock, advanced on every acquire and release.
    clock: u64,
    stats: PoolStats,
}

impl PoolCore {
    fn new(capacity: usize, policy: EvictionPolicy) -> Self {
        Self {
            frames: (0..capacity).map(BufferFrame::new).collect(),
            page_index: HashMap::with_capacity(capacity),
            policy,
            clock: 0,
            stats: PoolStats::default(),
        }
    }

    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }
}

const STORE_TAKEN: &str = "page store is only taken by into_store";

/// State guarded by the pool mutex.
struct PoolState<S> {
    /// `None` only once `into_store` has consumed the pool.
    store: Option<S>,
    /// `None` while the pool is uninitialized.
    core: Option<PoolCore>,
}

impl<S> PoolState<S> {
    fn store(&self) -> &S {
        self.store.as_ref().expect(STORE_TAKEN)
    }

    fn store_mut(&mut self) -> &mut S {
        self.store.as_mut().expect(STORE_TAKEN)
    }

    /// Splits out the store and core of an initialized pool.
    fn parts(&mut self) -> Result<(&mut S, &mut PoolCore)> {
        let core = self.core.as_mut().ok_or(PoolError::NotInitialized)?;
        let store = self.store.as_mut().expect(STORE_TAKEN);
        Ok((store, core))
    }
}

/// Fixed-capacity page cache over a [`PageStore`].
pub struct BufferPool<S: PageStore> {
    state: Mutex<PoolState<S>>,
    /// Page bytes, one buffer per frame. Empty while uninitialized.
    buffers: Vec<RwLock<Box<[u8]>>>,
    config: Option<PoolConfig>,
}

impl<S: PageStore> BufferPool<S> {
    /// Creates an uninitialized pool over `store`.
    ///
    /// Every operation except [`initialize`](Self::initialize) fails with
    /// `NotInitialized` until the pool is initialized.
    #[must_use]
    pub fn new(store: S) -> Self {
        Self {
            state: Mutex::new(PoolState {
                store: Some(store),
                core: None,
            }),
            buffers: Vec::new(),
            config: None,
        }
    }

    /// Creates and initializes a pool in one step.
    ///
    /// # Errors
    ///
    /// Returns `InitializationFailure` if the configuration is invalid or
    /// the frames cannot be allocated.
    pub fn with_config(store: S, config: PoolConfig) -> Result<Self> {
        let mut pool = Self::new(store);
        pool.initialize(config)?;
        Ok(pool)
    }

    /// Allocates `config.capacity` empty frames.
    ///
    /// Zero capacity is rejected rather than replaced by a default. On any
    /// failure the pool stays uninitialized with nothing allocated.
    ///
    /// # Errors
    ///
    /// Returns `InitializationFailure` if the pool is already initialized,
    /// the configuration is invalid or does not match the store's page
    /// size, or frame allocation fails.
    pub fn initialize(&mut self, config: PoolConfig) -> Result<()> {
        if self.is_initialized() {
            return Err(PoolError::InitializationFailure(
                "buffer pool is already initialized".into(),
            ));
        }
        config
            .validate()
            .map_err(|e| PoolError::InitializationFailure(e.into()))?;

        let store_page_size = self.state.get_mut().store().page_size();
        if store_page_size != config.page_size {
            return Err(PoolError::InitializationFailure(format!(
                "page size {} does not match the store's page size {store_page_size}",
                config.page_size
            )));
        }

        let buffers = allocate_buffers(config.capacity, config.page_size).map_err(|e| {
            PoolError::InitializationFailure(format!(
                "cannot allocate {} frames of {} bytes: {e}",
                config.capacity, config.page_size
            ))
        })?;

        self.state.get_mut().core = Some(PoolCore::new(config.capacity, config.policy));
        self.buffers = buffers;
        debug!(
            capacity = config.capacity,
            policy = %config.policy,
            page_size = config.page_size,
            "Initialized buffer pool"
        );
        self.config = Some(config);
        Ok(())
    }

    /// Flushes dirty pages, then frees every frame.
    ///
    /// The pool is uninitialized afterwards even if the flush fails; the
    /// flush error is returned. Shutting down an uninitialized pool is a
    /// no-op.
    ///
    /// # Errors
    ///
    /// Returns the first write-back failure of the final flush.
    pub fn shutdown(&mut self) -> Result<()> {
        if !self.is_initialized() {
            return Ok(());
        }

        let flushed = self.flush_all();
        if let Err(e) = &flushed {
            warn!(error = %e, "Flush during shutdown failed, dropping dirty pages");
        }

        if let Some(core) = self.state.get_mut().core.take() {
            let pinned = core.frames.iter().filter(|f| f.pin_count > 0).count();
            if pinned > 0 {
                warn!(pinned, "Shutting down buffer pool with pinned frames");
            }
        }
        self.buffers = Vec::new();
        self.config = None;
        debug!("Shut down buffer pool");
        flushed
    }

    /// Returns whether the pool is initialized.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.config.is_some()
    }

    /// Returns the configuration the pool was initialized with.
    #[must_use]
    pub fn config(&self) -> Option<&PoolConfig> {
        self.config.as_ref()
    }

    /// Returns the eviction policy, or `None` while uninitialized.
    #[must_use]
    pub fn policy(&self) -> Option<EvictionPolicy> {
        self.config.as_ref().map(|config| config.policy)
    }

    /// Returns the page size in bytes, or `None` while uninitialized.
    #[must_use]
    pub fn page_size(&self) -> Option<usize> {
        self.config.as_ref().map(|config| config.page_size)
    }

    /// Returns the number of frames, or 0 while uninitialized.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.buffers.len()
    }

    /// Returns the number of frames currently bound to a page.
    #[must_use]
    pub fn resident_pages(&self) -> usize {
        self.state
            .lock()
            .core
            .as_ref()
            .map_or(0, |core| core.page_index.len())
    }

    /// Looks up the frame holding `page_id`.
    ///
    /// # Errors
    ///
    /// Returns `NotInitialized` if the pool is not initialized.
    pub fn lookup(&self, page_id: PageId) -> Result<Option<FrameId>> {
        let state = self.state.lock();
        let core = state.core.as_ref().ok_or(PoolError::NotInitialized)?;
        Ok(core.page_index.get(&page_id).copied())
    }

    /// Returns a copy of the frame metadata for a resident page.
    #[must_use]
    pub fn frame_status(&self, page_id: PageId) -> Option<BufferFrame> {
        let state = self.state.lock();
        let core = state.core.as_ref()?;
        core.page_index
            .get(&page_id)
            .map(|&frame_id| core.frames[frame_id].clone())
    }

    /// Returns a copy of every frame's metadata, in frame order.
    #[must_use]
    pub fn frame_table(&self) -> Vec<BufferFrame> {
        self.state
            .lock()
            .core
            .as_ref()
            .map(|core| core.frames.clone())
            .unwrap_or_default()
    }

    /// Pins a page, loading it from the store on a miss.
    ///
    /// The returned handle releases the page when dropped.
    ///
    /// # Errors
    ///
    /// - `NotInitialized` if the pool is not initialized
    /// - `ResourceExhausted` if every frame is pinned
    /// - `WriteBackFailure` if the victim frame could not be written back;
    ///   the victim keeps its page
    /// - `LoadFailure` if the page could not be read; the victim frame is
    ///   left empty
    pub fn acquire(&self, page_id: PageId) -> Result<PageHandle<'_, S>> {
        let frame_id = self.pin(page_id)?;
        Ok(PageHandle {
            pool: self,
            frame_id,
            page_id,
            dirty: false,
        })
    }

    /// Drops one pin on `page_id`, marking it dirty if requested.
    ///
    /// Dirty is sticky until the next write-back. Only needed directly for
    /// pins taken with [`PageHandle::detach`]; handles release themselves.
    ///
    /// # Errors
    ///
    /// - `NotInitialized` if the pool is not initialized
    /// - `ProtocolViolation` if the page is not resident or not pinned
    pub fn release(&self, page_id: PageId, mark_dirty: bool) -> Result<()> {
        let mut state = self.state.lock();
        let core = state.core.as_mut().ok_or(PoolError::NotInitialized)?;

        let frame_id = *core
            .page_index
            .get(&page_id)
            .ok_or(PoolError::ProtocolViolation {
                page_id,
                reason: ProtocolReason::NotResident,
            })?;
        if core.frames[frame_id].pin_count == 0 {
            return Err(PoolError::ProtocolViolation {
                page_id,
                reason: ProtocolReason::NotPinned,
            });
        }

        let now = core.tick();
        core.frames[frame_id].unpin(mark_dirty, now);
        if mark_dirty {
            core.stats.logical_writes += 1;
        }
        Ok(())
    }

    /// Copies a page into `out` and releases it clean.
    ///
    /// # Errors
    ///
    /// Returns `PageSizeMismatch` if `out` is not exactly one page, or any
    /// error of [`acquire`](Self::acquire).
    pub fn read_page(&self, page_id: PageId, out: &mut [u8]) -> Result<()> {
        let page_size = self.page_size().ok_or(PoolError::NotInitialized)?;
        if out.len() != page_size {
            return Err(PoolError::PageSizeMismatch {
                expected: page_size,
                actual: out.len(),
            });
        }

        let handle = self.acquire(page_id)?;
        out.copy_from_slice(&handle.data());
        handle.release()
    }

    /// Copies `data` to the start of a page and releases it dirty.
    ///
    /// Bytes past `data.len()` keep their previous contents.
    ///
    /// # Errors
    ///
    /// Returns `PageSizeMismatch` if `data` is longer than a page, or any
    /// error of [`acquire`](Self::acquire).
    pub fn write_page(&self, page_id: PageId, data: &[u8]) -> Result<()> {
        let page_size = self.page_size().ok_or(PoolError::NotInitialized)?;
        if data.len() > page_size {
            return Err(PoolError::PageSizeMismatch {
                expected: page_size,
                actual: data.len(),
            });
        }

        let mut handle = self.acquire(page_id)?;
        handle.data_mut()[..data.len()].copy_from_slice(data);
        handle.release()
    }

    /// Writes one page back if it is resident and dirty.
    ///
    /// # Errors
    ///
    /// Returns `NotInitialized`, `PageBusy` if a write view of the page is
    /// live, or `WriteBackFailure` if the store rejects the write.
    pub fn flush_page(&self, page_id: PageId) -> Result<()> {
        let mut state = self.state.lock();
        let (store, core) = state.parts()?;

        match core.page_index.get(&page_id).copied() {
            Some(frame_id) => self.flush_frame(store, core, frame_id),
            None => Ok(()),
        }
    }

    /// Writes every dirty page back, in frame order.
    ///
    /// Stops at the first failure, leaving that frame and later dirty
    /// frames unflushed. On success no occupied frame is dirty.
    ///
    /// # Errors
    ///
    /// Returns `NotInitialized`, or the first `PageBusy` or
    /// `WriteBackFailure`.
    pub fn flush_all(&self) -> Result<()> {
        let mut state = self.state.lock();
        let (store, core) = state.parts()?;

        for frame_id in 0..core.frames.len() {
            self.flush_frame(store, core, frame_id)?;
        }
        debug!("Flushed all dirty pages");
        Ok(())
    }

    /// Returns a snapshot of the usage counters.
    ///
    /// # Errors
    ///
    /// Returns `NotInitialized` if the pool is not initialized.
    pub fn stats(&self) -> Result<PoolStats> {
        let state = self.state.lock();
        let core = state.core.as_ref().ok_or(PoolError::NotInitialized)?;
        Ok(core.stats)
    }

    /// Resets the usage counters.
    ///
    /// This is useful for benchmarking or monitoring specific workloads.
    ///
    /// # Errors
    ///
    /// Returns `NotInitialized` if the pool is not initialized.
    pub fn reset_stats(&self) -> Result<()> {
        let mut state = self.state.lock();
        let core = state.core.as_mut().ok_or(PoolError::NotInitialized)?;
        core.stats = PoolStats::default();
        Ok(())
    }

    /// Runs `f` with shared access to the page store.
    pub fn with_store<R>(&self, f: impl FnOnce(&S) -> R) -> R {
        f(self.state.lock().store())
    }

    /// Locks the pool and returns the page store.
    ///
    /// Every pool operation blocks until the guard is dropped, so the guard
    /// must not be held across calls into the pool.
    pub fn store(&self) -> MappedMutexGuard<'_, S> {
        MutexGuard::map(self.state.lock(), PoolState::store_mut)
    }

    /// Returns exclusive access to the page store.
    pub fn store_mut(&mut self) -> &mut S {
        self.state.get_mut().store_mut()
    }

    /// Shuts the pool down and hands back its page store.
    ///
    /// Dirty pages are flushed first. Call [`flush_all`](Self::flush_all)
    /// beforehand to keep the pool, and its store, on a write-back failure.
    ///
    /// # Errors
    ///
    /// Returns the first write-back failure of the final flush; the pool and
    /// its store are dropped.
    pub fn into_store(mut self) -> Result<S> {
        self.shutdown()?;
        Ok(self.state.get_mut().store.take().expect(STORE_TAKEN))
    }

    /// Internal: pins `page_id`, loading it into a victim frame on a miss.
    fn pin(&self, page_id: PageId) -> Result<FrameId> {
        let mut state = self.state.lock();
        let (store, core) = state.parts()?;
        let now = core.tick();

        if let Some(&frame_id) = core.page_index.get(&page_id) {
            core.frames[frame_id].pin(now);
            core.stats.hits += 1;
            core.stats.logical_reads += 1;
            return Ok(frame_id);
        }

        core.stats.misses += 1;
        core.stats.logical_reads += 1;

        let frame_id =
            core.policy
                .choose_victim(&core.frames)
                .ok_or(PoolError::ResourceExhausted {
                    capacity: core.frames.len(),
                })?;

        // Unpinned, so no page view holds this lock.
        let mut buf = self.buffers[frame_id].write();
        let frame = &mut core.frames[frame_id];

        if let Some(old) = frame.page_id {
            if frame.dirty {
                store.write_page(old, &buf).map_err(|source| {
                    warn!(page = %old, error = %source, "Write-back of victim failed");
                    PoolError::WriteBackFailure {
                        page_id: old,
                        source,
                    }
                })?;
                core.stats.physical_writes += 1;
                debug!(page = %old, frame_id, "Wrote back dirty victim");
            }
            core.page_index.remove(&old);
            frame.reset();
            debug!(evicted = %old, frame_id, "Evicted page");
        }

        store.read_page(page_id, &mut buf).map_err(|source| {
            warn!(page = %page_id, error = %source, "Load failed");
            PoolError::LoadFailure { page_id, source }
        })?;
        core.stats.physical_reads += 1;

        frame.bind(page_id, now);
        core.page_index.insert(page_id, frame_id);
        debug!(page = %page_id, frame_id, "Loaded page on miss");
        Ok(frame_id)
    }

    /// Internal: writes one frame back if it holds a dirty page.
    fn flush_frame(&self, store: &mut S, core: &mut PoolCore, frame_id: FrameId) -> Result<()> {
        let frame = &mut core.frames[frame_id];
        let Some(page_id) = frame.page_id else {
            return Ok(());
        };
        if !frame.dirty {
            return Ok(());
        }
        let Some(buf) = self.buffers[frame_id].try_read() else {
            debug!(page = %page_id, "Page is being written, cannot flush");
            return Err(PoolError::PageBusy { page_id });
        };

        store.write_page(page_id, &buf).map_err(|source| {
            warn!(page = %page_id, error = %source, "Flush failed");
            PoolError::WriteBackFailure { page_id, source }
        })?;
        frame.dirty = false;
        core.stats.physical_writes += 1;
        Ok(())
    }
}

impl<S: PageStore> fmt::Display for BufferPool<S> {
    /// Prints the pool shape followed by its usage counters.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Buffer Pool Stats ===")?;
        let (Some(config), Ok(stats)) = (self.config.as_ref(), self.stats()) else {
            return write!(f, "Not initialized");
        };
        writeln!(f, "Capacity: {}, Policy: {}", config.capacity, config.policy)?;
        write!(f, "{stats}")
    }
}

impl<S: PageStore> Drop for BufferPool<S> {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            warn!(error = %e, "Buffer pool dropped with unflushed pages");
        }
    }
}

fn allocate_buffers(
    capacity: usize,
    page_size: usize,
) -> std::result::Result<Vec<RwLock<Box<[u8]>>>, std::collections::TryReserveError> {
    let mut buffers = Vec::new();
    buffers.try_reserve_exact(capacity)?;
    for _ in 0..capacity {
        let mut page = Vec::new();
        page.try_reserve_exact(page_size)?;
        page.resize(page_size, 0u8);
        buffers.push(RwLock::new(page.into_boxed_slice()));
    }
    Ok(buffers)
}

/// RAII guard for a pinned page.
///
/// Releases the page when dropped, marking it dirty if
/// [`data_mut`](Self::data_mut) or [`mark_dirty`](Self::mark_dirty) was
/// called. Page views borrow the handle, so they cannot outlive the pin.
pub struct PageHandle<'a, S: PageStore> {
    pool: &'a BufferPool<S>,
    frame_id: FrameId,
    page_id: PageId,
    dirty: bool,
}

impl<S: PageStore> PageHandle<'_, S> {
    /// Returns the page ID.
    #[must_use]
    pub fn page_id(&self) -> PageId {
        self.page_id
    }

    /// Returns the frame holding the page.
    #[must_use]
    pub fn frame_id(&self) -> FrameId {
        self.frame_id
    }

    /// Returns whether this handle will release the page dirty.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Returns a read-only view of the page data.
    #[must_use]
    pub fn data(&self) -> MappedRwLockReadGuard<'_, [u8]> {
        RwLockReadGuard::map(self.pool.buffers[self.frame_id].read(), |buf| &**buf)
    }

    /// Returns a mutable view of the page data and marks the handle dirty.
    pub fn data_mut(&mut self) -> MappedRwLockWriteGuard<'_, [u8]> {
        self.dirty = true;
        RwLockWriteGuard::map(self.pool.buffers[self.frame_id].write(), |buf| &mut **buf)
    }

    /// Marks the page dirty without touching its bytes.
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Releases the page now and reports the outcome.
    ///
    /// # Errors
    ///
    /// Returns `ProtocolViolation` if the pin was already dropped through
    /// [`BufferPool::release`].
    pub fn release(self) -> Result<()> {
        let this = ManuallyDrop::new(self);
        this.pool.release(this.page_id, this.dirty)
    }

    /// Gives up the guard but keeps the pin.
    ///
    /// Returns the page ID and the pending dirty mark. The caller must pass
    /// both to [`BufferPool::release`] exactly once.
    #[must_use = "a detached pin must be released"]
    pub fn detach(self) -> (PageId, bool) {
        let this = ManuallyDrop::new(self);
        (this.page_id, this.dirty)
    }
}

impl<S: PageStore> Drop for PageHandle<'_, S> {
    fn drop(&mut self) {
        if let Err(e) = self.pool.release(self.page_id, self.dirty) {
            warn!(page = %self.page_id, error = %e, "Release on drop failed");
        }
    }
}

impl<S: PageStore> std::fmt::Debug for PageHandle<'_, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageHandle")
            .field("page_id", &self.page_id)
            .field("frame_id", &self.frame_id)
            .field("dirty", &self.dirty)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::page::{FileId, MemoryStore};

    const PAGE: usize = 64;

    fn page(n: u32) -> PageId {
        PageId::new(FileId(0), n)
    }

    fn create_test_pool(capacity: usize, policy: EvictionPolicy) -> BufferPool<MemoryStore> {
        let config = PoolConfig::new(capacity, policy).with_page_size(PAGE);
        BufferPool::with_config(MemoryStore::new(PAGE), config).unwrap()
    }

    #[test]
    fn test_miss_then_hit() {
        let pool = create_test_pool(4, EvictionPolicy::Lru);

        pool.acquire(page(0)).unwrap().release().unwrap();
        pool.acquire(page(0)).unwrap().release().unwrap();

        let stats = pool.stats().unwrap();
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.logical_reads, 2);
        assert_eq!(stats.physical_reads, 1);
        assert_eq!(stats.physical_writes, 0);
    }

    #[test]
    fn test_handle_drop_releases() {
        let pool = create_test_pool(4, EvictionPolicy::Lru);
        {
            let _handle = pool.acquire(page(0)).unwrap();
            assert_eq!(pool.frame_status(page(0)).unwrap().pin_count, 1);
        }
        assert_eq!(pool.frame_status(page(0)).unwrap().pin_count, 0);
    }

    #[test]
    fn test_data_mut_marks_dirty() {
        let pool = create_test_pool(4, EvictionPolicy::Lru);
        {
            let mut handle = pool.acquire(page(0)).unwrap();
            handle.data_mut()[0] = 42;
            assert!(handle.is_dirty());
        }

        let frame = pool.frame_status(page(0)).unwrap();
        assert!(frame.dirty);
        assert_eq!(pool.stats().unwrap().logical_writes, 1);

        let handle = pool.acquire(page(0)).unwrap();
        assert_eq!(handle.data()[0], 42);
    }

    #[test]
    fn test_clean_release_keeps_dirty() {
        let pool = create_test_pool(4, EvictionPolicy::Lru);
        pool.write_page(page(0), b"abc").unwrap();
        pool.acquire(page(0)).unwrap().release().unwrap();
        assert!(pool.frame_status(page(0)).unwrap().dirty);
    }

    #[test]
    fn test_release_advances_clock() {
        let pool = create_test_pool(4, EvictionPolicy::Lru);
        let handle = pool.acquire(page(0)).unwrap();
        assert_eq!(pool.frame_status(page(0)).unwrap().last_touched, 1);
        handle.release().unwrap();
        assert_eq!(pool.frame_status(page(0)).unwrap().last_touched, 2);
    }

    #[test]
    fn test_detach_and_raw_release() {
        let pool = create_test_pool(4, EvictionPolicy::Lru);
        let mut handle = pool.acquire(page(3)).unwrap();
        handle.data_mut()[..2].copy_from_slice(&[1, 2]);
        let (page_id, dirty) = handle.detach();

        assert_eq!(pool.frame_status(page_id).unwrap().pin_count, 1);
        pool.release(page_id, dirty).unwrap();

        let frame = pool.frame_status(page_id).unwrap();
        assert_eq!(frame.pin_count, 0);
        assert!(frame.dirty);
        assert!(matches!(
            pool.release(page_id, false),
            Err(PoolError::ProtocolViolation {
                reason: ProtocolReason::NotPinned,
                ..
            })
        ));
    }

    #[test]
    fn test_release_not_resident() {
        let pool = create_test_pool(2, EvictionPolicy::Lru);
        assert!(matches!(
            pool.release(page(9), true),
            Err(PoolError::ProtocolViolation {
                reason: ProtocolReason::NotResident,
                ..
            })
        ));
        assert_eq!(pool.stats().unwrap().logical_writes, 0);
    }

    #[test]
    fn test_eviction_writes_back_dirty() {
        let pool = create_test_pool(1, EvictionPolicy::Lru);
        pool.write_page(page(0), &[7u8; PAGE]).unwrap();
        pool.acquire(page(1)).unwrap().release().unwrap();

        assert_eq!(pool.lookup(page(0)).unwrap(), None);
        assert_eq!(pool.lookup(page(1)).unwrap(), Some(0));
        pool.with_store(|store| {
            assert_eq!(store.writes_to(page(0)), 1);
            assert_eq!(store.page(page(0)).unwrap(), &[7u8; PAGE][..]);
        });
        assert_eq!(pool.stats().unwrap().physical_writes, 1);
    }

    #[test]
    fn test_clean_eviction_skips_write() {
        let pool = create_test_pool(1, EvictionPolicy::Lru);
        pool.acquire(page(0)).unwrap().release().unwrap();
        pool.acquire(page(1)).unwrap().release().unwrap();
        assert_eq!(pool.stats().unwrap().physical_writes, 0);
        pool.with_store(|store| assert_eq!(store.writes(), 0));
    }

    #[test]
    fn test_mru_evicts_most_recent() {
        let pool = create_test_pool(2, EvictionPolicy::Mru);
        pool.acquire(page(0)).unwrap().release().unwrap();
        pool.acquire(page(1)).unwrap().release().unwrap();
        pool.acquire(page(2)).unwrap().release().unwrap();

        assert!(pool.lookup(page(0)).unwrap().is_some());
        assert!(pool.lookup(page(1)).unwrap().is_none());
        assert!(pool.lookup(page(2)).unwrap().is_some());
    }

    #[test]
    fn test_resource_exhausted_leaves_frames() {
        let pool = create_test_pool(2, EvictionPolicy::Lru);
        let _a = pool.acquire(page(0)).unwrap();
        let _b = pool.acquire(page(1)).unwrap();
        let before = pool.frame_table();

        let err = pool.acquire(page(2)).unwrap_err();
        assert!(matches!(err, PoolError::ResourceExhausted { capacity: 2 }));
        assert!(err.is_retryable());

        let after = pool.frame_table();
        for (b, a) in before.iter().zip(&after) {
            assert_eq!(b.page_id, a.page_id);
            assert_eq!(b.pin_count, a.pin_count);
            assert_eq!(b.last_touched, a.last_touched);
        }
        assert_eq!(pool.stats().unwrap().misses, 3);
    }

    #[test]
    fn test_write_back_failure_keeps_binding() {
        let mut pool = create_test_pool(1, EvictionPolicy::Lru);
        pool.write_page(page(0), b"dirty").unwrap();
        pool.store_mut().fail_writes_of(page(0));

        let err = pool.acquire(page(1)).unwrap_err();
        assert!(matches!(err, PoolError::WriteBackFailure { page_id, .. } if page_id == page(0)));

        let frame = pool.frame_status(page(0)).unwrap();
        assert!(frame.dirty);
        assert_eq!(pool.resident_pages(), 1);
        assert_eq!(pool.stats().unwrap().physical_reads, 1);
    }

    #[test]
    fn test_load_failure_leaves_frame_empty() {
        let mut pool = create_test_pool(1, EvictionPolicy::Lru);
        pool.acquire(page(0)).unwrap().release().unwrap();
        pool.store_mut().fail_reads_of(page(1));

        let err = pool.acquire(page(1)).unwrap_err();
        assert!(matches!(err, PoolError::LoadFailure { page_id, .. } if page_id == page(1)));
        assert_eq!(pool.resident_pages(), 0);
        assert!(pool.frame_table()[0].is_empty());

        pool.store_mut().clear_failures();
        pool.acquire(page(1)).unwrap().release().unwrap();
        assert_eq!(pool.resident_pages(), 1);
    }

    #[test]
    fn test_flush_all_clears_dirty() {
        let pool = create_test_pool(4, EvictionPolicy::Lru);
        for n in 0..3 {
            pool.write_page(page(n), &[n as u8 + 1]).unwrap();
        }
        pool.flush_all().unwrap();

        assert!(pool.frame_table().iter().all(|f| !f.dirty));
        assert_eq!(pool.stats().unwrap().physical_writes, 3);
        pool.with_store(|store| assert_eq!(store.page(page(2)).unwrap()[0], 3));
    }

    #[test]
    fn test_flush_all_stops_at_first_failure() {
        let mut pool = create_test_pool(4, EvictionPolicy::Lru);
        for n in 0..3 {
            pool.write_page(page(n), &[1]).unwrap();
        }
        pool.store_mut().fail_writes_of(page(1));

        assert!(matches!(
            pool.flush_all(),
            Err(PoolError::WriteBackFailure { page_id, .. }) if page_id == page(1)
        ));
        assert!(!pool.frame_status(page(0)).unwrap().dirty);
        assert!(pool.frame_status(page(1)).unwrap().dirty);
        assert!(pool.frame_status(page(2)).unwrap().dirty);
    }

    #[test]
    fn test_flush_page() {
        let pool = create_test_pool(4, EvictionPolicy::Lru);
        pool.write_page(page(0), &[1, 2, 3, 4]).unwrap();
        pool.flush_page(page(0)).unwrap();
        pool.flush_page(page(5)).unwrap();

        assert!(!pool.frame_status(page(0)).unwrap().dirty);
        pool.with_store(|store| assert_eq!(&store.page(page(0)).unwrap()[..4], &[1, 2, 3, 4]));
    }

    #[test]
    fn test_read_write_helpers() {
        let pool = create_test_pool(2, EvictionPolicy::Lru);
        pool.write_page(page(0), b"DATA").unwrap();

        let mut out = vec![0u8; PAGE];
        pool.read_page(page(0), &mut out).unwrap();
        assert_eq!(&out[..4], b"DATA");
        assert_eq!(pool.frame_status(page(0)).unwrap().pin_count, 0);

        let mut short = vec![0u8; 3];
        assert!(matches!(
            pool.read_page(page(0), &mut short),
            Err(PoolError::PageSizeMismatch { expected: PAGE, actual: 3 })
        ));
        assert!(pool.write_page(page(0), &[0u8; PAGE + 1]).is_err());
    }

    #[test]
    fn test_uninitialized_pool() {
        let pool = BufferPool::new(MemoryStore::new(PAGE));
        assert!(!pool.is_initialized());
        assert_eq!(pool.capacity(), 0);
        assert!(matches!(pool.acquire(page(0)), Err(PoolError::NotInitialized)));
        assert!(matches!(pool.release(page(0), false), Err(PoolError::NotInitialized)));
        assert!(matches!(pool.flush_all(), Err(PoolError::NotInitialized)));
        assert!(matches!(pool.stats(), Err(PoolError::NotInitialized)));
        assert!(matches!(pool.lookup(page(0)), Err(PoolError::NotInitialized)));
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let mut pool = BufferPool::new(MemoryStore::new(PAGE));
        let err = pool
            .initialize(PoolConfig::new(0, EvictionPolicy::Lru))
            .unwrap_err();
        assert!(matches!(err, PoolError::InitializationFailure(_)));
        assert!(!pool.is_initialized());
    }

    #[test]
    fn test_double_initialize_rejected() {
        let mut pool = create_test_pool(2, EvictionPolicy::Lru);
        assert!(matches!(
            pool.initialize(PoolConfig::default()),
            Err(PoolError::InitializationFailure(_))
        ));
        assert_eq!(pool.capacity(), 2);
    }

    #[test]
    fn test_shutdown_flushes_and_resets() {
        let mut pool = create_test_pool(2, EvictionPolicy::Lru);
        pool.write_page(page(0), b"x").unwrap();
        pool.shutdown().unwrap();

        assert!(!pool.is_initialized());
        assert!(matches!(pool.stats(), Err(PoolError::NotInitialized)));
        assert_eq!(pool.store_mut().writes_to(page(0)), 1);

        pool.initialize(PoolConfig::new(3, EvictionPolicy::Mru).with_page_size(PAGE))
            .unwrap();
        assert_eq!(pool.capacity(), 3);
        assert_eq!(pool.stats().unwrap(), PoolStats::default());
        assert!(pool.shutdown().is_ok());
        assert!(pool.shutdown().is_ok());
    }

    #[test]
    fn test_shutdown_reports_flush_failure() {
        let mut pool = create_test_pool(2, EvictionPolicy::Lru);
        pool.write_page(page(0), b"x").unwrap();
        pool.store_mut().fail_writes_of(page(0));

        assert!(matches!(pool.shutdown(), Err(PoolError::WriteBackFailure { .. })));
        assert!(!pool.is_initialized());
    }

    #[test]
    fn test_reset_stats() {
        let pool = create_test_pool(2, EvictionPolicy::Lru);
        pool.acquire(page(0)).unwrap().release().unwrap();
        pool.reset_stats().unwrap();
        assert_eq!(pool.stats().unwrap(), PoolStats::default());

        let idle = BufferPool::new(MemoryStore::new(PAGE));
        assert!(matches!(idle.reset_stats(), Err(PoolError::NotInitialized)));
    }

    #[test]
    fn test_flush_with_live_write_view_is_busy() {
        let pool = create_test_pool(2, EvictionPolicy::Lru);
        pool.write_page(page(0), b"abc").unwrap();

        let mut handle = pool.acquire(page(0)).unwrap();
        {
            let mut view = handle.data_mut();
            view[0] = b'z';
            assert!(matches!(
                pool.flush_all(),
                Err(PoolError::PageBusy { page_id }) if page_id == page(0)
            ));
            assert!(matches!(pool.flush_page(page(0)), Err(PoolError::PageBusy { .. })));
        }
        assert!(pool.frame_status(page(0)).unwrap().dirty);
        pool.with_store(|store| assert_eq!(store.writes(), 0));

        pool.flush_all().unwrap();
        assert!(!pool.frame_status(page(0)).unwrap().dirty);
        pool.with_store(|store| assert_eq!(store.page(page(0)).unwrap()[0], b'z'));
        handle.release().unwrap();
    }

    #[test]
    fn test_page_size_must_match_store() {
        let mut pool = BufferPool::new(MemoryStore::new(PAGE));
        let err = pool.initialize(PoolConfig::new(2, EvictionPolicy::Lru)).unwrap_err();
        assert!(matches!(err, PoolError::InitializationFailure(_)));
        assert!(!pool.is_initialized());

        pool.initialize(PoolConfig::new(2, EvictionPolicy::Lru).with_page_size(PAGE))
            .unwrap();
        assert_eq!(pool.page_size(), Some(PAGE));
    }

    #[test]
    fn test_accessors_and_into_store() {
        let pool = create_test_pool(3, EvictionPolicy::Mru);
        assert_eq!(pool.policy(), Some(EvictionPolicy::Mru));
        assert_eq!(pool.page_size(), Some(PAGE));

        pool.write_page(page(1), b"keep").unwrap();
        assert_eq!(pool.store().writes(), 0);

        let store = pool.into_store().unwrap();
        assert_eq!(store.writes_to(page(1)), 1);
        assert_eq!(&store.page(page(1)).unwrap()[..4], b"keep");

        let idle = BufferPool::new(MemoryStore::new(PAGE));
        assert!(idle.policy().is_none());
        assert!(idle.page_size().is_none());
        assert_eq!(idle.into_store().unwrap().writes(), 0);
    }

    #[test]
    fn test_display_report() {
        let pool = create_test_pool(2, EvictionPolicy::Lru);
        pool.acquire(page(0)).unwrap().release().unwrap();

        let report = pool.to_string();
        assert!(report.starts_with("=== Buffer Pool Stats ===\n"));
        assert!(report.contains("Capacity: 2, Policy: LRU"));
        assert!(report.contains("Hits: 0, Misses: 1"));

        let idle = BufferPool::new(MemoryStore::new(PAGE));
        assert!(idle.to_string().ends_with("Not initialized"));
    }
}
