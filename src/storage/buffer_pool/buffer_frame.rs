//! Buffer frame metadata for a single cache slot.

use crate::storage::page::PageId;

/// Index of a frame within the pool. Stable for the pool's lifetime.
pub type FrameId = usize;

/// Bookkeeping for one frame in the buffer pool.
///
/// The page bytes live in a buffer owned by the pool at the same index;
/// this struct only carries the binding and replacement state:
/// - The page currently bound to the frame (if any)
/// - Whether the page was modified since its last write-back (dirty)
/// - How many holders currently prevent eviction (pin count)
/// - The logical time of the last acquire or release
#[derive(Debug, Clone)]
pub struct BufferFrame {
    /// Index of this frame in the buffer pool.
    pub frame_id: FrameId,
    /// The page currently bound to this frame, if any.
    pub page_id: Option<PageId>,
    /// Number of active holders of this page.
    pub pin_count: u32,
    /// Whether the page has been modified since it was last written back.
    pub dirty: bool,
    /// Pool clock value at the last acquire or release.
    pub last_touched: u64,
}

impl BufferFrame {
    /// Creates a new empty buffer frame.
    #[must_use]
    pub fn new(frame_id: FrameId) -> Self {
        Self {
            frame_id,
            page_id: None,
            pin_count: 0,
            dirty: false,
            last_touched: 0,
        }
    }

    /// Binds a freshly loaded page, pinned once by the loader.
    pub fn bind(&mut self, page_id: PageId, now: u64) {
        self.page_id = Some(page_id);
        self.pin_count = 1;
        self.dirty = false;
        self.last_touched = now;
    }

    /// Adds a holder.
    pub fn pin(&mut self, now: u64) {
        self.pin_count += 1;
        self.last_touched = now;
    }

    /// Drops a holder. Dirty is sticky: a clean unpin never clears it.
    ///
    /// Callers must check `pin_count > 0` first.
    pub fn unpin(&mut self, mark_dirty: bool, now: u64) {
        debug_assert!(self.pin_count > 0, "unpin of unpinned frame");
        if mark_dirty {
            self.dirty = true;
        }
        self.pin_count -= 1;
        self.last_touched = now;
    }

    /// Returns whether this frame can be chosen as a victim.
    ///
    /// A frame can be evicted if:
    /// - It has a page bound
    /// - Its pin count is 0
    #[must_use]
    pub fn is_evictable(&self) -> bool {
        self.page_id.is_some() && self.pin_count == 0
    }

    /// Returns whether this frame is empty (no page bound).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.page_id.is_none()
    }

    /// Returns whether the frame holds modifications not yet written back.
    #[must_use]
    pub fn needs_write_back(&self) -> bool {
        self.page_id.is_some() && self.dirty
    }

    /// Resets the frame to the empty state.
    pub fn reset(&mut self) {
        self.page_id = None;
        self.pin_count = 0;
        self.dirty = false;
        self.last_touched = 0;
    }
}
