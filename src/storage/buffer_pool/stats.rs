//! Buffer pool usage counters.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Snapshot of the pool's usage counters.
///
/// Logical reads count every acquire, logical writes every dirty release.
/// Physical reads and writes count calls into the page store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolStats {
    /// Acquires served from a resident frame.
    pub hits: u64,
    /// Acquires that had to load the page.
    pub misses: u64,
    /// Total acquires.
    pub logical_reads: u64,
    /// Releases that marked the page dirty.
    pub logical_writes: u64,
    /// Pages read from the store.
    pub physical_reads: u64,
    /// Pages written back to the store.
    pub physical_writes: u64,
}

impl PoolStats {
    /// Calculates the cache hit rate as a fraction (0.0 to 1.0).
    ///
    /// Returns `None` if there have been no accesses.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn hit_rate(&self) -> Option<f64> {
        let total = self.total_accesses();
        if total == 0 {
            None
        } else {
            Some(self.hits as f64 / total as f64)
        }
    }

    /// Returns the total number of accesses (hits + misses).
    #[must_use]
    pub fn total_accesses(&self) -> u64 {
        self.hits + self.misses
    }
}

impl fmt::Display for PoolStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Hits: {}, Misses: {}", self.hits, self.misses)?;
        writeln!(
            f,
            "Logical Reads: {}, Logical Writes: {}",
            self.logical_reads, self.logical_writes
        )?;
        write!(
            f,
            "Physical Reads: {}, Physical Writes: {}",
            self.physical_reads, self.physical_writes
        )
    }
}
