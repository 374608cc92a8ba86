//! Buffer pool configuration.

use serde::{Deserialize, Serialize};

use super::eviction::EvictionPolicy;
use crate::storage::page::PAGE_SIZE;

/// Frame count used by [`PoolConfig::default`].
pub const DEFAULT_CAPACITY: usize = 8;

/// Configuration for a buffer pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Number of page frames in the pool.
    pub capacity: usize,
    /// Replacement policy used once every frame is occupied.
    pub policy: EvictionPolicy,
    /// Page size in bytes. Must match the page store.
    pub page_size: usize,
}

impl PoolConfig {
    /// Creates a configuration with the given capacity and policy.
    #[must_use]
    pub fn new(capacity: usize, policy: EvictionPolicy) -> Self {
        Self {
            capacity,
            policy,
            page_size: PAGE_SIZE,
        }
    }

    /// Sets the number of frames.
    #[must_use]
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Sets the replacement policy.
    #[must_use]
    pub fn with_policy(mut self, policy: EvictionPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Sets the page size.
    #[must_use]
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    /// Returns the bytes of page memory the pool will hold.
    #[must_use]
    pub fn memory_usage(&self) -> usize {
        self.capacity.saturating_mul(self.page_size)
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns a description of the first invalid field.
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.capacity == 0 {
            return Err("capacity must be > 0");
        }
        if self.page_size == 0 {
            return Err("page_size must be > 0");
        }
        if self.capacity.checked_mul(self.page_size).is_none() {
            return Err("capacity * page_size overflows");
        }
        Ok(())
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY, EvictionPolicy::Lru)
    }
}
