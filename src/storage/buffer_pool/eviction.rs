//! Replacement policies for the buffer pool.
//!
//! Victim selection always fills empty frames first. Once the pool is full,
//! only unpinned frames are candidates, ranked by the logical time of their
//! last acquire or release. Ties go to the lowest frame index.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::buffer_frame::{BufferFrame, FrameId};

/// Which end of the recency order is reclaimed first.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvictionPolicy {
    /// Evict the frame touched longest ago.
    #[default]
    Lru,
    /// Evict the frame touched most recently.
    Mru,
}

impl EvictionPolicy {
    /// Picks the frame to reuse for an incoming page.
    ///
    /// Returns `None` when every frame is occupied and pinned.
    #[must_use]
    pub fn choose_victim(self, frames: &[BufferFrame]) -> Option<FrameId> {
        if let Some(empty) = frames.iter().find(|f| f.is_empty()) {
            return Some(empty.frame_id);
        }

        let mut best: Option<&BufferFrame> = None;
        for frame in frames.iter().filter(|f| f.is_evictable()) {
            let better = match best {
                None => true,
                Some(current) => match self {
                    EvictionPolicy::Lru => frame.last_touched < current.last_touched,
                    EvictionPolicy::Mru => frame.last_touched > current.last_touched,
                },
            };
            if better {
                best = Some(frame);
            }
        }
        best.map(|f| f.frame_id)
    }

    /// Short name of the policy.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            EvictionPolicy::Lru => "LRU",
            EvictionPolicy::Mru => "MRU",
        }
    }
}

impl fmt::Display for EvictionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for EvictionPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "lru" => Ok(EvictionPolicy::Lru),
            "mru" => Ok(EvictionPolicy::Mru),
            other => Err(format!("unknown eviction policy '{other}'")),
        }
    }
}
