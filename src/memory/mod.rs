//! Memory structure

pub mod cache;
pub mod config;
pub mod hierarchy;
pub mod stats;

pub use cache::Cache;
pub use config::{CacheConfig, HierarchyConfig};
pub use hierarchy::MemoryHierarchy;
pub use stats::SimStats;

/// Latency of an access that hits in L1
pub const HIT_TIME: f64 = 30.5;
/// Penalty added on top of `HIT_TIME` for an L1 miss
pub const MISS_TIME: f64 = 40.7;
/// Latency assumed for main memory in the L2 average-access-time report
pub const MEMORY_TIME: f64 = 100.0;

/// Returns a mask with the lowest `bits` bits set
pub fn get_mask(bits: u32) -> u64 {
    if bits >= u64::BITS {
        u64::MAX
    } else {
        (1u64 << bits) - 1
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AccessType {
    Read,
    Write,
}

impl AccessType {
    /// Parses the trace notation `R`/`W` (either case)
    pub fn from_char(op: char) -> Option<Self> {
        match op {
            'R' | 'r' => Some(AccessType::Read),
            'W' | 'w' => Some(AccessType::Write),
            _ => None,
        }
    }

    pub fn as_char(self) -> char {
        match self {
            AccessType::Read => 'R',
            AccessType::Write => 'W',
        }
    }
}
