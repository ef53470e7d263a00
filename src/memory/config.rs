//! Cache configuration

use crate::error::ConfigError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ReplacePolicy {
    #[default]
    Lru,
    /// Least frequently used, with the most recently used line of a set
    /// protected from eviction
    Lfu,
}

/// Reference: <https://inst.eecs.berkeley.edu/~cs61c/su20/pdfs/lectures/lec15.pdf>
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum WriteStrategy {
    /// Write-back on hit, write-allocate on miss
    #[default]
    WriteBackWriteAllocate,
    WriteThrough,
}

/// Where a prefetched block lands in the replacement order
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum InsertPolicy {
    /// MRU insertion
    #[default]
    Mip,
    /// LRU insertion
    Lip,
}

/// Geometry and policies of one cache level.
///
/// Sizes are given as log2 values: the level holds `2^c` bytes
/// in blocks of `2^b` bytes, grouped into sets of `2^s` ways.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CacheConfig {
    pub c: u32,
    pub b: u32,
    pub s: u32,

    pub replace_policy: ReplacePolicy,
    pub write_strategy: WriteStrategy,
    pub disabled: bool,

    pub prefetcher_disabled: bool,
    pub strided_prefetch_disabled: bool,
    pub prefetch_insert_policy: InsertPolicy,
}

impl Default for CacheConfig {
    /// 32KB, 64B blocks, 8-way
    fn default() -> Self {
        Self::make(15, 6, 3)
    }
}

impl CacheConfig {
    pub fn make(c: u32, b: u32, s: u32) -> Self {
        Self {
            c,
            b,
            s,
            replace_policy: ReplacePolicy::default(),
            write_strategy: WriteStrategy::default(),
            disabled: false,
            prefetcher_disabled: false,
            strided_prefetch_disabled: false,
            prefetch_insert_policy: InsertPolicy::default(),
        }
    }

    /// A level that is bypassed entirely
    pub fn disabled() -> Self {
        Self {
            disabled: true,
            ..Self::default()
        }
    }

    pub fn with_replace_policy(mut self, policy: ReplacePolicy) -> Self {
        self.replace_policy = policy;
        self
    }

    pub fn with_write_strategy(mut self, strategy: WriteStrategy) -> Self {
        self.write_strategy = strategy;
        self
    }

    pub fn with_insert_policy(mut self, policy: InsertPolicy) -> Self {
        self.prefetch_insert_policy = policy;
        self
    }

    pub fn with_prefetcher(mut self, enabled: bool, strided: bool) -> Self {
        self.prefetcher_disabled = !enabled;
        self.strided_prefetch_disabled = !strided;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.c >= u64::BITS {
            return Err(ConfigError::CapacityTooLarge(self.c));
        }
        // c == b + s is a single fully associative set
        if self.c < self.b + self.s {
            return Err(ConfigError::NegativeIndexBits {
                c: self.c,
                b: self.b,
                s: self.s,
            });
        }
        Ok(())
    }

    /// Number of index bits; only meaningful for a validated config
    pub fn index_bits(&self) -> u32 {
        self.c - self.b - self.s
    }

    pub fn num_sets(&self) -> usize {
        1 << self.index_bits()
    }

    pub fn associativity(&self) -> usize {
        1 << self.s
    }

    pub fn block_size(&self) -> u64 {
        1 << self.b
    }

    pub fn num_lines(&self) -> usize {
        self.num_sets() * self.associativity()
    }

    pub fn write_back(&self) -> bool {
        self.write_strategy == WriteStrategy::WriteBackWriteAllocate
    }
}

/// Configuration of the two-level hierarchy
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HierarchyConfig {
    pub l1: CacheConfig,
    pub l2: CacheConfig,
}

impl Default for HierarchyConfig {
    /// 32KB 8-way L1 backed by a 256KB 8-way L2
    fn default() -> Self {
        Self {
            l1: CacheConfig::default(),
            l2: CacheConfig::make(18, 6, 3),
        }
    }
}

impl HierarchyConfig {
    /// Hierarchy that degrades to the given L1 alone
    pub fn single_level(l1: CacheConfig) -> Self {
        Self {
            l1,
            l2: CacheConfig::disabled(),
        }
    }
}
