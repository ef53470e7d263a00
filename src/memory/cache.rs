//! Cache implementation

use std::ops::Range;

use log::{debug, trace};

use super::config::{CacheConfig, InsertPolicy, ReplacePolicy};
use super::stats::SimStats;
use super::{get_mask, AccessType};
use crate::error::SimulatorResult;

/// Hit-time coefficients: base, per index bit, per way bit above 8 ways
const K_L1: [f64; 3] = [1.0, 0.15, 0.15];
const K_L2: [f64; 3] = [4.0, 0.3, 0.3];

/// Which level a cache plays in the hierarchy.
/// Only used to route statistics.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CacheLevel {
    L1,
    L2,
}

#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
pub struct Block {
    pub valid: bool,
    /// Only set under write-back/write-allocate
    pub dirty: bool,

    pub tag: u64,

    /// LRU recency stamp
    pub timestamp: u64,

    /// LFU frequency counter
    pub use_counter: u64,
    /// LFU protection flag
    pub mru: bool,
}

/// Result of installing a block
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
pub struct Installed {
    /// A valid block was evicted to make room
    pub evicted: bool,
    /// Address (block offset 0) of a dirty victim
    /// that must be written to the next level
    pub writeback: Option<u64>,
}

/// Block predicted by the prefetcher
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PrefetchTarget {
    pub tag: u64,
    pub index: usize,
}

/// Block chosen to be replaced
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Victim {
    /// Position in `Cache::blocks`
    pub position: usize,
    /// Lowest timestamp among the valid blocks of the set,
    /// `None` if the set holds no valid block or the policy is not LRU
    pub lowest_timestamp: Option<u64>,
}

/// One set-associative cache level
pub struct Cache {
    pub config: CacheConfig,
    pub level: CacheLevel,

    index_bits: u32,
    associativity: usize,

    /// Strictly increasing LRU clock
    timestep: u64,
    /// Last block number seen by the strided prefetcher
    previous_miss: u64,

    /// Set-major: block `way` of set `index` is at `index * associativity + way`
    pub blocks: Vec<Block>,
}

// Address layout:
// | tag | index | offset |
impl Cache {
    pub fn make(config: CacheConfig, level: CacheLevel) -> SimulatorResult<Self> {
        config.validate()?;

        let index_bits = config.index_bits();
        // A bypassed level never touches its blocks
        let blocks = if config.disabled {
            Vec::new()
        } else {
            vec![Block::default(); config.num_lines()]
        };

        Ok(Self {
            config,
            level,
            index_bits,
            associativity: config.associativity(),
            timestep: 1 << (config.c - config.b + 1).min(63),
            previous_miss: 0,
            blocks,
        })
    }

    pub fn disabled(&self) -> bool {
        self.config.disabled
    }

    fn set_range(&self, index: usize) -> Range<usize> {
        index * self.associativity..(index + 1) * self.associativity
    }

    /// Split an address into tag and set index.
    /// The block offset is irrelevant to the simulation and dropped.
    pub fn parse_address(&self, address: u64) -> (u64, usize) {
        let block_number = address >> self.config.b;
        let index = (block_number & get_mask(self.index_bits)) as usize;
        let tag_bits = u64::BITS - self.config.b - self.index_bits;
        let tag = (block_number >> self.index_bits) & get_mask(tag_bits);
        trace!(
            "{:?} decomposed address {:#x} -> tag {:#x}, index {:#x}",
            self.level,
            address,
            tag,
            index
        );
        (tag, index)
    }

    /// Inverse of `parse_address` with a zero block offset
    pub fn get_address(&self, tag: u64, index: usize) -> u64 {
        (tag << (self.config.c - self.config.s)) | ((index as u64) << self.config.b)
    }

    /// Position of the resident block with the given tag, if any.
    /// Does not touch replacement state.
    pub fn lookup(&self, tag: u64, index: usize) -> Option<usize> {
        if self.disabled() {
            return None;
        }
        self.set_range(index).find(|&position| {
            let block = &self.blocks[position];
            block.valid && block.tag == tag
        })
    }

    /// Probe the cache, updating replacement state on a hit.
    /// Returns whether the block was found.
    pub fn access(
        &mut self,
        access_type: AccessType,
        tag: u64,
        index: usize,
        stats: &mut SimStats,
    ) -> bool {
        match self.level {
            CacheLevel::L1 => stats.accesses_l1 += 1,
            CacheLevel::L2 => {
                stats.accesses_l2 += 1;
                match access_type {
                    AccessType::Read => stats.reads_l2 += 1,
                    AccessType::Write => stats.writes_l2 += 1,
                }
            }
        }

        if self.disabled() {
            match (self.level, access_type) {
                (CacheLevel::L1, _) => stats.misses_l1 += 1,
                (CacheLevel::L2, AccessType::Read) => stats.read_misses_l2 += 1,
                (CacheLevel::L2, AccessType::Write) => {}
            }
            debug!(
                "{:?} is disabled, treating {} as a miss",
                self.level,
                access_type.as_char()
            );
            return false;
        }

        let Some(position) = self.lookup(tag, index) else {
            match (self.level, access_type) {
                (CacheLevel::L1, _) => stats.misses_l1 += 1,
                (CacheLevel::L2, AccessType::Read) => stats.read_misses_l2 += 1,
                (CacheLevel::L2, AccessType::Write) => {}
            }
            debug!(
                "{:?} miss on {} of tag {:#x}, index {:#x}",
                self.level,
                access_type.as_char(),
                tag,
                index
            );
            return false;
        };

        self.touch(position, index);
        if access_type == AccessType::Write && self.config.write_back() {
            self.blocks[position].dirty = true;
        }

        match (self.level, access_type) {
            (CacheLevel::L1, _) => stats.hits_l1 += 1,
            (CacheLevel::L2, AccessType::Read) => stats.read_hits_l2 += 1,
            (CacheLevel::L2, AccessType::Write) => {}
        }
        debug!(
            "{:?} hit on {} of tag {:#x}, index {:#x}",
            self.level,
            access_type.as_char(),
            tag,
            index
        );
        true
    }

    /// Move a block to the most recently used position
    fn touch(&mut self, position: usize, index: usize) {
        match self.config.replace_policy {
            ReplacePolicy::Lfu => {
                self.blocks[position].use_counter += 1;
                self.clear_mru(index);
                self.blocks[position].mru = true;
            }
            ReplacePolicy::Lru => self.stamp(position),
        }
    }

    fn stamp(&mut self, position: usize) {
        self.blocks[position].timestamp = self.timestep;
        self.timestep += 1;
    }

    fn clear_mru(&mut self, index: usize) {
        for position in self.set_range(index) {
            self.blocks[position].mru = false;
        }
    }

    /// Least frequently used valid block of the set,
    /// ties going to the smaller tag
    fn least_frequent(&self, index: usize, include_mru: bool) -> Option<usize> {
        self.set_range(index)
            .filter(|&position| {
                let block = &self.blocks[position];
                block.valid && (include_mru || !block.mru)
            })
            .min_by_key(|&position| {
                let block = &self.blocks[position];
                (block.use_counter, block.tag)
            })
    }

    /// Choose the block to replace in the given set.
    ///
    /// An empty way always wins (lowest way first). Otherwise LRU takes
    /// the oldest timestamp, first way on ties, and LFU takes the least
    /// used block that is not MRU-protected. If every block of the set is
    /// protected, LFU falls back to ignoring the protection.
    pub fn find_eviction_victim(&self, index: usize) -> Victim {
        let range = self.set_range(index);
        let first = range.start;

        let mut empty = None;
        let mut oldest: Option<usize> = None;
        for position in range {
            let block = &self.blocks[position];
            if !block.valid {
                empty = empty.or(Some(position));
                continue;
            }
            if oldest.map_or(true, |p| block.timestamp < self.blocks[p].timestamp) {
                oldest = Some(position);
            }
        }

        let lowest_timestamp = match self.config.replace_policy {
            ReplacePolicy::Lru => oldest.map(|p| self.blocks[p].timestamp),
            ReplacePolicy::Lfu => None,
        };

        let position = empty
            .or_else(|| match self.config.replace_policy {
                ReplacePolicy::Lru => oldest,
                ReplacePolicy::Lfu => self
                    .least_frequent(index, false)
                    .or_else(|| self.least_frequent(index, true)),
            })
            .unwrap_or(first);

        Victim {
            position,
            lowest_timestamp,
        }
    }

    /// Fill a block, evicting a victim if needed
    pub fn install(
        &mut self,
        access_type: AccessType,
        tag: u64,
        index: usize,
        stats: &mut SimStats,
    ) -> Installed {
        let mut installed = Installed::default();
        if self.disabled() {
            return installed;
        }

        let Victim { position, .. } = self.find_eviction_victim(index);
        let victim = self.blocks[position];
        if victim.valid {
            stats.num_evictions += 1;
            installed.evicted = true;
            if victim.dirty && self.config.write_back() {
                installed.writeback = Some(self.get_address(victim.tag, index));
            }
            debug!(
                "Evict from {:?}: dirty={}, tag {:#x}, index {:#x}",
                self.level, victim.dirty, victim.tag, index
            );
        } else {
            trace!("Install into empty block of {:?} at index {:#x}", self.level, index);
        }

        let block = &mut self.blocks[position];
        block.valid = true;
        block.tag = tag;
        block.dirty = access_type == AccessType::Write && self.config.write_back();

        match self.config.replace_policy {
            ReplacePolicy::Lfu => {
                self.clear_mru(index);
                let block = &mut self.blocks[position];
                block.use_counter = 1;
                block.mru = true;
            }
            ReplacePolicy::Lru => self.stamp(position),
        }

        installed
    }

    /// Predict the next block to prefetch after a miss on (tag, index).
    ///
    /// Next-line prediction adds one to the block number; strided
    /// prediction extrapolates from the previous miss, which it then
    /// replaces.
    pub fn find_prefetch_target(
        &mut self,
        tag: u64,
        index: usize,
    ) -> Option<PrefetchTarget> {
        if self.disabled() || self.config.prefetcher_disabled {
            return None;
        }

        let block_number = (tag << self.index_bits) | index as u64;
        let predicted = if self.config.strided_prefetch_disabled {
            block_number.wrapping_add(1)
        } else {
            let stride = block_number.wrapping_sub(self.previous_miss);
            self.previous_miss = block_number;
            block_number.wrapping_add(stride)
        };

        Some(PrefetchTarget {
            tag: predicted >> self.index_bits,
            index: (predicted & get_mask(self.index_bits)) as usize,
        })
    }

    /// Bring a block in ahead of demand, honoring the insertion policy
    pub fn prefetch_install(&mut self, tag: u64, index: usize, stats: &mut SimStats) {
        if self.disabled() || self.lookup(tag, index).is_some() {
            return;
        }

        debug!(
            "Prefetch block with address {:#x} into {:?}",
            self.get_address(tag, index),
            self.level
        );

        let Victim {
            position,
            lowest_timestamp,
        } = self.find_eviction_victim(index);
        stats.prefetches_l2 += 1;

        let block = &mut self.blocks[position];
        block.valid = true;
        block.tag = tag;
        block.dirty = false;

        match (self.config.replace_policy, self.config.prefetch_insert_policy) {
            (ReplacePolicy::Lfu, InsertPolicy::Lip) => {
                block.mru = false;
                block.use_counter = 0;
            }
            (ReplacePolicy::Lfu, InsertPolicy::Mip) => {
                self.clear_mru(index);
                let block = &mut self.blocks[position];
                block.mru = true;
                block.use_counter = 0;
            }
            (ReplacePolicy::Lru, insert_policy) => {
                block.timestamp = match (insert_policy, lowest_timestamp) {
                    // Older than the current LRU block
                    (InsertPolicy::Lip, Some(lowest)) => lowest.saturating_sub(1),
                    _ => self.timestep,
                };
                self.timestep += 1;
            }
        }
    }

    /// Closed-form hit time from the level's geometry
    pub fn hit_time(&self) -> f64 {
        if self.disabled() {
            return 0.0;
        }

        let [k0, k1, k2] = match self.level {
            CacheLevel::L1 => K_L1,
            CacheLevel::L2 => K_L2,
        };
        let index_term = self.index_bits as f64;
        let way_term = self.config.s.saturating_sub(3) as f64;
        k0 + k1 * index_term + k2 * way_term
    }

    /// Tag of every slot, `None` where the slot is empty
    pub fn contents(&self) -> Vec<Option<u64>> {
        self.blocks
            .iter()
            .map(|block| block.valid.then_some(block.tag))
            .collect()
    }

    pub fn format_contents(&self) -> String {
        self.contents()
            .iter()
            .enumerate()
            .map(|(i, tag)| match tag {
                Some(tag) => format!("Block {}: Tag: {:#x}\n", i, tag),
                None => format!("Block {}: empty\n", i),
            })
            .collect()
    }

    pub fn num_valid(&self) -> usize {
        self.blocks.iter().filter(|block| block.valid).count()
    }
}
