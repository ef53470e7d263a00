//! Two-level cache hierarchy

use log::debug;

use super::cache::{Cache, CacheLevel};
use super::config::HierarchyConfig;
use super::stats::SimStats;
use super::{AccessType, HIT_TIME, MISS_TIME};
use crate::error::SimulatorResult;

/// An L1 backed by an L2.
///
/// L2 can be disabled to simulate a single cache.
pub struct MemoryHierarchy {
    pub l1: Cache,
    pub l2: Cache,

    /// Number of accesses issued so far
    pub time: u64,
}

impl MemoryHierarchy {
    pub fn setup(config: &HierarchyConfig) -> SimulatorResult<Self> {
        Ok(Self {
            l1: Cache::make(config.l1, CacheLevel::L1)?,
            l2: Cache::make(config.l2, CacheLevel::L2)?,
            time: 0,
        })
    }

    /// Perform one memory operation and return its latency
    pub fn access(
        &mut self,
        access_type: AccessType,
        address: u64,
        stats: &mut SimStats,
    ) -> f64 {
        debug!(
            "Time: {}. Address: {:#x}. Read/Write: {}",
            self.time,
            address,
            access_type.as_char()
        );
        match access_type {
            AccessType::Read => stats.reads += 1,
            AccessType::Write => stats.writes += 1,
        }
        self.time += 1;

        let (l1_tag, l1_index) = self.l1.parse_address(address);
        if self.l1.access(access_type, l1_tag, l1_index, stats) {
            return HIT_TIME;
        }

        // A write miss is still a read for L2:
        // only the later write-back dirties state there
        let (l2_tag, l2_index) = self.l2.parse_address(address);
        if !self.l2.access(AccessType::Read, l2_tag, l2_index, stats)
            && !self.l2.disabled()
        {
            self.l2.install(AccessType::Read, l2_tag, l2_index, stats);
            if let Some(target) = self.l2.find_prefetch_target(l2_tag, l2_index) {
                self.l2.prefetch_install(target.tag, target.index, stats);
            }
        }

        let installed = self.l1.install(access_type, l1_tag, l1_index, stats);
        if let Some(writeback) = installed.writeback {
            debug!("Writing back dirty block with address {:#x} to L2", writeback);
            let (wb_tag, wb_index) = self.l2.parse_address(writeback);
            self.l2.access(AccessType::Write, wb_tag, wb_index, stats);
        }

        HIT_TIME + MISS_TIME
    }

    /// Compute derived statistics and release both levels
    pub fn finish(self, stats: &mut SimStats) {
        stats.compute_derived(self.l2.hit_time());
    }

    /// Tag of every L1 slot, for debugging
    pub fn print_cache_contents(&self) -> String {
        self.l1.format_contents()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::config::{CacheConfig, InsertPolicy};

    /// 1 set, 8 ways, 64B blocks, no L2
    fn single_set() -> HierarchyConfig {
        HierarchyConfig::single_level(CacheConfig::make(9, 6, 3))
    }

    #[test]
    fn test_end_to_end_single_set() {
        let mut mem = MemoryHierarchy::setup(&single_set()).unwrap();
        let mut stats = SimStats::default();

        for i in 0..8u64 {
            let latency = mem.access(AccessType::Read, i * 0x40, &mut stats);
            assert_eq!(latency, HIT_TIME + MISS_TIME);
        }
        assert_eq!(stats.misses_l1, 8);
        assert_eq!(stats.num_evictions, 0);

        mem.access(AccessType::Read, 0x200, &mut stats);
        assert_eq!(stats.misses_l1, 9);
        assert_eq!(stats.num_evictions, 1);
        assert_eq!(mem.l1.lookup(0, 0), None);

        // The block at 0x0 was evicted
        let latency = mem.access(AccessType::Read, 0x0, &mut stats);
        assert_eq!(latency, HIT_TIME + MISS_TIME);
        assert_eq!(stats.misses_l1, 10);

        // 0x80 is still resident
        let latency = mem.access(AccessType::Read, 0x80, &mut stats);
        assert_eq!(latency, HIT_TIME);
        assert_eq!(stats.hits_l1, 1);

        assert_eq!(stats.reads, 11);
        assert_eq!(stats.accesses_l1, 11);
        // Every L1 miss probes the disabled L2 as a read miss
        assert_eq!(stats.read_misses_l2, 10);
        assert_eq!(mem.l2.num_valid(), 0);

        mem.finish(&mut stats);
        assert!((stats.hit_ratio_l1 - 1.0 / 11.0).abs() < 1e-9);
        assert!((stats.avg_access_time_l1 - (HIT_TIME + 10.0 / 11.0 * MISS_TIME)).abs() < 1e-9);
        assert_eq!(stats.avg_access_time_l2, crate::memory::MEMORY_TIME);
    }

    #[test]
    fn test_hit_in_l1() {
        let mut mem = MemoryHierarchy::setup(&HierarchyConfig::default()).unwrap();
        let mut stats = SimStats::default();
        mem.access(AccessType::Write, 0x1234, &mut stats);
        let latency = mem.access(AccessType::Read, 0x1238, &mut stats);
        assert_eq!(latency, HIT_TIME);
        assert_eq!(stats.writes, 1);
        assert_eq!(stats.reads, 1);
        assert_eq!(stats.hits_l1, 1);
        assert_eq!(mem.time, 2);
    }

    #[test]
    fn test_l1_miss_fills_l2_and_prefetches() {
        let mut mem = MemoryHierarchy::setup(&HierarchyConfig::default()).unwrap();
        let mut stats = SimStats::default();

        // Write miss: L2 is still probed as a read
        mem.access(AccessType::Write, 0x4000, &mut stats);
        assert_eq!(stats.reads_l2, 1);
        assert_eq!(stats.writes_l2, 0);
        assert_eq!(stats.read_misses_l2, 1);
        assert_eq!(stats.prefetches_l2, 1);
        assert_eq!(mem.l2.num_valid(), 2);

        let (tag, index) = mem.l1.parse_address(0x4000);
        let position = mem.l1.lookup(tag, index).unwrap();
        assert!(mem.l1.blocks[position].dirty);
    }

    #[test]
    fn test_dirty_eviction_writes_back_to_l2() {
        let mut config = HierarchyConfig::default();
        // Direct-mapped L1 with 16 sets
        config.l1 = CacheConfig::make(10, 6, 0);
        config.l2 = config.l2.with_prefetcher(false, false);
        let mut mem = MemoryHierarchy::setup(&config).unwrap();
        let mut stats = SimStats::default();

        mem.access(AccessType::Write, 0x0, &mut stats);
        // Same L1 set, evicts the dirty block
        mem.access(AccessType::Read, 0x400, &mut stats);

        assert_eq!(stats.num_evictions, 1);
        assert_eq!(stats.writes_l2, 1);
        assert_eq!(stats.reads_l2, 2);
        assert_eq!(stats.read_hits_l2, 0);
        assert_eq!(stats.accesses_l2, 3);

        let (tag, index) = mem.l2.parse_address(0x0);
        let position = mem.l2.lookup(tag, index).unwrap();
        assert!(mem.l2.blocks[position].dirty);
    }

    #[test]
    fn test_l2_hit_after_l1_eviction() {
        let mut config = HierarchyConfig::default();
        config.l1 = CacheConfig::make(10, 6, 0);
        let mut mem = MemoryHierarchy::setup(&config).unwrap();
        let mut stats = SimStats::default();

        mem.access(AccessType::Read, 0x0, &mut stats);
        mem.access(AccessType::Read, 0x400, &mut stats);
        let latency = mem.access(AccessType::Read, 0x0, &mut stats);

        // The latency model does not reward an L2 hit
        assert_eq!(latency, HIT_TIME + MISS_TIME);
        assert_eq!(stats.read_hits_l2, 1);
        assert_eq!(stats.misses_l1, 3);
    }

    #[test]
    fn test_strided_prefetch_follows_misses() {
        let mut config = HierarchyConfig::default();
        config.l2 = config.l2.with_insert_policy(InsertPolicy::Mip);
        let mut mem = MemoryHierarchy::setup(&config).unwrap();
        let mut stats = SimStats::default();

        // Block numbers 10 and 12; the second miss predicts block 14
        mem.access(AccessType::Read, 10 * 64, &mut stats);
        mem.access(AccessType::Read, 12 * 64, &mut stats);
        let (tag, index) = mem.l2.parse_address(14 * 64);
        assert!(mem.l2.lookup(tag, index).is_some());

        // Reading block 14 now hits in L2
        mem.access(AccessType::Read, 14 * 64, &mut stats);
        assert_eq!(stats.read_hits_l2, 1);
    }

    #[test]
    fn test_disabled_l1_always_misses() {
        let config = HierarchyConfig {
            l1: CacheConfig::disabled(),
            l2: CacheConfig::default(),
        };
        let mut mem = MemoryHierarchy::setup(&config).unwrap();
        let mut stats = SimStats::default();
        for _ in 0..3 {
            let latency = mem.access(AccessType::Read, 0x80, &mut stats);
            assert_eq!(latency, HIT_TIME + MISS_TIME);
        }
        assert_eq!(mem.l1.num_valid(), 0);
        assert_eq!(stats.misses_l1, 3);
        assert_eq!(stats.read_hits_l2, 2);
    }

    #[test]
    fn test_setup_rejects_bad_geometry() {
        let config = HierarchyConfig::single_level(CacheConfig::make(5, 6, 0));
        assert!(MemoryHierarchy::setup(&config).is_err());
    }

    #[test]
    fn test_print_cache_contents() {
        let mut mem = MemoryHierarchy::setup(&single_set()).unwrap();
        let mut stats = SimStats::default();
        mem.access(AccessType::Read, 0x40, &mut stats);
        let dump = mem.print_cache_contents();
        assert_eq!(dump.lines().count(), 8);
        assert!(dump.starts_with("Block 0: Tag: 0x1"));
    }
}
