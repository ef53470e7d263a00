//! Simulation statistics

use std::fmt;

use super::{HIT_TIME, MEMORY_TIME, MISS_TIME};

/// Counters collected during a run.
///
/// The hierarchy only ever writes to this block;
/// no simulation decision depends on its contents.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SimStats {
    pub reads: u64,
    pub writes: u64,

    pub accesses_l1: u64,
    pub hits_l1: u64,
    pub misses_l1: u64,

    pub accesses_l2: u64,
    pub reads_l2: u64,
    pub writes_l2: u64,
    pub read_hits_l2: u64,
    pub read_misses_l2: u64,

    pub num_evictions: u64,
    pub prefetches_l2: u64,

    pub hit_ratio_l1: f64,
    pub miss_ratio_l1: f64,
    pub read_hit_ratio_l2: f64,
    pub read_miss_ratio_l2: f64,

    pub avg_access_time_l1: f64,
    pub avg_access_time_l2: f64,

    /// Time spent walking the last-level cache in an attack experiment
    pub llc_walk_time: f64,
}

/// Ratio that is 0 when nothing was counted
fn ratio(numerator: u64, denominator: u64) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

impl SimStats {
    /// Fill the derived fields from the raw counters
    pub fn compute_derived(&mut self, l2_hit_time: f64) {
        self.hit_ratio_l1 = ratio(self.hits_l1, self.accesses_l1);
        self.miss_ratio_l1 = ratio(self.misses_l1, self.accesses_l1);
        self.read_hit_ratio_l2 = ratio(self.read_hits_l2, self.reads_l2);
        self.read_miss_ratio_l2 = ratio(self.read_misses_l2, self.reads_l2);

        self.avg_access_time_l1 = HIT_TIME + self.miss_ratio_l1 * MISS_TIME;
        self.avg_access_time_l2 =
            l2_hit_time + self.read_miss_ratio_l2 * MEMORY_TIME;
    }
}

impl fmt::Display for SimStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "reads: {}, writes: {}", self.reads, self.writes)?;
        writeln!(
            f,
            "L1: accesses: {}, hits: {}, misses: {}, hit ratio: {:.3}, miss ratio: {:.3}",
            self.accesses_l1,
            self.hits_l1,
            self.misses_l1,
            self.hit_ratio_l1,
            self.miss_ratio_l1
        )?;
        writeln!(
            f,
            "L2: accesses: {}, reads: {}, writes: {}, read hits: {}, read misses: {}, read hit ratio: {:.3}, read miss ratio: {:.3}",
            self.accesses_l2,
            self.reads_l2,
            self.writes_l2,
            self.read_hits_l2,
            self.read_misses_l2,
            self.read_hit_ratio_l2,
            self.read_miss_ratio_l2
        )?;
        writeln!(
            f,
            "evictions: {}, L2 prefetches: {}",
            self.num_evictions, self.prefetches_l2
        )?;
        writeln!(
            f,
            "AAT L1: {:.3}, AAT L2: {:.3}",
            self.avg_access_time_l1, self.avg_access_time_l2
        )?;
        write!(f, "LLC walk time: {:.3}", self.llc_walk_time)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_accesses_do_not_trap() {
        let mut stats = SimStats::default();
        stats.compute_derived(0.0);
        assert_eq!(stats.hit_ratio_l1, 0.0);
        assert_eq!(stats.miss_ratio_l1, 0.0);
        assert_eq!(stats.read_miss_ratio_l2, 0.0);
        assert_eq!(stats.avg_access_time_l1, HIT_TIME);
        assert_eq!(stats.avg_access_time_l2, 0.0);
    }

    #[test]
    fn test_derived_ratios() {
        let mut stats = SimStats {
            accesses_l1: 4,
            hits_l1: 3,
            misses_l1: 1,
            reads_l2: 2,
            read_hits_l2: 1,
            read_misses_l2: 1,
            ..Default::default()
        };
        stats.compute_derived(4.0);
        assert_eq!(stats.hit_ratio_l1, 0.75);
        assert_eq!(stats.miss_ratio_l1, 0.25);
        assert_eq!(stats.read_hit_ratio_l2, 0.5);
        assert_eq!(stats.avg_access_time_l1, HIT_TIME + 0.25 * MISS_TIME);
        assert_eq!(stats.avg_access_time_l2, 4.0 + 0.5 * MEMORY_TIME);
    }
}
