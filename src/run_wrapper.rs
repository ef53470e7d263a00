//! A simulator wrapper

use std::path::Path;

use log::{debug, info};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::error::{SimulatorResult, TraceError};
use crate::frame::{FramePattern, FrameStore};
use crate::memory::{AccessType, HierarchyConfig, MemoryHierarchy, SimStats};

/// Fetch operations from the trace file
pub fn fetch_operations(
    trace_path: impl AsRef<Path>,
) -> SimulatorResult<Vec<(AccessType, u64)>> {
    let trace_path = trace_path.as_ref();
    let content = std::fs::read_to_string(trace_path)
        .map_err(|e| TraceError::FileReadError(trace_path.into(), e))?;
    let mut operations = Vec::new();

    for (line_num, line) in content.lines().enumerate() {
        // Skip empty lines
        if line.trim().is_empty() {
            continue;
        }
        let parse_error =
            |message: String| TraceError::ParseError(trace_path.into(), line_num + 1, message);

        // Parse the line into op and address
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() != 2 {
            return Err(parse_error("expected 'op address'".to_string()).into());
        }

        let mut op_chars = parts[0].chars();
        let access_type = match (op_chars.next(), op_chars.next()) {
            (Some(op), None) => AccessType::from_char(op),
            _ => None,
        }
        .ok_or_else(|| {
            parse_error(format!(
                "invalid operation '{}': expected 'R' or 'W'",
                parts[0]
            ))
        })?;

        let address_str = parts[1]
            .strip_prefix("0x")
            .or_else(|| parts[1].strip_prefix("0X"))
            .ok_or_else(|| {
                parse_error("expected hexadecimal address starting with '0x'".to_string())
            })?;
        let address = u64::from_str_radix(address_str, 16).map_err(|_| {
            parse_error(format!("invalid hexadecimal address '{}'", parts[1]))
        })?;

        operations.push((access_type, address));
    }

    Ok(operations)
}

/// Replay a sequence of operations on a fresh hierarchy
pub fn run_operations(
    config: &HierarchyConfig,
    operations: &[(AccessType, u64)],
) -> SimulatorResult<SimStats> {
    let mut mem = MemoryHierarchy::setup(config)?;
    let mut stats = SimStats::default();

    for &(access_type, address) in operations {
        mem.access(access_type, address, &mut stats);
    }
    debug!("Final L1 contents:\n{}", mem.print_cache_contents());

    mem.finish(&mut stats);
    Ok(stats)
}

/// Run simulation on the given trace file
pub fn run_trace(
    config: &HierarchyConfig,
    trace_path: impl AsRef<Path>,
) -> SimulatorResult<SimStats> {
    let operations = fetch_operations(trace_path)?;
    info!("Replaying {} operations", operations.len());
    run_operations(config, &operations)
}

/// Number of uncompressed windows that fill the last-level cache
pub fn llc_windows(config: &HierarchyConfig) -> usize {
    let llc = if config.l2.disabled { &config.l1 } else { &config.l2 };
    llc.num_lines() / 2
}

/// One last-level-cache walk.
///
/// The attacker primes the cache with an incompressible frame, the
/// victim frame is rendered on top of it, and the attacker then walks
/// its frame backwards. The time of that walk depends on how many
/// attacker lines the victim evicted, and hence on whether the victim's
/// windows compressed.
pub fn run_llc_walk(
    config: &HierarchyConfig,
    victim_pattern: FramePattern,
    num_windows: usize,
    seed: u64,
) -> SimulatorResult<SimStats> {
    let mut mem = MemoryHierarchy::setup(config)?;
    let mut stats = SimStats::default();
    let mut rng = StdRng::seed_from_u64(seed);
    let mut store = FrameStore::new();

    let attacker = store.new_random(num_windows, &mut rng);
    let victim = store.new_frame(victim_pattern, num_windows, &mut rng);

    let attacker = store.frame(attacker)?;
    let victim = store.frame(victim)?;

    attacker.read(&mut mem, &mut stats);
    victim.read(&mut mem, &mut stats);
    stats.llc_walk_time = attacker.read_backwards(&mut mem, &mut stats);
    info!(
        "LLC walk over {} windows with {} victim: {:.1}",
        num_windows,
        victim_pattern.name(),
        stats.llc_walk_time
    );

    mem.finish(&mut stats);
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SimulatorError;
    use crate::memory::{CacheConfig, HIT_TIME, MISS_TIME};
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn trace_file(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_fetch_operations() {
        let file = trace_file("R 0x0\n\nw 0x1F40\nW 0xdeadbeefcafe\n");
        let operations = fetch_operations(file.path()).unwrap();
        assert_eq!(
            operations,
            vec![
                (AccessType::Read, 0x0),
                (AccessType::Write, 0x1f40),
                (AccessType::Write, 0xdead_beef_cafe),
            ]
        );
    }

    #[test]
    fn test_fetch_operations_reports_line() {
        let file = trace_file("R 0x0\nX 0x40\n");
        match fetch_operations(file.path()) {
            Err(SimulatorError::TraceError(TraceError::ParseError(_, line, _))) => {
                assert_eq!(line, 2)
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_fetch_operations_rejects_bad_addresses() {
        for content in ["R 40", "R 0xzz", "R", "R 0x0 0x1", "RW 0x0"] {
            let file = trace_file(content);
            assert!(fetch_operations(file.path()).is_err(), "{}", content);
        }
    }

    #[test]
    fn test_missing_trace_file() {
        assert!(matches!(
            fetch_operations("/nonexistent/trace.txt"),
            Err(SimulatorError::TraceError(TraceError::FileReadError(..)))
        ));
    }

    #[test]
    fn test_run_trace() {
        let file = trace_file("R 0x0\nR 0x40\nR 0x0\nW 0x44\n");
        let config = HierarchyConfig::single_level(CacheConfig::make(9, 6, 3));
        let stats = run_trace(&config, file.path()).unwrap();
        assert_eq!(stats.reads, 3);
        assert_eq!(stats.writes, 1);
        assert_eq!(stats.misses_l1, 2);
        assert_eq!(stats.hits_l1, 2);
        assert_eq!(stats.hit_ratio_l1, 0.5);
        assert_eq!(stats.avg_access_time_l1, HIT_TIME + 0.5 * MISS_TIME);
    }

    #[test]
    fn test_llc_windows() {
        let single = HierarchyConfig::single_level(CacheConfig::default());
        assert_eq!(llc_windows(&single), 256);
        assert_eq!(llc_windows(&HierarchyConfig::default()), 2048);
    }

    #[test]
    fn test_llc_walk_leaks_compressibility() {
        let config = HierarchyConfig::single_level(CacheConfig::default());
        let windows = llc_windows(&config);

        let black = run_llc_walk(&config, FramePattern::Black, windows, 1).unwrap();
        let random = run_llc_walk(&config, FramePattern::Random, windows, 1).unwrap();

        // A compressed victim evicts fewer attacker lines
        assert!(black.llc_walk_time < random.llc_walk_time);
        assert!(black.misses_l1 < random.misses_l1);
        assert!(black.llc_walk_time >= (2 * windows) as f64 * HIT_TIME);
    }

    #[test]
    fn test_llc_walk_always_walks() {
        let config = HierarchyConfig::single_level(CacheConfig::default());
        let stats = run_llc_walk(&config, FramePattern::Black, 8, 3).unwrap();
        assert!(stats.llc_walk_time > 0.0);
        assert_eq!(stats.reads, 8 * 2 + 8 + 8 * 2);
    }

    #[test]
    fn test_llc_walk_is_deterministic() {
        let config = HierarchyConfig::single_level(CacheConfig::default());
        let first = run_llc_walk(&config, FramePattern::Random, 64, 9).unwrap();
        let second = run_llc_walk(&config, FramePattern::Random, 64, 9).unwrap();
        assert_eq!(first, second);
    }
}
