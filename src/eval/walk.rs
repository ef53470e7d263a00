use std::process;

use env_logger::Env;
use log::{info, warn};
use sim_lib::error::SimulatorResult;
use sim_lib::frame::FramePattern;
use sim_lib::memory::config::ReplacePolicy;
use sim_lib::memory::{CacheConfig, HierarchyConfig};
use sim_lib::run_wrapper::{llc_windows, run_llc_walk};

const SEED: u64 = 0x5eed;

fn main() {
    env_logger::init_from_env(Env::default().filter_or("RUST_LOG", "info"));

    if let Err(e) = run_eval() {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run_eval() -> SimulatorResult<()> {
    let output_path = "eval/walk_eval.csv";
    std::fs::create_dir_all("eval")?;
    let mut writer = csv::Writer::from_path(output_path)?;

    writer.write_record([
        "Config",
        "Victim",
        "Windows",
        "LLC walk time",
        "L1 miss ratio",
        "Evictions",
        "L2 prefetches",
    ])?;

    let lfu = CacheConfig::default().with_replace_policy(ReplacePolicy::Lfu);
    let configs = vec![
        ("L1 only, LRU", HierarchyConfig::single_level(CacheConfig::default())),
        ("L1 only, LFU", HierarchyConfig::single_level(lfu)),
        ("L1 + L2, LRU", HierarchyConfig::default()),
    ];

    for (name, config) in configs {
        let windows = llc_windows(&config);
        info!("Running {} with {} windows per frame", name, windows);

        for pattern in FramePattern::ALL {
            match run_llc_walk(&config, pattern, windows, SEED) {
                Ok(stats) => {
                    writer.write_record([
                        name,
                        pattern.name(),
                        &windows.to_string(),
                        &format!("{:.3}", stats.llc_walk_time),
                        &format!("{:.3}", stats.miss_ratio_l1),
                        &stats.num_evictions.to_string(),
                        &stats.prefetches_l2.to_string(),
                    ])?;
                }
                Err(e) => {
                    warn!("Failed to run {} with {} victim: {}", name, pattern.name(), e);
                    writer.write_record([
                        name,
                        pattern.name(),
                        "Error",
                        "Error",
                        "Error",
                        "Error",
                        "Error",
                    ])?;
                }
            }
        }
    }

    writer.flush()?;
    Ok(())
}
