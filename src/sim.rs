use env_logger::Env;
use sim_lib::memory::config::{InsertPolicy, ReplacePolicy, WriteStrategy};
use sim_lib::memory::{CacheConfig, HierarchyConfig};
use sim_lib::run_wrapper;
use std::env;
use std::error::Error;

fn main() -> Result<(), Box<dyn Error>> {
    let mut args = env::args().skip(1);
    let trace_file = args.next().ok_or("You should specify exactly one trace file")?;

    let mut config = HierarchyConfig::default();
    let mut verbose = false;
    let mut single_level = false;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-v" => verbose = true,
            "-s" => single_level = true,
            "-n" => {
                config.l1 = config.l1.with_prefetcher(false, false);
                config.l2 = config.l2.with_prefetcher(false, false);
            }
            "-x" => {
                config.l1.strided_prefetch_disabled = true;
                config.l2.strided_prefetch_disabled = true;
            }
            "-r" => {
                let policy_arg = args
                    .next()
                    .ok_or("You should specify a replacement policy after -r")?;
                let policy = match policy_arg.to_uppercase().as_str() {
                    "LRU" => ReplacePolicy::Lru,
                    "LFU" => ReplacePolicy::Lfu,
                    _ => {
                        return Err(
                            "Invalid replacement policy specified after -r".into()
                        )
                    }
                };
                config.l1 = config.l1.with_replace_policy(policy);
                config.l2 = config.l2.with_replace_policy(policy);
            }
            "-w" => {
                let strategy_arg = args
                    .next()
                    .ok_or("You should specify a write strategy after -w")?;
                let strategy = match strategy_arg.to_uppercase().as_str() {
                    "WBWA" => WriteStrategy::WriteBackWriteAllocate,
                    "WT" => WriteStrategy::WriteThrough,
                    _ => {
                        return Err("Invalid write strategy specified after -w".into())
                    }
                };
                config.l1 = config.l1.with_write_strategy(strategy);
                config.l2 = config.l2.with_write_strategy(strategy);
            }
            "-i" => {
                let insert_arg = args
                    .next()
                    .ok_or("You should specify an insertion policy after -i")?;
                let policy = match insert_arg.to_uppercase().as_str() {
                    "MIP" => InsertPolicy::Mip,
                    "LIP" => InsertPolicy::Lip,
                    _ => {
                        return Err(
                            "Invalid insertion policy specified after -i".into()
                        )
                    }
                };
                config.l2 = config.l2.with_insert_policy(policy);
            }
            _ => return Err(format!("Unknown parameter: {}", arg).into()),
        }
    }

    let level = if verbose { "debug" } else { "info" };
    env_logger::init_from_env(Env::default().filter_or("RUST_LOG", level));

    if single_level {
        config.l2 = CacheConfig::disabled();
    }

    let stats = run_wrapper::run_trace(&config, &trace_file)?;
    println!("{}", stats);

    Ok(())
}
