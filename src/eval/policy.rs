use std::fs;
use std::process;

use cache_lib::config::SimConfig;
use cache_lib::error::SimulatorResult;
use cache_lib::flags::{init_logging, EvalArgs};
use cache_lib::memory::measurements::{
    average_access_time, two_level_access_time,
};
use cache_lib::memory::replacement::ReplacementPolicy;
use cache_lib::memory::{InclusionPolicy, TraceEntry};
use cache_lib::run_wrapper::{fetch_operations, simulate};
use clap::Parser;
use log::info;

const BLOCK_SIZE: u32 = 32;

/// Replacement policy and inclusion property comparison
#[derive(Debug, Parser)]
#[command(name = "policy-eval")]
struct PolicyArgs {
    #[command(flatten)]
    eval: EvalArgs,

    /// L1 hit time in ns
    #[arg(long = "hit-time", default_value_t = 0.15)]
    hit_time: f64,

    /// L2 hit time in ns
    #[arg(long = "l2-hit-time", default_value_t = 0.25)]
    l2_hit_time: f64,

    /// Memory access time in ns
    #[arg(long = "miss-penalty", default_value_t = 100.)]
    miss_penalty: f64,
}

fn main() {
    init_logging();
    let args = PolicyArgs::parse();

    if let Err(e) = run_eval(&args) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run_eval(args: &PolicyArgs) -> SimulatorResult<()> {
    let trace = fetch_operations(&args.eval.trace_file)?;
    fs::create_dir_all(&args.eval.out_dir)?;

    compare_replacement(args, &trace)?;
    compare_inclusion(args, &trace)?;

    Ok(())
}

/// 4-way L1 of growing size under each replacement policy
fn compare_replacement(
    args: &PolicyArgs,
    trace: &[TraceEntry],
) -> SimulatorResult<()> {
    let output_path = args.eval.out_dir.join("replacement_eval.csv");
    let mut writer = csv::Writer::from_path(&output_path)?;
    writer.write_record(["log2(size)", "policy", "L1 miss rate", "AAT"])?;

    for policy in [
        ReplacementPolicy::Lru,
        ReplacementPolicy::Plru,
        ReplacementPolicy::Opt,
    ] {
        for log_size in 10..=18 {
            let config = SimConfig {
                block_size: BLOCK_SIZE,
                l1_size: 1 << log_size,
                l1_assoc: 4,
                replacement: policy,
                ..Default::default()
            };
            let hierarchy = simulate(&config, trace)?;
            let miss_rate = hierarchy.l1.get_miss_rate();
            let aat =
                average_access_time(args.hit_time, miss_rate, args.miss_penalty);
            info!("{} size 2^{}: AAT {:.4}", policy, log_size, aat);

            writer.write_record([
                log_size.to_string(),
                policy.to_string(),
                format!("{:.6}", miss_rate.unwrap_or(0.)),
                format!("{:.4}", aat),
            ])?;
        }
    }
    writer.flush()?;

    Ok(())
}

/// 1KB 4-way L1 over an 8-way L2 of growing size, LRU
fn compare_inclusion(
    args: &PolicyArgs,
    trace: &[TraceEntry],
) -> SimulatorResult<()> {
    let output_path = args.eval.out_dir.join("inclusion_eval.csv");
    let mut writer = csv::Writer::from_path(&output_path)?;
    writer.write_record([
        "log2(L2 size)",
        "inclusion",
        "L1 miss rate",
        "L2 miss rate",
        "AAT",
    ])?;

    for inclusion in [InclusionPolicy::NonInclusive, InclusionPolicy::Inclusive]
    {
        for log_size in 11..=16 {
            let config = SimConfig {
                block_size: BLOCK_SIZE,
                l1_size: 1024,
                l1_assoc: 4,
                l2_size: 1 << log_size,
                l2_assoc: 8,
                replacement: ReplacementPolicy::Lru,
                inclusion,
            };
            let hierarchy = simulate(&config, trace)?;
            let l1_miss_rate = hierarchy.l1_snapshot().miss_rate;
            let l2_miss_rate =
                hierarchy.l2_snapshot().and_then(|l2| l2.miss_rate);
            let aat = two_level_access_time(
                args.hit_time,
                l1_miss_rate,
                args.l2_hit_time,
                l2_miss_rate,
                args.miss_penalty,
            );
            info!("{} L2 size 2^{}: AAT {:.4}", inclusion, log_size, aat);

            writer.write_record([
                log_size.to_string(),
                inclusion.to_string(),
                format!("{:.6}", l1_miss_rate.unwrap_or(0.)),
                format!("{:.6}", l2_miss_rate.unwrap_or(0.)),
                format!("{:.4}", aat),
            ])?;
        }
    }
    writer.flush()?;

    Ok(())
}
