//! Command-line arguments

use std::path::PathBuf;

use clap::Parser;
use env_logger::Env;

use crate::config::SimConfig;
use crate::memory::replacement::ReplacementPolicy;
use crate::memory::InclusionPolicy;

/// Set-associative cache hierarchy simulator.
#[derive(Debug, Parser)]
#[command(name = "sim_cache")]
pub struct SimCacheArgs {
    /// Block size in bytes, shared by both levels
    pub block_size: u32,

    /// L1 size in bytes
    pub l1_size: u32,

    /// L1 associativity
    pub l1_assoc: u32,

    /// L2 size in bytes, 0 for no L2
    pub l2_size: u32,

    /// L2 associativity, ignored without an L2
    pub l2_assoc: u32,

    /// Replacement policy.
    /// 0 or lru: least recently used (default)
    /// 1 or plru: tree pseudo-LRU
    /// 2 or opt: Belady's optimal
    pub replacement_policy: ReplacementPolicy,

    /// Inclusion property between L1 and L2.
    /// 0 or non-inclusive (default)
    /// 1 or inclusive
    pub inclusion_property: InclusionPolicy,

    /// Path to the trace file, one `r|w hexaddress` per line
    pub trace_file: PathBuf,

    /// Skip printing the final contents of each level
    #[arg(long = "no-contents")]
    pub no_contents: bool,
}

impl SimCacheArgs {
    pub fn config(&self) -> SimConfig {
        SimConfig {
            block_size: self.block_size,
            l1_size: self.l1_size,
            l1_assoc: self.l1_assoc,
            l2_size: self.l2_size,
            l2_assoc: self.l2_assoc,
            replacement: self.replacement_policy,
            inclusion: self.inclusion_property,
        }
    }

    /// File name shown in the report
    pub fn trace_name(&self) -> String {
        self.trace_file
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.trace_file.display().to_string())
    }
}

/// Evaluation driver arguments
#[derive(Debug, clap::Args)]
pub struct EvalArgs {
    /// Trace to replay for every configuration
    pub trace_file: PathBuf,

    /// Directory for the CSV and plot output
    #[arg(long = "out-dir", default_value = "eval")]
    pub out_dir: PathBuf,
}

/// Logging goes to stderr, `warn` and up unless `RUST_LOG` says otherwise
pub fn init_logging() {
    let env = Env::default().filter_or("RUST_LOG", "warn");
    // A second init in the same process is harmless
    let _ = env_logger::try_init_from_env(env);
}
