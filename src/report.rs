//! Human-readable simulation report

use std::io;
use std::io::Write;

use crate::config::SimConfig;
use crate::memory::cache::Cache;
use crate::memory::hierarchy::CacheHierarchy;
use crate::memory::measurements::MeasurementsSnapshot;

fn format_miss_rate(miss_rate: Option<f64>) -> String {
    miss_rate.map_or_else(|| "0".to_string(), |rate| format!("{:.6}", rate))
}

/// Print the configuration, the final contents of each level and the
/// raw counters
pub fn write_report<W: Write>(
    out: &mut W,
    config: &SimConfig,
    trace_name: &str,
    hierarchy: &CacheHierarchy,
    show_contents: bool,
) -> io::Result<()> {
    write_configuration(out, config, trace_name)?;
    if show_contents {
        write_contents(out, &hierarchy.l1)?;
        if let Some(l2) = &hierarchy.l2 {
            write_contents(out, l2)?;
        }
    }
    write_results(out, hierarchy)
}

pub fn write_configuration<W: Write>(
    out: &mut W,
    config: &SimConfig,
    trace_name: &str,
) -> io::Result<()> {
    writeln!(out, "===== Simulator configuration =====")?;
    writeln!(out, "BLOCKSIZE:             {}", config.block_size)?;
    writeln!(out, "L1_SIZE:               {}", config.l1_size)?;
    writeln!(out, "L1_ASSOC:              {}", config.l1_assoc)?;
    writeln!(out, "L2_SIZE:               {}", config.l2_size)?;
    writeln!(out, "L2_ASSOC:              {}", config.l2_assoc)?;
    writeln!(out, "REPLACEMENT POLICY:    {}", config.replacement)?;
    writeln!(out, "INCLUSION PROPERTY:    {}", config.inclusion)?;
    writeln!(out, "trace_file:            {}", trace_name)
}

pub fn write_contents<W: Write>(out: &mut W, cache: &Cache) -> io::Result<()> {
    writeln!(out, "===== L{} contents =====", cache.level)?;
    for (index, set) in cache.contents().iter().enumerate() {
        write!(out, "Set     {}:", index)?;
        for block in set {
            let dirty = if block.dirty { " D" } else { "  " };
            write!(out, "\t{}{}", block.tag, dirty)?;
        }
        writeln!(out)?;
    }
    Ok(())
}

pub fn write_results<W: Write>(
    out: &mut W,
    hierarchy: &CacheHierarchy,
) -> io::Result<()> {
    let l1 = hierarchy.l1_snapshot();
    let l2: MeasurementsSnapshot =
        hierarchy.l2_snapshot().unwrap_or_default();

    writeln!(out, "===== Simulation results (raw) =====")?;
    writeln!(out, "a. number of L1 reads:        {}", l1.reads)?;
    writeln!(out, "b. number of L1 read misses:  {}", l1.read_misses)?;
    writeln!(out, "c. number of L1 writes:       {}", l1.writes)?;
    writeln!(out, "d. number of L1 write misses: {}", l1.write_misses)?;
    writeln!(
        out,
        "e. L1 miss rate:              {}",
        format_miss_rate(l1.miss_rate)
    )?;
    writeln!(out, "f. number of L1 writebacks:   {}", l1.writebacks)?;
    writeln!(out, "g. number of L2 reads:        {}", l2.reads)?;
    writeln!(out, "h. number of L2 read misses:  {}", l2.read_misses)?;
    writeln!(out, "i. number of L2 writes:       {}", l2.writes)?;
    writeln!(out, "j. number of L2 write misses: {}", l2.write_misses)?;
    writeln!(
        out,
        "k. L2 miss rate:              {}",
        format_miss_rate(l2.miss_rate)
    )?;
    writeln!(out, "l. number of L2 writebacks:   {}", l2.writebacks)?;
    writeln!(
        out,
        "m. total memory traffic:      {}",
        hierarchy.total_memory_traffic()
    )
}
