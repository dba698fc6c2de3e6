//! A simulator wrapper

use std::path::Path;

use log::info;

use crate::config::SimConfig;
use crate::error::SimulatorError;
use crate::error::SimulatorResult;
use crate::memory::address::parse_address;
use crate::memory::hierarchy::CacheHierarchy;
use crate::memory::AccessType;
use crate::memory::TraceEntry;

/// Fetch operations from the trace file
pub fn fetch_operations(trace_path: &Path) -> SimulatorResult<Vec<TraceEntry>> {
    let content = std::fs::read_to_string(trace_path)?;
    let operations = parse_operations(&content, trace_path)?;
    info!(
        "read {} accesses from {}",
        operations.len(),
        trace_path.display()
    );
    Ok(operations)
}

/// Parse `op address` lines. Blank lines are skipped; anything else that
/// does not parse rejects the whole trace.
pub fn parse_operations(
    content: &str,
    trace_path: &Path,
) -> SimulatorResult<Vec<TraceEntry>> {
    let mut operations = Vec::new();

    for (line_num, line) in content.lines().enumerate() {
        // Skip empty lines
        if line.trim().is_empty() {
            continue;
        }

        // Parse the line into op and address
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() != 2 {
            return Err(SimulatorError::TraceError(
                trace_path.into(),
                format!(
                    "Invalid format at line {}: expected 'op address'",
                    line_num + 1
                ),
            ));
        }

        let access_type: AccessType = parts[0].parse().map_err(|e| {
            SimulatorError::TraceError(
                trace_path.into(),
                format!("{} at line {}", e, line_num + 1),
            )
        })?;
        let address = parse_address(parts[1])?;

        operations.push(TraceEntry::new(access_type, address));
    }

    Ok(operations)
}

/// Run simulation on an already loaded trace
pub fn simulate(
    config: &SimConfig,
    trace: &[TraceEntry],
) -> SimulatorResult<CacheHierarchy> {
    let mut hierarchy = CacheHierarchy::make(config, trace)?;
    hierarchy.run(trace);
    Ok(hierarchy)
}

/// Run simulation on the given trace file
pub fn run_trace(
    config: &SimConfig,
    trace_path: &Path,
) -> SimulatorResult<CacheHierarchy> {
    let operations = fetch_operations(trace_path)?;
    simulate(config, &operations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConfigError;
    use crate::memory::replacement::ReplacementPolicy;
    use crate::memory::InclusionPolicy;

    fn parse(content: &str) -> SimulatorResult<Vec<TraceEntry>> {
        parse_operations(content, Path::new("test_trace.txt"))
    }

    #[test]
    fn test_parse_operations() {
        let trace = parse("r 400341a0\n\nw 7fff5c40\n  r 0x10  \n").unwrap();
        assert_eq!(
            trace,
            vec![
                TraceEntry::read(0x400341a0),
                TraceEntry::write(0x7fff5c40),
                TraceEntry::read(0x10),
            ]
        );
    }

    #[test]
    fn test_malformed_address_rejects_trace() {
        assert!(matches!(
            parse("r 00000010\nw 0000001g\n"),
            Err(SimulatorError::MalformedAddress(_))
        ));
    }

    #[test]
    fn test_bad_lines_reject_trace() {
        assert!(matches!(
            parse("x 00000010\n"),
            Err(SimulatorError::TraceError(_, _))
        ));
        assert!(matches!(
            parse("r 00000010 extra\n"),
            Err(SimulatorError::TraceError(_, _))
        ));
    }

    #[test]
    fn test_simulate_two_levels() {
        let trace =
            parse("w 00000000\nr 00000200\nr 00000400\nr 00000000\n").unwrap();
        let config = SimConfig {
            l2_size: 4096,
            l2_assoc: 4,
            replacement: ReplacementPolicy::Opt,
            inclusion: InclusionPolicy::Inclusive,
            ..Default::default()
        };
        let hierarchy = simulate(&config, &trace).unwrap();
        let l1 = hierarchy.l1_snapshot();
        assert_eq!((l1.reads, l1.writes), (3, 1));
        // OPT keeps 0x000 for its reuse, so only the three cold misses
        assert_eq!(l1.read_misses + l1.write_misses, 3);
        assert!(hierarchy.verify_inclusiveness().is_ok());
    }

    #[test]
    fn test_config_error_surfaces() {
        let config = SimConfig { l1_size: 1000, ..Default::default() };
        assert!(matches!(
            simulate(&config, &[]),
            Err(SimulatorError::ConfigError(ConfigError::Indivisible { .. }))
        ));
    }
}
