//! Two-level cache hierarchy
//!
//! L1 always exists; L2 is optional. The hierarchy is the only place
//! where the two levels learn about each other: L1 write-backs and misses
//! are forwarded down, and under the inclusion property L2 evictions are
//! mirrored back up as invalidations.

use log::{debug, info};

use super::cache::Cache;
use super::measurements::MeasurementsSnapshot;
use super::AccessType;
use super::InclusionPolicy;
use super::Outcome;
use super::TraceEntry;
use crate::config::SimConfig;
use crate::error::ConfigError;
use crate::error::SimulatorError;
use crate::error::SimulatorResult;

/// Per-level outcome of one trace entry.
/// `l2` is `None` when there is no L2 or L1 hit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StepOutcome {
    pub l1: Outcome,
    pub l2: Option<Outcome>,
}

pub struct CacheHierarchy {
    pub l1: Cache,
    pub l2: Option<Cache>,
    pub inclusion: InclusionPolicy,

    /// Dirty L1 blocks dropped by an inclusive invalidation.
    /// They go straight to memory without passing through L2.
    pub direct_writebacks: u64,
}

impl CacheHierarchy {
    /// Build both levels. The trace is only read here to prepare the
    /// OPT oracle; it is fed later through `run` or `step`.
    pub fn make(
        config: &SimConfig,
        trace: &[TraceEntry],
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let addresses = || trace.iter().map(|entry| entry.address);

        let l1 = Cache::make_with_trace(1, config.l1(), addresses())?;
        let l2 = match config.l2() {
            Some(l2) => Some(Cache::make_with_trace(2, l2, addresses())?),
            None => None,
        };

        Ok(Self {
            l1,
            l2,
            inclusion: config.inclusion,
            direct_writebacks: 0,
        })
    }

    /// Feed the whole trace, in order
    pub fn run(&mut self, trace: &[TraceEntry]) -> Vec<StepOutcome> {
        let outcomes: Vec<_> =
            trace.iter().map(|entry| self.step(*entry)).collect();
        info!(
            "processed {} accesses, L1 miss rate {:?}",
            outcomes.len(),
            self.l1.get_miss_rate()
        );
        outcomes
    }

    /// Process one trace entry through both levels
    pub fn step(&mut self, entry: TraceEntry) -> StepOutcome {
        let l1_access = self.l1.execute(entry.access_type, entry.address);

        if self.l2.is_none() {
            return StepOutcome { l1: l1_access.outcome, l2: None };
        }

        if let Some(victim) = l1_access.write_back {
            if let Some(l2) = self.l2.as_mut() {
                l2.write_back(victim);
            }
            self.reconcile(entry.address);
        }

        let mut l2_outcome = None;
        if l1_access.outcome != Outcome::Hit {
            if let Some(l2) = self.l2.as_mut() {
                let l2_access = l2.execute(AccessType::Read, entry.address);
                l2_outcome = Some(l2_access.outcome);
            }
            self.reconcile(entry.address);
        }

        StepOutcome { l1: l1_access.outcome, l2: l2_outcome }
    }

    /// Drop from L1 whatever L2 just evicted, if the inclusion property
    /// asks for it. `current` is the address being served: its block is
    /// about to be brought back into L2 and must stay in L1.
    fn reconcile(&mut self, current: u32) {
        let Some(l2) = self.l2.as_mut() else {
            return;
        };
        let Some(evicted) = l2.take_pending_invalidation() else {
            return;
        };
        if self.inclusion != InclusionPolicy::Inclusive {
            return;
        }
        if self.l1.decoder.decompose(evicted)
            == self.l1.decoder.decompose(current)
        {
            return;
        }

        if let Some(block) = self.l1.invalidate(evicted) {
            debug!(
                "L1: invalidated {:#010x} after L2 eviction{}",
                evicted,
                if block.dirty { ", writing to memory" } else { "" }
            );
            if block.dirty {
                self.direct_writebacks += 1;
            }
        }
    }

    pub fn l1_snapshot(&self) -> MeasurementsSnapshot {
        self.l1.snapshot(0)
    }

    pub fn l2_snapshot(&self) -> Option<MeasurementsSnapshot> {
        self.l2
            .as_ref()
            .map(|l2| l2.snapshot(self.direct_writebacks))
    }

    /// Traffic between the last level and memory
    pub fn total_memory_traffic(&self) -> u64 {
        match &self.l2 {
            Some(l2) => l2.get_memory_traffic(self.direct_writebacks),
            None => self.l1.get_memory_traffic(0),
        }
    }

    /// Check that every block in L1 is also present in L2
    pub fn verify_inclusiveness(&self) -> SimulatorResult<()> {
        let Some(l2) = &self.l2 else {
            return Ok(());
        };
        for (index, set) in self.l1.contents().iter().enumerate() {
            for block in set {
                let address = self.l1.decoder.get_address(index, block.tag);
                if !l2.is_in_cache(address) {
                    return Err(SimulatorError::CacheInconsistency(
                        2,
                        format!(
                            "Cache level 2 does not contain address {:#010x} found in level 1",
                            address
                        ),
                    ));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::replacement::ReplacementPolicy;

    /// 16-byte blocks, direct-mapped 2-set L1, 1-set 2-way L2
    fn small_config(inclusion: InclusionPolicy) -> SimConfig {
        SimConfig {
            block_size: 16,
            l1_size: 32,
            l1_assoc: 1,
            l2_size: 32,
            l2_assoc: 2,
            replacement: ReplacementPolicy::Lru,
            inclusion,
        }
    }

    fn simulate(
        config: &SimConfig,
        trace: &[TraceEntry],
    ) -> (CacheHierarchy, Vec<StepOutcome>) {
        let mut hierarchy = CacheHierarchy::make(config, trace).unwrap();
        let outcomes = hierarchy.run(trace);
        (hierarchy, outcomes)
    }

    #[test]
    fn test_single_level() {
        let config = SimConfig::default();
        let trace = [
            TraceEntry::write(0x000),
            TraceEntry::write(0x200),
            TraceEntry::write(0x400),
        ];
        let (hierarchy, outcomes) = simulate(&config, &trace);
        assert!(outcomes.iter().all(|o| o.l2.is_none()));
        assert_eq!(outcomes[2].l1, Outcome::MissEvict);
        // 3 misses + 1 write-back
        assert_eq!(hierarchy.total_memory_traffic(), 4);
        assert!(hierarchy.l2_snapshot().is_none());
    }

    #[test]
    fn test_l1_hit_skips_l2() {
        let config = small_config(InclusionPolicy::NonInclusive);
        let trace = [TraceEntry::read(0x000), TraceEntry::read(0x004)];
        let (hierarchy, outcomes) = simulate(&config, &trace);
        assert_eq!(
            outcomes[0],
            StepOutcome {
                l1: Outcome::MissInsert,
                l2: Some(Outcome::MissInsert)
            }
        );
        assert_eq!(outcomes[1], StepOutcome { l1: Outcome::Hit, l2: None });
        assert_eq!(hierarchy.l2_snapshot().unwrap().reads, 1);
    }

    #[test]
    fn test_write_back_reaches_l2() {
        let config = small_config(InclusionPolicy::NonInclusive);
        // 0x000 and 0x020 share L1 set 0
        let trace = [TraceEntry::write(0x000), TraceEntry::read(0x020)];
        let (hierarchy, outcomes) = simulate(&config, &trace);
        assert_eq!(outcomes[1].l1, Outcome::MissEvict);
        let l1 = hierarchy.l1_snapshot();
        assert_eq!(l1.writebacks, 1);
        let l2 = hierarchy.l2_snapshot().unwrap();
        // The write-back hits the copy brought in by the first miss
        assert_eq!(l2.writes, 1);
        assert_eq!(l2.write_misses, 0);
        assert_eq!(l2.reads, 2);
        assert!(hierarchy.l2.as_ref().unwrap().contents()[0][0].dirty);
    }

    #[test]
    fn test_inclusive_eviction_of_block_absent_from_l1() {
        let config = small_config(InclusionPolicy::Inclusive);
        let trace = [
            // Dirty in L1, then pushed down to L2 by a conflicting read
            TraceEntry::write(0x000),
            TraceEntry::read(0x020),
            // Evicts the dirty 0x000 from L2; L1 no longer holds it
            TraceEntry::read(0x040),
        ];
        let (hierarchy, outcomes) = simulate(&config, &trace);
        assert_eq!(outcomes[2].l2, Some(Outcome::MissEvict));
        let l2 = hierarchy.l2_snapshot().unwrap();
        assert_eq!(l2.writebacks, 1);
        assert_eq!(hierarchy.direct_writebacks, 0);
        assert_eq!(hierarchy.l1_snapshot().writebacks, 1);
        assert!(hierarchy.verify_inclusiveness().is_ok());
    }

    #[test]
    fn test_inclusive_eviction_invalidates_l1() {
        let config = small_config(InclusionPolicy::Inclusive);
        let trace = [
            // L1 set 0 and set 1 both filled, L2 full
            TraceEntry::write(0x000),
            TraceEntry::read(0x010),
            // L2 evicts its LRU block 0x000, still live and dirty in L1
            TraceEntry::read(0x030),
        ];
        let (hierarchy, outcomes) = simulate(&config, &trace);
        assert_eq!(outcomes[2].l2, Some(Outcome::MissEvict));
        assert!(!hierarchy.l1.is_in_cache(0x000));
        // No L1 write-back, the dirty copy goes straight to memory
        let l1 = hierarchy.l1_snapshot();
        assert_eq!(l1.writebacks, 0);
        assert_eq!(hierarchy.direct_writebacks, 1);
        let l2 = hierarchy.l2_snapshot().unwrap();
        assert_eq!(l2.writebacks, 0);
        assert_eq!(l2.memory_traffic, 3 + 1);
        assert!(hierarchy.verify_inclusiveness().is_ok());
    }

    #[test]
    fn test_non_inclusive_keeps_l1_copy() {
        let config = small_config(InclusionPolicy::NonInclusive);
        let trace = [
            TraceEntry::write(0x000),
            TraceEntry::read(0x010),
            TraceEntry::read(0x030),
        ];
        let (hierarchy, _) = simulate(&config, &trace);
        assert!(hierarchy.l1.is_in_cache(0x000));
        assert_eq!(hierarchy.direct_writebacks, 0);
        assert!(hierarchy.verify_inclusiveness().is_err());
    }

    #[test]
    fn test_inclusion_holds_on_longer_traces() {
        for policy in [
            ReplacementPolicy::Lru,
            ReplacementPolicy::Plru,
            ReplacementPolicy::Opt,
        ] {
            let config = SimConfig {
                block_size: 16,
                l1_size: 128,
                l1_assoc: 2,
                l2_size: 256,
                l2_assoc: 4,
                replacement: policy,
                inclusion: InclusionPolicy::Inclusive,
            };
            let trace: Vec<_> = (0u32..600)
                .map(|i| {
                    let address = (i.wrapping_mul(2654435761) >> 20) & 0x7f0;
                    if i % 3 == 0 {
                        TraceEntry::write(address)
                    } else {
                        TraceEntry::read(address)
                    }
                })
                .collect();
            let mut hierarchy = CacheHierarchy::make(&config, &trace).unwrap();
            for entry in &trace {
                hierarchy.step(*entry);
                assert!(hierarchy.verify_inclusiveness().is_ok());
            }
            let l1 = hierarchy.l1_snapshot();
            let l2 = hierarchy.l2_snapshot().unwrap();
            // Every L1 miss is one L2 read
            assert_eq!(l2.reads, l1.read_misses + l1.write_misses);
            assert_eq!(l2.writes, l1.writebacks);
        }
    }
}
