//! Per-level access counters

use super::AccessType;
use super::Outcome;

#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
pub struct Measurements {
    pub reads: u64,
    pub read_misses: u64,
    pub writes: u64,
    pub write_misses: u64,
    pub writebacks: u64,
}

impl Measurements {
    pub fn record(&mut self, access_type: AccessType, outcome: Outcome) {
        let missed = outcome != Outcome::Hit;
        match access_type {
            AccessType::Read => {
                self.reads += 1;
                self.read_misses += missed as u64;
            }
            AccessType::Write => {
                self.writes += 1;
                self.write_misses += missed as u64;
            }
        }
    }

    pub fn record_writeback(&mut self) {
        self.writebacks += 1;
    }

    pub fn accesses(&self) -> u64 {
        self.reads + self.writes
    }

    pub fn misses(&self) -> u64 {
        self.read_misses + self.write_misses
    }

    /// Computes the current miss rate, `None` before the first access
    pub fn get_miss_rate(&self) -> Option<f64> {
        match self.accesses() {
            0 => None,
            accesses => Some(self.misses() as f64 / accesses as f64),
        }
    }

    /// Blocks moved between this level and the one below it.
    /// `direct_writebacks` are write-backs that bypassed this level on
    /// their way to memory.
    pub fn get_memory_traffic(&self, direct_writebacks: u64) -> u64 {
        self.writebacks + self.misses() + direct_writebacks
    }
}

/// Read-only view handed out for reporting
#[derive(Clone, Copy, Default, Debug, PartialEq)]
pub struct MeasurementsSnapshot {
    pub reads: u64,
    pub read_misses: u64,
    pub writes: u64,
    pub write_misses: u64,
    pub miss_rate: Option<f64>,
    pub writebacks: u64,
    pub memory_traffic: u64,
}

/// Average access time of a single level backed by memory.
/// An undefined miss rate counts as no misses.
pub fn average_access_time(
    hit_time: f64,
    miss_rate: Option<f64>,
    miss_penalty: f64,
) -> f64 {
    hit_time + miss_rate.unwrap_or(0.) * miss_penalty
}

/// Average access time seen by the processor with two levels
pub fn two_level_access_time(
    l1_hit_time: f64,
    l1_miss_rate: Option<f64>,
    l2_hit_time: f64,
    l2_miss_rate: Option<f64>,
    miss_penalty: f64,
) -> f64 {
    let l2_time = average_access_time(l2_hit_time, l2_miss_rate, miss_penalty);
    average_access_time(l1_hit_time, l1_miss_rate, l2_time)
}
