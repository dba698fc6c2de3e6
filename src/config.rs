//! Simulation configuration

use crate::error::ConfigError;
use crate::memory::cache::CacheConfig;
use crate::memory::replacement::ReplacementPolicy;
use crate::memory::InclusionPolicy;

/// Everything a run needs besides the trace.
/// All sizes are in bytes; an L2 size of 0 means there is no L2.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SimConfig {
    pub block_size: u32,
    pub l1_size: u32,
    pub l1_assoc: u32,
    pub l2_size: u32,
    pub l2_assoc: u32,
    pub replacement: ReplacementPolicy,
    pub inclusion: InclusionPolicy,
}

impl Default for SimConfig {
    /// Single 1KB 2-way L1 with 16-byte blocks
    fn default() -> Self {
        Self {
            block_size: 16,
            l1_size: 1024,
            l1_assoc: 2,
            l2_size: 0,
            l2_assoc: 0,
            replacement: ReplacementPolicy::Lru,
            inclusion: InclusionPolicy::NonInclusive,
        }
    }
}

impl SimConfig {
    pub fn has_l2(&self) -> bool {
        self.l2_size != 0
    }

    pub fn l1(&self) -> CacheConfig {
        CacheConfig::make(self.l1_size, self.l1_assoc, self.block_size)
            .with_replacement(self.replacement)
    }

    /// The inclusion property lives on L2, the level whose evictions
    /// have to be mirrored above
    pub fn l2(&self) -> Option<CacheConfig> {
        if !self.has_l2() {
            return None;
        }
        Some(
            CacheConfig::make(self.l2_size, self.l2_assoc, self.block_size)
                .with_replacement(self.replacement)
                .with_inclusion(self.inclusion),
        )
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.l1().validate()?;
        if let Some(l2) = self.l2() {
            l2.validate()?;
        }
        Ok(())
    }
}
