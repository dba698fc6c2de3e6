//! Cache implementation

use log::{debug, info, trace};

use super::address::is_pow_2;
use super::address::AddressDecoder;
use super::address::Tag;
use super::measurements::Measurements;
use super::measurements::MeasurementsSnapshot;
use super::replacement::opt::FutureTable;
use super::replacement::CacheSet;
use super::replacement::Placement;
use super::replacement::ReplacementEngine;
use super::replacement::ReplacementPolicy;
use super::AccessType;
use super::InclusionPolicy;
use super::Outcome;
use crate::error::ConfigError;

#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
pub struct Block {
    pub tag: Option<Tag>,
    pub dirty: bool,
    pub last_access: u64,
    /// Address of the access that brought the block in
    pub address: u32,
}

impl Block {
    pub fn is_empty(&self) -> bool {
        self.tag.is_none()
    }

    pub fn fill(&mut self, tag: Tag, dirty: bool, time: u64, address: u32) {
        self.tag = Some(tag);
        self.dirty = dirty;
        self.last_access = time;
        self.address = address;
    }

    pub fn reset(&mut self) {
        *self = Block::default();
    }
}

/// What one access did to a level
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Access {
    pub outcome: Outcome,
    /// Block address of a dirty victim that must go to the next level
    pub write_back: Option<u32>,
}

/// Occupied block as shown in a contents dump
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlockView {
    pub tag: Tag,
    pub dirty: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CacheConfig {
    pub size: u32,
    pub associativity: u32,
    pub block_size: u32,
    pub inclusion: InclusionPolicy,
    pub replacement: ReplacementPolicy,
}

impl Default for CacheConfig {
    /// 1KB, 2-way, 16-byte blocks
    fn default() -> Self {
        Self::make(1024, 2, 16)
    }
}

impl CacheConfig {
    pub fn make(size: u32, associativity: u32, block_size: u32) -> Self {
        Self {
            size,
            associativity,
            block_size,
            inclusion: InclusionPolicy::default(),
            replacement: ReplacementPolicy::default(),
        }
    }

    pub fn with_replacement(mut self, replacement: ReplacementPolicy) -> Self {
        self.replacement = replacement;
        self
    }

    pub fn with_inclusion(mut self, inclusion: InclusionPolicy) -> Self {
        self.inclusion = inclusion;
        self
    }

    /// Check the geometry and derive the address fields
    pub fn validate(&self) -> Result<AddressDecoder, ConfigError> {
        let decoder =
            AddressDecoder::make(self.size, self.associativity, self.block_size)?;
        // The decision tree needs a leaf per way
        if self.replacement == ReplacementPolicy::Plru
            && !is_pow_2(self.associativity)
        {
            return Err(ConfigError::NotPowerOfTwo {
                field: "PLRU associativity",
                value: self.associativity,
            });
        }
        Ok(decoder)
    }
}

/// One level of a set-associative cache
pub struct Cache {
    pub level: usize,
    pub config: CacheConfig,
    pub decoder: AddressDecoder,
    pub measurements: Measurements,

    sets: Vec<CacheSet>,
    engine: ReplacementEngine,

    /// Unset until the first access
    timestamp: Option<u64>,

    /// Block address of the last eviction under the inclusion property,
    /// waiting for the level above to drop its copy
    pending_invalidation: Option<u32>,
}

impl Cache {
    /// Make a cache level. An OPT level built this way knows nothing
    /// about the future; see `make_with_trace`.
    pub fn make(level: usize, config: CacheConfig) -> Result<Self, ConfigError> {
        Self::build(level, config, None)
    }

    /// Make a cache level, preparing the OPT oracle from the full list
    /// of trace addresses
    pub fn make_with_trace<I>(
        level: usize,
        config: CacheConfig,
        addresses: I,
    ) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = u32>,
    {
        let future = match config.replacement {
            ReplacementPolicy::Opt => {
                let decoder = config.validate()?;
                Some(FutureTable::build(&decoder, addresses))
            }
            _ => None,
        };
        Self::build(level, config, future)
    }

    fn build(
        level: usize,
        config: CacheConfig,
        future: Option<FutureTable>,
    ) -> Result<Self, ConfigError> {
        let decoder = config.validate()?;
        let engine = ReplacementEngine::make(config.replacement, future);
        let sets = (0..decoder.num_sets())
            .map(|_| engine.make_set(config.associativity as usize))
            .collect();

        info!(
            "L{}: {} sets x {} ways x {}B, {} tag / {} index / {} offset bits, {}",
            level,
            decoder.num_sets(),
            config.associativity,
            config.block_size,
            decoder.tag_bits,
            decoder.index_bits,
            decoder.offset_bits,
            engine.policy()
        );

        Ok(Self {
            level,
            config,
            decoder,
            measurements: Measurements::default(),
            sets,
            engine,
            timestamp: None,
            pending_invalidation: None,
        })
    }

    /// Perform a demand access from the level above (or the trace)
    pub fn execute(&mut self, access_type: AccessType, address: u32) -> Access {
        self.access(access_type, address, true)
    }

    /// Accept a dirty block written back by the level above.
    /// Counts as a write; the OPT oracle is not advanced since the
    /// trace never referenced this block here.
    pub fn write_back(&mut self, address: u32) -> Access {
        self.access(AccessType::Write, address, false)
    }

    fn access(
        &mut self,
        access_type: AccessType,
        address: u32,
        demand: bool,
    ) -> Access {
        let time = self.tick();
        let is_write = access_type == AccessType::Write;
        let (index, tag) = self.decoder.decompose(address);

        if demand {
            self.engine.observe(index, tag);
        }

        let set = &mut self.sets[index];
        let mut write_back = None;
        let outcome = if let Some(way) = set.find(tag) {
            set.touch(way, time);
            if is_write {
                set.block_mut(way).dirty = true;
            }
            Outcome::Hit
        } else {
            match self.engine.place(index, set) {
                Placement::Vacant(way) => {
                    set.block_mut(way).fill(tag, is_write, time, address);
                    Outcome::MissInsert
                }
                Placement::Victim(way) => {
                    let victim = *set.block(way);
                    let victim_tag = match victim.tag {
                        Some(victim_tag) => victim_tag,
                        None => panic!(
                            "L{} set {} way {} chosen as victim but empty",
                            self.level, index, way
                        ),
                    };
                    let victim_address =
                        self.decoder.get_address(index, victim_tag);
                    if victim.dirty {
                        self.measurements.record_writeback();
                        write_back = Some(victim_address);
                    }
                    if self.config.inclusion == InclusionPolicy::Inclusive {
                        self.pending_invalidation = Some(victim_address);
                    }
                    debug!(
                        "L{}: set {} evicts {} ({:#010x}){}",
                        self.level,
                        index,
                        victim_tag,
                        victim_address,
                        if victim.dirty { ", writing back" } else { "" }
                    );
                    set.block_mut(way).fill(tag, is_write, time, address);
                    Outcome::MissEvict
                }
            }
        };

        self.measurements.record(access_type, outcome);
        trace!(
            "L{}: {:?} {:#010x} set {} tag {} -> {:?}",
            self.level,
            access_type,
            address,
            index,
            tag,
            outcome
        );

        Access { outcome, write_back }
    }

    fn tick(&mut self) -> u64 {
        let time = self.timestamp.map_or(0, |time| time + 1);
        self.timestamp = Some(time);
        time
    }

    pub fn timestamp(&self) -> Option<u64> {
        self.timestamp
    }

    pub fn is_in_cache(&self, address: u32) -> bool {
        let (index, tag) = self.decoder.decompose(address);
        self.sets[index].find(tag).is_some()
    }

    /// Drop the block holding `address` without writing it back.
    /// Replacement state is left untouched. Returns the dropped block.
    pub fn invalidate(&mut self, address: u32) -> Option<Block> {
        let (index, tag) = self.decoder.decompose(address);
        let set = &mut self.sets[index];
        let way = set.find(tag)?;
        let block = set.block_mut(way);
        let dropped = *block;
        block.reset();
        Some(dropped)
    }

    /// Take the address the level above must invalidate, if any
    pub fn take_pending_invalidation(&mut self) -> Option<u32> {
        self.pending_invalidation.take()
    }

    pub fn policy(&self) -> ReplacementPolicy {
        self.engine.policy()
    }

    pub fn num_sets(&self) -> usize {
        self.sets.len()
    }

    /// Occupied blocks of every set, in container order
    /// (leaf order for PLRU)
    pub fn contents(&self) -> Vec<Vec<BlockView>> {
        self.sets
            .iter()
            .map(|set| {
                set.blocks()
                    .filter_map(|block| {
                        block.tag.map(|tag| BlockView { tag, dirty: block.dirty })
                    })
                    .collect()
            })
            .collect()
    }

    pub fn get_miss_rate(&self) -> Option<f64> {
        self.measurements.get_miss_rate()
    }

    /// Memory traffic of this level. Write-backs that the level above sent
    /// straight to memory only count under the inclusion property.
    pub fn get_memory_traffic(&self, higher_level_direct_writebacks: u64) -> u64 {
        let direct = match self.config.inclusion {
            InclusionPolicy::Inclusive => higher_level_direct_writebacks,
            InclusionPolicy::NonInclusive => 0,
        };
        self.measurements.get_memory_traffic(direct)
    }

    pub fn snapshot(
        &self,
        higher_level_direct_writebacks: u64,
    ) -> MeasurementsSnapshot {
        let m = &self.measurements;
        MeasurementsSnapshot {
            reads: m.reads,
            read_misses: m.read_misses,
            writes: m.writes,
            write_misses: m.write_misses,
            miss_rate: self.get_miss_rate(),
            writebacks: m.writebacks,
            memory_traffic: self
                .get_memory_traffic(higher_level_direct_writebacks),
        }
    }
}
