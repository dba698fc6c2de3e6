//! Replacement policies
//!
//! A cache level is parameterized by one `ReplacementEngine`, chosen when
//! the level is built. LRU and OPT store each set as a plain row of ways;
//! PLRU stores each set as a decision tree.

pub mod lru;
pub mod opt;
pub mod plru;

use std::fmt;
use std::str::FromStr;

use super::address::Tag;
use super::cache::Block;
use opt::FutureTable;
use plru::PlruTree;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ReplacementPolicy {
    #[default]
    Lru,
    Plru,
    Opt,
}

impl FromStr for ReplacementPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "0" | "LRU" => Ok(ReplacementPolicy::Lru),
            "1" | "PLRU" | "PSEUDO-LRU" => Ok(ReplacementPolicy::Plru),
            "2" | "OPT" | "OPTIMAL" => Ok(ReplacementPolicy::Opt),
            _ => Err(format!(
                "Invalid replacement policy: '{}'. Expected 0 (LRU), 1 (PLRU) or 2 (OPT).",
                s
            )),
        }
    }
}

impl fmt::Display for ReplacementPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ReplacementPolicy::Lru => "LRU",
            ReplacementPolicy::Plru => "Pseudo-LRU",
            ReplacementPolicy::Opt => "optimal",
        };
        f.write_str(name)
    }
}

/// Storage of one set
#[derive(Clone, Debug)]
pub enum CacheSet {
    Ways(Vec<Block>),
    Tree(PlruTree),
}

impl CacheSet {
    /// Blocks in container order (leaf order for trees)
    pub fn blocks(&self) -> Box<dyn Iterator<Item = &Block> + '_> {
        match self {
            CacheSet::Ways(blocks) => Box::new(blocks.iter()),
            CacheSet::Tree(tree) => Box::new(tree.blocks()),
        }
    }

    pub fn find(&self, tag: Tag) -> Option<usize> {
        match self {
            CacheSet::Ways(blocks) => {
                blocks.iter().position(|block| block.tag == Some(tag))
            }
            CacheSet::Tree(tree) => tree.find(tag),
        }
    }

    pub fn block(&self, way: usize) -> &Block {
        match self {
            CacheSet::Ways(blocks) => &blocks[way],
            CacheSet::Tree(tree) => tree.block(way),
        }
    }

    pub fn block_mut(&mut self, way: usize) -> &mut Block {
        match self {
            CacheSet::Ways(blocks) => &mut blocks[way],
            CacheSet::Tree(tree) => tree.block_mut(way),
        }
    }

    /// Refresh recency of a resident block.
    /// Trees update their bits and leave the stored time alone.
    pub fn touch(&mut self, way: usize, time: u64) {
        match self {
            CacheSet::Ways(blocks) => blocks[way].last_access = time,
            CacheSet::Tree(tree) => tree.touch(way),
        }
    }
}

/// Where a missing block goes
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Placement {
    /// An empty way
    Vacant(usize),
    /// An occupied way whose block must be evicted first
    Victim(usize),
}

#[derive(Clone, Debug)]
pub enum ReplacementEngine {
    Lru,
    Plru,
    Opt(FutureTable),
}

impl ReplacementEngine {
    /// OPT without a future table treats every block as never reused
    pub fn make(policy: ReplacementPolicy, future: Option<FutureTable>) -> Self {
        match policy {
            ReplacementPolicy::Lru => ReplacementEngine::Lru,
            ReplacementPolicy::Plru => ReplacementEngine::Plru,
            ReplacementPolicy::Opt => {
                ReplacementEngine::Opt(future.unwrap_or_default())
            }
        }
    }

    pub fn policy(&self) -> ReplacementPolicy {
        match self {
            ReplacementEngine::Lru => ReplacementPolicy::Lru,
            ReplacementEngine::Plru => ReplacementPolicy::Plru,
            ReplacementEngine::Opt(_) => ReplacementPolicy::Opt,
        }
    }

    pub fn make_set(&self, associativity: usize) -> CacheSet {
        match self {
            ReplacementEngine::Plru => {
                CacheSet::Tree(PlruTree::make(associativity))
            }
            _ => CacheSet::Ways(vec![Block::default(); associativity]),
        }
    }

    /// Let the engine know `tag` is being referenced in set `index`
    pub fn observe(&mut self, index: usize, tag: Tag) {
        if let ReplacementEngine::Opt(table) = self {
            table.consume(index, tag);
        }
    }

    /// Choose the way that receives a missing block
    pub fn place(&mut self, index: usize, set: &mut CacheSet) -> Placement {
        match set {
            CacheSet::Ways(blocks) => {
                if let Some(way) = blocks.iter().position(Block::is_empty) {
                    return Placement::Vacant(way);
                }
                Placement::Victim(match self {
                    ReplacementEngine::Lru => lru::select_victim(blocks),
                    ReplacementEngine::Opt(table) => {
                        opt::select_victim(table, index, blocks)
                    }
                    ReplacementEngine::Plru => {
                        panic!("PLRU engine handed a set without a tree")
                    }
                })
            }
            CacheSet::Tree(tree) => {
                if tree.occupied() < tree.associativity() {
                    Placement::Vacant(tree.vacancy())
                } else {
                    Placement::Victim(tree.victim())
                }
            }
        }
    }
}
