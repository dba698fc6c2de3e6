//! Belady's optimal replacement
//!
//! The oracle needs to know, for every set, which tags are going to be
//! referenced next. That knowledge is collected once from the whole trace
//! before the simulation starts and consumed as the accesses happen.

use std::collections::HashMap;
use std::collections::VecDeque;

use crate::memory::address::AddressDecoder;
use crate::memory::address::Tag;
use crate::memory::cache::Block;

/// Upcoming tags per set index, in trace order
#[derive(Clone, Debug, Default)]
pub struct FutureTable {
    upcoming: HashMap<usize, VecDeque<Tag>>,
}

impl FutureTable {
    pub fn build<I>(decoder: &AddressDecoder, addresses: I) -> Self
    where
        I: IntoIterator<Item = u32>,
    {
        let mut upcoming: HashMap<usize, VecDeque<Tag>> = HashMap::new();
        for address in addresses {
            let (index, tag) = decoder.decompose(address);
            upcoming.entry(index).or_default().push_back(tag);
        }
        Self { upcoming }
    }

    /// Remaining references to set `index`, current one first
    pub fn upcoming(&self, index: usize) -> Option<&VecDeque<Tag>> {
        self.upcoming.get(&index)
    }

    /// Record that `tag` has just been referenced in set `index`.
    ///
    /// Everything up to and including its first remaining occurrence is
    /// dropped. When every access of the trace reaches this level the
    /// current tag is always at the front, so exactly one entry goes.
    /// A level that only sees part of the trace skips the references
    /// that were served above it.
    pub fn consume(&mut self, index: usize, tag: Tag) {
        if let Some(queue) = self.upcoming.get_mut(&index) {
            if let Some(position) = queue.iter().position(|t| *t == tag) {
                queue.drain(..=position);
            }
        }
    }

    /// Distance to the next reference of `tag` in set `index`,
    /// `None` if it is never referenced again
    pub fn next_use(&self, index: usize, tag: Tag) -> Option<usize> {
        self.upcoming(index)?.iter().position(|t| *t == tag)
    }
}

/// Pick the way whose next reference lies farthest ahead.
///
/// A block that is never referenced again counts as infinitely far.
/// Ties go to the first way in set order, and with no known future for
/// the set at all way 0 is evicted.
pub fn select_victim(
    table: &FutureTable,
    index: usize,
    blocks: &[Block],
) -> usize {
    let mut victim = 0;
    let mut farthest = 0;
    for (way, block) in blocks.iter().enumerate() {
        let Some(tag) = block.tag else {
            panic!("OPT eviction from a set with an empty way {}", way);
        };
        let distance = table.next_use(index, tag).unwrap_or(usize::MAX);
        if way == 0 || distance > farthest {
            victim = way;
            farthest = distance;
        }
    }
    victim
}
