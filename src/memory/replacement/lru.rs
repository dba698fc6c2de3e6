//! Timestamp-based LRU

use crate::memory::cache::Block;

/// Return the way with the oldest access time.
/// Ties go to the first such way in set order.
pub fn select_victim(blocks: &[Block]) -> usize {
    assert!(!blocks.is_empty());
    let mut result = 0;
    let mut min_access = blocks[0].last_access;
    for (way, block) in blocks.iter().enumerate() {
        if block.last_access < min_access {
            min_access = block.last_access;
            result = way;
        }
    }
    result
}
