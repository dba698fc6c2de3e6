//! Tree-based pseudo-LRU
//!
//! Every set owns a complete binary tree with one leaf per way. Each
//! internal node stores which of its two subtrees holds the next victim.
//! Touching a leaf points every node on its root path away from it, so the
//! next descent lands somewhere else.
//!
//! Nodes live in an arena and refer to each other by index; leaf `w` of an
//! `n`-way set is node `n - 1 + w`.

use crate::memory::address::get_log_2;
use crate::memory::address::is_pow_2;
use crate::memory::address::Tag;
use crate::memory::cache::Block;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

impl Side {
    fn opposite(self) -> Self {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }
}

#[derive(Clone, Debug)]
enum NodeKind {
    /// `victim` points at the subtree holding the next victim
    Internal { victim: Side, left: usize, right: usize },
    Leaf { block: Block },
}

#[derive(Clone, Debug)]
struct Node {
    parent: Option<usize>,
    kind: NodeKind,
}

/// One set under the pseudo-LRU policy
#[derive(Clone, Debug)]
pub struct PlruTree {
    nodes: Vec<Node>,
    /// Arena ids of the leaves, left to right
    leaves: Vec<usize>,
}

impl PlruTree {
    pub fn make(associativity: usize) -> Self {
        assert!(is_pow_2(associativity as u32));

        let internal = associativity - 1;
        let mut nodes = Vec::with_capacity(2 * associativity - 1);
        for id in 0..2 * associativity - 1 {
            let parent = if id == 0 { None } else { Some((id - 1) / 2) };
            let kind = if id < internal {
                NodeKind::Internal {
                    victim: Side::Left,
                    left: 2 * id + 1,
                    right: 2 * id + 2,
                }
            } else {
                NodeKind::Leaf { block: Block::default() }
            };
            nodes.push(Node { parent, kind });
        }

        Self { nodes, leaves: (internal..2 * associativity - 1).collect() }
    }

    pub fn associativity(&self) -> usize {
        self.leaves.len()
    }

    pub fn depth(&self) -> usize {
        get_log_2(self.leaves.len() as u32) as usize
    }

    pub fn block(&self, way: usize) -> &Block {
        match &self.nodes[self.leaves[way]].kind {
            NodeKind::Leaf { block } => block,
            NodeKind::Internal { .. } => {
                panic!("PLRU leaf table points at an internal node")
            }
        }
    }

    pub fn block_mut(&mut self, way: usize) -> &mut Block {
        match &mut self.nodes[self.leaves[way]].kind {
            NodeKind::Leaf { block } => block,
            NodeKind::Internal { .. } => {
                panic!("PLRU leaf table points at an internal node")
            }
        }
    }

    /// Blocks in leaf order, left to right
    pub fn blocks(&self) -> impl Iterator<Item = &Block> + '_ {
        (0..self.leaves.len()).map(move |way| self.block(way))
    }

    pub fn find(&self, tag: Tag) -> Option<usize> {
        self.blocks().position(|block| block.tag == Some(tag))
    }

    pub fn occupied(&self) -> usize {
        self.blocks().filter(|block| !block.is_empty()).count()
    }

    /// Root-to-leaf path of `way` as (internal node, side taken) pairs,
    /// rebuilt from the parent links
    pub fn path(&self, way: usize) -> Vec<(usize, Side)> {
        let mut path = Vec::with_capacity(self.depth());
        let mut child = self.leaves[way];
        while let Some(parent) = self.nodes[child].parent {
            let side = match self.nodes[parent].kind {
                NodeKind::Internal { left, .. } if left == child => Side::Left,
                NodeKind::Internal { right, .. } if right == child => {
                    Side::Right
                }
                _ => panic!("PLRU node {} is not a child of {}", child, parent),
            };
            path.push((parent, side));
            child = parent;
        }
        path.reverse();
        path
    }

    /// Mark `way` as most recently used
    pub fn touch(&mut self, way: usize) {
        for (id, side) in self.path(way) {
            if let NodeKind::Internal { victim, .. } = &mut self.nodes[id].kind
            {
                *victim = side.opposite();
            }
        }
    }

    /// Follow the victim bits down to a leaf, flipping each one
    pub fn victim(&mut self) -> usize {
        let way = self.descend(|_, _| true);
        self.touch(way);
        way
    }

    /// Like `victim`, but never walks into a subtree without a free leaf.
    /// Only valid while the set still has an empty way.
    pub fn vacancy(&mut self) -> usize {
        assert!(self.occupied() < self.associativity());
        let way = self.descend(|tree, id| tree.has_vacancy(id));
        self.touch(way);
        assert!(self.block(way).is_empty());
        way
    }

    /// Walk from the root, taking the victim side unless `accept`
    /// rejects it
    fn descend<F>(&self, accept: F) -> usize
    where
        F: Fn(&Self, usize) -> bool,
    {
        let mut id = 0;
        while let NodeKind::Internal { victim, left, right } =
            self.nodes[id].kind
        {
            let (preferred, other) = match victim {
                Side::Left => (left, right),
                Side::Right => (right, left),
            };
            id = if accept(self, preferred) { preferred } else { other };
        }
        self.way_of(id)
    }

    fn has_vacancy(&self, id: usize) -> bool {
        match &self.nodes[id].kind {
            NodeKind::Leaf { block } => block.is_empty(),
            NodeKind::Internal { left, right, .. } => {
                self.has_vacancy(*left) || self.has_vacancy(*right)
            }
        }
    }

    fn way_of(&self, id: usize) -> usize {
        id - (self.leaves.len() - 1)
    }

    /// Bits of the internal nodes in arena order, `true` meaning right
    pub fn bits(&self) -> Vec<bool> {
        self.nodes
            .iter()
            .filter_map(|node| match node.kind {
                NodeKind::Internal { victim, .. } => Some(victim == Side::Right),
                NodeKind::Leaf { .. } => None,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fill(tree: &mut PlruTree, way: usize, tag: u32) {
        let block = tree.block_mut(way);
        block.tag = Some(Tag::new(tag, 24));
    }

    #[test]
    fn test_shape() {
        let tree = PlruTree::make(8);
        assert_eq!(tree.associativity(), 8);
        assert_eq!(tree.depth(), 3);
        assert_eq!(tree.bits().len(), 7);
        for way in 0..8 {
            assert_eq!(tree.path(way).len(), 3);
        }
        assert_eq!(
            tree.path(5),
            vec![(0, Side::Right), (2, Side::Left), (5, Side::Right)]
        );
    }

    #[test]
    fn test_direct_mapped_tree() {
        let mut tree = PlruTree::make(1);
        assert_eq!(tree.depth(), 0);
        assert!(tree.path(0).is_empty());
        assert_eq!(tree.victim(), 0);
        assert_eq!(tree.vacancy(), 0);
    }

    #[test]
    fn test_victim_order_from_reset() {
        // Repeated victim descents sweep all leaves before repeating
        let mut tree = PlruTree::make(4);
        let order: Vec<_> = (0..4).map(|_| tree.victim()).collect();
        assert_eq!(order, vec![0, 2, 1, 3]);
        assert_eq!(tree.victim(), 0);
    }

    #[test]
    fn test_touch_points_away() {
        let mut tree = PlruTree::make(4);
        tree.touch(0);
        assert_eq!(tree.bits(), vec![true, true, false]);
        tree.touch(3);
        assert_eq!(tree.bits(), vec![false, true, false]);
        // Last touched leaf is never the next victim
        assert_ne!(tree.victim(), 3);
    }

    #[test]
    fn test_vacancy_skips_full_subtree() {
        let mut tree = PlruTree::make(4);
        for (way, tag) in [(0, 0xa), (1, 0xb), (2, 0xc)] {
            fill(&mut tree, way, tag);
        }
        // Bits all point left, but only leaf 3 is free
        assert_eq!(tree.vacancy(), 3);
        fill(&mut tree, 3, 0xd);
        assert_eq!(tree.occupied(), 4);
        assert_eq!(tree.find(Tag::new(0xc, 24)), Some(2));
        assert_eq!(tree.find(Tag::new(0xe, 24)), None);
    }
}
