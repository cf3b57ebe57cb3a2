use std::{
    cmp::{Ordering, Reverse},
    collections::BinaryHeap,
};

use itertools::Itertools;

use crate::{chunk::ChunkKey, frequency::FrequencyMap};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Leaf {
        chunk: ChunkKey,
        weight: u64,
    },
    Internal {
        weight: u64,
        left: Box<Node>,
        right: Box<Node>,
    },
}

impl Node {
    pub fn weight(&self) -> u64 {
        match self {
            Node::Leaf { weight, .. } | Node::Internal { weight, .. } => *weight,
        }
    }

    fn merge(left: Node, right: Node) -> Node {
        Node::Internal {
            weight: left.weight() + right.weight(),
            left: Box::new(left),
            right: Box::new(right),
        }
    }
}

/// A Huffman tree over at least two distinct chunks.
#[derive(Debug, Clone)]
pub struct HuffmanTree {
    root: Node,
}

impl HuffmanTree {
    /// Builds the tree, or returns `None` when there are fewer than two
    /// distinct chunks and so nothing to merge.
    ///
    /// Ties are broken by age: leaves are numbered in ascending order of their
    /// chunk bytes, each merged node takes the next number, and among equal
    /// weights the lowest number is taken first. The first node taken at each
    /// step becomes the left child.
    pub fn new(frequencies: &FrequencyMap) -> Option<Self> {
        if frequencies.distinct() < 2 {
            return None;
        }

        let leaves = frequencies
            .iter()
            .sorted_by(|(a, _), (b, _)| a.cmp(b))
            .map(|(chunk, weight)| Node::Leaf {
                chunk: chunk.clone(),
                weight,
            });

        Trees::from_iter(leaves).merge().map(|root| Self { root })
    }

    pub fn root(&self) -> &Node {
        &self.root
    }

    pub fn weight(&self) -> u64 {
        self.root.weight()
    }
}

#[derive(Debug)]
struct Ranked {
    order: usize,
    node: Node,
}

impl Ord for Ranked {
    fn cmp(&self, other: &Self) -> Ordering {
        self.node
            .weight()
            .cmp(&other.node.weight())
            .then_with(|| self.order.cmp(&other.order))
    }
}

impl PartialOrd for Ranked {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Ranked {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Ranked {}

/// Min-priority queue of partial trees.
struct Trees {
    heap: BinaryHeap<Reverse<Ranked>>,
    next_order: usize,
}

impl FromIterator<Node> for Trees {
    fn from_iter<T: IntoIterator<Item = Node>>(iter: T) -> Self {
        let mut trees = Trees {
            heap: BinaryHeap::new(),
            next_order: 0,
        };
        iter.into_iter().for_each(|node| trees.insert(node));
        trees
    }
}

impl Trees {
    fn merge(mut self) -> Option<Node> {
        loop {
            match self.pop_lowest()? {
                PopResult::TreesToMerge { left, right } => self.insert(Node::merge(left, right)),
                PopResult::Single(root) => return Some(root),
            }
        }
    }

    fn pop_lowest(&mut self) -> Option<PopResult> {
        let Reverse(left) = self.heap.pop()?;

        let result = match self.heap.pop() {
            Some(Reverse(right)) => PopResult::TreesToMerge {
                left: left.node,
                right: right.node,
            },
            None => PopResult::Single(left.node),
        };

        Some(result)
    }

    fn insert(&mut self, node: Node) {
        let order = self.next_order;
        self.next_order += 1;
        self.heap.push(Reverse(Ranked { order, node }));
    }
}

enum PopResult {
    TreesToMerge { left: Node, right: Node },
    Single(Node),
}
