use std::collections::HashMap;

use bit_vec::BitVec;
use itertools::Itertools;

use crate::{
    chunk::ChunkKey,
    error::{FormatFault, Result},
    frequency::FrequencyMap,
    tree::{HuffmanTree, Node},
};

/// Codeword assigned to every distinct chunk of one input.
#[derive(Debug, Clone, Default)]
pub struct CodeTable(HashMap<ChunkKey, BitVec>);

impl CodeTable {
    /// Returns `None` for an empty input.
    ///
    /// A lone distinct chunk gets the one-bit codeword `0`: every occurrence
    /// still has to take up space in the payload.
    pub fn from_frequencies(frequencies: &FrequencyMap) -> Option<Self> {
        if let Some(tree) = HuffmanTree::new(frequencies) {
            return Some(Self::from_tree(&tree));
        }

        let (chunk, _) = frequencies.iter().next()?;
        let mut codes = HashMap::with_capacity(1);
        codes.insert(chunk.clone(), BitVec::from_elem(1, false));
        Some(Self(codes))
    }

    pub fn from_tree(tree: &HuffmanTree) -> Self {
        let mut codes = HashMap::new();
        let mut code = BitVec::new();
        generate_codes_inner(tree.root(), &mut code, &mut codes);
        Self(codes)
    }

    pub fn get(&self, chunk: &[u8]) -> Option<&BitVec> {
        self.0.get(chunk)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Entries in ascending chunk order, the order the dictionary is stored in.
    pub fn entries(&self) -> impl Iterator<Item = (&ChunkKey, &BitVec)> {
        self.0.iter().sorted_by(|(a, _), (b, _)| a.cmp(b))
    }
}

fn generate_codes_inner(
    node: &Node,
    current_code: &mut BitVec,
    result: &mut HashMap<ChunkKey, BitVec>,
) {
    match node {
        Node::Leaf { chunk, .. } => {
            result.insert(chunk.clone(), current_code.clone());
        }
        Node::Internal { left, right, .. } => {
            current_code.push(false);
            generate_codes_inner(left, current_code, result);
            current_code.pop();

            current_code.push(true);
            generate_codes_inner(right, current_code, result);
            current_code.pop();
        }
    }
}

/// Inverse of a [`CodeTable`], rebuilt from a stored dictionary.
#[derive(Debug, Default)]
pub struct DecodeTable {
    chunks: HashMap<BitVec, ChunkKey>,
    prefixes: CodeTrie,
    max_code_len: usize,
    max_chunk_len: usize,
}

impl DecodeTable {
    /// `entry` is the dictionary position, used in error reports.
    pub fn insert(&mut self, entry: usize, code: BitVec, chunk: ChunkKey) -> Result<()> {
        if chunk.is_empty() {
            return Err(FormatFault::EmptyChunk { entry }.into());
        }
        if code.is_empty() {
            return Err(FormatFault::EmptyCodeword { entry }.into());
        }
        if self.chunks.contains_key(&code) {
            return Err(FormatFault::DuplicateCodeword {
                entry,
                codeword: bit_string(&code),
            }
            .into());
        }
        if !self.prefixes.insert(&code) {
            return Err(FormatFault::PrefixCollision {
                entry,
                codeword: bit_string(&code),
            }
            .into());
        }

        self.max_code_len = self.max_code_len.max(code.len());
        self.max_chunk_len = self.max_chunk_len.max(chunk.len());
        self.chunks.insert(code, chunk);
        Ok(())
    }

    pub fn get(&self, code: &BitVec) -> Option<&ChunkKey> {
        self.chunks.get(code)
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Length of the longest codeword; a candidate longer than this can never match.
    pub fn max_code_len(&self) -> usize {
        self.max_code_len
    }

    /// Length of the longest stored chunk, i.e. the chunk size used for compression.
    pub fn max_chunk_len(&self) -> usize {
        self.max_chunk_len
    }
}

/// Binary trie of the codewords seen so far. A codeword is accepted only if
/// it neither passes through nor ends above a stored one.
#[derive(Debug, Default)]
struct CodeTrie {
    nodes: Vec<TrieNode>,
}

#[derive(Debug, Default, Clone, Copy)]
struct TrieNode {
    children: [Option<usize>; 2],
    terminal: bool,
}

impl CodeTrie {
    fn insert(&mut self, code: &BitVec) -> bool {
        if self.nodes.is_empty() {
            self.nodes.push(TrieNode::default());
        }

        let mut at = 0;
        for bit in code.iter() {
            if self.nodes[at].terminal {
                return false;
            }
            let branch = usize::from(bit);
            let existing = self.nodes[at].children[branch];
            at = match existing {
                Some(next) => next,
                None => {
                    self.nodes.push(TrieNode::default());
                    let next = self.nodes.len() - 1;
                    self.nodes[at].children[branch] = Some(next);
                    next
                }
            };
        }

        let node = &mut self.nodes[at];
        if node.terminal || node.children.iter().any(Option::is_some) {
            return false;
        }
        node.terminal = true;
        true
    }
}

pub fn bit_string(code: &BitVec) -> String {
    code.iter().map(|bit| if bit { '1' } else { '0' }).collect()
}
