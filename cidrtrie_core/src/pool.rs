//! Node pool: a block arena that grows geometrically, plus an intrusive
//! free list threaded through released nodes.
//!
//! Block `k` holds `first_block << k` slots, so an arena index maps to its
//! block and slot with a shift and a `leading_zeros`. Blocks are never
//! reallocated once created; `Vec::push` into a block always stays within
//! the capacity reserved for it.

use crate::constants::{DEFAULT_FIRST_BLOCK, MAX_NODES};
use crate::errors::Error;
use crate::types::{Node, NodeIdx, PoolStats, NIL, ROOT};
use log::{debug, error};
use metrics::gauge;

pub struct NodePool<T> {
    blocks: Vec<Vec<Node<T>>>,
    /// log2 of the first block's slot count.
    first_shift: u32,
    /// Arena slots handed out so far (bump index).
    next_index: usize,
    /// Head of the free list, linked through `children[1]`.
    free_head: NodeIdx,
    free_len: usize,
}

impl<T> NodePool<T> {
    /// Create a pool holding only the root. `size_hint` pre-sizes the first
    /// block (rounded up to a power of two); 0 picks the default.
    pub fn with_capacity(size_hint: usize) -> Self {
        let first = if size_hint == 0 {
            DEFAULT_FIRST_BLOCK
        } else {
            size_hint.min(1 << 31).next_power_of_two()
        };
        let mut root_block = Vec::with_capacity(first);
        root_block.push(Node::empty());
        debug!("[POOL] first block of {} slots", first);
        Self {
            blocks: vec![root_block],
            first_shift: first.trailing_zeros(),
            next_index: 1,
            free_head: NIL,
            free_len: 0,
        }
    }

    #[inline(always)]
    fn block_len(&self, block: usize) -> usize {
        block_capacity(self.first_shift, block)
    }

    /// Map an arena index to `(block, slot)`.
    #[inline(always)]
    fn locate(&self, idx: usize) -> (usize, usize) {
        let q = (idx >> self.first_shift) + 1;
        let block = (usize::BITS - 1 - q.leading_zeros()) as usize;
        let start = ((1usize << block) - 1) << self.first_shift;
        (block, idx - start)
    }

    #[inline(always)]
    pub fn node(&self, idx: NodeIdx) -> &Node<T> {
        let (b, s) = self.locate(idx as usize);
        &self.blocks[b][s]
    }

    #[inline(always)]
    pub fn node_mut(&mut self, idx: NodeIdx) -> &mut Node<T> {
        let (b, s) = self.locate(idx as usize);
        &mut self.blocks[b][s]
    }

    /// Hand out a blank node, recycling from the free list first.
    pub fn acquire(&mut self) -> Result<NodeIdx, Error> {
        if self.free_head != NIL {
            let idx = self.free_head;
            let node = self.node_mut(idx);
            let next_free = node.children[1];
            *node = Node::empty();
            self.free_head = next_free;
            self.free_len -= 1;
            return Ok(idx);
        }

        if self.next_index >= MAX_NODES {
            error!("[POOL] node index space exhausted at {} nodes", self.next_index);
            return Err(Error::CapacityExceeded);
        }
        let idx = self.next_index;
        let (block, slot) = self.locate(idx);
        if block == self.blocks.len() {
            self.grow();
        }
        debug_assert_eq!(self.blocks[block].len(), slot);
        self.blocks[block].push(Node::empty());
        self.next_index += 1;
        Ok(idx as NodeIdx)
    }

    fn grow(&mut self) {
        let block = self.blocks.len();
        let len = self.block_len(block);
        debug!("[POOL] growing arena: block {} with {} slots", block, len);
        self.blocks.push(Vec::with_capacity(len));
        gauge!("cidrtrie_arena_blocks").set(self.blocks.len() as f64);
    }

    /// Return a node to the free list. The caller must already have unlinked
    /// it from the live trie. Its value, if any, is dropped here.
    pub fn release(&mut self, idx: NodeIdx) {
        debug_assert_ne!(idx, ROOT, "the root is never released");
        let free_head = self.free_head;
        let node = self.node_mut(idx);
        node.value = None;
        node.parent = NIL;
        node.children = [NIL, free_head];
        self.free_head = idx;
        self.free_len += 1;
    }

    /// Drop every node and start over with a blank root. The first block's
    /// allocation is kept.
    pub fn reset(&mut self) {
        self.blocks.truncate(1);
        let root_block = &mut self.blocks[0];
        root_block.clear();
        root_block.push(Node::empty());
        self.next_index = 1;
        self.free_head = NIL;
        self.free_len = 0;
    }

    pub fn stats(&self) -> PoolStats {
        PoolStats {
            live: self.next_index - self.free_len,
            free: self.free_len,
            reserved: (0..self.blocks.len()).map(|b| self.block_len(b)).sum(),
            blocks: self.blocks.len(),
        }
    }
}

/// Slots block `block` gets: `first << block`, cut short where the last
/// block reaches the end of the index space.
#[inline]
fn block_capacity(first_shift: u32, block: usize) -> usize {
    let start = ((1usize << block) - 1) << first_shift;
    (1usize << (first_shift as usize + block)).min(MAX_NODES - start)
}
