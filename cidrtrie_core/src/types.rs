//! Data structures for the CIDR trie

use std::fmt;

/// Arena index of a trie node.
///
/// Index 0 is always the root. The root is never anyone's child, so 0 also
/// serves as the "no link" value in child slots and the free list.
pub type NodeIdx = u32;

pub const ROOT: NodeIdx = 0;
pub const NIL: NodeIdx = 0;

/// One binary-trie node. Slot 0 follows a 0 bit, slot 1 a 1 bit.
#[derive(Debug, Clone)]
pub struct Node<T> {
    pub children: [NodeIdx; 2],
    /// Back-link for pruning; never an ownership edge.
    pub parent: NodeIdx,
    pub value: Option<T>,
}

impl<T> Node<T> {
    pub const fn empty() -> Self {
        Self {
            children: [NIL, NIL],
            parent: NIL,
            value: None,
        }
    }

    #[inline(always)]
    pub fn child(&self, bit: bool) -> NodeIdx {
        self.children[bit as usize]
    }

    #[inline(always)]
    pub fn set_child(&mut self, bit: bool, idx: NodeIdx) {
        self.children[bit as usize] = idx;
    }

    #[inline]
    pub fn has_children(&self) -> bool {
        self.children != [NIL, NIL]
    }

    /// A non-root node failing this is garbage and gets reclaimed.
    #[inline]
    pub fn is_valuable(&self) -> bool {
        self.value.is_some() || self.has_children()
    }
}

/// Address family a [`crate::CidrTree`] is built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Family {
    V4,
    V6,
}

impl Family {
    pub fn from_ipv6_flag(ipv6: bool) -> Self {
        if ipv6 {
            Family::V6
        } else {
            Family::V4
        }
    }

    /// Key width in bits.
    pub fn bits(self) -> u8 {
        match self {
            Family::V4 => crate::constants::V4_BITS,
            Family::V6 => crate::constants::V6_BITS,
        }
    }
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Family::V4 => f.write_str("ipv4"),
            Family::V6 => f.write_str("ipv6"),
        }
    }
}

/// A parsed `(address, mask)` pair, sized for its family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    V4 { addr: u32, mask: u32 },
    V6 { addr: u128, mask: u128 },
}

/// Node-pool occupancy snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PoolStats {
    /// Nodes in the live trie, root included.
    pub live: usize,
    /// Released nodes waiting on the free list.
    pub free: usize,
    /// Slots reserved across all arena blocks.
    pub reserved: usize,
    pub blocks: usize,
}

/// Longest-prefix match result.
#[derive(Debug, PartialEq, Eq)]
pub struct Match<'a, T> {
    /// Prefix length of the stored entry that matched, in the tree's
    /// own key width (IPv4 entries in an IPv6 tree report +96).
    pub prefix_len: u8,
    pub value: &'a T,
}
