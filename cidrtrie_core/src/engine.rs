//! Uncompressed binary trie over fixed-width keys.
//!
//! One algorithm serves both address widths: the trie is generic over its
//! [`AddressBits`] key type and every operation takes a key of that type
//! plus a left-justified mask. Walks start at the root and take one step per
//! one-bit of the mask, most significant bit first, so every call costs at
//! most 32 or 128 steps regardless of how many prefixes are stored.

use crate::bits::AddressBits;
use crate::errors::Error;
use crate::helpers::canonical;
use crate::pool::NodePool;
use crate::types::{Match, NodeIdx, PoolStats, NIL, ROOT};
use log::debug;
#[cfg(feature = "trace")]
use log::trace;
use metrics::{counter, gauge};
use std::marker::PhantomData;

/// Binary trie keyed by `K` (`u32` for IPv4, `u128` for IPv6).
///
/// ```
/// use cidrtrie_core::{AddressBits, BitTrie};
///
/// let mut t: BitTrie<u32, &str> = BitTrie::default();
/// t.insert(0x0a00_0000, u32::mask(8), "ten", false).unwrap();
/// assert_eq!(t.find(0x0a01_0203, u32::MAX), Some(&"ten"));
/// ```
///
/// The key width is fixed by the type:
///
/// ```compile_fail
/// use cidrtrie_core::BitTrie;
///
/// let mut t: BitTrie<u32, ()> = BitTrie::default();
/// t.insert(1u128, u128::MAX, (), false).unwrap();
/// ```
pub struct BitTrie<K, T> {
    pool: NodePool<T>,
    values: usize,
    _key: PhantomData<K>,
}

impl<K: AddressBits, T> Default for BitTrie<K, T> {
    fn default() -> Self {
        Self::with_capacity(0)
    }
}

impl<K: AddressBits, T> BitTrie<K, T> {
    pub fn with_capacity(size_hint: usize) -> Self {
        Self {
            pool: NodePool::with_capacity(size_hint),
            values: 0,
            _key: PhantomData,
        }
    }

    /// Number of stored values.
    pub fn len(&self) -> usize {
        self.values
    }

    pub fn is_empty(&self) -> bool {
        self.values == 0
    }

    pub fn pool_stats(&self) -> PoolStats {
        self.pool.stats()
    }

    /// Emit pool gauges (caller decides cadence).
    pub fn report_pool_metrics(&self) {
        let stats = self.pool.stats();
        gauge!("cidrtrie_live_nodes").set(stats.live as f64);
        gauge!("cidrtrie_free_nodes").set(stats.free as f64);
        gauge!("cidrtrie_arena_blocks").set(stats.blocks as f64);
    }

    pub fn clear(&mut self) {
        self.pool.reset();
        self.values = 0;
    }

    /// Store `value` at the prefix `(addr, mask)`, creating junction nodes as
    /// needed. Returns the value it replaced.
    ///
    /// Without `overwrite`, an occupied prefix fails with [`Error::NodeBusy`]
    /// and keeps its value.
    pub fn insert(
        &mut self,
        addr: K,
        mask: K,
        value: T,
        overwrite: bool,
    ) -> Result<Option<T>, Error> {
        counter!("cidrtrie_inserts_total").increment(1);
        let plen = mask.prefix_len();
        debug!(
            "[INSERT] key={:x}/{} overwrite={}",
            canonical(addr, plen),
            plen,
            overwrite
        );

        let mut n = ROOT;
        for depth in 0..plen {
            let bit = addr.bit(depth);
            let next = self.pool.node(n).child(bit);
            n = if next != NIL {
                next
            } else {
                let child = self.pool.acquire()?;
                self.pool.node_mut(child).parent = n;
                self.pool.node_mut(n).set_child(bit, child);
                #[cfg(feature = "trace")]
                trace!("[INSERT] depth={} new node {} under {}", depth, child, n);
                child
            };
        }

        let target = self.pool.node_mut(n);
        if target.value.is_some() && !overwrite {
            counter!("cidrtrie_node_busy_total").increment(1);
            debug!("[INSERT] node {} already holds a value", n);
            return Err(Error::NodeBusy);
        }
        let prev = target.value.replace(value);
        if prev.is_none() {
            self.values += 1;
        }
        Ok(prev)
    }

    /// Partial (`whole_range == false`) or whole-range delete.
    pub fn delete(
        &mut self,
        addr: K,
        mask: K,
        whole_range: bool,
    ) -> Result<(), Error> {
        if whole_range {
            self.remove_range(addr, mask).map(|_| ())
        } else {
            self.remove(addr, mask).map(|_| ())
        }
    }

    /// Remove the value stored exactly at `(addr, mask)`.
    ///
    /// A node that still leads to more specific prefixes only loses its
    /// value. A leaf is unlinked and released together with every ancestor
    /// that is left with neither a value nor a child.
    pub fn remove(&mut self, addr: K, mask: K) -> Result<T, Error> {
        counter!("cidrtrie_deletes_total").increment(1);
        let plen = mask.prefix_len();
        debug!("[DELETE] key={:x}/{}", canonical(addr, plen), plen);

        let n = self.locate(addr, mask).ok_or_else(not_found)?;
        let node = self.pool.node_mut(n);
        let value = node.value.take().ok_or_else(not_found)?;
        self.values -= 1;
        if n != ROOT && !node.has_children() {
            self.prune_upward(n);
        }
        Ok(value)
    }

    /// Remove the prefix `(addr, mask)` and everything nested inside it.
    /// Returns how many values were dropped. Every node of the cut subtree
    /// goes back to the pool.
    pub fn remove_range(&mut self, addr: K, mask: K) -> Result<usize, Error> {
        counter!("cidrtrie_deletes_total").increment(1);
        let plen = mask.prefix_len();
        debug!("[DELETE] whole range key={:x}/{}", canonical(addr, plen), plen);

        let n = self.locate(addr, mask).ok_or_else(not_found)?;
        if n == ROOT {
            if !self.pool.node(ROOT).is_valuable() {
                return Err(not_found());
            }
            let removed = self.values;
            self.clear();
            debug!("[DELETE] cleared whole tree ({} values)", removed);
            return Ok(removed);
        }

        let parent = self.pool.node(n).parent;
        self.detach(n);
        let removed = self.release_subtree(n);
        self.values -= removed;
        if parent != ROOT && !self.pool.node(parent).is_valuable() {
            self.prune_upward(parent);
        }
        debug!("[DELETE] cut subtree at node {} ({} values)", n, removed);
        Ok(removed)
    }

    /// Longest-prefix match of `(addr, mask)`.
    ///
    /// The walk never goes deeper than the query's own prefix length, so a
    /// broad query is answered by its closest covering entry, not by entries
    /// nested inside it.
    pub fn find(&self, addr: K, mask: K) -> Option<&T> {
        self.find_match(addr, mask).map(|m| m.value)
    }

    pub fn find_match(&self, addr: K, mask: K) -> Option<Match<'_, T>> {
        counter!("cidrtrie_lookups_total").increment(1);
        let plen = mask.prefix_len();
        let mut node = self.pool.node(ROOT);
        let mut best = node.value.as_ref().map(|value| Match {
            prefix_len: 0,
            value,
        });
        for depth in 0..plen {
            let next = node.child(addr.bit(depth));
            if next == NIL {
                break;
            }
            node = self.pool.node(next);
            if let Some(value) = node.value.as_ref() {
                best = Some(Match {
                    prefix_len: depth + 1,
                    value,
                });
            }
        }
        best
    }

    /// Value stored exactly at `(addr, mask)`, without falling back to a
    /// covering prefix.
    pub fn find_exact(&self, addr: K, mask: K) -> Option<&T> {
        self.locate(addr, mask)
            .and_then(|n| self.pool.node(n).value.as_ref())
    }

    /// Follow `(addr, mask)` without creating anything.
    fn locate(&self, addr: K, mask: K) -> Option<NodeIdx> {
        let mut n = ROOT;
        for depth in 0..mask.prefix_len() {
            n = self.pool.node(n).child(addr.bit(depth));
            if n == NIL {
                return None;
            }
        }
        Some(n)
    }

    /// Clear the parent's link to `n`.
    fn detach(&mut self, n: NodeIdx) {
        let parent = self.pool.node(n).parent;
        let p = self.pool.node_mut(parent);
        if p.children[0] == n {
            p.children[0] = NIL;
        } else {
            debug_assert_eq!(p.children[1], n);
            p.children[1] = NIL;
        }
    }

    /// Unlink and release `n`, then keep climbing while the parent is left
    /// with neither a value nor a child. Stops at the root.
    fn prune_upward(&mut self, mut n: NodeIdx) {
        loop {
            let parent = self.pool.node(n).parent;
            self.detach(n);
            self.pool.release(n);
            #[cfg(feature = "trace")]
            trace!("[DELETE] released node {}", n);
            if parent == ROOT || self.pool.node(parent).is_valuable() {
                return;
            }
            n = parent;
        }
    }

    /// Release an already detached subtree, post-order, steering by the
    /// parent links so no stack is needed. Returns the values dropped.
    fn release_subtree(&mut self, top: NodeIdx) -> usize {
        let mut removed = 0;
        let mut cur = top;
        loop {
            loop {
                let node = self.pool.node(cur);
                let next = if node.children[0] != NIL {
                    node.children[0]
                } else {
                    node.children[1]
                };
                if next == NIL {
                    break;
                }
                cur = next;
            }
            let node = self.pool.node(cur);
            let parent = node.parent;
            if node.value.is_some() {
                removed += 1;
            }
            if cur == top {
                self.pool.release(cur);
                return removed;
            }
            self.detach(cur);
            self.pool.release(cur);
            cur = parent;
        }
    }
}

#[inline]
fn not_found() -> Error {
    counter!("cidrtrie_not_found_total").increment(1);
    Error::NotFound
}
