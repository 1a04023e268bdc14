//! Address-family façade over [`BitTrie`].
//!
//! A `CidrTree` is built for one family and keeps it for life. IPv4 trees
//! take 32-bit keys; IPv6 trees take 128-bit keys and also accept IPv4
//! input, embedded as IPv4-mapped addresses.

use crate::engine::BitTrie;
use crate::errors::Error;
use crate::parse::{addr_key, net_key, parse_cidr};
use crate::types::{Family, Key, Match, PoolStats};
use ipnet::IpNet;
use log::info;
use std::net::IpAddr;

/// One engine per family; the key width is part of the type.
enum Trie<T> {
    V4(BitTrie<u32, T>),
    V6(BitTrie<u128, T>),
}

/// Run `$body` with `$t` bound to whichever engine the tree holds.
macro_rules! on_trie {
    ($trie:expr, |$t:ident| $body:expr) => {
        match $trie {
            Trie::V4($t) => $body,
            Trie::V6($t) => $body,
        }
    };
}

/// Run `$body` with the engine and `$addr`/`$mask` at its native width.
/// A key of the other width is rejected with [`Error::BadAddress`].
macro_rules! with_key {
    ($trie:expr, $key:expr, |$t:ident, $addr:ident, $mask:ident| $body:expr) => {
        match ($trie, $key) {
            (
                Trie::V4($t),
                Key::V4 {
                    addr: $addr,
                    mask: $mask,
                },
            ) => $body,
            (
                Trie::V6($t),
                Key::V6 {
                    addr: $addr,
                    mask: $mask,
                },
            ) => $body,
            _ => return Err(Error::BadAddress),
        }
    };
}

/// Longest-prefix-match table from CIDR ranges to values.
pub struct CidrTree<T> {
    trie: Trie<T>,
    family: Family,
}

impl<T> CidrTree<T> {
    pub fn new(family: Family) -> Self {
        Self::with_capacity(family, 0)
    }

    /// `prealloc` sizes the first arena block (nodes, not prefixes; a
    /// prefix of length *n* needs up to *n* nodes).
    pub fn with_capacity(family: Family, prealloc: usize) -> Self {
        crate::ensure_logging();
        info!(
            "[OPEN] family={} key_bits={} prealloc={}",
            family,
            family.bits(),
            prealloc
        );
        let trie = match family {
            Family::V4 => Trie::V4(BitTrie::with_capacity(prealloc)),
            Family::V6 => Trie::V6(BitTrie::with_capacity(prealloc)),
        };
        Self { trie, family }
    }

    pub fn family(&self) -> Family {
        self.family
    }

    /// Number of stored prefixes.
    pub fn len(&self) -> usize {
        on_trie!(&self.trie, |t| t.len())
    }

    pub fn is_empty(&self) -> bool {
        on_trie!(&self.trie, |t| t.is_empty())
    }

    pub fn pool_stats(&self) -> PoolStats {
        on_trie!(&self.trie, |t| t.pool_stats())
    }

    pub fn report_pool_metrics(&self) {
        on_trie!(&self.trie, |t| t.report_pool_metrics())
    }

    /// Drop every prefix.
    pub fn clear(&mut self) {
        on_trie!(&mut self.trie, |t| t.clear())
    }

    // ─────────────────────────── text API ─────────────────────────────── //

    /// Store `value` at `cidr`; fails with [`Error::NodeBusy`] if the exact
    /// prefix already has one.
    pub fn add_cidr(&mut self, cidr: &str, value: T) -> Result<(), Error> {
        let key = parse_cidr(cidr, self.family)?;
        self.insert_key(key, value, false).map(|_| ())
    }

    /// Store `value` at `cidr`, replacing and returning any previous value.
    pub fn set_cidr(&mut self, cidr: &str, value: T) -> Result<Option<T>, Error> {
        let key = parse_cidr(cidr, self.family)?;
        self.insert_key(key, value, true)
    }

    /// Remove the value stored exactly at `cidr`. More specific prefixes
    /// nested inside it are kept.
    pub fn delete_cidr(&mut self, cidr: &str) -> Result<T, Error> {
        let key = parse_cidr(cidr, self.family)?;
        with_key!(&mut self.trie, key, |t, addr, mask| t.remove(addr, mask))
    }

    /// Remove `cidr` together with every prefix nested inside it. Returns
    /// the number of values removed.
    pub fn delete_whole_range_cidr(&mut self, cidr: &str) -> Result<usize, Error> {
        let key = parse_cidr(cidr, self.family)?;
        with_key!(&mut self.trie, key, |t, addr, mask| t.remove_range(addr, mask))
    }

    /// Value of the most specific stored prefix covering `cidr`.
    pub fn find_cidr(&self, cidr: &str) -> Result<&T, Error> {
        self.longest_match_cidr(cidr).map(|m| m.value)
    }

    pub fn longest_match_cidr(&self, cidr: &str) -> Result<Match<'_, T>, Error> {
        let key = parse_cidr(cidr, self.family)?;
        self.match_key(key)
    }

    /// Value stored exactly at `cidr`, ignoring covering prefixes.
    pub fn get_cidr(&self, cidr: &str) -> Result<&T, Error> {
        let key = parse_cidr(cidr, self.family)?;
        with_key!(&self.trie, key, |t, addr, mask| t.find_exact(addr, mask)).ok_or(Error::NotFound)
    }

    // ─────────────────────────── byte API ─────────────────────────────── //

    // Same operations on raw buffers; invalid UTF-8 is a bad address.

    pub fn add_cidr_bytes(&mut self, cidr: &[u8], value: T) -> Result<(), Error> {
        self.add_cidr(utf8(cidr)?, value)
    }

    pub fn set_cidr_bytes(&mut self, cidr: &[u8], value: T) -> Result<Option<T>, Error> {
        self.set_cidr(utf8(cidr)?, value)
    }

    pub fn delete_cidr_bytes(&mut self, cidr: &[u8]) -> Result<T, Error> {
        self.delete_cidr(utf8(cidr)?)
    }

    pub fn delete_whole_range_cidr_bytes(&mut self, cidr: &[u8]) -> Result<usize, Error> {
        self.delete_whole_range_cidr(utf8(cidr)?)
    }

    pub fn find_cidr_bytes(&self, cidr: &[u8]) -> Result<&T, Error> {
        self.find_cidr(utf8(cidr)?)
    }

    // ─────────────────────────── typed API ────────────────────────────── //

    pub fn insert_net(&mut self, net: IpNet, value: T, overwrite: bool) -> Result<Option<T>, Error> {
        let key = net_key(net, self.family)?;
        self.insert_key(key, value, overwrite)
    }

    pub fn remove_net(&mut self, net: IpNet) -> Result<T, Error> {
        let key = net_key(net, self.family)?;
        with_key!(&mut self.trie, key, |t, addr, mask| t.remove(addr, mask))
    }

    pub fn remove_range_net(&mut self, net: IpNet) -> Result<usize, Error> {
        let key = net_key(net, self.family)?;
        with_key!(&mut self.trie, key, |t, addr, mask| t.remove_range(addr, mask))
    }

    pub fn find_net(&self, net: IpNet) -> Result<&T, Error> {
        let key = net_key(net, self.family)?;
        self.match_key(key).map(|m| m.value)
    }

    pub fn find_addr(&self, addr: IpAddr) -> Result<&T, Error> {
        let key = addr_key(addr, self.family)?;
        self.match_key(key).map(|m| m.value)
    }

    fn insert_key(&mut self, key: Key, value: T, overwrite: bool) -> Result<Option<T>, Error> {
        with_key!(&mut self.trie, key, |t, addr, mask| t.insert(addr, mask, value, overwrite))
    }

    fn match_key(&self, key: Key) -> Result<Match<'_, T>, Error> {
        with_key!(&self.trie, key, |t, addr, mask| t.find_match(addr, mask)).ok_or(Error::NotFound)
    }
}

#[inline]
fn utf8(bytes: &[u8]) -> Result<&str, Error> {
    std::str::from_utf8(bytes).map_err(|_| Error::BadAddress)
}

impl<T> std::fmt::Debug for CidrTree<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CidrTree")
            .field("family", &self.family)
            .field("len", &self.len())
            .field("pool", &self.pool_stats())
            .finish()
    }
}
