//! Helper functions for address keys and masks

use crate::bits::AddressBits;
use crate::constants::V4_MAPPED_PREFIX;

/// Embed an IPv4 address into IPv6 space as `::ffff:a.b.c.d`.
#[inline]
pub fn v4_key(addr: u32) -> u128 {
    V4_MAPPED_PREFIX | addr as u128
}

/// Embed a left-justified IPv4 mask: the 96 mapped-prefix bits plus `mask`.
#[inline]
pub fn v4_mask(mask: u32) -> u128 {
    (!0u128 << 32) | mask as u128
}

#[inline]
pub fn mask32(prefix_len: u8) -> u32 {
    <u32 as AddressBits>::mask(prefix_len)
}

#[inline]
pub fn mask128(prefix_len: u8) -> u128 {
    <u128 as AddressBits>::mask(prefix_len)
}

// Canonicalise a key: zero host bits beyond `plen`.
#[inline(always)]
pub fn canonical<K: AddressBits>(key: K, plen: u8) -> K {
    key & K::mask(plen)
}
