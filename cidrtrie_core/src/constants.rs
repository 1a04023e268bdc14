//! Constants and configuration for the CIDR trie

/// Slots in the first arena block when no pre-size hint is given.
pub const DEFAULT_FIRST_BLOCK: usize = 256;

/// Arena indices are `u32`; index 0 is the root, so this many slots can exist.
pub const MAX_NODES: usize = u32::MAX as usize;

/// The `::ffff:0:0/96` prefix IPv4-mapped addresses live under.
pub const V4_MAPPED_PREFIX: u128 = 0xffff_u128 << 32;

pub const V4_BITS: u8 = 32;
pub const V6_BITS: u8 = 128;
