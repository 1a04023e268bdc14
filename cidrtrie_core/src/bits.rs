//! Fixed-width address keys the trie engine walks bit by bit.

use std::fmt;
use std::ops::BitAnd;

/// An unsigned integer key of fixed width (32 bits for IPv4, 128 for IPv6).
///
/// Bits are addressed by *depth*: depth 0 is the most significant bit, which
/// is the first branch taken below the root.
pub trait AddressBits: Copy + Eq + BitAnd<Output = Self> + fmt::Debug + fmt::LowerHex {
    /// Key width in bits.
    const WIDTH: u8;

    /// The bit at `depth` (0 = MSB). `depth` must be below `WIDTH`.
    fn bit(self, depth: u8) -> bool;

    /// Length of the leading run of one-bits.
    ///
    /// For a well-formed (left-justified) mask this is its prefix length.
    fn prefix_len(self) -> u8;

    /// Left-justified mask of `prefix_len` one-bits.
    fn mask(prefix_len: u8) -> Self;
}

macro_rules! impl_address_bits {
    ($t:ty, $width:expr) => {
        impl AddressBits for $t {
            const WIDTH: u8 = $width;

            #[inline(always)]
            fn bit(self, depth: u8) -> bool {
                debug_assert!(depth < Self::WIDTH);
                (self >> (Self::WIDTH - 1 - depth)) & 1 == 1
            }

            #[inline(always)]
            fn prefix_len(self) -> u8 {
                self.leading_ones() as u8
            }

            #[inline]
            fn mask(prefix_len: u8) -> Self {
                if prefix_len == 0 {
                    0
                } else if prefix_len >= Self::WIDTH {
                    <$t>::MAX
                } else {
                    !(<$t>::MAX >> prefix_len)
                }
            }
        }
    };
}

impl_address_bits!(u32, 32);
impl_address_bits!(u128, 128);
