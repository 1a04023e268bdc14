//! Longest-prefix-match index for IPv4/IPv6 CIDR ranges.
//!
//! An uncompressed binary trie: one node per prefix bit, nodes drawn from a
//! growable block arena with an intrusive free list, so steady-state
//! inserts, deletes and lookups do not allocate. Every operation costs at
//! most 32 (IPv4) or 128 (IPv6) steps.
//!
//! ```
//! use cidrtrie_core::{CidrTree, Error, Family};
//!
//! let mut tree = CidrTree::new(Family::V4);
//! tree.add_cidr("10.0.0.0/8", "corp").unwrap();
//! tree.add_cidr("10.1.0.0/16", "lab").unwrap();
//! assert_eq!(tree.find_cidr("10.1.2.3"), Ok(&"lab"));
//! assert_eq!(tree.find_cidr("10.2.0.1"), Ok(&"corp"));
//! assert_eq!(tree.find_cidr("192.0.2.1"), Err(Error::NotFound));
//! ```
//!
//! No internal locking: mutation takes `&mut self`; share across threads
//! behind your own lock.

pub mod bits;
pub mod constants;
pub mod engine;
pub mod errors;
pub mod helpers;
pub mod parse;
pub mod pool;
pub mod telemetry;
pub mod tree;
pub mod types;

pub use bits::AddressBits;
pub use engine::BitTrie;
pub use errors::{Error, ErrorCode};
pub use tree::CidrTree;
pub use types::{Family, Match, PoolStats};

use once_cell::sync::OnceCell;

/// Install `env_logger` once so `RUST_LOG` works out of the box.
pub(crate) fn ensure_logging() {
    static INIT: OnceCell<()> = OnceCell::new();
    INIT.get_or_init(|| {
        // no-op when the host already installed a logger
        let _ = env_logger::builder()
            .format_timestamp(None)
            .is_test(std::env::var("RUST_TEST_THREADS").is_ok())
            .try_init();
    });
}

// C ABI, flattened into the crate root
pub mod public_api;
pub use public_api::*;
