// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! Lookups in HAMT-sharded directories.
//!
//! Each level of a shard consumes `log2(fanout)` bits of the murmur3-x64-64 hash of an entry
//! name, most significant bits first. The bits select a slot, written as a fixed-width
//! upper-case hex prefix on the link name: a bare prefix links to a sub-shard, a prefix followed
//! by a name links to that entry.
//! See <https://specs.ipfs.tech/unixfs/#hamt-directory>.

use cid::Cid;

use super::node::DirEntry;

/// Multihash code of murmur3-x64-64, the only hash function sharded directories are built with.
pub const MURMUR3_X64_64: u64 = 0x22;

/// Largest fanout accepted from a shard node.
pub const MAX_FANOUT: u64 = 1 << 12;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HamtShard {
    pub hash_type: u64,
    pub fanout: u64,
    pub links: Vec<DirEntry>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    Entry(Cid),
    Shard(Cid),
    Empty,
}

impl HamtShard {
    fn bits(&self) -> u32 {
        self.fanout.trailing_zeros()
    }

    /// Looks `name` up in this level of the shard, consuming the next bits of `hash`. Returns
    /// `None` once the hash is exhausted.
    pub fn slot(&self, name: &str, hash: &mut HashBits) -> Option<Slot> {
        let index = hash.next(self.bits())?;
        let width = format!("{:X}", self.fanout - 1).len();
        let prefix = format!("{index:0width$X}");
        let mut slot = Slot::Empty;
        for link in &self.links {
            match link.name.strip_prefix(prefix.as_str()) {
                Some("") => slot = Slot::Shard(link.cid),
                Some(rest) if rest == name => return Some(Slot::Entry(link.cid)),
                _ => {}
            }
        }
        Some(slot)
    }
}

/// The hash of an entry name, handed out a few bits at a time.
#[derive(Debug, Clone, Copy)]
pub struct HashBits {
    hash: u64,
    consumed: u32,
}

impl HashBits {
    pub fn new(name: &str) -> Self {
        Self {
            hash: murmur3_x64_64(name.as_bytes()),
            consumed: 0,
        }
    }

    fn next(&mut self, bits: u32) -> Option<u64> {
        if bits == 0 || self.consumed + bits > u64::BITS {
            return None;
        }
        let index = (self.hash << self.consumed) >> (u64::BITS - bits);
        self.consumed += bits;
        Some(index)
    }
}

/// First 64 bits of murmur3-x64-128 with a zero seed, read as a big-endian integer.
fn murmur3_x64_64(data: &[u8]) -> u64 {
    // h1 is the low half
    fastmurmur3::hash(data) as u64
}

#[cfg(test)]
pub(crate) fn slot_prefix(name: &str, fanout: u64, level: u32) -> String {
    let mut hash = HashBits::new(name);
    let bits = fanout.trailing_zeros();
    let index = (0..=level)
        .map(|_| hash.next(bits).unwrap())
        .last()
        .unwrap();
    let width = format!("{:X}", fanout - 1).len();
    format!("{index:0width$X}")
}
