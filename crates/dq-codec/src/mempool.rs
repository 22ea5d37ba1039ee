//! A simple growable byte arena used to back the value-codec writers.
//!
//! The original allocator hands out raw `T*` pointers into a chain of
//! fixed-size pools, growing the chain and reinterpreting the tail as
//! whatever type the caller asked for. Rust's aliasing rules make that
//! literal translation unsound, so this version keeps the same shape (a
//! chain of growable blocks, grow-on-demand, tail reclaim via `reuse`) but
//! hands out borrowed `&mut [u8]` slices into a `Vec<u8>` block instead of
//! raw pointers. Requesting a new allocation while holding a previous one
//! simply doesn't typecheck, which is the borrow checker enforcing the same
//! "single writer, sequential access" discipline the original relied on
//! programmer discipline for.

/// A chain of growable byte blocks. Only the last block in the chain is
/// ever allocated from; once full it is left behind and a fresh block
/// becomes the tail.
pub struct Mempool {
    blocks: Vec<Vec<u8>>,
    block_size: usize,
}

impl Mempool {
    /// Create a pool whose blocks are at least `block_size` bytes, growing
    /// to fit any single allocation larger than that.
    pub fn new(block_size: usize) -> Self {
        let block_size = block_size.max(1);
        Self {
            blocks: vec![Vec::with_capacity(block_size)],
            block_size,
        }
    }

    /// Reserve `n` zeroed bytes at the tail of the pool, growing the chain
    /// with a new block if the current tail doesn't have room, and return a
    /// mutable slice into it.
    pub fn allocate(&mut self, n: usize) -> &mut [u8] {
        let tail = self.blocks.last().expect("mempool always has a tail block");
        if tail.capacity() - tail.len() < n {
            let next_size = self.block_size.max(n);
            self.blocks.push(Vec::with_capacity(next_size));
        }
        let tail = self.blocks.last_mut().expect("mempool always has a tail block");
        let start = tail.len();
        tail.resize(start + n, 0);
        &mut tail[start..]
    }

    /// Give back the last `n` bytes allocated from the pool's tail block,
    /// shrinking it so a later `allocate` call can reuse the space.
    ///
    /// Only ever reclaims from the current tail block, matching the
    /// original's "reuse only applies to the last allocation" contract.
    pub fn reuse(&mut self, n: usize) {
        let tail = self.blocks.last_mut().expect("mempool always has a tail block");
        let new_len = tail.len().saturating_sub(n);
        tail.truncate(new_len);
    }

    /// Total capacity reserved across the whole chain.
    pub fn allocated_bytes(&self) -> usize {
        self.blocks.iter().map(|b| b.capacity()).sum()
    }

    /// Number of blocks in the chain.
    pub fn n_blocks(&self) -> usize {
        self.blocks.len()
    }
}
