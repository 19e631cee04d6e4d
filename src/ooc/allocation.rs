//! Block allocation model
//!
//! The matrix diagonal is split into contiguous index ranges, each owned by
//! one device. Deciding the split (block sizes, device round-robin, memory
//! budgeting) is the job of an external planner; this module only represents
//! the result and checks that it is structurally sound before the scheduler
//! trusts it.

use std::collections::HashSet;

use crate::error::{Error, Result};

/// One diagonal block of the partition: the half-open range `[start, end)`
/// owned by `device`, with a job-unique `id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockAllocation {
    /// First row/column of the block
    pub start: usize,
    /// One past the last row/column of the block
    pub end: usize,
    /// Block edge length (`end - start`)
    pub size: usize,
    /// Id of the device owning this block's staged storage
    pub device: usize,
    /// Unique identifier within the job
    pub id: usize,
}

impl BlockAllocation {
    /// Create a block descriptor for `[start, end)` owned by `device`
    pub fn new(start: usize, end: usize, device: usize, id: usize) -> Result<Self> {
        if end <= start {
            return Err(Error::configuration(format!(
                "block {} has empty or inverted range [{}, {})",
                id, start, end
            )));
        }
        Ok(Self {
            start,
            end,
            size: end - start,
            device,
            id,
        })
    }
}

/// A validated partition of `[0, n)` into device-owned blocks.
///
/// Construction checks the structural invariants the scheduler relies on:
/// blocks sorted by `start` cover the range contiguously with no gaps or
/// overlaps, every `size` matches its range, and ids are unique. Whether the
/// owning devices have enough memory is the external planner's problem and is
/// not checked here.
#[derive(Debug, Clone)]
pub struct BlockPartition {
    n: usize,
    blocks: Vec<BlockAllocation>,
}

impl BlockPartition {
    /// Validate `blocks` as a partition of `[0, n)` where `n` is the end of
    /// the last block.
    pub fn new(mut blocks: Vec<BlockAllocation>) -> Result<Self> {
        if blocks.is_empty() {
            return Err(Error::configuration("partition contains no blocks"));
        }
        blocks.sort_by_key(|b| b.start);

        if blocks[0].start != 0 {
            return Err(Error::configuration(format!(
                "partition does not start at 0 (first block starts at {})",
                blocks[0].start
            )));
        }

        let mut ids = HashSet::with_capacity(blocks.len());
        let mut cursor = 0usize;
        for b in &blocks {
            if b.start != cursor {
                return Err(Error::configuration(format!(
                    "block {} starts at {} but the previous block ends at {}",
                    b.id, b.start, cursor
                )));
            }
            if b.size != b.end - b.start {
                return Err(Error::configuration(format!(
                    "block {} declares size {} for range [{}, {})",
                    b.id, b.size, b.start, b.end
                )));
            }
            if !ids.insert(b.id) {
                return Err(Error::configuration(format!("duplicate block id {}", b.id)));
            }
            cursor = b.end;
        }

        Ok(Self { n: cursor, blocks })
    }

    /// Matrix order covered by this partition
    pub fn n(&self) -> usize {
        self.n
    }

    /// Blocks in ascending `start` order
    pub fn blocks(&self) -> &[BlockAllocation] {
        &self.blocks
    }

    /// Number of blocks
    pub fn num_blocks(&self) -> usize {
        self.blocks.len()
    }

    /// Largest block edge length
    pub fn max_block_size(&self) -> usize {
        self.blocks.iter().map(|b| b.size).max().unwrap_or(0)
    }

    /// Ids of the devices that own at least one block, ascending
    pub fn devices(&self) -> Vec<usize> {
        let mut ids: Vec<usize> = self.blocks.iter().map(|b| b.device).collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }
}
