//! Block-parallel memory copy
//!
//! Copies below two blocks run on the calling thread. Larger copies are cut
//! into `block_size` blocks, with any remainder folded into the last block,
//! and each block is copied by one pool task. The caller blocks until the
//! batch completes.

use crate::config::CopyConfig;
use crate::core::WorkerPool;
use crate::error::{PoolCopyError, Result};
use serde::Serialize;
use std::ptr;
use std::time::{Duration, Instant};

/// One contiguous sub-range of a copy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BlockRange {
    /// Byte offset from the start of the copy
    pub offset: usize,
    /// Block length in bytes
    pub len: usize,
}

impl BlockRange {
    /// One past the last byte of the block
    pub fn end(&self) -> usize {
        self.offset + self.len
    }
}

/// Split `[0, count)` into copy blocks
///
/// Returns no blocks when `count < 2 * block_size`; such copies are done on
/// the calling thread. Otherwise there are `count / block_size` blocks, all
/// exactly `block_size` long except the last, which absorbs the remainder
/// and is therefore in `[block_size, 2 * block_size)`.
///
/// # Panics
///
/// Panics if `block_size` is zero.
pub fn plan_blocks(count: usize, block_size: usize) -> Vec<BlockRange> {
    assert!(block_size > 0, "block size must be greater than zero");

    if count < block_size.saturating_mul(2) {
        return Vec::new();
    }

    let blocks = count / block_size;
    (0..blocks)
        .map(|index| {
            let offset = index * block_size;
            let len = if index + 1 == blocks {
                count - offset
            } else {
                block_size
            };
            BlockRange { offset, len }
        })
        .collect()
}

/// Arguments of a single block copy task
#[derive(Debug, Clone, Copy)]
struct BlockCopy {
    dst: *mut u8,
    src: *const u8,
    len: usize,
}

// The pointers target disjoint ranges of buffers that the submitting caller
// keeps alive until every block of the batch has completed.
unsafe impl Send for BlockCopy {}

impl BlockCopy {
    fn new(dst: *mut u8, src: *const u8, block: BlockRange) -> Self {
        Self {
            dst: dst.wrapping_add(block.offset),
            src: src.wrapping_add(block.offset),
            len: block.len,
        }
    }

    /// # Safety
    ///
    /// Both ranges must be valid for `len` bytes and must not overlap.
    unsafe fn run(self) {
        unsafe { ptr::copy_nonoverlapping(self.src, self.dst, self.len) };
    }
}

/// Outcome of one copy call
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CopyStats {
    /// Bytes copied
    pub bytes: usize,
    /// Blocks handed to the pool (0 when copied on the calling thread)
    pub blocks: usize,
    /// Wall-clock time of the call
    pub duration: Duration,
}

impl CopyStats {
    /// Check whether the copy was split across the pool
    pub fn is_parallel(&self) -> bool {
        self.blocks > 0
    }

    /// Throughput in bytes/second
    pub fn throughput(&self) -> f64 {
        let secs = self.duration.as_secs_f64();
        if secs == 0.0 {
            0.0
        } else {
            self.bytes as f64 / secs
        }
    }
}

/// Memory copier that fans large copies out over a worker pool
#[derive(Debug, Clone, Copy)]
pub struct ParallelCopier<'p> {
    /// None means the process-wide pool, resolved only when a copy is split
    pool: Option<&'p WorkerPool>,
    config: CopyConfig,
}

impl<'p> ParallelCopier<'p> {
    /// Create a copier that schedules blocks on `pool`
    pub fn new(pool: &'p WorkerPool, config: CopyConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            pool: Some(pool),
            config,
        })
    }

    /// Copier on the process-wide pool with the default 1 GiB blocks
    ///
    /// The global pool is only started by the first copy large enough to
    /// be split.
    pub fn global() -> ParallelCopier<'static> {
        ParallelCopier {
            pool: None,
            config: CopyConfig::default(),
        }
    }

    /// Copy configuration in use
    pub fn config(&self) -> &CopyConfig {
        &self.config
    }

    fn pool(&self) -> &'p WorkerPool {
        match self.pool {
            Some(pool) => pool,
            None => WorkerPool::global(),
        }
    }

    /// Copy `src` into `dst`
    ///
    /// Both slices must have the same length.
    pub fn copy(&self, dst: &mut [u8], src: &[u8]) -> Result<CopyStats> {
        if dst.len() != src.len() {
            return Err(PoolCopyError::LengthMismatch {
                dst: dst.len(),
                src: src.len(),
            });
        }

        // SAFETY: the borrows guarantee both ranges are valid for the whole
        // call and cannot overlap.
        Ok(unsafe { self.copy_raw(dst.as_mut_ptr(), src.as_ptr(), src.len()) })
    }

    /// Copy `count` bytes from `src` to `dst`
    ///
    /// Returns only after every byte has been copied.
    ///
    /// # Safety
    ///
    /// `src` must be valid for reads and `dst` valid for writes of `count`
    /// bytes, the ranges must not overlap, and no other party may access
    /// them until this call returns.
    pub unsafe fn copy_raw(&self, dst: *mut u8, src: *const u8, count: usize) -> CopyStats {
        let start = Instant::now();
        let blocks = plan_blocks(count, self.config.block_size);

        if blocks.is_empty() {
            if count > 0 {
                unsafe { ptr::copy_nonoverlapping(src, dst, count) };
            }
            return CopyStats {
                bytes: count,
                blocks: 0,
                duration: start.elapsed(),
            };
        }

        tracing::debug!(
            "Splitting {} byte copy into {} blocks of {} bytes",
            count,
            blocks.len(),
            self.config.block_size
        );

        let handle = self.pool().submit_batch(blocks.iter().map(|&block| {
            let job = BlockCopy::new(dst, src, block);
            // SAFETY: blocks are disjoint sub-ranges of the caller's buffers,
            // which stay valid because we wait on the batch below.
            move || unsafe { job.run() }
        }));
        handle.wait();

        let stats = CopyStats {
            bytes: count,
            blocks: blocks.len(),
            duration: start.elapsed(),
        };
        tracing::trace!(
            "Parallel copy finished in {:?} ({:.2} GiB/s)",
            stats.duration,
            stats.throughput() / (1u64 << 30) as f64
        );
        stats
    }
}

/// Copy `count` bytes from `src` to `dst`, splitting large copies across
/// the process-wide pool
///
/// Copies smaller than two blocks of [`DEFAULT_BLOCK_SIZE`](crate::DEFAULT_BLOCK_SIZE)
/// run on the calling thread without touching the pool.
///
/// # Safety
///
/// Same contract as [`ParallelCopier::copy_raw`]. Calling this from inside
/// a pool task can deadlock when every worker ends up waiting.
pub unsafe fn parallel_copy(dst: *mut u8, src: *const u8, count: usize) {
    unsafe { ParallelCopier::global().copy_raw(dst, src, count) };
}
