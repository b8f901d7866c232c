//! # PoolCopy - Parallel Memory Copy over a Fixed Worker Pool
//!
//! PoolCopy provides a small, fixed-size worker-thread pool and one utility
//! built on top of it: a memory copy that splits very large transfers into
//! blocks and copies them concurrently, to reach memory bandwidth a single
//! thread cannot sustain.
//!
//! ## Features
//!
//! - **Fixed Worker Pool**: FIFO task queue, blocking wait/wake, drain-on-drop
//! - **Process-wide Pool**: lazily constructed on first use, never torn down
//! - **Structured Join**: submit a batch and wait on a single handle
//! - **Parallel Copy**: block partitioning with the remainder folded into the
//!   last block, caller blocks until every block is done
//!
//! ## Quick Start
//!
//! ```no_run
//! use poolcopy::core::ParallelCopier;
//!
//! let src = vec![7u8; 3 << 30];
//! let mut dst = vec![0u8; src.len()];
//!
//! // Uses the process-wide pool and 1 GiB blocks
//! let stats = ParallelCopier::global().copy(&mut dst, &src).unwrap();
//! println!("Copied {} bytes in {} blocks", stats.bytes, stats.blocks);
//! ```
//!
//! ## Explicit Pool
//!
//! ```no_run
//! use poolcopy::config::{CopyConfig, PoolConfig};
//! use poolcopy::core::{ParallelCopier, WorkerPool};
//!
//! let pool = WorkerPool::with_config(PoolConfig::with_threads(8)).unwrap();
//! let copier = ParallelCopier::new(&pool, CopyConfig::with_block_size(64 << 20)).unwrap();
//!
//! let src = vec![1u8; 512 << 20];
//! let mut dst = vec![0u8; src.len()];
//! copier.copy(&mut dst, &src).unwrap();
//!
//! pool.shutdown();
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod bench;
pub mod config;
pub mod core;
pub mod error;

// Re-export commonly used types
pub use crate::config::{CopyConfig, PoolConfig, DEFAULT_BLOCK_SIZE};
pub use crate::core::{parallel_copy, plan_blocks, BlockRange, CopyStats, ParallelCopier, WorkerPool};
pub use crate::error::{PoolCopyError, Result};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for convenient imports
pub mod prelude {
    //! Convenient re-exports for common usage
    //!
    //! ```no_run
    //! use poolcopy::prelude::*;
    //! ```

    pub use crate::config::{CopyConfig, PoolConfig};
    pub use crate::core::{
        parallel_copy, BatchHandle, CompletionLatch, CopyStats, ParallelCopier, PoolStats,
        WorkerPool,
    };
    pub use crate::error::{PoolCopyError, Result};
}
