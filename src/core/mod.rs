//! Core pool and copy module
//!
//! Provides the fixed-size worker pool, the fan-in primitives used to
//! wait on a batch of tasks, and the block-parallel memory copy.

mod batch;
mod copier;
mod pool;

pub use batch::*;
pub use copier::*;
pub use pool::*;
