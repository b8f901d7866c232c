//! Configuration module for PoolCopy
//!
//! Provides pool and copy settings, CLI arguments for the benchmark
//! binary, and human-readable size parsing.

mod settings;

pub use settings::*;
