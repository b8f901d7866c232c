//! Throughput benchmarking module
//!
//! Runs the parallel copy against a single-threaded baseline on the host
//! and renders the results as text or JSON.

mod report;
mod runner;

pub use report::*;
pub use runner::*;
