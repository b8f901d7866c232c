//! Benchmark execution
//!
//! Allocates a patterned source buffer and a zeroed destination, times the
//! parallel copy on a dedicated pool, then times a plain single-threaded
//! copy of the same buffers.

use crate::bench::{BenchReport, PlanReport, RunSample};
use crate::config::{BenchConfig, CopyConfig};
use crate::core::{plan_blocks, ParallelCopier, WorkerPool};
use crate::error::{PoolCopyError, Result};
use std::time::Instant;
use sysinfo::System;
use xxhash_rust::xxh3::xxh3_64;

/// Fail early when the source and destination buffers would not fit in
/// the memory currently available
pub fn ensure_memory(size: usize) -> Result<()> {
    let required = (size as u64).saturating_mul(2);

    let mut sys = System::new();
    sys.refresh_memory();
    let available = sys.available_memory();

    // Some sandboxes report zero; trust the allocator there
    if available > 0 && required > available {
        return Err(PoolCopyError::InsufficientMemory {
            required,
            available,
        });
    }

    Ok(())
}

/// Deterministic fill pattern with a prime period
pub fn pattern_buffer(size: usize) -> Vec<u8> {
    (0..size).map(|i| (i % 251) as u8).collect()
}

/// Run the `bench` subcommand
pub fn run_bench(config: &BenchConfig) -> Result<BenchReport> {
    ensure_memory(config.size)?;

    let pool = WorkerPool::with_config(config.pool.clone())?;
    let copier = ParallelCopier::new(&pool, config.copy)?;

    tracing::info!(
        "Benchmarking {} byte copies on {} workers ({} iterations)",
        config.size,
        pool.worker_count(),
        config.iterations
    );

    let src = pattern_buffer(config.size);
    let mut dst = vec![0u8; config.size];

    let mut parallel = Vec::with_capacity(config.iterations);
    for iteration in 0..config.iterations {
        let stats = copier
            .copy(&mut dst, &src)
            .map_err(|e| e.with_context(format!("parallel copy, iteration {}", iteration)))?;
        tracing::debug!(
            "Iteration {}: {} blocks in {:?}",
            iteration,
            stats.blocks,
            stats.duration
        );
        parallel.push(RunSample::from_stats(&stats));
    }

    let verified = config.verify.then(|| {
        let matches = xxh3_64(&src) == xxh3_64(&dst);
        if !matches {
            tracing::warn!("Destination hash does not match source after parallel copy");
        }
        matches
    });

    let mut baseline = Vec::with_capacity(config.iterations);
    for _ in 0..config.iterations {
        let start = Instant::now();
        dst.copy_from_slice(&src);
        baseline.push(RunSample::new(config.size, 0, start.elapsed()));
    }

    let pool_stats = pool.stats();
    pool.shutdown();

    Ok(BenchReport {
        size: config.size,
        block_size: config.copy.block_size,
        workers: pool_stats.workers,
        tasks_scheduled: pool_stats.tasks_scheduled,
        parallel,
        baseline,
        verified,
    })
}

/// Largest block table the `plan` subcommand will build and print
pub const MAX_PLAN_BLOCKS: usize = 1 << 16;

/// Run the `plan` subcommand
///
/// Rejects layouts of more than [`MAX_PLAN_BLOCKS`] blocks instead of
/// materializing the whole table.
pub fn run_plan(size: usize, copy: CopyConfig) -> Result<PlanReport> {
    copy.validate()?;

    let blocks = size / copy.block_size;
    if blocks > MAX_PLAN_BLOCKS {
        return Err(PoolCopyError::config(format!(
            "{} bytes in {} byte blocks is {} blocks, more than the {} a plan can list",
            size, copy.block_size, blocks, MAX_PLAN_BLOCKS
        )));
    }

    Ok(PlanReport {
        size,
        block_size: copy.block_size,
        threshold: copy.parallel_threshold(),
        blocks: plan_blocks(size, copy.block_size),
    })
}
