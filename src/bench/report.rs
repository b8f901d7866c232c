//! Benchmark and plan reports

use crate::config::OutputFormat;
use crate::core::{BlockRange, CopyStats};
use crate::error::Result;
use serde::Serialize;
use std::time::Duration;

/// One timed copy
#[derive(Debug, Clone, Serialize)]
pub struct RunSample {
    /// Bytes copied
    pub bytes: usize,
    /// Blocks handed to the pool
    pub blocks: usize,
    /// Elapsed time in seconds
    pub seconds: f64,
    /// Throughput in bytes/second
    pub throughput: f64,
}

impl RunSample {
    /// Create a sample from raw measurements
    pub fn new(bytes: usize, blocks: usize, elapsed: Duration) -> Self {
        let seconds = elapsed.as_secs_f64();
        let throughput = if seconds > 0.0 { bytes as f64 / seconds } else { 0.0 };
        Self {
            bytes,
            blocks,
            seconds,
            throughput,
        }
    }

    /// Create a sample from copier statistics
    pub fn from_stats(stats: &CopyStats) -> Self {
        Self::new(stats.bytes, stats.blocks, stats.duration)
    }
}

/// Results of the `bench` subcommand
#[derive(Debug, Clone, Serialize)]
pub struct BenchReport {
    /// Bytes copied per iteration
    pub size: usize,
    /// Block size used for parallel copies
    pub block_size: usize,
    /// Pool worker count
    pub workers: usize,
    /// Tasks the pool accepted over the whole run
    pub tasks_scheduled: u64,
    /// Parallel copy samples
    pub parallel: Vec<RunSample>,
    /// Single-threaded copy samples
    pub baseline: Vec<RunSample>,
    /// XXH3 comparison of source and destination, if requested
    pub verified: Option<bool>,
}

impl BenchReport {
    /// Best parallel throughput in bytes/second
    pub fn best_parallel(&self) -> f64 {
        best_throughput(&self.parallel)
    }

    /// Best single-threaded throughput in bytes/second
    pub fn best_baseline(&self) -> f64 {
        best_throughput(&self.baseline)
    }

    /// Parallel over single-threaded throughput
    pub fn speedup(&self) -> f64 {
        let baseline = self.best_baseline();
        if baseline == 0.0 {
            0.0
        } else {
            self.best_parallel() / baseline
        }
    }

    /// Render the report in the requested format
    pub fn render(&self, format: OutputFormat) -> Result<String> {
        match format {
            OutputFormat::Json => Ok(serde_json::to_string_pretty(self)?),
            OutputFormat::Text => Ok(self.to_text()),
        }
    }

    fn to_text(&self) -> String {
        let mut out = String::new();
        out.push_str("=== Copy Benchmark ===\n");
        out.push_str(&format!("Size:            {}\n", format_bytes(self.size as u64)));
        out.push_str(&format!("Block size:      {}\n", format_bytes(self.block_size as u64)));
        out.push_str(&format!("Workers:         {}\n", self.workers));
        out.push_str(&format!("Tasks scheduled: {}\n", self.tasks_scheduled));

        out.push_str("\nParallel:\n");
        for (i, run) in self.parallel.iter().enumerate() {
            out.push_str(&format_sample(i, run));
        }
        out.push_str("\nSingle thread:\n");
        for (i, run) in self.baseline.iter().enumerate() {
            out.push_str(&format_sample(i, run));
        }

        out.push_str(&format!(
            "\nBest: {}/s parallel, {}/s single thread ({:.2}x)\n",
            format_bytes(self.best_parallel() as u64),
            format_bytes(self.best_baseline() as u64),
            self.speedup()
        ));

        match self.verified {
            Some(true) => out.push_str("Verification:    passed (XXH3)\n"),
            Some(false) => out.push_str("Verification:    FAILED (XXH3)\n"),
            None => {}
        }

        out
    }
}

/// Results of the `plan` subcommand
#[derive(Debug, Clone, Serialize)]
pub struct PlanReport {
    /// Bytes to copy
    pub size: usize,
    /// Configured block size
    pub block_size: usize,
    /// Smallest size that is split across the pool
    pub threshold: usize,
    /// Blocks, empty when the copy stays on the calling thread
    pub blocks: Vec<BlockRange>,
}

impl PlanReport {
    /// Render the report in the requested format
    pub fn render(&self, format: OutputFormat) -> Result<String> {
        match format {
            OutputFormat::Json => Ok(serde_json::to_string_pretty(self)?),
            OutputFormat::Text => Ok(self.to_text()),
        }
    }

    fn to_text(&self) -> String {
        if self.blocks.is_empty() {
            return format!(
                "{} is below the parallel threshold of {}: copied on the calling thread\n",
                format_bytes(self.size as u64),
                format_bytes(self.threshold as u64)
            );
        }

        let mut out = format!(
            "{} in {} blocks:\n",
            format_bytes(self.size as u64),
            self.blocks.len()
        );
        for (i, block) in self.blocks.iter().enumerate() {
            out.push_str(&format!(
                "  [{:>4}] offset {:>14}  len {}\n",
                i,
                block.offset,
                format_bytes(block.len as u64)
            ));
        }
        out
    }
}

fn best_throughput(samples: &[RunSample]) -> f64 {
    samples.iter().map(|s| s.throughput).fold(0.0, f64::max)
}

fn format_bytes(bytes: u64) -> String {
    humansize::format_size(bytes, humansize::BINARY)
}

fn format_sample(index: usize, run: &RunSample) -> String {
    // Whole microseconds read better than nanosecond noise
    let elapsed = Duration::from_micros((run.seconds * 1_000_000.0) as u64);
    // Padding needs a String; FormattedDuration ignores width
    let elapsed = humantime::format_duration(elapsed).to_string();
    format!(
        "  #{:<3} {:>12}  {}/s\n",
        index,
        elapsed,
        format_bytes(run.throughput as u64)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_report() -> BenchReport {
        BenchReport {
            size: 4 << 20,
            block_size: 1 << 20,
            workers: 4,
            tasks_scheduled: 8,
            parallel: vec![
                RunSample::new(4 << 20, 4, Duration::from_millis(2)),
                RunSample::new(4 << 20, 4, Duration::from_millis(1)),
            ],
            baseline: vec![RunSample::new(4 << 20, 0, Duration::from_millis(4))],
            verified: Some(true),
        }
    }

    #[test]
    fn test_speedup() {
        let report = sample_report();
        assert!((report.speedup() - 4.0).abs() < 1e-9);

        let empty = BenchReport {
            baseline: Vec::new(),
            ..sample_report()
        };
        assert_eq!(empty.speedup(), 0.0);
    }

    #[test]
    fn test_text_report() {
        let text = sample_report().render(OutputFormat::Text).unwrap();
        assert!(text.contains("Workers:         4"));
        assert!(text.contains("4.00x"));
        assert!(text.contains("passed (XXH3)"));
    }

    #[test]
    fn test_json_report() {
        let json = sample_report().render(OutputFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["workers"], 4);
        assert_eq!(value["parallel"].as_array().unwrap().len(), 2);
        assert_eq!(value["verified"], true);
    }

    #[test]
    fn test_plan_report() {
        let inline = PlanReport {
            size: 1024,
            block_size: 1024,
            threshold: 2048,
            blocks: Vec::new(),
        };
        assert!(inline.render(OutputFormat::Text).unwrap().contains("calling thread"));

        let split = PlanReport {
            size: 3072,
            block_size: 1024,
            threshold: 2048,
            blocks: vec![
                BlockRange { offset: 0, len: 1024 },
                BlockRange { offset: 1024, len: 2048 },
            ],
        };
        let text = split.render(OutputFormat::Text).unwrap();
        assert!(text.contains("in 2 blocks"));

        let json = split.render(OutputFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["blocks"][1]["len"], 2048);
    }

    #[test]
    fn test_sample_line_pads_duration() {
        let line = format_sample(1, &RunSample::new(1 << 20, 0, Duration::from_secs(2)));
        assert!(line.starts_with("  #1  "));
        assert!(line.contains(&format!("{:>12}", "2s")));
        assert!(line.ends_with("KiB/s\n"));
    }

    #[test]
    fn test_zero_duration_sample() {
        let sample = RunSample::new(100, 0, Duration::ZERO);
        assert_eq!(sample.throughput, 0.0);
    }
}
