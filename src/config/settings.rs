//! Configuration settings for PoolCopy
//!
//! Defines the worker pool and copy settings, the CLI arguments of the
//! `poolcopy` binary, and their defaults.

use crate::error::{PoolCopyError, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};

/// Default copy block size (1 GiB)
pub const DEFAULT_BLOCK_SIZE: usize = 1 << 30;

/// Thread name prefix for pool workers
pub const DEFAULT_THREAD_PREFIX: &str = "poolcopy";

/// PoolCopy - parallel memory copy benchmark
#[derive(Parser, Debug, Clone)]
#[command(name = "poolcopy")]
#[command(author = "PoolCopy Team")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Parallel memory copy over a fixed worker pool")]
#[command(long_about = r#"
PoolCopy splits very large memory copies into blocks and copies them on a
fixed pool of worker threads, to reach memory bandwidth beyond what one
thread can sustain.

Copies smaller than two blocks run on the calling thread.

Examples:
  poolcopy bench                               # 4 GiB copy, 1 GiB blocks
  poolcopy bench --size 8G --threads 16 --verify
  poolcopy bench -b 256M --output-format json
  poolcopy plan --size 2.5G                    # Show the block layout
"#)]
pub struct CliArgs {
    /// Verbose output (can be repeated: -v, -vv, -vvv)
    #[arg(short = 'v', long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (only errors are logged)
    #[arg(short = 'q', long, global = true)]
    pub quiet: bool,

    /// Subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Measure parallel copy throughput against a single-threaded copy
    #[command(name = "bench")]
    Bench {
        /// Bytes to copy per iteration (e.g., 4G, 512M)
        #[arg(short = 's', long, default_value = "4G", value_name = "SIZE")]
        size: String,

        /// Block size for parallel copies (e.g., 1G, 64M)
        #[arg(short = 'b', long, default_value = "1G", value_name = "SIZE")]
        block_size: String,

        /// Number of worker threads (0 = auto-detect)
        #[arg(short = 't', long, default_value = "0", value_name = "NUM")]
        threads: usize,

        /// Number of timed iterations
        #[arg(short = 'n', long, default_value = "3", value_name = "NUM")]
        iterations: usize,

        /// Verify the destination with XXH3 after copying
        #[arg(long)]
        verify: bool,

        /// Output format for the report
        #[arg(long, value_enum, default_value = "text")]
        output_format: OutputFormat,
    },

    /// Show how a copy of the given size is split into blocks
    #[command(name = "plan")]
    Plan {
        /// Bytes to copy (e.g., 2.5G)
        #[arg(short = 's', long, value_name = "SIZE")]
        size: String,

        /// Block size (e.g., 1G, 64M)
        #[arg(short = 'b', long, default_value = "1G", value_name = "SIZE")]
        block_size: String,

        /// Output format for the report
        #[arg(long, value_enum, default_value = "text")]
        output_format: OutputFormat,
    },
}

/// Output format for reports
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable text
    #[default]
    Text,
    /// JSON format
    Json,
}

/// Worker pool configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Worker thread count (0 = one per logical CPU)
    pub threads: usize,
    /// Worker threads are named `<prefix>-<index>`
    pub thread_name_prefix: String,
    /// Stack size per worker in bytes (None = platform default)
    pub stack_size: Option<usize>,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            threads: 0, // Auto-detect
            thread_name_prefix: DEFAULT_THREAD_PREFIX.to_string(),
            stack_size: None,
        }
    }
}

impl PoolConfig {
    /// Create config with a specific thread count
    pub fn with_threads(threads: usize) -> Self {
        Self {
            threads,
            ..Default::default()
        }
    }

    /// Config used for the process-wide pool
    pub fn global() -> Self {
        Self::default()
    }

    /// Thread count after resolving auto-detection
    pub fn resolved_threads(&self) -> usize {
        if self.threads == 0 {
            num_cpus::get().max(1)
        } else {
            self.threads
        }
    }
}

/// Parallel copy configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CopyConfig {
    /// Size of one block handed to a worker
    pub block_size: usize,
}

impl Default for CopyConfig {
    fn default() -> Self {
        Self {
            block_size: DEFAULT_BLOCK_SIZE,
        }
    }
}

impl CopyConfig {
    /// Create config with a specific block size
    pub fn with_block_size(block_size: usize) -> Self {
        Self { block_size }
    }

    /// Smallest copy that is split across the pool (two blocks)
    pub fn parallel_threshold(&self) -> usize {
        self.block_size.saturating_mul(2)
    }

    /// Check the configuration for values the copier cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.block_size == 0 {
            return Err(PoolCopyError::config("Block size must be greater than zero"));
        }
        Ok(())
    }
}

/// Runtime configuration for the `bench` subcommand
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchConfig {
    /// Bytes copied per iteration
    pub size: usize,
    /// Timed iterations
    pub iterations: usize,
    /// Verify the copy with XXH3
    pub verify: bool,
    /// Pool settings
    pub pool: PoolConfig,
    /// Copy settings
    pub copy: CopyConfig,
    /// Report format
    pub output_format: OutputFormat,
}

impl BenchConfig {
    /// Create config from the `bench` subcommand arguments
    pub fn from_cli(command: &Commands) -> Result<Self> {
        let Commands::Bench {
            size,
            block_size,
            threads,
            iterations,
            verify,
            output_format,
        } = command
        else {
            return Err(PoolCopyError::config("Not a bench command"));
        };

        if *iterations == 0 {
            return Err(PoolCopyError::config("Iterations must be at least 1"));
        }

        let config = Self {
            size: parse_size_usize(size).map_err(|e| PoolCopyError::config(format!("Invalid size: {}", e)))?,
            iterations: *iterations,
            verify: *verify,
            pool: PoolConfig::with_threads(*threads),
            copy: CopyConfig::with_block_size(
                parse_size_usize(block_size).map_err(|e| PoolCopyError::config(format!("Invalid block size: {}", e)))?,
            ),
            output_format: *output_format,
        };
        config.copy.validate()?;

        Ok(config)
    }
}

/// Parse human-readable size string to bytes
pub fn parse_size(size: &str) -> std::result::Result<u64, String> {
    let size = size.trim().to_uppercase();

    if size.is_empty() {
        return Err("Empty size string".to_string());
    }

    let (num_str, multiplier) = if size.ends_with("TB") || size.ends_with('T') {
        (size.trim_end_matches(['T', 'B']), 1u64 << 40)
    } else if size.ends_with("GB") || size.ends_with('G') {
        (size.trim_end_matches(['G', 'B']), 1u64 << 30)
    } else if size.ends_with("MB") || size.ends_with('M') {
        (size.trim_end_matches(['M', 'B']), 1u64 << 20)
    } else if size.ends_with("KB") || size.ends_with('K') {
        (size.trim_end_matches(['K', 'B']), 1u64 << 10)
    } else if size.ends_with('B') {
        (size.trim_end_matches('B'), 1u64)
    } else {
        // Assume bytes if no suffix
        (size.as_str(), 1u64)
    };

    let num: f64 = num_str
        .trim()
        .parse()
        .map_err(|_| format!("Invalid number: {}", num_str))?;

    if !num.is_finite() || num < 0.0 {
        return Err(format!("Invalid number: {}", num_str));
    }

    Ok((num * multiplier as f64) as u64)
}

/// Parse a size that must also fit the address space
pub fn parse_size_usize(size: &str) -> std::result::Result<usize, String> {
    let bytes = parse_size(size)?;
    usize::try_from(bytes).map_err(|_| format!("Size too large for this platform: {}", size))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_size() {
        assert_eq!(parse_size("1024").unwrap(), 1024);
        assert_eq!(parse_size("1K").unwrap(), 1024);
        assert_eq!(parse_size("1KB").unwrap(), 1024);
        assert_eq!(parse_size("1M").unwrap(), 1024 * 1024);
        assert_eq!(parse_size("1G").unwrap(), 1024 * 1024 * 1024);
        assert_eq!(parse_size("2.5G").unwrap(), 5 << 29);
        assert!(parse_size("").is_err());
        assert!(parse_size("abc").is_err());
        assert!(parse_size("-1G").is_err());
    }

    #[test]
    fn test_pool_config_resolution() {
        assert_eq!(PoolConfig::with_threads(3).resolved_threads(), 3);
        assert_eq!(PoolConfig::default().resolved_threads(), num_cpus::get().max(1));
        assert_eq!(PoolConfig::global().thread_name_prefix, DEFAULT_THREAD_PREFIX);
    }

    #[test]
    fn test_copy_config() {
        let config = CopyConfig::default();
        assert_eq!(config.block_size, 1 << 30);
        assert_eq!(config.parallel_threshold(), 2 << 30);
        assert!(config.validate().is_ok());

        assert!(CopyConfig::with_block_size(0).validate().is_err());
        assert_eq!(CopyConfig::with_block_size(usize::MAX).parallel_threshold(), usize::MAX);
    }

    #[test]
    fn test_bench_config_from_cli() {
        let args = CliArgs::parse_from([
            "poolcopy", "bench", "--size", "64M", "-b", "8M", "-t", "4", "--verify",
        ]);
        let config = BenchConfig::from_cli(&args.command).unwrap();

        assert_eq!(config.size, 64 << 20);
        assert_eq!(config.copy.block_size, 8 << 20);
        assert_eq!(config.pool.threads, 4);
        assert_eq!(config.iterations, 3);
        assert!(config.verify);
        assert_eq!(config.output_format, OutputFormat::Text);
    }

    #[test]
    fn test_bench_config_rejects_bad_input() {
        let args = CliArgs::parse_from(["poolcopy", "bench", "-b", "0"]);
        assert!(BenchConfig::from_cli(&args.command).is_err());

        let args = CliArgs::parse_from(["poolcopy", "bench", "-n", "0"]);
        assert!(BenchConfig::from_cli(&args.command).is_err());

        let args = CliArgs::parse_from(["poolcopy", "plan", "--size", "1G"]);
        assert!(BenchConfig::from_cli(&args.command).is_err());
    }

    #[test]
    fn test_config_serialization() {
        let config = PoolConfig::with_threads(2);
        let json = serde_json::to_string(&config).unwrap();
        let back: PoolConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }
}
