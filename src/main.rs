//! PoolCopy CLI - Parallel Memory Copy Benchmark
//!
//! Measures block-parallel memory copies on a fixed worker pool.

use clap::Parser;
use poolcopy::bench::{run_bench, run_plan};
use poolcopy::config::{parse_size_usize, BenchConfig, CliArgs, Commands, CopyConfig};
use poolcopy::error::{PoolCopyError, Result};
use tracing_subscriber::EnvFilter;

fn main() {
    // Parse CLI arguments
    let args = CliArgs::parse();

    // Initialize logging
    init_logging(args.verbose, args.quiet);

    // Handle result
    if let Err(e) = run(args) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

/// RUST_LOG wins over -v/-q when set
fn init_logging(verbose: u8, quiet: bool) {
    let default_level = if quiet {
        "error"
    } else {
        match verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn run(args: CliArgs) -> Result<()> {
    match &args.command {
        command @ Commands::Bench { .. } => cmd_bench(command),
        Commands::Plan {
            size,
            block_size,
            output_format,
        } => {
            let size = parse_size_usize(size)
                .map_err(|e| PoolCopyError::config(format!("Invalid size: {}", e)))?;
            let block_size = parse_size_usize(block_size)
                .map_err(|e| PoolCopyError::config(format!("Invalid block size: {}", e)))?;

            let report = run_plan(size, CopyConfig::with_block_size(block_size))?;
            println!("{}", report.render(*output_format)?.trim_end());
            Ok(())
        }
    }
}

fn cmd_bench(command: &Commands) -> Result<()> {
    let config = BenchConfig::from_cli(command)?;
    let report = run_bench(&config)?;

    println!("{}", report.render(config.output_format)?.trim_end());

    if report.verified == Some(false) {
        std::process::exit(1);
    }

    Ok(())
}
