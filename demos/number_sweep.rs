//! Number Producer/Consumer Sweep Example
//!
//! This example sweeps the timing parameters of a single FIFO connection
//! between a number producer and a number consumer:
//! - Read and write rates
//! - Transfer latency
//! - Capacity
//!
//! It showcases:
//! - Building an experiment in code with the config builder
//! - Running cases on the worker pool
//! - Ranking results and writing the report directory
//!
//! Run with: `cargo run --example number_sweep [output_dir]`

use std::sync::Arc;

use hestia::config::ExperimentConfigBuilder;
use hestia::{Experiment, FifoModelEngine};

const NUM_TRANSACTIONS: u64 = 100;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let output_dir = std::env::args().nth(1).unwrap_or_else(|| "number_sweep_results".to_string());

    let config = ExperimentConfigBuilder::new()
        .name("number_sweep")
        .output_dir(output_dir.as_str())
        .num_transactions(NUM_TRANSACTIONS)
        .add_axis("read_rate", "r", vec![1, 2])
        .add_axis("write_rate", "w", vec![1, 2])
        .add_axis("latency", "l", vec![0, 1, 4])
        .add_axis("capacity", "c", vec![1, 2, 8])
        .build()?;

    hestia::init_logging(&config.experiment.log_level);

    println!("╔══════════════════════════════════════════════════════════╗");
    println!("║           Number Producer/Consumer Sweep                 ║");
    println!("╚══════════════════════════════════════════════════════════╝");
    println!();

    let experiment = Experiment::from_config(&config, Arc::new(FifoModelEngine))?;
    println!("Cases:        {}", experiment.space().len());
    println!("Transactions: {}", NUM_TRANSACTIONS);
    println!();

    let report = experiment.run_and_report()?;

    println!("Top 5:");
    for (rank, entry) in report.selection.top_5.iter().enumerate() {
        println!("  {}. {:<20} {:>6} clocks (area {})", rank + 1, entry.name.as_str(), entry.clocks, entry.area);
    }
    println!();

    match &report.selection.winner {
        Some(winner) => println!("Winner: {} ({} clocks, area {})", winner.name, winner.clocks, winner.area),
        None => println!("No case succeeded"),
    }
    println!();
    println!("{}", report.stats.summary());
    println!("Reports written to {}", output_dir);

    Ok(())
}
