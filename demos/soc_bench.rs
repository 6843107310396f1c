//! SoC Doorbell Sweep Example
//!
//! This example composes a small system-on-chip test bench:
//! - An application driver that loads a program and rings a doorbell
//! - A functional processor executing the program from memory
//! - A memory region registered with the engine
//!
//! The doorbell connection is swept over latency and capacity for two
//! drivers, a straight-line program and a loop, and the winners compared.
//!
//! Run with: `cargo run --example soc_bench`

use std::sync::Arc;

use hestia::bench::SOC_BENCH_CONNECTION;
use hestia::{Driver, Experiment, ExperimentAxis, FifoModelEngine, RunOptions, SocTestBench};

const MEMORY_NAME: &str = "dram";
const MEMORY_SIZE: u64 = 64 * 1024;

fn axes() -> Vec<ExperimentAxis> {
    vec![
        ExperimentAxis::new("latency", "l", [0, 1, 2, 4]),
        ExperimentAxis::new("capacity", "c", [1, 2, 4]),
    ]
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    hestia::init_logging("warn");

    println!("╔══════════════════════════════════════════════════════════╗");
    println!("║           SoC Doorbell Sweep                             ║");
    println!("╠══════════════════════════════════════════════════════════╣");
    println!("║   Swept connection: {:<37}║", SOC_BENCH_CONNECTION);
    println!("║   Memory region:    {:<37}║", MEMORY_NAME);
    println!("╚══════════════════════════════════════════════════════════╝");
    println!();

    let drivers = [
        ("simple", Driver::Simple),
        (
            "loop",
            Driver::Loop {
                iterations: 16,
                ops_per_iteration: 8,
            },
        ),
    ];

    for (label, driver) in drivers {
        let bench = SocTestBench::new(driver).with_memory(MEMORY_NAME, MEMORY_SIZE);
        let experiment = Experiment::new(
            format!("soc_{}", label),
            axes(),
            Arc::new(bench),
            Arc::new(FifoModelEngine),
        )?
        .with_options(RunOptions::new().with_step_cap(Some(100_000)));

        let report = experiment.run()?;
        println!("Driver: {}", label);
        println!(
            "  Cases: {} succeeded, {} failed",
            report.outcome.results.len(),
            report.outcome.failures.len()
        );
        match &report.selection.winner {
            Some(winner) => println!(
                "  Winner: {} ({} clocks, area {})",
                winner.name, winner.clocks, winner.area
            ),
            None => println!("  No case succeeded"),
        }
        for failure in &report.outcome.failures {
            println!("  {} failed ({}): {}", failure.name, failure.kind(), failure.error);
        }
        println!();
    }

    Ok(())
}
