// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// Entry point for all user interaction, parsed with clap.
// All work is delegated to Layer 2 (application).
//
// Two commands are supported:
//   1. `run`     — train, evaluate, sweep drift, render charts
//   2. `dataset` — export the synthetic sequence as CSV

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, DatasetArgs, RunArgs};

use crate::application::{
    dataset_use_case::DatasetUseCase,
    experiment_use_case::ExperimentUseCase,
};

#[derive(Parser, Debug)]
#[command(
    name = "analog-rnn",
    version,
    about = "Hardware-aware training of an analog RNN with simulated conductance drift."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Dispatch to the matching use case.
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Run(args)     => run_experiment(args),
            Commands::Dataset(args) => run_dataset(args),
        }
    }
}

fn run_experiment(args: RunArgs) -> Result<()> {
    let use_case = ExperimentUseCase::new(args.into());
    tracing::info!("Starting experiment, results in '{}'", use_case.config().results_dir.display());

    let run = use_case.execute()?;

    println!("Test Perplexity = {:.6}", run.report.baseline.perplexity());
    for path in &run.artifacts {
        println!("  wrote {}", path.display());
    }
    Ok(())
}

fn run_dataset(args: DatasetArgs) -> Result<()> {
    let out = args.out.clone();
    let sample = DatasetUseCase::new(args.into()).execute()?;
    println!("Dataset {:?} written to {}", sample.shape(), out.display());
    Ok(())
}
