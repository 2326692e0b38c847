// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the two subcommands, `run` and `dataset`, and all
// their configurable flags. Defaults reproduce the reference
// experiment: 501 samples, 5 batch elements, 100 epochs.
//
// Reference: Rust Book §12 (Building a CLI Program)

use std::path::PathBuf;

use clap::{Args, Subcommand, ValueEnum};

use crate::application::{dataset_use_case::DatasetConfig, experiment_use_case::TrainConfig};
use crate::ml::{analog::AnalogTileConfig, recurrent::CellKind};

/// The two top-level subcommands available to the user
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Train the analog RNN, evaluate it and sweep drift
    Run(RunArgs),

    /// Write the synthetic training sequence as CSV
    Dataset(DatasetArgs),
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum CellArg {
    Vanilla,
    Lstm,
    Gru,
}

impl From<CellArg> for CellKind {
    fn from(c: CellArg) -> Self {
        match c {
            CellArg::Vanilla => CellKind::Vanilla,
            CellArg::Lstm    => CellKind::Lstm,
            CellArg::Gru     => CellKind::Gru,
        }
    }
}

/// All arguments for the `run` command.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Number of samples of the base signal (input/target are one shorter)
    #[arg(long, default_value_t = 501)]
    pub seq_len: usize,

    /// Number of phase-shifted copies of the signal
    #[arg(long, default_value_t = 5)]
    pub batch_size: usize,

    /// Number of full-batch training steps
    #[arg(long, default_value_t = 100)]
    pub epochs: usize,

    #[arg(long, default_value_t = 0.05)]
    pub lr: f64,

    /// Width of the analog input projection
    #[arg(long, default_value_t = 20)]
    pub embed_size: usize,

    #[arg(long, default_value_t = 50)]
    pub hidden_size: usize,

    /// Number of stacked recurrent layers
    #[arg(long, default_value_t = 1)]
    pub num_layers: usize,

    #[arg(long, default_value_t = 0.0)]
    pub dropout: f64,

    /// Upper bound of the uniform noise added to the dataset
    #[arg(long, default_value_t = 0.0)]
    pub noise: f64,

    #[arg(long, value_enum, default_value_t = CellArg::Vanilla)]
    pub cell: CellArg,

    /// Feed the raw input straight into the recurrent layer
    #[arg(long)]
    pub no_embedding: bool,

    /// Run the recurrent layer forward in time only
    #[arg(long)]
    pub unidirectional: bool,

    /// Disable all tile noise (training perturbations, programming and read noise)
    #[arg(long)]
    pub ideal_tiles: bool,

    /// Seed for dataset noise, weight init and tile noise
    #[arg(long)]
    pub seed: Option<u64>,

    #[arg(long, default_value = "results/RNN")]
    pub results_dir: PathBuf,
}

/// Convert CLI RunArgs into the application-layer TrainConfig.
/// The application layer never sees clap types.
impl From<RunArgs> for TrainConfig {
    fn from(a: RunArgs) -> Self {
        TrainConfig {
            seq_len:       a.seq_len,
            batch_size:    a.batch_size,
            epochs:        a.epochs,
            lr:            a.lr,
            embed_size:    a.embed_size,
            hidden_size:   a.hidden_size,
            num_layers:    a.num_layers,
            dropout:       a.dropout,
            noise:         a.noise,
            cell:          a.cell.into(),
            embedding:     !a.no_embedding,
            bidirectional: !a.unidirectional,
            tile:          if a.ideal_tiles { AnalogTileConfig::ideal() } else { AnalogTileConfig::default() },
            seed:          a.seed,
            results_dir:   a.results_dir,
        }
    }
}

/// All arguments for the `dataset` command
#[derive(Args, Debug)]
pub struct DatasetArgs {
    #[arg(long, default_value_t = 501)]
    pub seq_len: usize,

    #[arg(long, default_value_t = 5)]
    pub batch_size: usize,

    #[arg(long, default_value_t = 0.0)]
    pub noise: f64,

    #[arg(long)]
    pub seed: Option<u64>,

    /// CSV file to write
    #[arg(long)]
    pub out: PathBuf,
}

impl From<DatasetArgs> for DatasetConfig {
    fn from(a: DatasetArgs) -> Self {
        DatasetConfig {
            seq_len:    a.seq_len,
            batch_size: a.batch_size,
            noise:      a.noise,
            seed:       a.seed,
            out:        a.out,
        }
    }
}
