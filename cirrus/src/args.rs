use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use libcirrus::search::{Passes, StorageKind};

#[derive(Subcommand)]
pub enum SubCommands {
    #[command(about = "Run every task in a batch and write a table of scores")]
    Search(SearchArgs),
    #[command(about = "Write a random batch of profiles, sequences and tasks")]
    Generate(GenerateArgs),
}

#[derive(Parser)]
#[command(name = "cirrus")]
#[command(about = "Score batches of profile HMM alignments inside sparse edge bounds")]
pub struct Cli {
    #[command(subcommand)]
    pub command: SubCommands,
}

#[derive(Args, Debug, Clone)]
pub struct CommonArgs {
    /// The number of threads that cirrus will use
    #[arg(
        short = 't',
        long = "threads",
        default_value_t = 8usize,
        value_name = "n"
    )]
    pub num_threads: usize,

    /// Allow cirrus to overwrite files
    #[arg(short = 'q', long = "allow-overwrite", default_value_t = false)]
    pub allow_overwrite: bool,
}

#[derive(Debug, Args)]
pub struct SearchArgs {
    /// The batch of profiles, sequences and tasks
    #[arg(value_name = "BATCH.json")]
    pub batch_path: PathBuf,

    /// Where to place tabular output (stdout if not set)
    #[arg(short = 'o', long = "output", value_name = "path")]
    pub output_path: Option<PathBuf>,

    /// Where to place traceback dumps
    #[arg(long = "trace-output", value_name = "path")]
    pub trace_output_path: Option<PathBuf>,

    /// The matrix storage used by the score passes
    #[arg(long = "storage", default_value_t = StorageKind::Quadratic, value_name = "kind")]
    pub storage: StorageKind,

    /// Skip the backward pass
    #[arg(long = "no-backward", action)]
    pub no_backward: bool,

    /// Skip the viterbi pass
    #[arg(long = "no-viterbi", action)]
    pub no_viterbi: bool,

    /// Recover the best path of every task
    #[arg(long = "traceback", action)]
    pub traceback: bool,

    /// Configure each profile for the length of its target sequence
    #[arg(long = "configure-length", action)]
    pub configure_length: bool,

    /// Reject tasks whose bounds hold more than this many cells
    #[arg(long = "max-cells", value_name = "N")]
    pub max_cells: Option<usize>,

    /// Arguments that are common across all cirrus subcommands
    #[command(flatten)]
    pub common_args: CommonArgs,
}

impl SearchArgs {
    pub fn passes(&self) -> Passes {
        Passes {
            forward: true,
            backward: !self.no_backward,
            viterbi: !self.no_viterbi || self.traceback,
            traceback: self.traceback,
        }
    }
}

#[derive(Debug, Args)]
pub struct GenerateArgs {
    /// Where to place the batch
    #[arg(short = 'o', long = "output", default_value = "batch.json", value_name = "path")]
    pub output_path: PathBuf,

    /// The number of random profiles
    #[arg(long = "profiles", default_value_t = 4usize, value_name = "N")]
    pub num_profiles: usize,

    /// The number of random sequences
    #[arg(long = "sequences", default_value_t = 16usize, value_name = "N")]
    pub num_sequences: usize,

    /// The shortest profile or sequence
    #[arg(long = "min-length", default_value_t = 50usize, value_name = "N")]
    pub min_length: usize,

    /// The longest profile or sequence
    #[arg(long = "max-length", default_value_t = 300usize, value_name = "N")]
    pub max_length: usize,

    /// Bound every task to a diagonal band of this radius instead of the full matrix
    #[arg(long = "band", value_name = "N")]
    pub band_radius: Option<usize>,

    /// The random seed
    #[arg(long = "seed", default_value_t = 0u64, value_name = "N")]
    pub seed: u64,

    /// Arguments that are common across all cirrus subcommands
    #[command(flatten)]
    pub common_args: CommonArgs,
}
