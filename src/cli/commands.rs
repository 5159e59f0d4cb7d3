// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Two subcommands: `train` runs one experiment, `report` prints
// a summary of a persisted one. Every other knob lives in the
// training configuration record, not on the command line.
//
// Reference: Rust Book §12 (Building a CLI Program)

use clap::{Args, Subcommand};

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Train a modulation classifier and persist the experiment
    Train(TrainArgs),

    /// Summarize a persisted experiment directory
    Report(ReportArgs),
}

#[derive(Args, Debug)]
pub struct TrainArgs {
    /// Directory to write results.json (and model weights) into
    #[arg(long)]
    pub save_path: String,

    /// Path to a training configuration JSON; omit to run the
    /// built-in default configuration
    #[arg(long)]
    pub config: Option<String>,

    /// Also dump the learned parameters next to results.json
    #[arg(long, default_value_t = false)]
    pub dump_model: bool,
}

#[derive(Args, Debug)]
pub struct ReportArgs {
    /// Directory holding a results.json written by `train`
    #[arg(long)]
    pub save_path: String,
}
