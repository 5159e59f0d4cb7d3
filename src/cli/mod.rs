// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// Entry point for all user interaction, parsed with clap. All
// business logic is delegated to Layer 2 (application); this
// layer only routes and prints.
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

pub mod commands;

use std::path::Path;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, ReportArgs, TrainArgs};

#[derive(Parser, Debug)]
#[command(
    name = "radioclass",
    version = "0.1.0",
    about = "Train CNN and transformer-encoder modulation classifiers on radio IQ datasets."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Train(args) => Self::run_train(args),
            Commands::Report(args) => Self::run_report(args),
        }
    }

    /// Handles the `train` subcommand: load (or default) the
    /// training configuration and hand off to Layer 2.
    fn run_train(args: TrainArgs) -> Result<()> {
        use crate::application::train_use_case::{TrainConfig, TrainUseCase};

        let config = match &args.config {
            Some(path) => TrainConfig::from_file(Path::new(path))?,
            None => TrainConfig::default(),
        };
        tracing::info!(
            "Training '{}' on dataset '{}'",
            config.model_name,
            config.dataset_name,
        );

        let use_case = TrainUseCase::new(config);
        use_case.execute(Path::new(&args.save_path), args.dump_model)?;

        println!("Experiment complete. Results written to {}", args.save_path);
        Ok(())
    }

    /// Handles the `report` subcommand: read results.json back and
    /// print a human-readable summary.
    fn run_report(args: ReportArgs) -> Result<()> {
        use crate::infra::results::ResultsStore;
        use crate::ml::evaluator::OVERALL_KEY;

        let record = ResultsStore::new(&args.save_path).load()?;

        println!("Model:      {}", record.model_name);
        println!("Parameters: {}", record.n_parameters);
        if let Some(history) = &record.train_history {
            println!("Epochs:     {}", history.loss.len());
        }
        if let Some(acc) = &record.cls_to_acc_test {
            if let Some(overall) = acc.get(OVERALL_KEY) {
                println!("Test accuracy: {:.4}", overall);
            }
            for (class, value) in acc.iter().filter(|(k, _)| k.as_str() != OVERALL_KEY) {
                println!("  {class:10} {value:.4}");
            }
        }
        if let Some(by_snr) = &record.snr_to_acc_test {
            println!("Accuracy by SNR:");
            for (snr, value) in by_snr {
                println!("  {snr:>4} dB   {value:.4}");
            }
        }
        if let Some(path) = &record.path_to_weights {
            println!("Weights:    {path}");
        }
        Ok(())
    }
}
