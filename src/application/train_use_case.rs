// ============================================================
// Layer 2 — TrainUseCase
// ============================================================
// Orchestrates one experiment in order:
//
//   Step 1: Seed every randomness source
//   Step 2: Construct dataset via registry and load it  (Layer 4)
//   Step 3: Compute the train/val/test split            (Layer 4)
//   Step 4: Patch n_classes from the loaded class list
//   Step 5: Verify shapes and build the network         (Layer 5)
//   Step 6: Fit with Adam and the LR schedule           (Layer 5)
//   Step 7: Evaluate the val and test splits            (Layer 5)
//   Step 8: Persist the experiment record               (Layer 6)
//
// Nothing is caught here: any failure aborts the experiment and
// surfaces through the CLI.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use burn::prelude::*;
use ndarray::{Array3, Axis};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::data::dataset::FrameDataset;
use crate::data::registry::{make_dataset, DatasetParams};
use crate::domain::error::PipelineError;
use crate::domain::sample::DatasetPath;
use crate::infra::results::{ExperimentRecord, ResultsStore};
use crate::ml::config::ModelConfig;
use crate::ml::evaluator::{evaluate_overall_and_per_class, evaluate_per_snr};
use crate::ml::registry::make_model;
use crate::ml::trainer::{fit, FitSettings};
use crate::ml::{default_device, TrainBackend};

// ─── Training Configuration ──────────────────────────────────────────────────
// Everything one experiment needs, serialisable so runs can be
// described by a JSON file and reproduced from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainConfig {
    pub dataset_name: String,
    pub dataset_path: DatasetPath,
    pub model_name: String,
    pub model_config: ModelConfig,
    pub n_epochs: usize,
    pub batch_size: usize,
    #[serde(default)]
    pub dataset_params: DatasetParams,
    pub seed: u64,
    #[serde(default = "default_train_frac")]
    pub train_frac: f64,
    #[serde(default = "default_val_frac")]
    pub val_frac: f64,
}

fn default_train_frac() -> f64 {
    0.8
}

fn default_val_frac() -> f64 {
    0.1
}

impl Default for TrainConfig {
    fn default() -> Self {
        use crate::data::registry::RADIOML_2016;
        use crate::ml::config::{CnnConfig, Padding, CNN_1D_V01X};

        Self {
            dataset_name: RADIOML_2016.to_string(),
            dataset_path: DatasetPath::Single("data/radioml_2016.json".into()),
            model_name: CNN_1D_V01X.to_string(),
            model_config: ModelConfig::Cnn(CnnConfig {
                input_shape: (128, 2),
                n_classes: 11,
                output_channels: vec![32, 48, 64, 96, 128, 192],
                kernel_sizes: vec![8; 6],
                paddings: vec![Padding::Same; 6],
                max_pool_sizes: vec![1, 1, 2, 1, 2, 1],
                max_pool_strides: vec![1, 1, 2, 1, 2, 1],
                avg_size: 32,
                dense_sizes: vec![],
            }),
            n_epochs: 24,
            batch_size: 512,
            dataset_params: DatasetParams::default(),
            seed: 1234,
            train_frac: default_train_frac(),
            val_frac: default_val_frac(),
        }
    }
}

impl TrainConfig {
    /// Read a configuration from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Cannot read training config '{}'", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("Cannot parse training config '{}'", path.display()))
    }
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
pub struct TrainUseCase {
    config: TrainConfig,
}

impl TrainUseCase {
    pub fn new(config: TrainConfig) -> Self {
        Self { config }
    }

    /// Run the full experiment and persist its artifacts under
    /// `save_path`.
    pub fn execute(&self, save_path: &Path, dump_model: bool) -> Result<()> {
        let cfg = &self.config;

        // ── Step 1: Seed every randomness source ──────────────────────────────
        // Core randomness (split shuffle) and the tensor framework.
        // Downstream components never reseed.
        let mut rng = StdRng::seed_from_u64(cfg.seed);
        TrainBackend::seed(cfg.seed);
        tracing::info!("Seeded all randomness sources with {}", cfg.seed);

        // ── Step 2: Construct and load the dataset ────────────────────────────
        let mut dataset = make_dataset(&cfg.dataset_name, &cfg.dataset_params)?;
        dataset.load(&cfg.dataset_path, false)?;

        // ── Step 3: Train/val/test split ──────────────────────────────────────
        let split = dataset
            .split(cfg.train_frac, cfg.val_frac, false, &mut rng)?
            .clone();
        tracing::info!(
            "Split: {} train, {} val, {} test",
            split.train.len(),
            split.val.len(),
            split.test.len(),
        );

        // ── Step 4: Patch n_classes from the loaded class list ────────────────
        // The configured value is a placeholder; the dataset decides.
        let modulations = dataset.modulations()?.to_vec();
        let mut model_config = cfg.model_config.clone();
        model_config.set_n_classes(modulations.len());

        // ── Step 5: Verify shapes, then build the network ─────────────────────
        let data = dataset.data()?;
        if data.ndim() != dataset.expected_rank() {
            return Err(PipelineError::InvalidConfiguration(format!(
                "dataset '{}' delivered rank {} data, declared {}",
                cfg.dataset_name,
                data.ndim(),
                dataset.expected_rank()
            ))
            .into());
        }
        let per_sample = (data.shape()[1], data.shape()[2]);
        if model_config.input_shape() != per_sample {
            return Err(PipelineError::InvalidConfiguration(format!(
                "model input_shape {:?} does not match loaded samples {:?}",
                model_config.input_shape(),
                per_sample
            ))
            .into());
        }

        let device = default_device();
        let network = make_model::<TrainBackend>(&cfg.model_name, &model_config, &device)?;
        let n_parameters = network.num_params();
        tracing::info!("Built '{}' with {} parameters", cfg.model_name, n_parameters);

        // ── Step 6: Fit ───────────────────────────────────────────────────────
        let labels = dataset.labels()?;
        let train_dataset = FrameDataset::from_indices(data, labels, &split.train);
        let val_dataset = FrameDataset::from_indices(data, labels, &split.val);
        let settings = FitSettings {
            n_epochs: cfg.n_epochs,
            batch_size: cfg.batch_size,
            shuffle_seed: cfg.seed,
        };
        let (network, history) = fit(network, train_dataset, val_dataset, &settings, &device)?;

        // ── Step 7: Evaluate the val and test splits ──────────────────────────
        let network_eval = network.valid();
        let snrs = dataset.snrs_per_sample()?;
        let gather = |indices: &[usize]| -> (Array3<f32>, Vec<usize>, Vec<i32>) {
            (
                data.select(Axis(0), indices),
                indices.iter().map(|&i| labels[i]).collect(),
                indices.iter().map(|&i| snrs[i]).collect(),
            )
        };

        let mut record =
            ExperimentRecord::new(model_config, cfg.model_name.clone(), n_parameters);
        record.train_history = Some(history);

        if !split.val.is_empty() {
            let (val_data, val_labels, val_snrs) = gather(&split.val);
            let (cm, cls_to_acc) = evaluate_overall_and_per_class(
                &network_eval,
                &val_data,
                &val_labels,
                &modulations,
                &device,
            )?;
            record.snr_to_acc_val = Some(evaluate_per_snr(
                &network_eval,
                &val_data,
                &val_labels,
                &val_snrs,
                &device,
            )?);
            record.cm_val = Some(cm);
            record.cls_to_acc_val = Some(cls_to_acc);
        }

        let (test_data, test_labels, test_snrs) = gather(&split.test);
        let (cm, cls_to_acc) = evaluate_overall_and_per_class(
            &network_eval,
            &test_data,
            &test_labels,
            &modulations,
            &device,
        )?;
        if let Some(overall) = cls_to_acc.get(crate::ml::evaluator::OVERALL_KEY) {
            tracing::info!("Test accuracy: {:.4}", overall);
        }
        record.snr_to_acc_test = Some(evaluate_per_snr(
            &network_eval,
            &test_data,
            &test_labels,
            &test_snrs,
            &device,
        )?);
        record.cm_test = Some(cm);
        record.cls_to_acc_test = Some(cls_to_acc);

        // ── Step 8: Persist ───────────────────────────────────────────────────
        let store = ResultsStore::new(save_path);
        if dump_model {
            record.path_to_weights = Some(store.save_weights(&network)?);
        }
        store.save(&record)?;

        Ok(())
    }
}
