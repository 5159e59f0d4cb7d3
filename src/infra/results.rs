// ============================================================
// Layer 6 — Results Serializer
// ============================================================
// Persists one experiment as a directory:
//
//   <dir>/results.json           always (when saved)
//   <dir>/model_weights.mpk.gz   only when weights are dumped
//
// results.json is UTF-8 JSON with 4-space indentation. Fields the
// run did not produce are omitted, not written as null. SNR-keyed
// maps can only carry string keys in JSON; serde writes the i32
// keys as strings and parses them back to numbers on load, so a
// record survives the round trip with numeric identity intact
// (and fails loudly on an unparsable key).
//
// Weights go through Burn's CompactRecorder, the same recorder
// that restores them into a rebuilt network on load.
//
// Reference: Burn Book §5 (Records and Checkpointing)

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use burn::prelude::*;
use burn::record::{CompactRecorder, Recorder};
use serde::{Deserialize, Serialize};

use crate::domain::error::{PipelineError, Result};
use crate::ml::config::ModelConfig;
use crate::ml::registry::{make_model, Network};

pub const RESULTS_FILE: &str = "results.json";
pub const WEIGHTS_FILE: &str = "model_weights";

/// Per-epoch training curves, one entry per epoch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainHistory {
    pub loss: Vec<f64>,
    pub accuracy: Vec<f64>,
    pub val_loss: Vec<f64>,
    pub val_accuracy: Vec<f64>,
}

/// Everything one experiment leaves behind. Matrices are nested
/// integer lists; accuracy maps are keyed by class name or SNR.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentRecord {
    pub model_configuration: ModelConfig,
    pub model_name: String,
    pub n_parameters: usize,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub train_history: Option<TrainHistory>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cm_val: Option<Vec<Vec<u64>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cls_to_acc_val: Option<BTreeMap<String, f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snr_to_acc_val: Option<BTreeMap<i32, f64>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cm_test: Option<Vec<Vec<u64>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cls_to_acc_test: Option<BTreeMap<String, f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snr_to_acc_test: Option<BTreeMap<i32, f64>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path_to_weights: Option<String>,
}

impl ExperimentRecord {
    /// A record carrying only the mandatory fields.
    pub fn new(model_configuration: ModelConfig, model_name: String, n_parameters: usize) -> Self {
        Self {
            model_configuration,
            model_name,
            n_parameters,
            train_history: None,
            cm_val: None,
            cls_to_acc_val: None,
            snr_to_acc_val: None,
            cm_test: None,
            cls_to_acc_test: None,
            snr_to_acc_test: None,
            path_to_weights: None,
        }
    }
}

/// Reads and writes one experiment directory.
pub struct ResultsStore {
    dir: PathBuf,
}

impl ResultsStore {
    /// Create a store over `dir`, creating the directory if needed.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        fs::create_dir_all(&dir).ok();
        Self { dir }
    }

    pub fn results_path(&self) -> PathBuf {
        self.dir.join(RESULTS_FILE)
    }

    /// Write results.json (4-space indented). Returns the file path.
    pub fn save(&self, record: &ExperimentRecord) -> Result<PathBuf> {
        let path = self.results_path();

        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
        record.serialize(&mut serializer)?;
        buf.push(b'\n');

        fs::write(&path, &buf).map_err(|e| PipelineError::io(&path, e))?;
        tracing::info!("Wrote experiment record to '{}'", path.display());
        Ok(path)
    }

    /// Read results.json back into a record.
    pub fn load(&self) -> Result<ExperimentRecord> {
        let path = self.results_path();
        let text = fs::read_to_string(&path).map_err(|e| PipelineError::io(&path, e))?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Dump the learned parameters next to results.json. Returns the
    /// recorded path stem (the recorder appends its extension) for
    /// the record's `path_to_weights` field.
    pub fn save_weights<B: Backend>(&self, network: &Network<B>) -> Result<String> {
        let stem = self.dir.join(WEIGHTS_FILE);
        let recorder = CompactRecorder::new();
        match network {
            Network::Cnn(m) => recorder.record(m.clone().into_record(), stem.clone()),
            Network::Transformer(m) => recorder.record(m.clone().into_record(), stem.clone()),
        }
        .map_err(|e| PipelineError::Recorder(format!("{e:?}")))?;

        tracing::info!("Dumped model weights to '{}'", stem.display());
        Ok(stem.to_string_lossy().into_owned())
    }

    /// Rebuild the network named by the record and restore its
    /// weights. Fails with MissingWeightsPath if the record never
    /// dumped any.
    pub fn load_network<B: Backend>(
        &self,
        record: &ExperimentRecord,
        device: &B::Device,
    ) -> Result<Network<B>> {
        let stem = record
            .path_to_weights
            .as_ref()
            .ok_or(PipelineError::MissingWeightsPath)?;

        let network = make_model::<B>(&record.model_name, &record.model_configuration, device)?;
        let recorder = CompactRecorder::new();
        let loaded = match network {
            Network::Cnn(m) => {
                let rec = recorder
                    .load(PathBuf::from(stem), device)
                    .map_err(|e| PipelineError::Recorder(format!("{e:?}")))?;
                Network::Cnn(m.load_record(rec))
            }
            Network::Transformer(m) => {
                let rec = recorder
                    .load(PathBuf::from(stem), device)
                    .map_err(|e| PipelineError::Recorder(format!("{e:?}")))?;
                Network::Transformer(m.load_record(rec))
            }
        };
        Ok(loaded)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::config::{CnnConfig, Padding, CNN_1D_V01X};
    use crate::ml::EvalBackend;

    fn tiny_config() -> ModelConfig {
        ModelConfig::Cnn(CnnConfig {
            input_shape: (8, 2),
            n_classes: 3,
            output_channels: vec![4],
            kernel_sizes: vec![3],
            paddings: vec![Padding::Same],
            max_pool_sizes: vec![1],
            max_pool_strides: vec![1],
            avg_size: 2,
            dense_sizes: vec![],
        })
    }

    fn full_record() -> ExperimentRecord {
        let mut record = ExperimentRecord::new(tiny_config(), CNN_1D_V01X.to_string(), 1234);
        record.train_history = Some(TrainHistory {
            loss: vec![1.5, 0.9],
            accuracy: vec![0.4, 0.7],
            val_loss: vec![1.6, 1.0],
            val_accuracy: vec![0.3, 0.6],
        });
        record.cm_test = Some(vec![vec![5, 1, 0], vec![0, 6, 0], vec![1, 1, 4]]);
        record.cls_to_acc_test = Some(
            [("Overall".to_string(), 0.83), ("QPSK".to_string(), 1.0)]
                .into_iter()
                .collect(),
        );
        // Negative SNR keys must survive the string round trip
        record.snr_to_acc_test = Some([(-4, 0.5), (0, 0.75), (6, 0.9)].into_iter().collect());
        record
    }

    #[test]
    fn test_record_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = ResultsStore::new(dir.path());

        let record = full_record();
        store.save(&record).unwrap();
        let loaded = store.load().unwrap();
        assert_eq!(loaded, record);

        // Numeric identity of the SNR keys, not just string equality
        let snr_acc = loaded.snr_to_acc_test.unwrap();
        assert!((snr_acc[&-4] - 0.5).abs() < 1e-12);
        assert!((snr_acc[&6] - 0.9).abs() < 1e-12);
    }

    #[test]
    fn test_absent_fields_are_omitted() {
        let dir = tempfile::tempdir().unwrap();
        let store = ResultsStore::new(dir.path());

        let record = ExperimentRecord::new(tiny_config(), CNN_1D_V01X.to_string(), 77);
        let path = store.save(&record).unwrap();

        let text = fs::read_to_string(path).unwrap();
        assert!(!text.contains("train_history"));
        assert!(!text.contains("cm_val"));
        assert!(!text.contains("path_to_weights"));
        assert!(text.contains("\"n_parameters\": 77"));
    }

    #[test]
    fn test_results_json_uses_four_space_indent() {
        let dir = tempfile::tempdir().unwrap();
        let store = ResultsStore::new(dir.path());
        store.save(&full_record()).unwrap();

        let text = fs::read_to_string(store.results_path()).unwrap();
        let second_line = text.lines().nth(1).unwrap();
        assert!(second_line.starts_with("    \""));
        assert!(!second_line.starts_with("     "));
    }

    #[test]
    fn test_unparsable_snr_key_fails_loudly() {
        let dir = tempfile::tempdir().unwrap();
        let store = ResultsStore::new(dir.path());

        store.save(&full_record()).unwrap();
        let text = fs::read_to_string(store.results_path()).unwrap();
        let broken = text.replace("\"-4\"", "\"low\"");
        fs::write(store.results_path(), broken).unwrap();

        assert!(matches!(
            store.load().unwrap_err(),
            PipelineError::Json(_)
        ));
    }

    #[test]
    fn test_load_network_requires_weights_path() {
        let dir = tempfile::tempdir().unwrap();
        let store = ResultsStore::new(dir.path());
        let record = ExperimentRecord::new(tiny_config(), CNN_1D_V01X.to_string(), 0);

        let device = Default::default();
        let err = store
            .load_network::<EvalBackend>(&record, &device)
            .unwrap_err();
        assert!(matches!(err, PipelineError::MissingWeightsPath));
    }

    #[test]
    fn test_weights_round_trip_restores_predictions() {
        let dir = tempfile::tempdir().unwrap();
        let store = ResultsStore::new(dir.path());
        let device = Default::default();

        let network = make_model::<EvalBackend>(CNN_1D_V01X, &tiny_config(), &device).unwrap();
        let mut record =
            ExperimentRecord::new(tiny_config(), CNN_1D_V01X.to_string(), network.num_params());
        record.path_to_weights = Some(store.save_weights(&network).unwrap());
        store.save(&record).unwrap();

        let loaded_record = store.load().unwrap();
        let restored = store
            .load_network::<EvalBackend>(&loaded_record, &device)
            .unwrap();
        assert_eq!(restored.num_params(), network.num_params());

        // Same weights give the same probabilities (up to the
        // recorder's reduced precision)
        let frames = Tensor::<EvalBackend, 3>::random(
            [2, 8, 2],
            burn::tensor::Distribution::Default,
            &device,
        );
        let before: Vec<f32> = network.predict(frames.clone()).into_data().to_vec().unwrap();
        let after: Vec<f32> = restored.predict(frames).into_data().to_vec().unwrap();
        for (b, a) in before.iter().zip(&after) {
            assert!((b - a).abs() < 1e-2);
        }
    }
}
