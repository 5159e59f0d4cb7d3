// ============================================================
// Layer 5 — Evaluator
// ============================================================
// Computes the confusion matrix and the three accuracy views the
// experiment record stores: overall, per-class and per-SNR.
//
// Confusion matrix convention: rows are true labels, columns are
// predicted labels (argmax over the class axis). Argmax ties
// break to the first index, so results are stable across
// backends.

use std::collections::BTreeMap;

use burn::prelude::*;
use ndarray::{s, Array3};

use crate::domain::error::{PipelineError, Result};
use crate::ml::registry::Network;

/// Prediction batch size; evaluation data can be large.
const EVAL_BATCH: usize = 256;

/// Key under which the whole-set accuracy is stored next to the
/// per-class entries.
pub const OVERALL_KEY: &str = "Overall";

/// Predicted class per sample: argmax of the model's probability
/// rows, first index winning ties.
pub fn predict_classes<B: Backend>(
    network: &Network<B>,
    data: &Array3<f32>,
    device: &B::Device,
) -> Result<Vec<usize>> {
    let (n, t, features) = (data.shape()[0], data.shape()[1], data.shape()[2]);
    let mut predictions = Vec::with_capacity(n);

    let mut start = 0;
    while start < n {
        let end = (start + EVAL_BATCH).min(n);
        let flat: Vec<f32> = data.slice(s![start..end, .., ..]).iter().copied().collect();
        let frames =
            Tensor::<B, 1>::from_floats(flat.as_slice(), device).reshape([end - start, t, features]);

        let probs = network.predict(frames);
        let n_classes = probs.dims()[1];
        let rows: Vec<f32> = probs
            .into_data()
            .to_vec()
            .map_err(|e| PipelineError::Recorder(format!("tensor readback: {e:?}")))?;

        for row in rows.chunks(n_classes) {
            predictions.push(argmax_row(row));
        }
        start = end;
    }

    Ok(predictions)
}

/// Index of the row maximum; strict comparison keeps the first
/// index on ties.
pub(crate) fn argmax_row(row: &[f32]) -> usize {
    let mut best = 0;
    for (class, &p) in row.iter().enumerate() {
        if p > row[best] {
            best = class;
        }
    }
    best
}

/// Integer C x C table; rows = true labels, columns = predictions.
pub(crate) fn confusion_matrix(
    predictions: &[usize],
    labels: &[usize],
    n_classes: usize,
) -> Vec<Vec<u64>> {
    let mut cm = vec![vec![0u64; n_classes]; n_classes];
    for (&pred, &truth) in predictions.iter().zip(labels) {
        cm[truth][pred] += 1;
    }
    cm
}

/// Overall plus per-class accuracy out of a confusion matrix.
/// Classes with no samples report NaN.
pub(crate) fn accuracies_from_matrix(
    cm: &[Vec<u64>],
    modulations: &[String],
) -> BTreeMap<String, f64> {
    let total: u64 = cm.iter().flatten().sum();
    let trace: u64 = cm.iter().enumerate().map(|(i, row)| row[i]).sum();

    let mut accuracies = BTreeMap::new();
    accuracies.insert(
        OVERALL_KEY.to_string(),
        if total > 0 {
            trace as f64 / total as f64
        } else {
            f64::NAN
        },
    );
    for (class, name) in modulations.iter().enumerate() {
        let row_sum: u64 = cm[class].iter().sum();
        accuracies.insert(
            name.clone(),
            if row_sum > 0 {
                cm[class][class] as f64 / row_sum as f64
            } else {
                f64::NAN
            },
        );
    }
    accuracies
}

/// Confusion matrix plus {"Overall", class name, ...} -> accuracy.
pub fn evaluate_overall_and_per_class<B: Backend>(
    network: &Network<B>,
    data: &Array3<f32>,
    labels: &[usize],
    modulations: &[String],
    device: &B::Device,
) -> Result<(Vec<Vec<u64>>, BTreeMap<String, f64>)> {
    let predictions = predict_classes(network, data, device)?;
    let cm = confusion_matrix(&predictions, labels, modulations.len());
    let accuracies = accuracies_from_matrix(&cm, modulations);
    Ok((cm, accuracies))
}

/// Accuracy over the sample subset at each distinct SNR present.
pub fn evaluate_per_snr<B: Backend>(
    network: &Network<B>,
    data: &Array3<f32>,
    labels: &[usize],
    snrs: &[i32],
    device: &B::Device,
) -> Result<BTreeMap<i32, f64>> {
    let predictions = predict_classes(network, data, device)?;

    let mut counts: BTreeMap<i32, (u64, u64)> = BTreeMap::new();
    for ((&pred, &truth), &snr) in predictions.iter().zip(labels).zip(snrs) {
        let entry = counts.entry(snr).or_insert((0, 0));
        entry.1 += 1;
        if pred == truth {
            entry.0 += 1;
        }
    }

    Ok(counts
        .into_iter()
        .map(|(snr, (correct, total))| (snr, correct as f64 / total as f64))
        .collect())
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::config::{CnnConfig, ModelConfig, Padding, CNN_1D_V01X};
    use crate::ml::registry::make_model;
    use crate::ml::EvalBackend;

    fn class_names(names: &[&str]) -> Vec<String> {
        names.iter().map(|&n| n.to_string()).collect()
    }

    #[test]
    fn test_perfect_predictions_give_diagonal_matrix() {
        let labels = vec![0, 1, 2, 1, 0, 2, 2];
        let cm = confusion_matrix(&labels, &labels, 3);

        for (i, row) in cm.iter().enumerate() {
            for (j, &count) in row.iter().enumerate() {
                if i != j {
                    assert_eq!(count, 0);
                }
            }
        }
        assert_eq!(cm[0][0], 2);
        assert_eq!(cm[1][1], 2);
        assert_eq!(cm[2][2], 3);

        let acc = accuracies_from_matrix(&cm, &class_names(&["A", "B", "C"]));
        assert_eq!(acc[OVERALL_KEY], 1.0);
        assert_eq!(acc["A"], 1.0);
        assert_eq!(acc["B"], 1.0);
        assert_eq!(acc["C"], 1.0);
    }

    #[test]
    fn test_matrix_invariants() {
        let labels = vec![0, 0, 1, 1, 1];
        let preds = vec![0, 1, 1, 1, 0];
        let cm = confusion_matrix(&preds, &labels, 2);

        // The matrix sums to the sample count
        let total: u64 = cm.iter().flatten().sum();
        assert_eq!(total as usize, labels.len());
        assert_eq!(cm, vec![vec![1, 1], vec![1, 2]]);

        let acc = accuracies_from_matrix(&cm, &class_names(&["A", "B"]));
        // Overall = trace / sum; per class = diagonal / row sum
        assert!((acc[OVERALL_KEY] - 3.0 / 5.0).abs() < 1e-12);
        assert!((acc["A"] - 0.5).abs() < 1e-12);
        assert!((acc["B"] - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_absent_class_reports_nan() {
        let labels = vec![0, 0];
        let preds = vec![0, 0];
        let cm = confusion_matrix(&preds, &labels, 2);
        let acc = accuracies_from_matrix(&cm, &class_names(&["A", "B"]));
        assert_eq!(acc["A"], 1.0);
        assert!(acc["B"].is_nan());
    }

    #[test]
    fn test_per_snr_grouping() {
        let device = Default::default();
        let network = make_model::<EvalBackend>(
            CNN_1D_V01X,
            &ModelConfig::Cnn(CnnConfig {
                input_shape: (8, 2),
                n_classes: 2,
                output_channels: vec![4],
                kernel_sizes: vec![3],
                paddings: vec![Padding::Same],
                max_pool_sizes: vec![1],
                max_pool_strides: vec![1],
                avg_size: 8,
                dense_sizes: vec![],
            }),
            &device,
        )
        .unwrap();

        let data = Array3::<f32>::zeros((4, 8, 2));
        let snrs = vec![-4, -4, 6, 6];

        // Identical inputs give identical predictions, so each SNR
        // group's accuracy depends only on its labels.
        let preds = predict_classes(&network, &data, &device).unwrap();
        assert!(preds.iter().all(|&p| p == preds[0]));

        let labels = vec![preds[0], 1 - preds[0], preds[0], preds[0]];
        let by_snr = evaluate_per_snr(&network, &data, &labels, &snrs, &device).unwrap();
        assert_eq!(by_snr.len(), 2);
        assert!((by_snr[&-4] - 0.5).abs() < 1e-12);
        assert!((by_snr[&6] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_argmax_breaks_ties_to_first_index() {
        assert_eq!(argmax_row(&[0.4, 0.4, 0.2]), 0);
        assert_eq!(argmax_row(&[0.1, 0.3, 0.3]), 1);
        assert_eq!(argmax_row(&[0.1, 0.2, 0.7]), 2);
        assert_eq!(argmax_row(&[1.0]), 0);
    }
}
