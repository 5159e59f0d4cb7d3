// ============================================================
// Layer 4 — RadioML-2016 Dataset
// ============================================================
// Loads the RadioML 2016 style blob: one serialized mapping from
// (modulation name, SNR) to a block of IQ vectors. The Rust
// carrier is a JSON sequence of groups
//
//   [{"modulation": "QPSK", "snr": -4,
//     "frames": [[ [I...], [Q...] ], ...]}, ...]
//
// where each frame is stored channel-major [2][vec_length] and is
// transposed to time-major [vec_length][2] on load.
//
// Label encoding: groups are flattened in canonical class order
// (the fixed RadioML 2016 list below); the classes actually present
// in the file become the modulation list, so labels are always
// compact in [0, C). Unknown modulation names are an error, not a
// new class.
//
// Reference: O'Shea & West (2016), Radio ML Dataset Generation
//            with GNU Radio

use std::fs::File;
use std::io::BufReader;

use ndarray::Array3;
use rand::rngs::StdRng;
use serde::Deserialize;

use crate::data::dataset::DatasetState;
use crate::domain::error::{PipelineError, Result};
use crate::domain::sample::{DatasetPath, RadioSamples, SplitIndices};
use crate::domain::traits::RadioDataset;

/// Canonical RadioML 2016.10a class order. Position in this list fixes
/// the label encoding for every blob of this kind.
pub const RADIOML_2016_CLASSES: [&str; 11] = [
    "8PSK", "AM-DSB", "AM-SSB", "BPSK", "CPFSK", "GFSK", "PAM4", "QAM16", "QAM64", "QPSK", "WBFM",
];

/// One (modulation, snr) group out of the serialized mapping.
#[derive(Debug, Deserialize)]
struct BlobGroup {
    modulation: String,
    snr: i32,
    /// [n_vectors][2][vec_length]
    frames: Vec<Vec<Vec<f32>>>,
}

#[derive(Debug)]
pub struct RadioMl2016 {
    state: DatasetState,
}

impl RadioMl2016 {
    pub fn new() -> Self {
        Self {
            state: DatasetState::new("radioml_2016"),
        }
    }

    fn read_groups(path: &std::path::Path) -> Result<Vec<BlobGroup>> {
        let file = File::open(path).map_err(|e| PipelineError::io(path, e))?;
        serde_json::from_reader(BufReader::new(file))
            .map_err(|e| PipelineError::format(path, format!("not a RadioML blob: {e}")))
    }
}

impl Default for RadioMl2016 {
    fn default() -> Self {
        Self::new()
    }
}

impl RadioDataset for RadioMl2016 {
    fn name(&self) -> &'static str {
        "radioml_2016"
    }

    fn load(&mut self, path: &DatasetPath, force: bool) -> Result<()> {
        if self.state.is_loaded() && !force {
            tracing::debug!("radioml_2016 already loaded, skipping");
            return Ok(());
        }
        let file = match path {
            DatasetPath::Single(p) => p,
            DatasetPath::Pair(p, _) => {
                return Err(PipelineError::format(
                    p,
                    "radioml_2016 expects a single blob file, not a path pair",
                ))
            }
        };

        let groups = Self::read_groups(file)?;

        // Which canonical classes does this blob actually contain?
        let mut present = vec![false; RADIOML_2016_CLASSES.len()];
        for group in &groups {
            let idx = RADIOML_2016_CLASSES
                .iter()
                .position(|&c| c == group.modulation)
                .ok_or_else(|| {
                    PipelineError::format(
                        file,
                        format!("unknown modulation '{}'", group.modulation),
                    )
                })?;
            present[idx] = true;
        }
        let modulations: Vec<String> = RADIOML_2016_CLASSES
            .iter()
            .enumerate()
            .filter(|&(i, _)| present[i])
            .map(|(_, &c)| c.to_string())
            .collect();

        // Flatten: canonical class order outermost, file order of groups
        // within a class, file order of vectors within a group.
        let mut rows: Vec<f32> = Vec::new();
        let mut labels: Vec<usize> = Vec::new();
        let mut snrs: Vec<i32> = Vec::new();
        let mut vec_length: Option<usize> = None;

        for (label, class) in modulations.iter().enumerate() {
            for group in groups.iter().filter(|g| &g.modulation == class) {
                for frame in &group.frames {
                    if frame.len() != 2 {
                        return Err(PipelineError::format(
                            file,
                            format!(
                                "frame in '{}' has {} channels, expected 2",
                                class,
                                frame.len()
                            ),
                        ));
                    }
                    let t = frame[0].len();
                    if frame[1].len() != t {
                        return Err(PipelineError::format(
                            file,
                            format!("I/Q length mismatch in '{class}'"),
                        ));
                    }
                    match vec_length {
                        None => vec_length = Some(t),
                        Some(expected) if expected != t => {
                            return Err(PipelineError::format(
                                file,
                                format!("vector length {t} != {expected} in '{class}'"),
                            ))
                        }
                        _ => {}
                    }
                    // Channel-major on disk, time-major in memory
                    for step in 0..t {
                        rows.push(frame[0][step]);
                        rows.push(frame[1][step]);
                    }
                    labels.push(label);
                    snrs.push(group.snr);
                }
            }
        }

        let t = vec_length.unwrap_or(0);
        let n = labels.len();
        let data = Array3::from_shape_vec((n, t, 2), rows)
            .map_err(|e| PipelineError::format(file, format!("bad block shape: {e}")))?;

        tracing::info!(
            "Loaded radioml_2016: {} samples, {} time steps, {} classes",
            n,
            t,
            modulations.len(),
        );

        self.state.install(RadioSamples { data, labels, snrs }, modulations)
    }

    fn data(&self) -> Result<&Array3<f32>> {
        self.state.data()
    }

    fn labels(&self) -> Result<&[usize]> {
        self.state.labels()
    }

    fn modulations(&self) -> Result<&[String]> {
        self.state.modulations()
    }

    fn snrs_per_sample(&self) -> Result<&[i32]> {
        self.state.snrs()
    }

    fn split(
        &mut self,
        train_frac: f64,
        val_frac: f64,
        force_resplit: bool,
        rng: &mut StdRng,
    ) -> Result<&SplitIndices> {
        self.state.split(train_frac, val_frac, force_resplit, rng)
    }

    fn split_indices(&self) -> Result<&SplitIndices> {
        self.state.split_indices()
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    fn write_blob(dir: &tempfile::TempDir, value: serde_json::Value) -> DatasetPath {
        let path = dir.path().join("blob.json");
        let mut f = File::create(&path).unwrap();
        write!(f, "{value}").unwrap();
        DatasetPath::Single(path)
    }

    #[test]
    fn test_single_class_blob_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        // One class, two SNRs, two vectors each -> 4 samples, all label 0
        let blob = json!([
            {"modulation": "QPSK", "snr": -4,
             "frames": [[[1.0, 2.0], [3.0, 4.0]], [[5.0, 6.0], [7.0, 8.0]]]},
            {"modulation": "QPSK", "snr": 6,
             "frames": [[[9.0, 10.0], [11.0, 12.0]], [[13.0, 14.0], [15.0, 16.0]]]}
        ]);
        let path = write_blob(&dir, blob);

        let mut ds = RadioMl2016::new();
        ds.load(&path, false).unwrap();

        assert_eq!(ds.data().unwrap().shape(), &[4, 2, 2]);
        assert_eq!(ds.labels().unwrap(), &[0, 0, 0, 0]);
        assert_eq!(ds.modulations().unwrap(), &["QPSK".to_string()]);
        assert_eq!(ds.snrs_per_sample().unwrap(), &[-4, -4, 6, 6]);

        // Channel-major on disk became time-major rows
        let data = ds.data().unwrap();
        assert_eq!(data[[0, 0, 0]], 1.0); // I at t=0
        assert_eq!(data[[0, 0, 1]], 3.0); // Q at t=0
        assert_eq!(data[[0, 1, 0]], 2.0); // I at t=1
        assert_eq!(data[[3, 1, 1]], 16.0);
    }

    #[test]
    fn test_labels_follow_canonical_order() {
        let dir = tempfile::tempdir().unwrap();
        // File lists QPSK before BPSK; canonical order still puts BPSK first
        let blob = json!([
            {"modulation": "QPSK", "snr": 0, "frames": [[[1.0], [1.0]]]},
            {"modulation": "BPSK", "snr": 0, "frames": [[[2.0], [2.0]]]}
        ]);
        let path = write_blob(&dir, blob);

        let mut ds = RadioMl2016::new();
        ds.load(&path, false).unwrap();

        assert_eq!(
            ds.modulations().unwrap(),
            &["BPSK".to_string(), "QPSK".to_string()]
        );
        assert_eq!(ds.labels().unwrap(), &[0, 1]);
        assert_eq!(ds.data().unwrap()[[0, 0, 0]], 2.0); // BPSK frame first
    }

    #[test]
    fn test_unknown_modulation_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let blob = json!([
            {"modulation": "OOK", "snr": 0, "frames": [[[1.0], [1.0]]]}
        ]);
        let path = write_blob(&dir, blob);

        let mut ds = RadioMl2016::new();
        let err = ds.load(&path, false).unwrap_err();
        assert!(matches!(err, PipelineError::Format { .. }));
    }

    #[test]
    fn test_load_is_idempotent_unless_forced() {
        let dir = tempfile::tempdir().unwrap();
        let blob = json!([
            {"modulation": "QPSK", "snr": 0, "frames": [[[1.0], [1.0]]]}
        ]);
        let path = write_blob(&dir, blob);

        let mut ds = RadioMl2016::new();
        ds.load(&path, false).unwrap();

        // Remove the file: a non-forced reload must be a no-op...
        std::fs::remove_file(path.primary()).unwrap();
        ds.load(&path, false).unwrap();
        assert_eq!(ds.labels().unwrap().len(), 1);

        // ...while a forced reload actually hits the disk again.
        assert!(ds.load(&path, true).is_err());
    }

    #[test]
    fn test_accessors_before_load_fail() {
        let ds = RadioMl2016::new();
        assert!(matches!(
            ds.data().unwrap_err(),
            PipelineError::NotLoaded { .. }
        ));
        assert!(matches!(
            ds.snrs_per_sample().unwrap_err(),
            PipelineError::NotLoaded { .. }
        ));
    }
}
