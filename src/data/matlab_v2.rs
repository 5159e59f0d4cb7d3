// ============================================================
// Layer 4 — Matlab-V2 Dataset
// ============================================================
// Loads the MATLAB-generated frame layout: one MAT 5 file per
// (class, frame index), named frame{CLASS}{i}.mat, each holding a
// complex column vector under the variable name "frame".
//
// Preprocessing stacks real and imaginary parts along the feature
// axis, so a length-T complex vector becomes a T x 2 real matrix.
//
// The generator does not store SNR per file; it sweeps SNR in
// equal consecutive blocks inside each class. The per-sample SNR
// is therefore derived from the sample index:
//
//   snr[i] = snrs[(i mod frames_per_mod) / (frames_per_mod / snrs.len())]
//
// which requires frames_per_mod to be a positive multiple of the
// SNR count; construction rejects anything else.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use ndarray::Array3;
use rand::rngs::StdRng;

use crate::data::dataset::DatasetState;
use crate::domain::error::{PipelineError, Result};
use crate::domain::sample::{DatasetPath, RadioSamples, SplitIndices};
use crate::domain::traits::RadioDataset;

/// Class order used by the MATLAB generator; position = label.
pub const MATLAB_V2_CLASSES: [&str; 11] = [
    "BPSK", "QPSK", "8PSK", "16QAM", "64QAM", "PAM4", "GFSK", "CPFSK", "B-FM", "DSB-AM", "SSB-AM",
];

#[derive(Debug)]
pub struct MatlabV2 {
    frames_per_mod: usize,
    snrs: Vec<i32>,
    state: DatasetState,
}

impl MatlabV2 {
    /// Both parameters are mandatory; the SNR sweep must divide the
    /// per-class frame count exactly.
    pub fn new(frames_per_mod: usize, snrs: Vec<i32>) -> Result<Self> {
        if snrs.is_empty() || frames_per_mod == 0 || frames_per_mod % snrs.len() != 0 {
            return Err(PipelineError::InvalidConfiguration(format!(
                "matlab_v2: frames_per_modulation ({frames_per_mod}) must be a \
                 positive multiple of the SNR count ({})",
                snrs.len()
            )));
        }
        Ok(Self {
            frames_per_mod,
            snrs,
            state: DatasetState::new("matlab_v2"),
        })
    }

    /// SNR of the sample at global index `i`, from the block position
    /// inside its class.
    fn derive_snr(i: usize, frames_per_mod: usize, snrs: &[i32]) -> i32 {
        let block = frames_per_mod / snrs.len();
        snrs[(i % frames_per_mod) / block]
    }

    /// Read one frame file and return its T x 2 rows (re, im).
    fn read_frame(path: &Path) -> Result<Vec<[f32; 2]>> {
        let file = File::open(path).map_err(|e| PipelineError::io(path, e))?;
        let mat = matfile::MatFile::parse(BufReader::new(file))
            .map_err(|e| PipelineError::format(path, format!("MAT parse error: {e:?}")))?;
        let array = mat
            .find_by_name("frame")
            .ok_or_else(|| PipelineError::format(path, "no variable named 'frame'"))?;

        let (real, imag): (Vec<f64>, Option<Vec<f64>>) = match array.data() {
            matfile::NumericData::Double { real, imag } => (real.clone(), imag.clone()),
            matfile::NumericData::Single { real, imag } => (
                real.iter().map(|&v| f64::from(v)).collect(),
                imag.as_ref()
                    .map(|im| im.iter().map(|&v| f64::from(v)).collect()),
            ),
            _ => {
                return Err(PipelineError::format(
                    path,
                    "'frame' is not a floating-point matrix",
                ))
            }
        };
        let imag = imag.unwrap_or_else(|| vec![0.0; real.len()]);
        if imag.len() != real.len() {
            return Err(PipelineError::format(path, "re/im length mismatch"));
        }

        Ok(real
            .iter()
            .zip(&imag)
            .map(|(&re, &im)| [re as f32, im as f32])
            .collect())
    }
}

impl RadioDataset for MatlabV2 {
    fn name(&self) -> &'static str {
        "matlab_v2"
    }

    fn load(&mut self, path: &DatasetPath, force: bool) -> Result<()> {
        if self.state.is_loaded() && !force {
            tracing::debug!("matlab_v2 already loaded, skipping");
            return Ok(());
        }
        let dir = match path {
            DatasetPath::Single(p) => p,
            DatasetPath::Pair(p, _) => {
                return Err(PipelineError::format(
                    p,
                    "matlab_v2 expects a frame directory, not a path pair",
                ))
            }
        };

        let mut rows: Vec<f32> = Vec::new();
        let mut labels: Vec<usize> = Vec::new();
        let mut snrs: Vec<i32> = Vec::new();
        let mut time_steps: Option<usize> = None;
        let mut sample_index = 0usize;

        for (label, class) in MATLAB_V2_CLASSES.iter().enumerate() {
            // MATLAB writers index from 1
            for i in 1..=self.frames_per_mod {
                let file = dir.join(format!("frame{class}{i}.mat"));
                let frame = Self::read_frame(&file)?;
                match time_steps {
                    None => time_steps = Some(frame.len()),
                    Some(expected) if expected != frame.len() => {
                        return Err(PipelineError::format(
                            &file,
                            format!("frame length {} != {expected}", frame.len()),
                        ))
                    }
                    _ => {}
                }
                for [re, im] in frame {
                    rows.push(re);
                    rows.push(im);
                }
                labels.push(label);
                snrs.push(Self::derive_snr(sample_index, self.frames_per_mod, &self.snrs));
                sample_index += 1;
            }
        }

        let t = time_steps.unwrap_or(0);
        let n = labels.len();
        let data = Array3::from_shape_vec((n, t, 2), rows)
            .map_err(|e| PipelineError::format(dir, format!("bad block shape: {e}")))?;

        tracing::info!(
            "Loaded matlab_v2: {} samples, {} time steps, {} SNR levels",
            n,
            t,
            self.snrs.len(),
        );

        let modulations = MATLAB_V2_CLASSES.iter().map(|&c| c.to_string()).collect();
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

    #[test]
    fn test_snr_derivation_blocks() {
        // 30000 frames per class swept over SNRs 0..=29: 1000-frame blocks
        let snrs: Vec<i32> = (0..30).collect();
        assert_eq!(MatlabV2::derive_snr(0, 30000, &snrs), 0);
        assert_eq!(MatlabV2::derive_snr(999, 30000, &snrs), 0);
        assert_eq!(MatlabV2::derive_snr(1000, 30000, &snrs), 1);
        assert_eq!(MatlabV2::derive_snr(29999, 30000, &snrs), 29);
        // Next class starts the sweep over
        assert_eq!(MatlabV2::derive_snr(30000, 30000, &snrs), 0);
    }

    #[test]
    fn test_construction_validates_sweep() {
        assert!(MatlabV2::new(30, (0..3).collect()).is_ok());
        assert!(matches!(
            MatlabV2::new(10, (0..3).collect()).unwrap_err(),
            PipelineError::InvalidConfiguration(_)
        ));
        assert!(MatlabV2::new(0, vec![0]).is_err());
        assert!(MatlabV2::new(10, vec![]).is_err());
    }

    /// Minimal little-endian MAT 5 writer for one complex column
    /// vector named "frame". Layout per the MAT-file format spec:
    /// 128-byte header, then a miMATRIX element with array flags,
    /// dimensions, name, real part and imaginary part subelements.
    fn write_complex_frame_mat(path: &Path, re: &[f64], im: &[f64]) {
        let t = re.len();
        let mut buf: Vec<u8> = Vec::new();

        let mut header = [0x20u8; 116];
        let desc = b"MATLAB 5.0 MAT-file, radioclass test fixture";
        header[..desc.len()].copy_from_slice(desc);
        buf.extend_from_slice(&header);
        buf.extend_from_slice(&[0u8; 8]); // subsystem data offset
        buf.extend_from_slice(&0x0100u16.to_le_bytes()); // version
        buf.extend_from_slice(b"IM"); // little-endian indicator

        let mut m: Vec<u8> = Vec::new();
        // array flags: mxDOUBLE_CLASS with the complex bit set
        m.extend_from_slice(&6u32.to_le_bytes());
        m.extend_from_slice(&8u32.to_le_bytes());
        m.extend_from_slice(&(6u32 | 0x0800).to_le_bytes());
        m.extend_from_slice(&0u32.to_le_bytes());
        // dimensions: [t, 1]
        m.extend_from_slice(&5u32.to_le_bytes());
        m.extend_from_slice(&8u32.to_le_bytes());
        m.extend_from_slice(&(t as i32).to_le_bytes());
        m.extend_from_slice(&1i32.to_le_bytes());
        // name: "frame", padded to the 8-byte boundary
        m.extend_from_slice(&1u32.to_le_bytes());
        m.extend_from_slice(&5u32.to_le_bytes());
        m.extend_from_slice(b"frame\0\0\0");
        // real part
        m.extend_from_slice(&9u32.to_le_bytes());
        m.extend_from_slice(&((t * 8) as u32).to_le_bytes());
        for v in re {
            m.extend_from_slice(&v.to_le_bytes());
        }
        // imaginary part
        m.extend_from_slice(&9u32.to_le_bytes());
        m.extend_from_slice(&((t * 8) as u32).to_le_bytes());
        for v in im {
            m.extend_from_slice(&v.to_le_bytes());
        }

        buf.extend_from_slice(&14u32.to_le_bytes());
        buf.extend_from_slice(&(m.len() as u32).to_le_bytes());
        buf.extend_from_slice(&m);
        std::fs::write(path, &buf).unwrap();
    }

    #[test]
    fn test_load_frame_directory() {
        let dir = tempfile::tempdir().unwrap();
        let frames_per_mod = 2;
        let snrs = vec![0, 6];
        let t = 3;

        // Two frames per class, values encode (class, frame, step)
        for (label, class) in MATLAB_V2_CLASSES.iter().enumerate() {
            for i in 1..=frames_per_mod {
                let re: Vec<f64> =
                    (0..t).map(|s| (label * 100 + i * 10 + s) as f64).collect();
                let im: Vec<f64> = re.iter().map(|v| -v).collect();
                write_complex_frame_mat(
                    &dir.path().join(format!("frame{class}{i}.mat")),
                    &re,
                    &im,
                );
            }
        }

        let mut ds = MatlabV2::new(frames_per_mod, snrs).unwrap();
        ds.load(&DatasetPath::Single(dir.path().to_path_buf()), false)
            .unwrap();

        let n = MATLAB_V2_CLASSES.len() * frames_per_mod;
        assert_eq!(ds.data().unwrap().shape(), &[n, t, 2]);
        assert_eq!(ds.modulations().unwrap().len(), 11);

        // Labels walk the class list, two frames each
        assert_eq!(&ds.labels().unwrap()[..4], &[0, 0, 1, 1]);
        // One-frame SNR blocks: sweep restarts inside every class
        assert_eq!(&ds.snrs_per_sample().unwrap()[..4], &[0, 6, 0, 6]);

        // Re/im stacked along the feature axis
        let data = ds.data().unwrap();
        assert_eq!(data[[0, 0, 0]], 10.0);
        assert_eq!(data[[0, 0, 1]], -10.0);
        assert_eq!(data[[0, 2, 0]], 12.0);
        // Second class (QPSK), first frame, step 0: 100 + 10
        assert_eq!(data[[2, 0, 0]], 110.0);
    }

    #[test]
    fn test_missing_frame_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut ds = MatlabV2::new(2, vec![0, 6]).unwrap();
        let err = ds
            .load(&DatasetPath::Single(dir.path().to_path_buf()), false)
            .unwrap_err();
        assert!(matches!(err, PipelineError::Io { .. }));
    }
}
