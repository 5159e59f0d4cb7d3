// ============================================================
// Layer 4 — Dataset Registry
// ============================================================
// Name -> constructor dispatch. The orchestrator only ever names
// a dataset kind; the registry hands back a boxed RadioDataset.
// Parameter validation belongs to the constructors themselves.

use serde::{Deserialize, Serialize};

use crate::data::matlab_v2::MatlabV2;
use crate::data::radioml::RadioMl2016;
use crate::domain::error::{PipelineError, Result};
use crate::domain::traits::RadioDataset;

pub const RADIOML_2016: &str = "radioml_2016";
pub const MATLAB_V2: &str = "matlab_v2";

/// Optional dataset-construction parameters out of the training
/// configuration. Which fields are required depends on the kind.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DatasetParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frames_per_modulation: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snrs: Option<Vec<i32>>,
}

/// Construct the dataset registered under `name`.
pub fn make_dataset(name: &str, params: &DatasetParams) -> Result<Box<dyn RadioDataset>> {
    match name {
        RADIOML_2016 => Ok(Box::new(RadioMl2016::new())),
        MATLAB_V2 => {
            let frames_per_mod = params.frames_per_modulation.ok_or(
                PipelineError::MissingRequiredParameter {
                    dataset: MATLAB_V2,
                    parameter: "frames_per_modulation",
                },
            )?;
            let snrs = params
                .snrs
                .clone()
                .ok_or(PipelineError::MissingRequiredParameter {
                    dataset: MATLAB_V2,
                    parameter: "snrs",
                })?;
            Ok(Box::new(MatlabV2::new(frames_per_mod, snrs)?))
        }
        other => Err(PipelineError::UnknownDataset(other.to_string())),
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_names_dispatch() {
        let ds = make_dataset(RADIOML_2016, &DatasetParams::default()).unwrap();
        assert_eq!(ds.name(), "radioml_2016");

        let params = DatasetParams {
            frames_per_modulation: Some(30),
            snrs: Some((0..3).collect()),
        };
        let ds = make_dataset(MATLAB_V2, &params).unwrap();
        assert_eq!(ds.name(), "matlab_v2");
        assert_eq!(ds.expected_rank(), 3);
    }

    #[test]
    fn test_unknown_name_fails() {
        let err = make_dataset("radioml_2023", &DatasetParams::default()).unwrap_err();
        assert!(matches!(err, PipelineError::UnknownDataset(name) if name == "radioml_2023"));
    }

    #[test]
    fn test_matlab_v2_requires_parameters() {
        let err = make_dataset(MATLAB_V2, &DatasetParams::default()).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::MissingRequiredParameter {
                parameter: "frames_per_modulation",
                ..
            }
        ));

        let params = DatasetParams {
            frames_per_modulation: Some(30),
            snrs: None,
        };
        let err = make_dataset(MATLAB_V2, &params).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::MissingRequiredParameter {
                parameter: "snrs",
                ..
            }
        ));
    }
}
