//! JSON persistence of a fitted pipeline: the filter matrix, the linear model
//! and the channel order they were learned on.
use std::fs;
use std::path::Path;
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use crate::decoding::classifier::{ClassifierKind, LinearModel};
use crate::decoding::csp::{Csp, CspConfig, CspState};
use crate::decoding::pipeline::CspPipeline;
use crate::decoding::DecodeError;
pub const SNAPSHOT_FORMAT_VERSION: u32 = 1;
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("snapshot format version {found} is not supported (expected {})", SNAPSHOT_FORMAT_VERSION)]
    UnsupportedVersion { found: u32 },
    #[error("snapshot expects channels {expected:?}, got {actual:?}")]
    ChannelOrder {
        expected: Vec<String>,
        actual: Vec<String>,
    },
    #[error("snapshot is inconsistent: {0}")]
    Inconsistent(String),
    #[error(transparent)]
    Model(#[from] DecodeError),
    #[error("snapshot json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("snapshot io: {0}")]
    Io(#[from] std::io::Error),
}
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ModelSnapshot {
    pub format_version: u32,
    pub n_components: usize,
    pub channel_names: Vec<String>,
    pub classes: [i32; 2],
    /// One row per spatial filter, `n_components` rows of `channel_names.len()`.
    pub filters: Vec<Vec<f64>>,
    pub classifier_kind: ClassifierKind,
    pub classifier: LinearModel,
}
impl ModelSnapshot {
    pub fn capture(pipeline: &CspPipeline, channel_names: &[String]) -> Result<Self, SnapshotError> {
        let state = pipeline.csp().state()?;
        if state.n_channels() != channel_names.len() {
            return Err(SnapshotError::Inconsistent(format!(
                "{} channel names for filters over {} channels",
                channel_names.len(),
                state.n_channels()
            )));
        }
        Ok(Self {
            format_version: SNAPSHOT_FORMAT_VERSION,
            n_components: state.n_components(),
            channel_names: channel_names.to_vec(),
            classes: state.classes(),
            filters: state.filters().rows().into_iter().map(|r| r.to_vec()).collect(),
            classifier_kind: pipeline.kind(),
            classifier: pipeline.model()?.clone(),
        })
    }
    pub fn validate(&self) -> Result<(), SnapshotError> {
        if self.format_version != SNAPSHOT_FORMAT_VERSION {
            return Err(SnapshotError::UnsupportedVersion {
                found: self.format_version,
            });
        }
        if self.filters.len() != self.n_components {
            return Err(SnapshotError::Inconsistent(format!(
                "{} filter rows for {} components",
                self.filters.len(),
                self.n_components
            )));
        }
        let n_channels = self.channel_names.len();
        if let Some(row) = self.filters.iter().find(|row| row.len() != n_channels) {
            return Err(SnapshotError::Inconsistent(format!(
                "filter row of length {} for {} channels",
                row.len(),
                n_channels
            )));
        }
        if self.classifier.weights.len() != self.n_components {
            return Err(SnapshotError::Inconsistent(format!(
                "classifier has {} weights for {} components",
                self.classifier.weights.len(),
                self.n_components
            )));
        }
        if self.classifier.classes != self.classes {
            return Err(SnapshotError::Inconsistent(format!(
                "classifier classes {:?} differ from filter classes {:?}",
                self.classifier.classes, self.classes
            )));
        }
        Ok(())
    }
    /// Fails unless `channel_names` matches the stored order exactly.
    pub fn check_channels(&self, channel_names: &[String]) -> Result<(), SnapshotError> {
        if self.channel_names != channel_names {
            return Err(SnapshotError::ChannelOrder {
                expected: self.channel_names.clone(),
                actual: channel_names.to_vec(),
            });
        }
        Ok(())
    }
    pub fn filter_matrix(&self) -> Result<Array2<f64>, SnapshotError> {
        let flat: Vec<f64> = self.filters.iter().flatten().copied().collect();
        Array2::from_shape_vec((self.filters.len(), self.channel_names.len()), flat)
            .map_err(|e| SnapshotError::Inconsistent(e.to_string()))
    }
    /// Rebuilds a pipeline that predicts with the stored parameters.
    pub fn restore(&self) -> Result<CspPipeline, SnapshotError> {
        self.validate()?;
        let state = CspState::from_filters(self.filter_matrix()?, self.classes)?;
        let config = CspConfig {
            n_components: self.n_components,
            ..CspConfig::default()
        };
        let mut classifier = self.classifier_kind.build();
        classifier.load_model(self.classifier.clone());
        Ok(CspPipeline::from_parts(
            Csp::from_state(config, state),
            self.classifier_kind,
            classifier,
        ))
    }
    pub fn to_json(&self) -> Result<String, SnapshotError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
    pub fn from_json(text: &str) -> Result<Self, SnapshotError> {
        let snapshot: Self = serde_json::from_str(text)?;
        snapshot.validate()?;
        Ok(snapshot)
    }
    pub fn save(&self, path: &Path) -> Result<(), SnapshotError> {
        fs::write(path, self.to_json()?)?;
        Ok(())
    }
    pub fn load(path: &Path) -> Result<Self, SnapshotError> {
        Self::from_json(&fs::read_to_string(path)?)
    }
}
