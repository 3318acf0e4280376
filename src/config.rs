// src/config.rs
use std::fs;
use std::path::{Path, PathBuf};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use crate::decoding::{ClassifierKind, CspConfig, CvConfig, DecodeError, WindowConfig};
/// Everything a batch run needs. Missing JSON fields take their defaults.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecoderConfig {
    pub csp: CspConfig,
    pub classifier: ClassifierKind,
    pub cv: CvConfig,
    pub window: WindowConfig,
    pub sample_rate_hz: f64,
    /// Epoch bounds around the cue, in seconds.
    pub tmin_seconds: f64,
    pub tmax_seconds: f64,
    /// Post-cue interval the pipeline is trained on, `[from, to]` seconds.
    pub train_crop_seconds: (f64, f64),
    pub subjects: Vec<u32>,
    pub tasks: Vec<u32>,
    pub trials_per_class: usize,
    pub workers: usize,
    pub output_dir: Option<PathBuf>,
}
impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            csp: CspConfig {
                n_components: 16,
                ..CspConfig::default()
            },
            classifier: ClassifierKind::default(),
            cv: CvConfig::default(),
            window: WindowConfig::default(),
            sample_rate_hz: 160.0,
            tmin_seconds: -1.0,
            tmax_seconds: 2.0,
            train_crop_seconds: (1.0, 2.0),
            subjects: (1..=9).collect(),
            tasks: (1..=4).collect(),
            trials_per_class: 22,
            workers: 4,
            output_dir: None,
        }
    }
}
impl DecoderConfig {
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config: Self = serde_json::from_str(&text)
            .with_context(|| format!("parsing config {}", path.display()))?;
        config
            .validate()
            .with_context(|| format!("validating config {}", path.display()))?;
        Ok(config)
    }
    /// Samples per epoch, both bounds inclusive.
    pub fn samples_per_epoch(&self) -> usize {
        ((self.tmax_seconds - self.tmin_seconds) * self.sample_rate_hz).round() as usize + 1
    }
    pub fn validate(&self) -> Result<(), DecodeError> {
        let invalid = |msg: String| Err(DecodeError::InvalidParameter(msg));
        self.csp.validate_for(crate::synthetic::CHANNELS.len())?;
        self.cv.validate()?;
        self.window.to_samples(self.sample_rate_hz)?;
        if !(self.sample_rate_hz > 0.0) {
            return invalid(format!("sample rate must be positive, got {}", self.sample_rate_hz));
        }
        if self.tmin_seconds >= self.tmax_seconds {
            return invalid(format!(
                "epoch start {}s must precede epoch end {}s",
                self.tmin_seconds, self.tmax_seconds
            ));
        }
        let (from, to) = self.train_crop_seconds;
        if from >= to || from < self.tmin_seconds || to > self.tmax_seconds {
            return invalid(format!(
                "training crop [{from}, {to}]s must lie inside the epoch [{}, {}]s",
                self.tmin_seconds, self.tmax_seconds
            ));
        }
        if self.subjects.is_empty() || self.tasks.is_empty() {
            return invalid("at least one subject and one task are required".into());
        }
        if let Some(task) = self
            .tasks
            .iter()
            .find(|&&t| crate::experiment::task(t).is_none())
        {
            return invalid(format!("unknown task {task}"));
        }
        if self.workers == 0 {
            return invalid("worker count must be at least 1".into());
        }
        if self.trials_per_class < 2 {
            return invalid(format!(
                "need at least 2 trials per class, got {}",
                self.trials_per_class
            ));
        }
        Ok(())
    }
}
#[cfg(test)]
mod tests {
    use super::*;
    #[test]
    fn defaults_are_valid() {
        let config = DecoderConfig::default();
        config.validate().unwrap();
        assert_eq!(config.samples_per_epoch(), 481);
    }
    #[test]
    fn partial_json_keeps_defaults() {
        let config: DecoderConfig = serde_json::from_str(
            r#"{"subjects":[3],"cv":{"n_splits":5},"classifier":{"kind":"linear_discriminant"}}"#,
        )
        .unwrap();
        assert_eq!(config.subjects, vec![3]);
        assert_eq!(config.cv.n_splits, 5);
        assert_eq!(config.cv.test_fraction, 0.2);
        assert_eq!(config.classifier, ClassifierKind::LinearDiscriminant);
        assert_eq!(config.csp.n_components, 16);
    }
    #[test]
    fn invalid_values_are_rejected() {
        let odd = DecoderConfig {
            csp: CspConfig {
                n_components: 3,
                ..CspConfig::default()
            },
            ..DecoderConfig::default()
        };
        assert!(matches!(odd.validate(), Err(DecodeError::InvalidComponentCount { .. })));
        let too_many = DecoderConfig {
            csp: CspConfig {
                n_components: 18,
                ..CspConfig::default()
            },
            ..DecoderConfig::default()
        };
        assert!(matches!(
            too_many.validate(),
            Err(DecodeError::InvalidComponentCount {
                requested: 18,
                channels: 16
            })
        ));
        let crop = DecoderConfig {
            train_crop_seconds: (1.5, 2.5),
            ..DecoderConfig::default()
        };
        assert!(crop.validate().is_err());
        let task = DecoderConfig {
            tasks: vec![9],
            ..DecoderConfig::default()
        };
        assert!(task.validate().is_err());
    }
    #[test]
    fn missing_file_reports_path() {
        let err = DecoderConfig::from_json_file(Path::new("/nonexistent/neurocsp.json")).unwrap_err();
        assert!(format!("{err:#}").contains("/nonexistent/neurocsp.json"));
    }
}
