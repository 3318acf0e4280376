use std::collections::BTreeMap;
use ndarray::{s, Array3, ArrayD, ArrayView3, Axis, Ix3};
use crate::decoding::DecodeError;
/// Epoched multi-channel trials with one class label per trial.
#[derive(Clone, Debug)]
pub struct EpochSet {
    pub data: Array3<f64>, // trials x channels x samples
    pub labels: Vec<i32>,
    pub channel_labels: Vec<String>,
    pub sample_rate_hz: f64,
    /// Time of the first sample relative to the event, in seconds.
    pub tmin_seconds: f64,
}
impl EpochSet {
    pub fn new(
        data: Array3<f64>,
        labels: Vec<i32>,
        channel_labels: Vec<String>,
        sample_rate_hz: f64,
        tmin_seconds: f64,
    ) -> Result<Self, DecodeError> {
        let epochs = Self {
            data,
            labels,
            channel_labels,
            sample_rate_hz,
            tmin_seconds,
        };
        epochs.validate()?;
        Ok(epochs)
    }
    pub fn validate(&self) -> Result<(), DecodeError> {
        if !(self.sample_rate_hz > 0.0) {
            return Err(DecodeError::InvalidParameter(format!(
                "sample rate must be greater than zero, got {}",
                self.sample_rate_hz
            )));
        }
        check_trials(self.data.view(), &self.labels)?;
        if self.channel_labels.len() != self.num_channels() {
            return Err(DecodeError::Shape(format!(
                "{} channel labels for {} channels",
                self.channel_labels.len(),
                self.num_channels()
            )));
        }
        Ok(())
    }
    pub fn num_trials(&self) -> usize {
        self.data.len_of(Axis(0))
    }
    pub fn num_channels(&self) -> usize {
        self.data.len_of(Axis(1))
    }
    pub fn num_samples(&self) -> usize {
        self.data.len_of(Axis(2))
    }
    /// Keeps samples `[start, end)` of every trial.
    pub fn crop(&self, start: usize, end: usize) -> Result<EpochSet, DecodeError> {
        let data = crop_samples(self.data.view(), start, end)?;
        Ok(EpochSet {
            data,
            labels: self.labels.clone(),
            channel_labels: self.channel_labels.clone(),
            sample_rate_hz: self.sample_rate_hz,
            tmin_seconds: self.tmin_seconds + start as f64 / self.sample_rate_hz,
        })
    }
    /// Keeps samples whose time lies in `[from, to]`, both ends inclusive.
    pub fn crop_seconds(&self, from: f64, to: f64) -> Result<EpochSet, DecodeError> {
        if from > to {
            return Err(DecodeError::InvalidParameter(format!(
                "crop start {from}s is after crop end {to}s"
            )));
        }
        let to_index = |t: f64| ((t - self.tmin_seconds) * self.sample_rate_hz).round();
        let start = to_index(from).max(0.0) as usize;
        let end = ((to_index(to) + 1.0).max(0.0) as usize).min(self.num_samples());
        self.crop(start, end)
    }
    /// Trials at `indices`, in that order.
    pub fn select(&self, indices: &[usize]) -> Result<EpochSet, DecodeError> {
        Ok(EpochSet {
            data: select_trials(self.data.view(), indices)?,
            labels: select_labels(&self.labels, indices)?,
            channel_labels: self.channel_labels.clone(),
            sample_rate_hz: self.sample_rate_hz,
            tmin_seconds: self.tmin_seconds,
        })
    }
}
/// Converts an arbitrary-rank array into a trial tensor.
pub fn trials_from_dyn(data: ArrayD<f64>) -> Result<Array3<f64>, DecodeError> {
    let ndim = data.ndim();
    data.into_dimensionality::<Ix3>().map_err(|_| {
        DecodeError::Shape(format!(
            "trials must have 3 dimensions (trials, channels, samples), got {ndim}"
        ))
    })
}
pub fn check_trials(trials: ArrayView3<f64>, labels: &[i32]) -> Result<(), DecodeError> {
    let (n_trials, n_channels, n_samples) = trials.dim();
    if labels.len() != n_trials {
        return Err(DecodeError::Shape(format!(
            "{} labels for {} trials",
            labels.len(),
            n_trials
        )));
    }
    if n_channels == 0 || n_samples == 0 {
        return Err(DecodeError::Shape(format!(
            "trials must have channels and samples, got {n_channels}x{n_samples}"
        )));
    }
    Ok(())
}
pub fn crop_samples(
    trials: ArrayView3<f64>,
    start: usize,
    end: usize,
) -> Result<Array3<f64>, DecodeError> {
    let n_samples = trials.len_of(Axis(2));
    if start >= end || end > n_samples {
        return Err(DecodeError::Shape(format!(
            "crop [{start}, {end}) outside of {n_samples} samples"
        )));
    }
    Ok(trials.slice(s![.., .., start..end]).to_owned())
}
pub fn select_trials(trials: ArrayView3<f64>, indices: &[usize]) -> Result<Array3<f64>, DecodeError> {
    let n_trials = trials.len_of(Axis(0));
    if let Some(&bad) = indices.iter().find(|&&i| i >= n_trials) {
        return Err(DecodeError::Shape(format!(
            "trial index {bad} out of range for {n_trials} trials"
        )));
    }
    Ok(trials.select(Axis(0), indices))
}
pub fn select_labels(labels: &[i32], indices: &[usize]) -> Result<Vec<i32>, DecodeError> {
    indices
        .iter()
        .map(|&i| {
            labels.get(i).copied().ok_or_else(|| {
                DecodeError::Shape(format!(
                    "label index {i} out of range for {} labels",
                    labels.len()
                ))
            })
        })
        .collect()
}
/// Trial count per label, ordered by label.
pub fn class_counts(labels: &[i32]) -> BTreeMap<i32, usize> {
    let mut counts = BTreeMap::new();
    for &label in labels {
        *counts.entry(label).or_insert(0) += 1;
    }
    counts
}
/// Resolves the class pair of a binary label vector.
pub fn resolve_classes(labels: &[i32], declared: Option<[i32; 2]>) -> Result<[i32; 2], DecodeError> {
    let counts = class_counts(labels);
    match declared {
        Some(pair) => {
            let mut seen: Vec<i32> = counts.keys().copied().collect();
            for class in pair {
                if !seen.contains(&class) {
                    seen.push(class);
                }
            }
            if seen.len() > 2 || pair[0] == pair[1] {
                return Err(DecodeError::ClassCount { found: seen.len() });
            }
            if let Some(&empty) = pair.iter().find(|c| !counts.contains_key(*c)) {
                return Err(DecodeError::EmptyClass { label: empty });
            }
            Ok(pair)
        }
        None => {
            if counts.len() != 2 {
                return Err(DecodeError::ClassCount {
                    found: counts.len(),
                });
            }
            let mut keys = counts.keys().copied();
            match (keys.next(), keys.next()) {
                (Some(first), Some(second)) => Ok([first, second]),
                _ => Err(DecodeError::ClassCount {
                    found: counts.len(),
                }),
            }
        }
    }
}
/// Accuracy of always predicting the most frequent label, i.e. `max(p, 1 - p)`
/// for a binary set. Zero for an empty label vector.
pub fn chance_level(labels: &[i32]) -> f64 {
    if labels.is_empty() {
        return 0.0;
    }
    let majority = class_counts(labels).values().copied().max().unwrap_or(0);
    majority as f64 / labels.len() as f64
}
