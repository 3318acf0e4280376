//! Repeated random train/test subsampling and per-split scoring.
use std::collections::BTreeMap;
use log::debug;
use ndarray::ArrayView3;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use crate::decoding::epochs::{chance_level, check_trials, class_counts, select_labels, select_trials};
use crate::decoding::estimator::EpochClassifier;
use crate::decoding::DecodeError;
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SplitStrategy {
    /// Test trials drawn per class in proportion to its size.
    #[default]
    Stratified,
    /// Test trials drawn from the whole set regardless of class.
    Shuffle,
}
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CvConfig {
    pub n_splits: usize,
    pub test_fraction: f64,
    pub seed: u64,
    pub strategy: SplitStrategy,
}
impl Default for CvConfig {
    fn default() -> Self {
        Self {
            n_splits: 10,
            test_fraction: 0.2,
            seed: 42,
            strategy: SplitStrategy::default(),
        }
    }
}
/// Disjoint trial indices, both sorted ascending.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CvSplit {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}
impl CvConfig {
    pub fn validate(&self) -> Result<(), DecodeError> {
        if self.n_splits == 0 {
            return Err(DecodeError::InvalidParameter(
                "number of splits must be at least 1".into(),
            ));
        }
        if !(self.test_fraction > 0.0 && self.test_fraction < 1.0) {
            return Err(DecodeError::InvalidParameter(format!(
                "test fraction must lie strictly between 0 and 1, got {}",
                self.test_fraction
            )));
        }
        Ok(())
    }
    /// Number of test trials for a set of `n` trials.
    pub fn test_size(&self, n: usize) -> usize {
        (self.test_fraction * n as f64).ceil() as usize
    }
    /// Generates the partitions for `labels`. The same seed and labels always
    /// yield the same partitions.
    pub fn splits(&self, labels: &[i32]) -> Result<Vec<CvSplit>, DecodeError> {
        self.validate()?;
        let n = labels.len();
        let n_test = self.test_size(n);
        if n_test == 0 || n_test >= n {
            return Err(DecodeError::InsufficientData(format!(
                "{n} trials cannot be split with test fraction {}",
                self.test_fraction
            )));
        }
        let mut rng = StdRng::seed_from_u64(self.seed);
        let splits = match self.strategy {
            SplitStrategy::Shuffle => shuffle_splits(&mut rng, n, n_test, self.n_splits),
            SplitStrategy::Stratified => {
                stratified_splits(&mut rng, labels, n_test, self.n_splits)?
            }
        };
        for (index, split) in splits.iter().enumerate() {
            check_both_classes(labels, split, index)?;
        }
        Ok(splits)
    }
}
fn shuffle_splits(rng: &mut StdRng, n: usize, n_test: usize, n_splits: usize) -> Vec<CvSplit> {
    (0..n_splits)
        .map(|_| {
            let mut order: Vec<usize> = (0..n).collect();
            order.shuffle(rng);
            let mut test = order[..n_test].to_vec();
            let mut train = order[n_test..].to_vec();
            test.sort_unstable();
            train.sort_unstable();
            CvSplit { train, test }
        })
        .collect()
}
/// Test trials per class by largest remainder, at least one test and one
/// train trial per class.
fn stratified_allocation(
    counts: &BTreeMap<i32, usize>,
    n: usize,
    n_test: usize,
) -> Result<BTreeMap<i32, usize>, DecodeError> {
    if let Some((label, _)) = counts.iter().find(|(_, c)| **c < 2) {
        return Err(DecodeError::InsufficientData(format!(
            "class {label} needs at least 2 trials to appear in both train and test"
        )));
    }
    if n_test < counts.len() || n - n_test < counts.len() {
        return Err(DecodeError::InsufficientData(format!(
            "{n_test} test trials out of {n} cannot cover {} classes on both sides",
            counts.len()
        )));
    }
    let mut allocation = BTreeMap::new();
    let mut remainders = Vec::with_capacity(counts.len());
    let mut assigned = 0;
    for (&label, &count) in counts {
        let exact = n_test as f64 * count as f64 / n as f64;
        let base = exact.floor() as usize;
        allocation.insert(label, base);
        remainders.push((exact - base as f64, label));
        assigned += base;
    }
    remainders.sort_by(|a, b| b.0.total_cmp(&a.0).then(a.1.cmp(&b.1)));
    for (_, label) in remainders.iter().take(n_test.saturating_sub(assigned)) {
        if let Some(slot) = allocation.get_mut(label) {
            *slot += 1;
        }
    }
    for (label, slot) in allocation.iter_mut() {
        let count = counts[label];
        *slot = (*slot).clamp(1, count - 1);
    }
    Ok(allocation)
}
fn stratified_splits(
    rng: &mut StdRng,
    labels: &[i32],
    n_test: usize,
    n_splits: usize,
) -> Result<Vec<CvSplit>, DecodeError> {
    let counts = class_counts(labels);
    let allocation = stratified_allocation(&counts, labels.len(), n_test)?;
    let mut members: BTreeMap<i32, Vec<usize>> = BTreeMap::new();
    for (index, &label) in labels.iter().enumerate() {
        members.entry(label).or_default().push(index);
    }
    let splits = (0..n_splits)
        .map(|_| {
            let mut train = Vec::with_capacity(labels.len());
            let mut test = Vec::with_capacity(n_test);
            for (label, indices) in &members {
                let mut order = indices.clone();
                order.shuffle(rng);
                let take = allocation[label];
                test.extend_from_slice(&order[..take]);
                train.extend_from_slice(&order[take..]);
            }
            test.sort_unstable();
            train.sort_unstable();
            CvSplit { train, test }
        })
        .collect();
    Ok(splits)
}
fn check_both_classes(labels: &[i32], split: &CvSplit, index: usize) -> Result<(), DecodeError> {
    let all = class_counts(labels);
    for (side, indices) in [("train", &split.train), ("test", &split.test)] {
        let present = class_counts(&select_labels(labels, indices)?);
        if let Some(missing) = all.keys().find(|label| !present.contains_key(*label)) {
            return Err(DecodeError::InsufficientData(format!(
                "split {index} leaves class {missing} out of the {side} set"
            )));
        }
    }
    Ok(())
}
/// Per-split accuracies in split order, plus the majority-class baseline of
/// the full label vector.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CvReport {
    pub scores: Vec<f64>,
    pub chance_level: f64,
}
impl CvReport {
    pub fn mean(&self) -> f64 {
        if self.scores.is_empty() {
            return 0.0;
        }
        self.scores.iter().sum::<f64>() / self.scores.len() as f64
    }
    /// Population standard deviation.
    pub fn std(&self) -> f64 {
        if self.scores.is_empty() {
            return 0.0;
        }
        let mean = self.mean();
        let var = self
            .scores
            .iter()
            .map(|s| (s - mean).powi(2))
            .sum::<f64>()
            / self.scores.len() as f64;
        var.sqrt()
    }
    pub fn max(&self) -> f64 {
        self.scores.iter().copied().fold(0.0, f64::max)
    }
}
/// Fits a fresh pipeline from `factory` on each split's train trials and
/// scores it on the split's test trials.
pub fn evaluate<P, F>(
    factory: F,
    trials: ArrayView3<f64>,
    labels: &[i32],
    splits: &[CvSplit],
) -> Result<CvReport, DecodeError>
where
    P: EpochClassifier,
    F: Fn() -> P,
{
    check_trials(trials, labels)?;
    if splits.is_empty() {
        return Err(DecodeError::InvalidParameter(
            "at least one train/test split is required".into(),
        ));
    }
    let mut scores = Vec::with_capacity(splits.len());
    for (index, split) in splits.iter().enumerate() {
        let mut pipeline = factory();
        pipeline.fit(
            select_trials(trials, &split.train)?.view(),
            &select_labels(labels, &split.train)?,
        )?;
        let score = pipeline.score(
            select_trials(trials, &split.test)?.view(),
            &select_labels(labels, &split.test)?,
        )?;
        debug!(
            "split {index}: {} train / {} test trials, accuracy {score:.3}",
            split.train.len(),
            split.test.len()
        );
        scores.push(score);
    }
    Ok(CvReport {
        scores,
        chance_level: chance_level(labels),
    })
}
/// Generates splits from `config` and evaluates them.
pub fn cross_validate<P, F>(
    factory: F,
    trials: ArrayView3<f64>,
    labels: &[i32],
    config: &CvConfig,
) -> Result<CvReport, DecodeError>
where
    P: EpochClassifier,
    F: Fn() -> P,
{
    check_trials(trials, labels)?;
    let splits = config.splits(labels)?;
    evaluate(factory, trials, labels, &splits)
}
