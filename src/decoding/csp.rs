//! Common Spatial Pattern filters for two-class trials.
//!
//! Solves `R₁·w = λ·(R₁ + R₂ + εI)·w` on the trace-normalised class
//! covariances. Eigenvectors are ranked by descending `|λ|`; the first `K/2`
//! favour class 1 and the last `K/2` favour class 2. Each row of the filter
//! bank is one spatial filter over channels.
use log::debug;
use ndarray::{Array1, Array2, ArrayView3, Axis};
use serde::{Deserialize, Serialize};
use crate::decoding::covariance;
use crate::decoding::epochs::{check_trials, resolve_classes, EpochSet};
use crate::decoding::estimator::EpochTransformer;
use crate::decoding::features::log_variance;
use crate::decoding::linalg::generalized_eigen;
use crate::decoding::DecodeError;
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CspConfig {
    /// Number of filters kept; even, at least 2 and at most the channel count.
    pub n_components: usize,
    /// Ridge added to the composite covariance diagonal.
    pub regularization: f64,
}
impl Default for CspConfig {
    fn default() -> Self {
        Self {
            n_components: 4,
            regularization: 1e-8,
        }
    }
}
impl CspConfig {
    pub fn validate_for(&self, n_channels: usize) -> Result<(), DecodeError> {
        let k = self.n_components;
        if k == 0 || k % 2 != 0 || k > n_channels {
            return Err(DecodeError::InvalidComponentCount {
                requested: k,
                channels: n_channels,
            });
        }
        if !(self.regularization >= 0.0) || !self.regularization.is_finite() {
            return Err(DecodeError::InvalidParameter(format!(
                "regularization must be a non-negative number, got {}",
                self.regularization
            )));
        }
        Ok(())
    }
}
/// Learned filter bank. Never mutated after `fit` produced it.
#[derive(Clone, Debug)]
pub struct CspState {
    filters: Array2<f64>,
    patterns: Array2<f64>,
    eigenvalues: Array1<f64>,
    classes: [i32; 2],
}
impl CspState {
    /// Rebuilds a state from stored filters (K x channels), e.g. a snapshot.
    /// Patterns and eigenvalues are not stored and come back empty.
    pub fn from_filters(filters: Array2<f64>, classes: [i32; 2]) -> Result<Self, DecodeError> {
        CspConfig {
            n_components: filters.nrows(),
            ..CspConfig::default()
        }
        .validate_for(filters.ncols())?;
        let n_channels = filters.ncols();
        Ok(Self {
            filters,
            patterns: Array2::zeros((0, n_channels)),
            eigenvalues: Array1::zeros(0),
            classes,
        })
    }
    /// K x channels, rows ordered by discriminative rank.
    pub fn filters(&self) -> &Array2<f64> {
        &self.filters
    }
    /// K x channels forward-model patterns matching the filter rows.
    pub fn patterns(&self) -> &Array2<f64> {
        &self.patterns
    }
    pub fn eigenvalues(&self) -> &Array1<f64> {
        &self.eigenvalues
    }
    /// `[class 1, class 2]`; class 1 is the numerator covariance.
    pub fn classes(&self) -> [i32; 2] {
        self.classes
    }
    pub fn n_components(&self) -> usize {
        self.filters.nrows()
    }
    pub fn n_channels(&self) -> usize {
        self.filters.ncols()
    }
}
/// Two-class CSP learner.
#[derive(Clone, Debug)]
pub struct Csp {
    config: CspConfig,
    declared_classes: Option<[i32; 2]>,
    state: Option<CspState>,
}
impl Csp {
    pub fn new(config: CspConfig) -> Self {
        Self {
            config,
            declared_classes: None,
            state: None,
        }
    }
    pub fn with_components(n_components: usize) -> Self {
        Self::new(CspConfig {
            n_components,
            ..CspConfig::default()
        })
    }
    /// Fixes the expected label pair; `classes[0]` becomes class 1.
    pub fn with_classes(mut self, classes: [i32; 2]) -> Self {
        self.declared_classes = Some(classes);
        self
    }
    pub fn from_state(config: CspConfig, state: CspState) -> Self {
        Self {
            config,
            declared_classes: Some(state.classes),
            state: Some(state),
        }
    }
    pub fn config(&self) -> &CspConfig {
        &self.config
    }
    pub fn is_fitted(&self) -> bool {
        self.state.is_some()
    }
    pub fn state(&self) -> Result<&CspState, DecodeError> {
        self.state.as_ref().ok_or(DecodeError::NotFitted)
    }
    pub fn filters(&self) -> Result<&Array2<f64>, DecodeError> {
        Ok(self.state()?.filters())
    }
    pub fn patterns(&self) -> Result<&Array2<f64>, DecodeError> {
        Ok(self.state()?.patterns())
    }
}
impl EpochTransformer for Csp {
    fn fit(&mut self, trials: ArrayView3<f64>, labels: &[i32]) -> Result<(), DecodeError> {
        self.state = None;
        let state = solve(&self.config, self.declared_classes, trials, labels)?;
        self.state = Some(state);
        Ok(())
    }
    fn transform(&self, trials: ArrayView3<f64>) -> Result<Array2<f64>, DecodeError> {
        log_variance(self.filters()?.view(), trials)
    }
}
fn solve(
    config: &CspConfig,
    declared: Option<[i32; 2]>,
    trials: ArrayView3<f64>,
    labels: &[i32],
) -> Result<CspState, DecodeError> {
    check_trials(trials, labels)?;
    let n_channels = trials.len_of(Axis(1));
    config.validate_for(n_channels)?;
    let classes = resolve_classes(labels, declared)?;
    let r1 = covariance::estimate(trials, labels, classes[0])?;
    let r2 = covariance::estimate(trials, labels, classes[1])?;
    let mut composite = &r1 + &r2;
    composite.diag_mut().mapv_inplace(|d| d + config.regularization);
    let eigen = generalized_eigen(r1.view(), composite.view())?;
    let mut order: Vec<usize> = (0..n_channels).collect();
    order.sort_by(|&a, &b| eigen.values[b].abs().total_cmp(&eigen.values[a].abs()));
    let half = config.n_components / 2;
    let picked: Vec<usize> = order[..half]
        .iter()
        .chain(&order[n_channels - half..])
        .copied()
        .collect();
    let mut filters = Array2::<f64>::zeros((picked.len(), n_channels));
    let mut patterns = Array2::<f64>::zeros((picked.len(), n_channels));
    for (row, &idx) in picked.iter().enumerate() {
        let w = eigen.vectors.column(idx);
        filters.row_mut(row).assign(&w);
        patterns.row_mut(row).assign(&composite.dot(&w));
    }
    let eigenvalues: Array1<f64> = picked.iter().map(|&i| eigen.values[i]).collect();
    debug!(
        "csp fit: {} trials, {} channels, classes {:?}, selected eigenvalues {:?}",
        labels.len(),
        n_channels,
        classes,
        eigenvalues.to_vec()
    );
    Ok(CspState {
        filters,
        patterns,
        eigenvalues,
        classes,
    })
}
/// Filters and patterns fitted on a whole dataset for inspection only.
///
/// Has no transform or score capability; accuracy must come from per-fold fits.
#[derive(Clone, Debug)]
pub struct DisplayPatterns {
    pub channel_labels: Vec<String>,
    pub filters: Array2<f64>,
    pub patterns: Array2<f64>,
    pub eigenvalues: Array1<f64>,
}
pub fn fit_display_patterns(
    config: &CspConfig,
    epochs: &EpochSet,
) -> Result<DisplayPatterns, DecodeError> {
    let state = solve(config, None, epochs.data.view(), &epochs.labels)?;
    Ok(DisplayPatterns {
        channel_labels: epochs.channel_labels.clone(),
        filters: state.filters,
        patterns: state.patterns,
        eigenvalues: state.eigenvalues,
    })
}
#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    /// Class 0 is loud on channel 0, class 1 on the last channel.
    fn two_class_trials(n_per_class: usize, n_channels: usize, n_samples: usize) -> (Array3<f64>, Vec<i32>) {
        let mut rng = StdRng::seed_from_u64(7);
        let n_trials = 2 * n_per_class;
        let labels: Vec<i32> = (0..n_trials).map(|t| (t >= n_per_class) as i32).collect();
        let data = Array3::from_shape_fn((n_trials, n_channels, n_samples), |(t, c, _)| {
            let noise: f64 = rng.gen_range(-1.0..1.0);
            let gain = match (labels[t], c) {
                (0, 0) => 4.0,
                (1, c) if c == n_channels - 1 => 4.0,
                _ => 1.0,
            };
            gain * noise
        });
        (data, labels)
    }
    #[test]
    fn filter_bank_has_requested_shape() {
        let (data, labels) = two_class_trials(10, 6, 80);
        let mut csp = Csp::with_components(4);
        csp.fit(data.view(), &labels).unwrap();
        assert_eq!(csp.filters().unwrap().dim(), (4, 6));
        assert_eq!(csp.patterns().unwrap().dim(), (4, 6));
        assert_eq!(csp.state().unwrap().classes(), [0, 1]);
    }
    #[test]
    fn eigenvalues_are_ranked_by_magnitude_then_split() {
        let (data, labels) = two_class_trials(12, 5, 100);
        let mut csp = Csp::with_components(2);
        csp.fit(data.view(), &labels).unwrap();
        let eig = csp.state().unwrap().eigenvalues();
        // first filter favours class 0 (large ratio), last favours class 1
        assert!(eig[0] > 0.5);
        assert!(eig[1] < 0.5);
        let features = csp.transform(data.view()).unwrap();
        let class0_mean: f64 = (0..12).map(|t| features[[t, 0]]).sum::<f64>() / 12.0;
        let class1_mean: f64 = (12..24).map(|t| features[[t, 0]]).sum::<f64>() / 12.0;
        assert!(class0_mean > class1_mean);
    }
    #[test]
    fn odd_or_oversized_component_counts_are_rejected() {
        let (data, labels) = two_class_trials(5, 4, 40);
        for k in [0, 3, 6] {
            let mut csp = Csp::with_components(k);
            assert!(matches!(
                csp.fit(data.view(), &labels),
                Err(DecodeError::InvalidComponentCount { requested, channels: 4 }) if requested == k
            ));
        }
    }
    #[test]
    fn transform_before_fit_fails() {
        let (data, _) = two_class_trials(2, 3, 10);
        let csp = Csp::with_components(2);
        assert!(matches!(csp.transform(data.view()), Err(DecodeError::NotFitted)));
    }
    #[test]
    fn failed_refit_clears_previous_state() {
        let (data, labels) = two_class_trials(5, 4, 40);
        let mut csp = Csp::with_components(2);
        csp.fit(data.view(), &labels).unwrap();
        let three_classes: Vec<i32> = (0..10).map(|t| (t % 3) as i32).collect();
        assert!(csp.fit(data.view(), &three_classes).is_err());
        assert!(!csp.is_fitted());
    }
    #[test]
    fn declared_classes_detect_missing_class() {
        assert!(matches!(
            resolve_classes(&[1, 1, 1], Some([1, 2])),
            Err(DecodeError::EmptyClass { label: 2 })
        ));
        assert!(matches!(
            resolve_classes(&[1, 2, 3], Some([1, 2])),
            Err(DecodeError::ClassCount { found: 3 })
        ));
        assert_eq!(resolve_classes(&[2, 1, 2], Some([2, 1])).unwrap(), [2, 1]);
        assert_eq!(resolve_classes(&[5, 3, 5], None).unwrap(), [3, 5]);
        assert!(matches!(
            resolve_classes(&[4, 4], None),
            Err(DecodeError::ClassCount { found: 1 })
        ));
    }
    #[test]
    fn display_patterns_cover_full_dataset() {
        let (data, labels) = two_class_trials(6, 4, 50);
        let epochs = EpochSet::new(
            data,
            labels,
            vec!["C3".into(), "Cz".into(), "C4".into(), "Pz".into()],
            160.0,
            0.0,
        )
        .unwrap();
        let display = fit_display_patterns(&CspConfig::default(), &epochs).unwrap();
        assert_eq!(display.filters.dim(), (4, 4));
        assert_eq!(display.patterns.dim(), (4, 4));
        assert_eq!(display.channel_labels.len(), 4);
    }
}
