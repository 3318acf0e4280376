//! Time-resolved scoring: one fit per split on a stable training window,
//! then the fixed pipeline is scored on successive windows of the full trials.
use log::{debug, warn};
use ndarray::{s, ArrayView3, Axis};
use serde::{Deserialize, Serialize};
use crate::decoding::epochs::{check_trials, select_labels, select_trials};
use crate::decoding::estimator::EpochClassifier;
use crate::decoding::validation::CvSplit;
use crate::decoding::DecodeError;
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub length_seconds: f64,
    pub step_seconds: f64,
}
impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            length_seconds: 0.5,
            step_seconds: 0.1,
        }
    }
}
impl WindowConfig {
    /// Window length and step in samples at `sample_rate_hz`.
    pub fn to_samples(&self, sample_rate_hz: f64) -> Result<(usize, usize), DecodeError> {
        let convert = |seconds: f64, what: &str| {
            let samples = (seconds * sample_rate_hz).round();
            if !(samples >= 1.0) {
                return Err(DecodeError::InvalidParameter(format!(
                    "window {what} of {seconds}s is shorter than one sample at {sample_rate_hz} Hz"
                )));
            }
            Ok(samples as usize)
        };
        Ok((
            convert(self.length_seconds, "length")?,
            convert(self.step_seconds, "step")?,
        ))
    }
}
/// Window start offsets `0, step, 2·step, …` with `offset + length <= total`.
pub fn window_offsets(total_samples: usize, window_length: usize, step: usize) -> Vec<usize> {
    if step == 0 || window_length == 0 || window_length > total_samples {
        return Vec::new();
    }
    (0..=total_samples - window_length).step_by(step).collect()
}
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SlidingWindowReport {
    pub window_length: usize,
    pub step: usize,
    pub offsets: Vec<usize>,
    /// Accuracy per offset, averaged over splits.
    pub mean_accuracy: Vec<f64>,
    /// `per_split[split][offset]`.
    pub per_split: Vec<Vec<f64>>,
}
impl SlidingWindowReport {
    /// Window-centre times in seconds relative to the event.
    pub fn times(&self, sample_rate_hz: f64, tmin_seconds: f64) -> Vec<f64> {
        self.offsets
            .iter()
            .map(|&o| (o as f64 + self.window_length as f64 / 2.0) / sample_rate_hz + tmin_seconds)
            .collect()
    }
    /// Offset index and value of the best mean accuracy.
    pub fn peak(&self) -> Option<(usize, f64)> {
        self.mean_accuracy
            .iter()
            .copied()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(&b.1))
    }
}
/// Scores a pipeline per split over sliding windows of `full`.
///
/// For every split a fresh pipeline is fitted once on the train trials of
/// `train_window`, then scored on each window of the split's test trials of
/// `full`. Both tensors must hold the same trials in the same order.
pub fn evaluate<P, F>(
    factory: F,
    full: ArrayView3<f64>,
    train_window: ArrayView3<f64>,
    labels: &[i32],
    splits: &[CvSplit],
    window_length: usize,
    step: usize,
) -> Result<SlidingWindowReport, DecodeError>
where
    P: EpochClassifier,
    F: Fn() -> P,
{
    if window_length == 0 || step == 0 {
        return Err(DecodeError::InvalidParameter(format!(
            "window length ({window_length}) and step ({step}) must be positive"
        )));
    }
    if splits.is_empty() {
        return Err(DecodeError::InvalidParameter(
            "at least one train/test split is required".into(),
        ));
    }
    check_trials(full, labels)?;
    check_trials(train_window, labels)?;
    if full.len_of(Axis(1)) != train_window.len_of(Axis(1)) {
        return Err(DecodeError::Shape(format!(
            "full trials have {} channels, training window has {}",
            full.len_of(Axis(1)),
            train_window.len_of(Axis(1))
        )));
    }
    let total = full.len_of(Axis(2));
    let offsets = window_offsets(total, window_length, step);
    if offsets.is_empty() {
        warn!("window of {window_length} samples does not fit in {total} samples");
    }
    let mut per_split = Vec::with_capacity(splits.len());
    for (index, split) in splits.iter().enumerate() {
        let mut pipeline = factory();
        pipeline.fit(
            select_trials(train_window, &split.train)?.view(),
            &select_labels(labels, &split.train)?,
        )?;
        let test_trials = select_trials(full, &split.test)?;
        let test_labels = select_labels(labels, &split.test)?;
        let scores = offsets
            .iter()
            .map(|&n| {
                let window = test_trials.slice(s![.., .., n..n + window_length]);
                pipeline.score(window, &test_labels)
            })
            .collect::<Result<Vec<f64>, DecodeError>>()?;
        debug!("split {index}: scored {} windows", scores.len());
        per_split.push(scores);
    }
    let mean_accuracy = (0..offsets.len())
        .map(|i| per_split.iter().map(|row| row[i]).sum::<f64>() / per_split.len() as f64)
        .collect();
    Ok(SlidingWindowReport {
        window_length,
        step,
        offsets,
        mean_accuracy,
        per_split,
    })
}
#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoding::classifier::ClassifierKind;
    use crate::decoding::csp::CspConfig;
    use crate::decoding::estimator::recording::{FitLog, RecordingClassifier};
    use crate::decoding::pipeline::CspPipeline;
    use crate::decoding::validation::CvConfig;
    use approx::assert_abs_diff_eq;
    use ndarray::Array3;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use std::rc::Rc;
    #[test]
    fn offsets_follow_floor_formula() {
        assert_eq!(window_offsets(200, 50, 10), (0..=150).step_by(10).collect::<Vec<_>>());
        assert_eq!(window_offsets(200, 50, 10).len(), 16);
        assert_eq!(window_offsets(100, 30, 7).len(), (100 - 30) / 7 + 1);
        assert!(window_offsets(40, 50, 10).is_empty());
        assert_eq!(window_offsets(50, 50, 10), vec![0]);
    }
    #[test]
    fn seconds_convert_to_samples() {
        assert_eq!(WindowConfig::default().to_samples(160.0).unwrap(), (80, 16));
        let tiny = WindowConfig {
            length_seconds: 0.5,
            step_seconds: 0.001,
        };
        assert!(matches!(tiny.to_samples(160.0), Err(DecodeError::InvalidParameter(_))));
    }
    #[test]
    fn times_are_window_centres() {
        let report = SlidingWindowReport {
            window_length: 80,
            step: 16,
            offsets: vec![0, 16],
            mean_accuracy: vec![0.5, 0.6],
            per_split: vec![],
        };
        let times = report.times(160.0, -1.0);
        assert_abs_diff_eq!(times[0], -0.75, epsilon = 1e-12);
        assert_abs_diff_eq!(times[1], -0.65, epsilon = 1e-12);
        assert_eq!(report.peak(), Some((1, 0.6)));
    }
    #[test]
    fn fits_use_training_window_and_score_full_trials() {
        let labels: Vec<i32> = (0..20).map(|t| (t % 2) as i32).collect();
        let full = Array3::from_shape_fn((20, 2, 100), |(t, _, s)| if s == 0 { t as f64 } else { 1.0 });
        let train_window = Array3::from_shape_fn((20, 2, 40), |(t, _, s)| {
            if s == 0 {
                1000.0 + t as f64
            } else {
                1.0
            }
        });
        let splits = CvConfig::default().splits(&labels).unwrap();
        let log = Rc::new(FitLog::default());
        let report = evaluate(
            || RecordingClassifier::build(&log),
            full.view(),
            train_window.view(),
            &labels,
            &splits,
            20,
            20,
        )
        .unwrap();
        assert_eq!(log.built.get(), splits.len());
        let fits = log.fits.borrow();
        assert_eq!(fits.len(), splits.len());
        for (fit, split) in fits.iter().zip(&splits) {
            let expected: Vec<f64> = split.train.iter().map(|&t| 1000.0 + t as f64).collect();
            assert_eq!(fit.markers, expected);
            assert_eq!(fit.n_samples, 40);
        }
        assert_eq!(report.offsets, vec![0, 20, 40, 60, 80]);
        assert!(report.per_split.iter().all(|row| row.len() == 5));
    }
    #[test]
    fn empty_split_list_is_rejected() {
        let labels = vec![0, 1, 0, 1];
        let trials = Array3::<f64>::ones((4, 2, 50));
        let log = Rc::new(FitLog::default());
        let result = evaluate(
            || RecordingClassifier::build(&log),
            trials.view(),
            trials.view(),
            &labels,
            &[],
            10,
            5,
        );
        assert!(matches!(result, Err(DecodeError::InvalidParameter(_))));
    }
    #[test]
    fn informative_second_half_scores_higher() {
        let mut rng = StdRng::seed_from_u64(21);
        let n = 40;
        let labels: Vec<i32> = (0..n).map(|t| (t % 2) as i32).collect();
        // class difference only after sample 100
        let full = Array3::from_shape_fn((n, 4, 200), |(t, c, s)| {
            let boosted = s >= 100 && ((labels[t] == 0 && c == 0) || (labels[t] == 1 && c == 3));
            let gain = if boosted { 4.0 } else { 1.0 };
            gain * rng.gen_range(-1.0..1.0)
        });
        let train_window = full.slice(s![.., .., 100..]).to_owned();
        let splits = CvConfig::default().splits(&labels).unwrap();
        let report = evaluate(
            || CspPipeline::new(CspConfig::default(), ClassifierKind::default()),
            full.view(),
            train_window.view(),
            &labels,
            &splits,
            50,
            10,
        )
        .unwrap();
        assert_eq!(report.offsets.len(), 16);
        assert_eq!(report.mean_accuracy.len(), 16);
        assert_eq!(report.per_split.len(), splits.len());
        assert!(report.mean_accuracy.iter().all(|a| (0.0..=1.0).contains(a)));
        let last = *report.mean_accuracy.last().unwrap();
        assert!(last > 0.8, "late-window accuracy {last}");
    }
}
