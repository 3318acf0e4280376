use ndarray::{Array2, ArrayView3};
use crate::decoding::DecodeError;
/// Something that learns from labelled trials and maps trials to features.
pub trait EpochTransformer {
    /// Learns from `trials` (trials x channels x samples). Replaces any state
    /// from a previous call.
    fn fit(&mut self, trials: ArrayView3<f64>, labels: &[i32]) -> Result<(), DecodeError>;
    /// Fails with [`DecodeError::NotFitted`] before a successful `fit`.
    fn transform(&self, trials: ArrayView3<f64>) -> Result<Array2<f64>, DecodeError>;
    fn fit_transform(
        &mut self,
        trials: ArrayView3<f64>,
        labels: &[i32],
    ) -> Result<Array2<f64>, DecodeError> {
        self.fit(trials, labels)?;
        self.transform(trials)
    }
}
/// A transformer that also predicts labels, so it can be cross-validated as
/// one unit.
pub trait EpochClassifier: EpochTransformer {
    fn predict(&self, trials: ArrayView3<f64>) -> Result<Vec<i32>, DecodeError>;
    /// Fraction of trials whose predicted label matches `labels`.
    fn score(&self, trials: ArrayView3<f64>, labels: &[i32]) -> Result<f64, DecodeError> {
        let predicted = self.predict(trials)?;
        accuracy(&predicted, labels)
    }
}
pub fn accuracy(predicted: &[i32], expected: &[i32]) -> Result<f64, DecodeError> {
    if predicted.len() != expected.len() {
        return Err(DecodeError::Shape(format!(
            "{} predictions for {} labels",
            predicted.len(),
            expected.len()
        )));
    }
    if expected.is_empty() {
        return Err(DecodeError::InsufficientData(
            "cannot score an empty set of trials".into(),
        ));
    }
    let correct = predicted
        .iter()
        .zip(expected)
        .filter(|(p, e)| p == e)
        .count();
    Ok(correct as f64 / expected.len() as f64)
}
/// Test double that remembers what each fit saw.
#[cfg(test)]
pub(crate) mod recording {
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;
    use ndarray::{Array2, ArrayView3, Axis};
    use super::{EpochClassifier, EpochTransformer};
    use crate::decoding::DecodeError;
    /// One `fit` call: the `[t, 0, 0]` marker of every trial and the sample count.
    #[derive(Clone, Debug, PartialEq)]
    pub struct FitCall {
        pub markers: Vec<f64>,
        pub n_samples: usize,
    }
    #[derive(Default)]
    pub struct FitLog {
        pub built: Cell<usize>,
        pub fits: RefCell<Vec<FitCall>>,
    }
    /// Predicts the first label it was fitted on for every trial.
    pub struct RecordingClassifier {
        log: Rc<FitLog>,
        label: Option<i32>,
    }
    impl RecordingClassifier {
        pub fn build(log: &Rc<FitLog>) -> Self {
            log.built.set(log.built.get() + 1);
            Self {
                log: Rc::clone(log),
                label: None,
            }
        }
    }
    impl EpochTransformer for RecordingClassifier {
        fn fit(&mut self, trials: ArrayView3<f64>, labels: &[i32]) -> Result<(), DecodeError> {
            self.log.fits.borrow_mut().push(FitCall {
                markers: trials.outer_iter().map(|t| t[[0, 0]]).collect(),
                n_samples: trials.len_of(Axis(2)),
            });
            self.label = labels.first().copied();
            Ok(())
        }
        fn transform(&self, trials: ArrayView3<f64>) -> Result<Array2<f64>, DecodeError> {
            self.label.ok_or(DecodeError::NotFitted)?;
            Ok(Array2::zeros((trials.len_of(Axis(0)), 1)))
        }
    }
    impl EpochClassifier for RecordingClassifier {
        fn predict(&self, trials: ArrayView3<f64>) -> Result<Vec<i32>, DecodeError> {
            let label = self.label.ok_or(DecodeError::NotFitted)?;
            Ok(vec![label; trials.len_of(Axis(0))])
        }
    }
}
