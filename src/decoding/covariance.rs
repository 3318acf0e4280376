//! Trace-normalised spatial covariance per trial, averaged per class.
//!
//! Normalising each `X·Xᵀ` by its trace removes absolute amplitude differences
//! between trials before the class averages enter the eigenproblem.
use ndarray::{Array2, ArrayView2, ArrayView3, Axis};
use crate::decoding::DecodeError;
/// Spatial covariance `X·Xᵀ / trace(X·Xᵀ)` of one (channels x samples) trial.
///
/// `trial_index` only labels the error when the trial carries no power.
pub fn normalized_covariance(
    trial: ArrayView2<f64>,
    trial_index: usize,
) -> Result<Array2<f64>, DecodeError> {
    let cov = trial.dot(&trial.t());
    let trace = cov.diag().sum();
    if !(trace > 0.0) || !trace.is_finite() {
        return Err(DecodeError::DegenerateSignal {
            trial: trial_index,
            component: 0,
        });
    }
    Ok(cov / trace)
}
/// Mean of the per-trial normalised covariances of the class `label`.
pub fn class_covariance<'a, I>(trials: I, label: i32) -> Result<Array2<f64>, DecodeError>
where
    I: IntoIterator<Item = (usize, ArrayView2<'a, f64>)>,
{
    let mut sum: Option<Array2<f64>> = None;
    let mut count = 0usize;
    for (index, trial) in trials {
        let cov = normalized_covariance(trial, index)?;
        match sum.as_mut() {
            None => sum = Some(cov),
            Some(acc) => {
                if acc.dim() != cov.dim() {
                    return Err(DecodeError::Shape(format!(
                        "trial {index} has {} channels, expected {}",
                        cov.nrows(),
                        acc.nrows()
                    )));
                }
                *acc += &cov;
            }
        }
        count += 1;
    }
    let sum = sum.ok_or(DecodeError::EmptyClass { label })?;
    Ok(sum / count as f64)
}
/// Class covariance over the trials of `trials` labelled `label`.
pub fn estimate(
    trials: ArrayView3<f64>,
    labels: &[i32],
    label: i32,
) -> Result<Array2<f64>, DecodeError> {
    let members = trials
        .axis_iter(Axis(0))
        .enumerate()
        .zip(labels)
        .filter(|(_, l)| **l == label)
        .map(|(trial, _)| trial);
    class_covariance(members, label)
}
