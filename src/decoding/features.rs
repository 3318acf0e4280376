use ndarray::{Array2, ArrayView2, ArrayView3, Axis};
use crate::decoding::DecodeError;
/// Projects every trial through `filters` (K x channels) and returns the
/// natural log of the mean squared amplitude of each component, one row per
/// trial.
///
/// Trials are assumed zero-mean (band-passed upstream), so the mean square is
/// the component variance. A component with exactly zero power is an error.
pub fn log_variance(
    filters: ArrayView2<f64>,
    trials: ArrayView3<f64>,
) -> Result<Array2<f64>, DecodeError> {
    let (n_trials, n_channels, n_samples) = trials.dim();
    if filters.ncols() != n_channels {
        return Err(DecodeError::Shape(format!(
            "filters expect {} channels, trials have {}",
            filters.ncols(),
            n_channels
        )));
    }
    if n_samples == 0 {
        return Err(DecodeError::Shape("trials have no samples".into()));
    }
    let mut features = Array2::<f64>::zeros((n_trials, filters.nrows()));
    for (trial_index, (trial, mut row)) in trials
        .axis_iter(Axis(0))
        .zip(features.axis_iter_mut(Axis(0)))
        .enumerate()
    {
        let projected = filters.dot(&trial);
        for (component, (power_slot, source)) in row
            .iter_mut()
            .zip(projected.axis_iter(Axis(0)))
            .enumerate()
        {
            let power = source.iter().map(|v| v * v).sum::<f64>() / n_samples as f64;
            if !(power > 0.0) || !power.is_finite() {
                return Err(DecodeError::DegenerateSignal {
                    trial: trial_index,
                    component,
                });
            }
            *power_slot = power.ln();
        }
    }
    Ok(features)
}
/// Per-trial log-variance of the raw channels, without spatial filtering.
pub fn channel_log_variance(trials: ArrayView3<f64>) -> Result<Array2<f64>, DecodeError> {
    let identity = Array2::<f64>::eye(trials.len_of(Axis(1)));
    log_variance(identity.view(), trials)
}
