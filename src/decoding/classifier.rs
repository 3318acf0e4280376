//! Binary linear classifiers over CSP features.
//!
//! Both learners end in the same [`LinearModel`]: a positive decision value
//! predicts the second class of the pair, anything else the first.
use log::{debug, warn};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use serde::{Deserialize, Serialize};
use crate::decoding::epochs::{class_counts, resolve_classes};
use crate::decoding::estimator::accuracy;
use crate::decoding::linalg::cholesky_solve;
use crate::decoding::DecodeError;
/// Trained hyperplane `w·x + b`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LinearModel {
    pub weights: Vec<f64>,
    pub intercept: f64,
    pub classes: [i32; 2],
}
impl LinearModel {
    pub fn decision_function(&self, features: ArrayView2<f64>) -> Result<Array1<f64>, DecodeError> {
        if features.ncols() != self.weights.len() {
            return Err(DecodeError::Shape(format!(
                "model expects {} features, got {}",
                self.weights.len(),
                features.ncols()
            )));
        }
        let w = ArrayView1::from(&self.weights[..]);
        Ok(features.dot(&w) + self.intercept)
    }
    pub fn predict(&self, features: ArrayView2<f64>) -> Result<Vec<i32>, DecodeError> {
        let [negative, positive] = self.classes;
        Ok(self
            .decision_function(features)?
            .iter()
            .map(|&d| if d > 0.0 { positive } else { negative })
            .collect())
    }
}
pub trait LinearClassifier: Send {
    fn fit(&mut self, features: ArrayView2<f64>, labels: &[i32]) -> Result<(), DecodeError>;
    fn model(&self) -> Option<&LinearModel>;
    /// Installs previously trained parameters in place of a fit.
    fn load_model(&mut self, model: LinearModel);
    fn name(&self) -> &'static str;
    fn predict(&self, features: ArrayView2<f64>) -> Result<Vec<i32>, DecodeError> {
        self.model().ok_or(DecodeError::NotFitted)?.predict(features)
    }
    fn score(&self, features: ArrayView2<f64>, labels: &[i32]) -> Result<f64, DecodeError> {
        accuracy(&self.predict(features)?, labels)
    }
}
fn check_features(features: ArrayView2<f64>, labels: &[i32]) -> Result<[i32; 2], DecodeError> {
    if features.nrows() != labels.len() {
        return Err(DecodeError::Shape(format!(
            "{} feature rows for {} labels",
            features.nrows(),
            labels.len()
        )));
    }
    if features.ncols() == 0 {
        return Err(DecodeError::Shape("feature matrix has no columns".into()));
    }
    if features.iter().any(|v| !v.is_finite()) {
        return Err(DecodeError::InvalidParameter(
            "features contain non-finite values".into(),
        ));
    }
    resolve_classes(labels, None)
}
/// L2-regularised logistic regression solved by Newton iterations.
///
/// Minimises `½‖w‖² + C·Σ log(1 + exp(−yᵢ·(w·xᵢ + b)))`, with the intercept
/// treated as the weight of a constant feature and regularised along with
/// the rest.
#[derive(Clone, Debug)]
pub struct LogisticRegression {
    pub c: f64,
    pub max_iter: usize,
    pub tolerance: f64,
    model: Option<LinearModel>,
}
impl Default for LogisticRegression {
    fn default() -> Self {
        Self::with_c(1.0)
    }
}
impl LogisticRegression {
    pub fn with_c(c: f64) -> Self {
        Self {
            c,
            max_iter: 100,
            tolerance: 1e-8,
            model: None,
        }
    }
    fn objective(&self, x: &Array2<f64>, y: &Array1<f64>, w: &Array1<f64>) -> f64 {
        let margins = x.dot(w) * y;
        let loss: f64 = margins.iter().map(|&m| log1p_exp(-m)).sum();
        0.5 * w.dot(w) + self.c * loss
    }
}
/// `ln(1 + e^z)` without overflow.
fn log1p_exp(z: f64) -> f64 {
    if z > 0.0 {
        z + (-z).exp().ln_1p()
    } else {
        z.exp().ln_1p()
    }
}
fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}
fn with_bias_column(features: ArrayView2<f64>) -> Array2<f64> {
    let (n, d) = features.dim();
    let mut x = Array2::<f64>::ones((n, d + 1));
    x.slice_mut(ndarray::s![.., ..d]).assign(&features);
    x
}
impl LinearClassifier for LogisticRegression {
    fn fit(&mut self, features: ArrayView2<f64>, labels: &[i32]) -> Result<(), DecodeError> {
        self.model = None;
        if !(self.c > 0.0) {
            return Err(DecodeError::InvalidParameter(format!(
                "inverse regularisation C must be positive, got {}",
                self.c
            )));
        }
        let classes = check_features(features, labels)?;
        let x = with_bias_column(features);
        let y: Array1<f64> = labels
            .iter()
            .map(|&l| if l == classes[1] { 1.0 } else { -1.0 })
            .collect();
        let dim = x.ncols();
        let mut w = Array1::<f64>::zeros(dim);
        let mut objective = self.objective(&x, &y, &w);
        let mut converged = false;
        for iteration in 0..self.max_iter {
            let margins = x.dot(&w) * &y;
            let sig: Array1<f64> = margins.mapv(sigmoid);
            // gradient: w + C·Σ (σ(m) − 1)·y·x
            let coeff = (&sig - 1.0) * &y * self.c;
            let grad = &w + &x.t().dot(&coeff);
            let grad_norm = grad.iter().fold(0.0f64, |acc, g| acc.max(g.abs()));
            if grad_norm < self.tolerance {
                debug!("logistic regression converged after {iteration} iterations");
                converged = true;
                break;
            }
            let curvature = sig.mapv(|s| s * (1.0 - s) * self.c);
            let weighted = &x * &curvature.insert_axis(Axis(1));
            let mut hessian = x.t().dot(&weighted);
            hessian.diag_mut().mapv_inplace(|h| h + 1.0);
            let step = cholesky_solve(hessian.view(), grad.view())?;
            let mut scale = 1.0;
            let mut accepted = false;
            for _ in 0..30 {
                let candidate = &w - &(&step * scale);
                let candidate_objective = self.objective(&x, &y, &candidate);
                if candidate_objective <= objective {
                    w = candidate;
                    objective = candidate_objective;
                    accepted = true;
                    break;
                }
                scale *= 0.5;
            }
            if !accepted {
                converged = true;
                break;
            }
        }
        if !converged {
            warn!(
                "logistic regression stopped after {} iterations without converging",
                self.max_iter
            );
        }
        let intercept = w[dim - 1];
        self.model = Some(LinearModel {
            weights: w.slice(ndarray::s![..dim - 1]).to_vec(),
            intercept,
            classes,
        });
        Ok(())
    }
    fn model(&self) -> Option<&LinearModel> {
        self.model.as_ref()
    }
    fn load_model(&mut self, model: LinearModel) {
        self.model = Some(model);
    }
    fn name(&self) -> &'static str {
        "logistic_regression"
    }
}
/// Fisher linear discriminant with a pooled within-class covariance.
#[derive(Clone, Debug)]
pub struct LinearDiscriminant {
    /// Ridge relative to the mean feature variance, keeps the pooled
    /// covariance invertible.
    pub ridge: f64,
    model: Option<LinearModel>,
}
impl Default for LinearDiscriminant {
    fn default() -> Self {
        Self {
            ridge: 1e-6,
            model: None,
        }
    }
}
impl LinearClassifier for LinearDiscriminant {
    fn fit(&mut self, features: ArrayView2<f64>, labels: &[i32]) -> Result<(), DecodeError> {
        self.model = None;
        let classes = check_features(features, labels)?;
        let counts = class_counts(labels);
        let d = features.ncols();
        let mut means = [Array1::<f64>::zeros(d), Array1::<f64>::zeros(d)];
        for (row, &label) in features.axis_iter(Axis(0)).zip(labels) {
            let k = usize::from(label == classes[1]);
            means[k] += &row;
        }
        let n = [counts[&classes[0]] as f64, counts[&classes[1]] as f64];
        for k in 0..2 {
            means[k] /= n[k];
        }
        let mut pooled = Array2::<f64>::zeros((d, d));
        for (row, &label) in features.axis_iter(Axis(0)).zip(labels) {
            let k = usize::from(label == classes[1]);
            let centered = &row - &means[k];
            let column = centered.view().insert_axis(Axis(1));
            pooled += &column.dot(&column.t());
        }
        let dof = (labels.len() as f64 - 2.0).max(1.0);
        pooled /= dof;
        let ridge = self.ridge * (pooled.diag().sum() / d as f64).max(1e-12);
        pooled.diag_mut().mapv_inplace(|v| v + ridge);
        let direction = &means[1] - &means[0];
        let w = cholesky_solve(pooled.view(), direction.view())?;
        let midpoint = (&means[0] + &means[1]) * 0.5;
        let intercept = -w.dot(&midpoint) + (n[1] / n[0]).ln();
        self.model = Some(LinearModel {
            weights: w.to_vec(),
            intercept,
            classes,
        });
        Ok(())
    }
    fn model(&self) -> Option<&LinearModel> {
        self.model.as_ref()
    }
    fn load_model(&mut self, model: LinearModel) {
        self.model = Some(model);
    }
    fn name(&self) -> &'static str {
        "linear_discriminant"
    }
}
/// Which classifier a pipeline trains on the CSP features.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum ClassifierKind {
    LogisticRegression { c: f64 },
    LinearDiscriminant,
}
impl Default for ClassifierKind {
    fn default() -> Self {
        ClassifierKind::LogisticRegression { c: 1.0 }
    }
}
impl ClassifierKind {
    pub fn build(&self) -> Box<dyn LinearClassifier> {
        match *self {
            ClassifierKind::LogisticRegression { c } => Box::new(LogisticRegression::with_c(c)),
            ClassifierKind::LinearDiscriminant => Box::new(LinearDiscriminant::default()),
        }
    }
}
