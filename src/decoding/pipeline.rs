use log::debug;
use ndarray::{Array2, ArrayView3};
use crate::decoding::classifier::{ClassifierKind, LinearClassifier, LinearModel};
use crate::decoding::csp::{Csp, CspConfig};
use crate::decoding::estimator::{EpochClassifier, EpochTransformer};
use crate::decoding::DecodeError;
/// CSP log-variance features feeding a linear classifier, fitted and scored
/// as one unit.
///
/// `fit` learns the filter bank from the trials it is given and nothing else;
/// `predict` and `score` reuse that filter bank without refitting.
pub struct CspPipeline {
    csp: Csp,
    kind: ClassifierKind,
    classifier: Box<dyn LinearClassifier>,
}
impl CspPipeline {
    pub fn new(csp: CspConfig, kind: ClassifierKind) -> Self {
        Self::from_parts(Csp::new(csp), kind, kind.build())
    }
    pub fn from_parts(csp: Csp, kind: ClassifierKind, classifier: Box<dyn LinearClassifier>) -> Self {
        Self {
            csp,
            kind,
            classifier,
        }
    }
    /// Fixes the expected label pair of the spatial filter stage.
    pub fn with_classes(mut self, classes: [i32; 2]) -> Self {
        self.csp = self.csp.with_classes(classes);
        self
    }
    pub fn csp(&self) -> &Csp {
        &self.csp
    }
    pub fn kind(&self) -> ClassifierKind {
        self.kind
    }
    pub fn is_fitted(&self) -> bool {
        self.csp.is_fitted() && self.classifier.model().is_some()
    }
    pub fn model(&self) -> Result<&LinearModel, DecodeError> {
        self.classifier.model().ok_or(DecodeError::NotFitted)
    }
    pub fn decision_function(&self, trials: ArrayView3<f64>) -> Result<Vec<f64>, DecodeError> {
        let features = self.csp.transform(trials)?;
        Ok(self.model()?.decision_function(features.view())?.to_vec())
    }
}
impl EpochTransformer for CspPipeline {
    fn fit(&mut self, trials: ArrayView3<f64>, labels: &[i32]) -> Result<(), DecodeError> {
        let features = self.csp.fit_transform(trials, labels)?;
        self.classifier.fit(features.view(), labels)?;
        debug!(
            "pipeline fit: {} trials, {} features, classifier {}",
            labels.len(),
            features.ncols(),
            self.classifier.name()
        );
        Ok(())
    }
    fn transform(&self, trials: ArrayView3<f64>) -> Result<Array2<f64>, DecodeError> {
        self.csp.transform(trials)
    }
}
impl EpochClassifier for CspPipeline {
    fn predict(&self, trials: ArrayView3<f64>) -> Result<Vec<i32>, DecodeError> {
        let features = self.csp.transform(trials)?;
        self.classifier.predict(features.view())
    }
}
#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{s, Array3};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    fn lateralised(n_per_class: usize, seed: u64) -> (Array3<f64>, Vec<i32>) {
        let mut rng = StdRng::seed_from_u64(seed);
        let n = 2 * n_per_class;
        let labels: Vec<i32> = (0..n).map(|t| if t % 2 == 0 { 1 } else { 2 }).collect();
        let data = Array3::from_shape_fn((n, 4, 120), |(t, c, _)| {
            let gain = match (labels[t], c) {
                (1, 0) | (2, 3) => 3.0,
                _ => 1.0,
            };
            gain * rng.gen_range(-1.0..1.0)
        });
        (data, labels)
    }
    #[test]
    fn fits_and_scores_held_out_trials() {
        let (data, labels) = lateralised(20, 11);
        let mut pipeline = CspPipeline::new(CspConfig::default(), ClassifierKind::default());
        pipeline
            .fit(data.slice(s![..30, .., ..]), &labels[..30])
            .unwrap();
        let score = pipeline
            .score(data.slice(s![30.., .., ..]), &labels[30..])
            .unwrap();
        assert!(score >= 0.8, "held-out accuracy {score}");
    }
    #[test]
    fn predict_before_fit_is_not_fitted() {
        let (data, _) = lateralised(3, 1);
        let pipeline = CspPipeline::new(CspConfig::default(), ClassifierKind::LinearDiscriminant);
        assert!(matches!(
            pipeline.predict(data.view()),
            Err(DecodeError::NotFitted)
        ));
        assert!(!pipeline.is_fitted());
    }
    #[test]
    fn scoring_does_not_refit_filters() {
        let (data, labels) = lateralised(10, 5);
        let mut pipeline = CspPipeline::new(CspConfig::default(), ClassifierKind::default());
        pipeline.fit(data.view(), &labels).unwrap();
        let before = pipeline.csp().filters().unwrap().clone();
        let flipped: Vec<i32> = labels.iter().map(|&l| 3 - l).collect();
        pipeline.score(data.view(), &flipped).unwrap();
        assert_eq!(&before, pipeline.csp().filters().unwrap());
    }
    #[test]
    fn predictions_use_label_values() {
        let (data, labels) = lateralised(10, 9);
        let mut pipeline = CspPipeline::new(CspConfig::default(), ClassifierKind::LinearDiscriminant);
        pipeline.fit(data.view(), &labels).unwrap();
        let predicted = pipeline.predict(data.view()).unwrap();
        assert!(predicted.iter().all(|p| *p == 1 || *p == 2));
        assert_eq!(pipeline.decision_function(data.view()).unwrap().len(), 20);
    }
}
