use thiserror::Error;
use crate::decoding::linalg::LinalgError;
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("shape mismatch: {0}")]
    Shape(String),
    #[error("expected exactly two classes, found {found}")]
    ClassCount { found: usize },
    #[error("class {label} has no trials")]
    EmptyClass { label: i32 },
    #[error("component count must be even and between 2 and {channels}, got {requested}")]
    InvalidComponentCount { requested: usize, channels: usize },
    #[error("spatial filters not fitted yet; call fit first")]
    NotFitted,
    #[error("component {component} of trial {trial} has zero power; log-variance undefined")]
    DegenerateSignal { trial: usize, component: usize },
    #[error("insufficient data: {0}")]
    InsufficientData(String),
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
    #[error(transparent)]
    Linalg(#[from] LinalgError),
}
