// src/decoding/mod.rs
pub mod classifier;
pub mod covariance;
pub mod csp;
pub mod epochs;
pub mod error;
pub mod estimator;
pub mod features;
pub mod linalg;
pub mod pipeline;
pub mod sliding;
pub mod snapshot;
pub mod validation;
pub use classifier::{ClassifierKind, LinearClassifier, LinearDiscriminant, LinearModel, LogisticRegression};
pub use csp::{fit_display_patterns, Csp, CspConfig, CspState, DisplayPatterns};
pub use epochs::{chance_level, EpochSet};
pub use error::DecodeError;
pub use estimator::{accuracy, EpochClassifier, EpochTransformer};
pub use features::log_variance;
pub use linalg::LinalgError;
pub use pipeline::CspPipeline;
pub use sliding::{window_offsets, SlidingWindowReport, WindowConfig};
pub use snapshot::{ModelSnapshot, SnapshotError};
pub use validation::{cross_validate, CvConfig, CvReport, CvSplit, SplitStrategy};
