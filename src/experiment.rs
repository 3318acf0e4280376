// src/experiment.rs
//! The unit of work: one subject analysed on one task.
use std::fs;
use std::path::{Path, PathBuf};
use anyhow::Context;
use log::info;
use rand::rngs::StdRng;
use rand::SeedableRng;
use crate::config::DecoderConfig;
use crate::decoding::{
    fit_display_patterns, sliding, validation, CspPipeline, CvConfig, CvReport, DecodeError,
    DisplayPatterns, EpochSet, EpochTransformer, SlidingWindowReport,
};
use crate::decoding::ModelSnapshot;
use crate::recorder::CurveRecorder;
use crate::synthetic::{self, Contrast, SyntheticConfig};
use crate::types::{JobKey, JobSpec};
#[derive(Clone, Copy, Debug)]
pub struct Task {
    pub id: u32,
    pub description: &'static str,
    /// Recording runs of the motor movement/imagery protocol.
    pub runs: [u32; 3],
    pub class_names: [&'static str; 2],
    pub event_ids: [i32; 2],
    pub imagined: bool,
    pub contrast: Contrast,
}
pub const TASKS: [Task; 4] = [
    Task {
        id: 1,
        description: "executed left vs right fist",
        runs: [3, 7, 11],
        class_names: ["left/fist", "right/fist"],
        event_ids: [1, 2],
        imagined: false,
        contrast: Contrast::LeftRightFist,
    },
    Task {
        id: 2,
        description: "imagined left vs right fist",
        runs: [4, 8, 12],
        class_names: ["left/imaginefist", "right/imaginefist"],
        event_ids: [1, 2],
        imagined: true,
        contrast: Contrast::LeftRightFist,
    },
    Task {
        id: 3,
        description: "executed fists vs feet",
        runs: [5, 9, 13],
        class_names: ["top/fists", "bottom/feets"],
        event_ids: [1, 2],
        imagined: false,
        contrast: Contrast::FistsFeet,
    },
    Task {
        id: 4,
        description: "imagined fists vs feet",
        runs: [6, 10, 14],
        class_names: ["top/imaginefists", "top/imaginefeets"],
        event_ids: [1, 2],
        imagined: true,
        contrast: Contrast::FistsFeet,
    },
];
pub fn task(id: u32) -> Option<&'static Task> {
    TASKS.iter().find(|t| t.id == id)
}
/// Everything one job produces.
pub struct SubjectReport {
    pub key: JobKey,
    pub cv: CvReport,
    pub sliding: SlidingWindowReport,
    /// Window-centre times of `sliding`, seconds relative to the cue.
    pub times: Vec<f64>,
    /// Fitted on all training-window trials, kept for export only.
    pub model: CspPipeline,
    /// Visualisation-only filters and patterns; never scored.
    pub display: DisplayPatterns,
    pub channel_names: Vec<String>,
}
/// Synthetic epochs for `spec`, standing in for a loaded recording.
pub fn load_epochs(config: &DecoderConfig, task: &Task, spec: &JobSpec) -> Result<EpochSet, DecodeError> {
    let synthetic_config = SyntheticConfig {
        sample_rate_hz: config.sample_rate_hz,
        tmin_seconds: config.tmin_seconds,
        tmax_seconds: config.tmax_seconds,
        trials_per_class: config.trials_per_class,
        // imagined movement desynchronises less than executed movement
        desync_depth: if task.imagined { 0.35 } else { 0.6 },
        ..SyntheticConfig::default()
    };
    // data stream kept apart from the split stream seeded with `spec.seed`
    let mut rng = StdRng::seed_from_u64(spec.key.derive_seed(!spec.seed));
    synthetic::generate(&synthetic_config, task.contrast, task.event_ids, &mut rng)
}
pub fn run_job(config: &DecoderConfig, spec: &JobSpec) -> Result<SubjectReport, DecodeError> {
    let task = task(spec.key.task)
        .ok_or_else(|| DecodeError::InvalidParameter(format!("unknown task {}", spec.key.task)))?;
    let epochs = load_epochs(config, task, spec)?;
    analyse(config, task, spec, &epochs)
}
/// Cross-validated and time-resolved scoring of `epochs`, then a final fit
/// on all training-window trials for export.
pub fn analyse(
    config: &DecoderConfig,
    task: &Task,
    spec: &JobSpec,
    epochs: &EpochSet,
) -> Result<SubjectReport, DecodeError> {
    let (from, to) = config.train_crop_seconds;
    let train = epochs.crop_seconds(from, to)?;
    let cv = CvConfig {
        seed: spec.seed,
        ..config.cv
    };
    let splits = cv.splits(&epochs.labels)?;
    let factory = || CspPipeline::new(config.csp, config.classifier).with_classes(task.event_ids);
    let cv_report = validation::evaluate(&factory, train.data.view(), &train.labels, &splits)?;
    let (window_length, step) = config.window.to_samples(epochs.sample_rate_hz)?;
    let sliding_report = sliding::evaluate(
        &factory,
        epochs.data.view(),
        train.data.view(),
        &epochs.labels,
        &splits,
        window_length,
        step,
    )?;
    let times = sliding_report.times(epochs.sample_rate_hz, epochs.tmin_seconds);
    let mut model = factory();
    model.fit(train.data.view(), &train.labels)?;
    let display = fit_display_patterns(&config.csp, &train)?;
    info!(
        "{} ({}): accuracy {:.3} +/- {:.3}, chance {:.3}, max {:.3}",
        spec.key,
        task.description,
        cv_report.mean(),
        cv_report.std(),
        cv_report.chance_level,
        cv_report.max()
    );
    Ok(SubjectReport {
        key: spec.key,
        cv: cv_report,
        sliding: sliding_report,
        times,
        model,
        display,
        channel_names: epochs.channel_labels.clone(),
    })
}
/// Writes `{key}_model.json` and `{key}_curve.csv` under `dir`, creating it
/// if needed. Returns both paths.
pub fn export_report(dir: &Path, report: &SubjectReport) -> anyhow::Result<(PathBuf, PathBuf)> {
    fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    let model_path = dir.join(format!("{}_model.json", report.key));
    ModelSnapshot::capture(&report.model, &report.channel_names)
        .and_then(|snapshot| snapshot.save(&model_path))
        .with_context(|| format!("writing {}", model_path.display()))?;
    let curve_path = dir.join(format!("{}_curve.csv", report.key));
    let mut recorder = CurveRecorder::create(&curve_path, report.sliding.per_split.len())
        .with_context(|| format!("creating {}", curve_path.display()))?;
    recorder
        .write_report(&report.times, &report.sliding)
        .and_then(|_| recorder.finish().map(|_| ()))
        .with_context(|| format!("writing {}", curve_path.display()))?;
    Ok((model_path, curve_path))
}
#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoding::CspConfig;
    fn small_config() -> DecoderConfig {
        DecoderConfig {
            csp: CspConfig {
                n_components: 4,
                ..CspConfig::default()
            },
            trials_per_class: 15,
            ..DecoderConfig::default()
        }
    }
    #[test]
    fn task_table_covers_four_binary_tasks() {
        assert_eq!(TASKS.len(), 4);
        assert!(TASKS.iter().all(|t| t.event_ids == [1, 2]));
        assert!(task(2).unwrap().imagined);
        assert!(task(5).is_none());
    }
    #[test]
    fn executed_task_decodes_above_chance() {
        let config = small_config();
        let spec = JobSpec::new(JobKey::new(1, 1), config.cv.seed);
        let report = run_job(&config, &spec).unwrap();
        assert_eq!(report.cv.scores.len(), config.cv.n_splits);
        assert!(report.cv.mean() > 0.7, "mean accuracy {}", report.cv.mean());
        assert_eq!(report.times.len(), report.sliding.mean_accuracy.len());
        assert_eq!(report.display.filters.dim(), (4, 16));
        assert!(report.model.is_fitted());
    }
    #[test]
    fn export_writes_snapshot_and_curve() {
        let config = DecoderConfig {
            cv: CvConfig {
                n_splits: 2,
                ..CvConfig::default()
            },
            ..small_config()
        };
        let report = run_job(&config, &JobSpec::new(JobKey::new(2, 3), 42)).unwrap();
        let dir = std::env::temp_dir().join(format!("neurocsp_export_{}", std::process::id()));
        let (model, curve) = export_report(&dir.join("nested"), &report).unwrap();
        assert!(model.ends_with("S002T3_model.json"));
        let restored = ModelSnapshot::load(&model).unwrap();
        assert_eq!(restored.channel_names, report.channel_names);
        let rows = fs::read_to_string(&curve).unwrap().lines().count();
        assert_eq!(rows, report.times.len() + 1);
        // a regular file where the directory should be
        let blocked = dir.join("blocked");
        fs::write(&blocked, b"").unwrap();
        let err = export_report(&blocked, &report).unwrap_err();
        assert!(format!("{err:#}").contains("blocked"));
        fs::remove_dir_all(&dir).ok();
    }
    #[test]
    fn unknown_task_is_an_error() {
        let config = small_config();
        let spec = JobSpec::new(JobKey::new(1, 7), 42);
        assert!(matches!(run_job(&config, &spec), Err(DecodeError::InvalidParameter(_))));
    }
}
