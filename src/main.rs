// src/main.rs
use std::path::Path;
use anyhow::{Context, Result};
use log::{error, info};
use neurocsp::config::DecoderConfig;
use neurocsp::experiment;
use neurocsp::runner::JobRunner;
use neurocsp::types::{JobKey, JobSpec};
fn load_config() -> Result<DecoderConfig> {
    match std::env::args().nth(1) {
        Some(path) => DecoderConfig::from_json_file(Path::new(&path)),
        None => {
            let config = DecoderConfig::default();
            config.validate().context("validating default config")?;
            Ok(config)
        }
    }
}
fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}
fn main() -> Result<()> {
    env_logger::init();
    let config = load_config()?;
    let jobs: Vec<JobSpec> = config
        .tasks
        .iter()
        .flat_map(|&task| {
            config
                .subjects
                .iter()
                .map(move |&subject| JobKey::new(subject, task))
        })
        .map(|key| JobSpec::new(key, config.cv.seed))
        .collect();
    let runner = JobRunner::new(config.workers);
    let report = runner.run(&jobs, |spec| experiment::run_job(&config, spec));
    let mut failed_exports = Vec::new();
    if let Some(dir) = &config.output_dir {
        for (key, subject_report) in &report.completed {
            match experiment::export_report(dir, subject_report) {
                Ok((model, curve)) => info!("wrote {} and {}", model.display(), curve.display()),
                Err(err) => {
                    error!("{key}: export failed: {err:#}");
                    failed_exports.push(format!("{key}: {err:#}"));
                }
            }
        }
    }
    for (key, subject_report) in &report.completed {
        let cv = &subject_report.cv;
        println!(
            "Subject {} - Task {}: {:.2}% +/- {:.2}% (chance {:.2}%, max {:.2}%)",
            key.subject,
            key.task,
            cv.mean() * 100.0,
            cv.std() * 100.0,
            cv.chance_level * 100.0,
            cv.max() * 100.0
        );
        if let Some((i, peak)) = subject_report.sliding.peak() {
            println!(
                "    best window at {:.2}s: {:.2}%",
                subject_report.times[i],
                peak * 100.0
            );
        }
    }
    println!();
    println!("Task averages:");
    let mut task_means = Vec::new();
    for &task in &config.tasks {
        let scores: Vec<f64> = report
            .completed
            .iter()
            .filter(|(key, _)| key.task == task)
            .map(|(_, r)| r.cv.mean())
            .collect();
        let description = experiment::task(task).map_or("", |t| t.description);
        match mean(&scores) {
            Some(m) => {
                println!("Task {task} ({description}): {:.2}%", m * 100.0);
                task_means.push(m);
            }
            None => println!("Task {task} ({description}): no successful jobs"),
        }
    }
    if let Some(overall) = mean(&task_means) {
        println!();
        println!("Overall mean accuracy = {:.2}%", overall * 100.0);
    }
    if !report.failed.is_empty() {
        println!();
        println!("Failed jobs ({} of {}):", report.failed.len(), report.total());
        for failure in &report.failed {
            error!("{failure}");
            println!("  {failure}");
        }
    }
    if !failed_exports.is_empty() {
        println!();
        println!("Failed exports ({} of {}):", failed_exports.len(), report.completed.len());
        for failure in &failed_exports {
            println!("  {failure}");
        }
    }
    Ok(())
}
