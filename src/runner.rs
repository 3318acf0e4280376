// src/runner.rs
//! Bounded worker pool for independent (subject, task) jobs.
//!
//! Jobs go out on a shared queue, outcomes come back on a result channel
//! tagged with the submission index. A job that errors or panics is reported
//! under its key and never affects the other jobs.
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{mpsc, Mutex};
use std::thread;
use log::{debug, info, warn};
use thiserror::Error;
use crate::decoding::DecodeError;
use crate::types::{JobKey, JobSpec};
#[derive(Debug, Error)]
pub enum JobError {
    #[error("job {key} failed: {source}")]
    Failed { key: JobKey, source: DecodeError },
    #[error("job {key} panicked: {message}")]
    Panicked { key: JobKey, message: String },
}
impl JobError {
    pub fn key(&self) -> JobKey {
        match self {
            JobError::Failed { key, .. } | JobError::Panicked { key, .. } => *key,
        }
    }
}
/// Outcomes in submission order, successes and failures kept apart.
#[derive(Debug)]
pub struct JobReport<T> {
    pub completed: Vec<(JobKey, T)>,
    pub failed: Vec<JobError>,
}
impl<T> JobReport<T> {
    pub fn total(&self) -> usize {
        self.completed.len() + self.failed.len()
    }
}
#[derive(Clone, Copy, Debug)]
pub struct JobRunner {
    workers: usize,
}
impl Default for JobRunner {
    fn default() -> Self {
        let workers = thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(4);
        Self::new(workers)
    }
}
impl JobRunner {
    pub fn new(workers: usize) -> Self {
        Self {
            workers: workers.max(1),
        }
    }
    pub fn workers(&self) -> usize {
        self.workers
    }
    /// Runs `work` once per job and waits for all of them.
    pub fn run<T, W>(&self, jobs: &[JobSpec], work: W) -> JobReport<T>
    where
        T: Send,
        W: Fn(&JobSpec) -> Result<T, DecodeError> + Sync,
    {
        let (job_tx, job_rx) = mpsc::channel::<(usize, JobSpec)>();
        for (index, job) in jobs.iter().enumerate() {
            job_tx.send((index, *job)).ok();
        }
        drop(job_tx);
        let job_rx = Mutex::new(job_rx);
        let (result_tx, result_rx) = mpsc::channel::<(usize, Result<T, JobError>)>();
        let workers = self.workers.min(jobs.len().max(1));
        info!("running {} jobs on {} workers", jobs.len(), workers);
        thread::scope(|scope| {
            for worker in 0..workers {
                let result_tx = result_tx.clone();
                let job_rx = &job_rx;
                let work = &work;
                scope.spawn(move || loop {
                    let next = match job_rx.lock() {
                        Ok(rx) => rx.recv(),
                        Err(_) => break,
                    };
                    let Ok((index, spec)) = next else {
                        break;
                    };
                    debug!("worker {worker} picked up {}", spec.key);
                    let outcome = match panic::catch_unwind(AssertUnwindSafe(|| work(&spec))) {
                        Ok(Ok(value)) => {
                            info!("{} finished", spec.key);
                            Ok(value)
                        }
                        Ok(Err(source)) => {
                            warn!("{} failed: {source}", spec.key);
                            Err(JobError::Failed {
                                key: spec.key,
                                source,
                            })
                        }
                        Err(payload) => {
                            let message = panic_message(payload.as_ref());
                            warn!("{} panicked: {message}", spec.key);
                            Err(JobError::Panicked {
                                key: spec.key,
                                message,
                            })
                        }
                    };
                    if result_tx.send((index, outcome)).is_err() {
                        break;
                    }
                });
            }
        });
        drop(result_tx);
        let mut outcomes: Vec<(usize, Result<T, JobError>)> = result_rx.into_iter().collect();
        outcomes.sort_by_key(|(index, _)| *index);
        let mut report = JobReport {
            completed: Vec::new(),
            failed: Vec::new(),
        };
        for (index, outcome) in outcomes {
            match outcome {
                Ok(value) => report.completed.push((jobs[index].key, value)),
                Err(err) => report.failed.push(err),
            }
        }
        report
    }
}
fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_owned()
    }
}
