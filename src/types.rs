// src/types.rs
use std::fmt;
use serde::{Deserialize, Serialize};
/// Identifies one unit of work: a subject analysed on one task.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct JobKey {
    pub subject: u32,
    pub task: u32,
}
impl JobKey {
    pub fn new(subject: u32, task: u32) -> Self {
        Self { subject, task }
    }
    /// Split seed for this job, distinct per key for a given base seed.
    pub fn derive_seed(&self, base: u64) -> u64 {
        // splitmix64 over the packed key
        let mut z = base ^ (((self.subject as u64) << 32) | self.task as u64);
        z = z.wrapping_add(0x9E37_79B9_7F4A_7C15);
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        z ^ (z >> 31)
    }
}
impl fmt::Display for JobKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "S{:03}T{}", self.subject, self.task)
    }
}
/// A job as submitted to the runner.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct JobSpec {
    pub key: JobKey,
    pub seed: u64,
}
impl JobSpec {
    pub fn new(key: JobKey, base_seed: u64) -> Self {
        Self {
            key,
            seed: key.derive_seed(base_seed),
        }
    }
}
