// src/synthetic.rs
//! Seeded motor-imagery-like epochs over a sensorimotor montage.
//!
//! Every channel carries a 10 Hz mu rhythm, a shared background source and
//! Gaussian noise. After the cue the mu rhythm desynchronises over the
//! region that drives the trial's class, which is what CSP picks up.
use std::f64::consts::PI;
use ndarray::Array3;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::Rng;
use rand_distr::{Distribution, Normal};
use crate::decoding::{DecodeError, EpochSet};
pub const CHANNELS: [&str; 16] = [
    "FC3", "FC1", "FCz", "FC2", "FC4", "C3", "C1", "Cz", "C2", "C4", "CP3", "CP1", "CPz", "CP2",
    "CP4", "Fpz",
];
/// Which pair of movements a task contrasts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Contrast {
    LeftRightFist,
    FistsFeet,
}
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Region {
    Left,
    Midline,
    Right,
    Frontal,
}
fn region(channel: &str) -> Region {
    if channel.starts_with("Fp") {
        return Region::Frontal;
    }
    match channel.chars().last() {
        Some('z') => Region::Midline,
        Some(d) if d.to_digit(10).is_some_and(|d| d % 2 == 1) => Region::Left,
        _ => Region::Right,
    }
}
/// Mu amplitude kept after the cue, per class, in a region.
fn post_cue_gain(contrast: Contrast, class: usize, region: Region, depth: f64) -> f64 {
    let desync = match (contrast, class, region) {
        // left fist desynchronises the right hemisphere and vice versa
        (Contrast::LeftRightFist, 0, Region::Right) => true,
        (Contrast::LeftRightFist, 1, Region::Left) => true,
        (Contrast::FistsFeet, 0, Region::Left | Region::Right) => true,
        (Contrast::FistsFeet, 1, Region::Midline) => true,
        _ => false,
    };
    if desync {
        1.0 - depth
    } else {
        1.0
    }
}
#[derive(Clone, Debug)]
pub struct SyntheticConfig {
    pub sample_rate_hz: f64,
    pub tmin_seconds: f64,
    pub tmax_seconds: f64,
    pub trials_per_class: usize,
    pub mu_hz: f64,
    pub mu_amplitude: f64,
    pub background_amplitude: f64,
    pub noise_std: f64,
    /// Fraction of mu amplitude lost over the active region after the cue.
    pub desync_depth: f64,
}
impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            sample_rate_hz: 160.0,
            tmin_seconds: -1.0,
            tmax_seconds: 2.0,
            trials_per_class: 22,
            mu_hz: 10.0,
            mu_amplitude: 2.0,
            background_amplitude: 1.0,
            noise_std: 1.0,
            desync_depth: 0.6,
        }
    }
}
/// Generates a shuffled two-class epoch set labelled with `event_ids`.
pub fn generate(
    config: &SyntheticConfig,
    contrast: Contrast,
    event_ids: [i32; 2],
    rng: &mut StdRng,
) -> Result<EpochSet, DecodeError> {
    let noise = Normal::new(0.0, config.noise_std).map_err(|e| {
        DecodeError::InvalidParameter(format!("noise std {}: {e}", config.noise_std))
    })?;
    let sr = config.sample_rate_hz;
    let n_samples = ((config.tmax_seconds - config.tmin_seconds) * sr).round() as usize + 1;
    let mut classes: Vec<usize> = (0..2 * config.trials_per_class)
        .map(|t| t % 2)
        .collect();
    classes.shuffle(rng);
    let regions: Vec<Region> = CHANNELS.iter().map(|c| region(c)).collect();
    let mut data = Array3::<f64>::zeros((classes.len(), CHANNELS.len(), n_samples));
    for (trial, &class) in classes.iter().enumerate() {
        let mu_phase = rng.gen_range(0.0..2.0 * PI);
        let background_hz = rng.gen_range(6.0..30.0);
        let background_phase = rng.gen_range(0.0..2.0 * PI);
        for (channel, &region) in regions.iter().enumerate() {
            let post_gain = post_cue_gain(contrast, class, region, config.desync_depth);
            let channel_phase = mu_phase + channel as f64 * 0.05;
            for sample in 0..n_samples {
                let t = config.tmin_seconds + sample as f64 / sr;
                let gain = if t >= 0.0 { post_gain } else { 1.0 };
                let mu = config.mu_amplitude * gain * (2.0 * PI * config.mu_hz * t + channel_phase).sin();
                let background = config.background_amplitude
                    * (2.0 * PI * background_hz * t + background_phase).sin();
                data[[trial, channel, sample]] = mu + background + noise.sample(rng);
            }
        }
    }
    let labels = classes.iter().map(|&c| event_ids[c]).collect();
    EpochSet::new(
        data,
        labels,
        CHANNELS.iter().map(|c| c.to_string()).collect(),
        sr,
        config.tmin_seconds,
    )
}
