// src/lib.rs
pub mod config;
pub mod decoding;
pub mod experiment;
pub mod recorder;
pub mod runner;
pub mod synthetic;
pub mod types;
