// src/recorder.rs
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use crate::decoding::SlidingWindowReport;
/// Writes a time-resolved accuracy curve as CSV: one row per window with its
/// centre time, mean accuracy and the per-split accuracies.
pub struct CurveRecorder {
    writer: BufWriter<File>,
    path: PathBuf,
    rows: usize,
}
impl CurveRecorder {
    pub fn create(path: &Path, n_splits: usize) -> io::Result<Self> {
        let mut writer = BufWriter::new(File::create(path)?);
        write!(writer, "time_s,offset,mean_accuracy")?;
        for split in 0..n_splits {
            write!(writer, ",split_{split}")?;
        }
        writeln!(writer)?;
        Ok(Self {
            writer,
            path: path.to_path_buf(),
            rows: 0,
        })
    }
    pub fn write_row(&mut self, time_s: f64, offset: usize, mean: f64, per_split: &[f64]) -> io::Result<()> {
        write!(self.writer, "{time_s:.4},{offset},{mean:.4}")?;
        for value in per_split {
            write!(self.writer, ",{value:.4}")?;
        }
        writeln!(self.writer)?;
        self.rows += 1;
        Ok(())
    }
    pub fn write_report(&mut self, times: &[f64], report: &SlidingWindowReport) -> io::Result<()> {
        for (i, (&time_s, &offset)) in times.iter().zip(&report.offsets).enumerate() {
            let per_split: Vec<f64> = report.per_split.iter().map(|row| row[i]).collect();
            self.write_row(time_s, offset, report.mean_accuracy[i], &per_split)?;
        }
        Ok(())
    }
    /// Flushes and returns the file path and the number of data rows.
    pub fn finish(mut self) -> io::Result<(PathBuf, usize)> {
        self.writer.flush()?;
        Ok((self.path, self.rows))
    }
}
