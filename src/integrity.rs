//! Decides whether a file already on disk is complete enough to skip.
//!
//! There is no checksum to compare against, so the expected size is
//! estimated from sibling files of the same variable already downloaded.

use std::{
    fs,
    path::{Path, PathBuf},
};

use tracing::{debug, warn};

use crate::errors::Result;

/// Files below this size (KB) are incomplete when no siblings exist.
pub const ABSOLUTE_FLOOR_KB: f64 = 5.0;

/// Fraction of the acceptance floor an existing file must reach.
pub const FLOOR_FRACTION: f64 = 0.8;

/// Size statistics of sibling files, in KB.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SizeStats {
    pub mean: f64,
    pub min: f64,
    pub max: f64,
    pub count: usize,
}

impl SizeStats {
    pub fn from_sizes(sizes: &[f64]) -> Self {
        if sizes.is_empty() {
            return Self::default();
        }

        let min = sizes.iter().copied().fold(f64::INFINITY, f64::min);
        let max = sizes.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let mean = sizes.iter().sum::<f64>() / sizes.len() as f64;

        Self {
            mean,
            min,
            max,
            count: sizes.len(),
        }
    }

    /// `mean - 0.5 * (max - min)`, never below the observed minimum.
    pub fn acceptance_floor(&self) -> f64 {
        (self.mean - 0.5 * (self.max - self.min)).max(self.min)
    }

    /// Size (KB) below which an existing file counts as incomplete.
    pub fn threshold(&self) -> f64 {
        let floor = FLOOR_FRACTION * self.acceptance_floor();
        if self.count > 0 && floor > 0.0 {
            floor
        } else {
            ABSOLUTE_FLOOR_KB
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileCheck {
    Missing,
    Complete,
    Incomplete,
}

pub fn size_kb(path: &Path) -> Result<f64> {
    Ok(fs::metadata(path)?.len() as f64 / 1024.0)
}

/// Non-empty files in `dir` named `HYCOM_<key>_<timestamp...>.nc`.
pub fn sibling_files(dir: &Path, key: &str) -> Result<Vec<PathBuf>> {
    let pattern = format!(
        "{}/HYCOM_{}_[0-9]*.nc",
        glob::Pattern::escape(&dir.to_string_lossy()),
        glob::Pattern::escape(key)
    );

    let mut files: Vec<PathBuf> = glob::glob(&pattern)?
        .filter_map(|entry| entry.ok())
        .filter(|path| fs::metadata(path).map(|m| m.len() > 0).unwrap_or(false))
        .collect();
    files.sort();

    Ok(files)
}

/// Statistics of the siblings of `candidate`, which itself is left out.
pub fn sibling_stats(dir: &Path, key: &str, candidate: &Path) -> Result<SizeStats> {
    let sizes = sibling_files(dir, key)?
        .iter()
        .filter(|path| path.as_path() != candidate)
        .map(|path| size_kb(path))
        .collect::<Result<Vec<_>>>()?;

    Ok(SizeStats::from_sizes(&sizes))
}

/// Classifies an existing file against sibling statistics.
pub fn check_existing(path: &Path, stats: &SizeStats) -> Result<FileCheck> {
    if !path.exists() {
        return Ok(FileCheck::Missing);
    }

    let size = size_kb(path)?;
    let threshold = stats.threshold();
    if size < threshold {
        warn!(
            file = %path.display(),
            size_kb = format!("{size:.2}"),
            threshold_kb = format!("{threshold:.2}"),
            "existing file may be incomplete"
        );
        return Ok(FileCheck::Incomplete);
    }

    debug!(file = %path.display(), size_kb = format!("{size:.2}"), "existing file accepted");
    Ok(FileCheck::Complete)
}

// -- Tests -------------------------------------------------------------------
