// src/utils/output_paths.rs

use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};

fn with_stem_suffix(path: &Path, suffix: &str) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    let file_name = match path.extension() {
        Some(ext) => format!("{}{}.{}", stem, suffix, ext.to_string_lossy()),
        None => format!("{}{}", stem, suffix),
    };
    path.with_file_name(file_name)
}

/// `resolved.csv` -> `resolved_20240131_154500.csv`
pub fn timestamped_path(path: &Path, at: DateTime<Local>) -> PathBuf {
    with_stem_suffix(path, &format!("_{}", at.format("%Y%m%d_%H%M%S")))
}

/// `resolved.csv` -> `resolved_SAMPLE_25.csv`
pub fn sample_path(path: &Path, sample_size: usize) -> PathBuf {
    with_stem_suffix(path, &format!("_SAMPLE_{}", sample_size))
}

/// Trace file written next to the output: `resolved.csv` -> `resolved_trace.json`
pub fn trace_path(output: &Path) -> PathBuf {
    with_stem_suffix(output, "_trace").with_extension("json")
}
