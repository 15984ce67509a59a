// src/storage/checkpoint.rs

use anyhow::Result;
use log::debug;
use std::path::{Path, PathBuf};

use super::table::Table;

/// Persistence for partial results. `load` returns the snapshot of a previous
/// run, if any; `save` replaces it.
pub trait CheckpointStore {
    fn load(&self) -> Result<Option<Table>>;
    fn save(&mut self, snapshot: &Table) -> Result<()>;
}

/// Keeps snapshots as a delimited file. The file read on resume may differ
/// from the one written, as with timestamped outputs.
#[derive(Debug, Clone)]
pub struct CsvCheckpointStore {
    resume_from: Option<PathBuf>,
    destination: PathBuf,
    delimiter: u8,
}

impl CsvCheckpointStore {
    pub fn new(destination: &Path, delimiter: u8) -> Self {
        Self {
            resume_from: Some(destination.to_path_buf()),
            destination: destination.to_path_buf(),
            delimiter,
        }
    }

    pub fn with_resume_source(mut self, resume_from: Option<PathBuf>) -> Self {
        self.resume_from = resume_from;
        self
    }

    pub fn destination(&self) -> &Path {
        &self.destination
    }
}

impl CheckpointStore for CsvCheckpointStore {
    fn load(&self) -> Result<Option<Table>> {
        match &self.resume_from {
            Some(path) if path.exists() => {
                debug!("Loading previous results from {}", path.display());
                Table::read_csv(path, self.delimiter).map(Some)
            }
            _ => Ok(None),
        }
    }

    fn save(&mut self, snapshot: &Table) -> Result<()> {
        snapshot.write_csv(&self.destination, self.delimiter)
    }
}
