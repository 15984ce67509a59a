// src/storage/table.rs

use anyhow::{Context, Result};
use csv::{ReaderBuilder, WriterBuilder};
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

/// A delimited table kept entirely in memory, cells as text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(headers: Vec<String>) -> Self {
        Self {
            headers,
            rows: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Trimmed cell value; `None` for a missing column or a blank cell.
    pub fn value(&self, row: usize, column: &str) -> Option<&str> {
        let col = self.column_index(column)?;
        self.rows
            .get(row)
            .and_then(|cells| cells.get(col))
            .map(|cell| cell.trim())
            .filter(|cell| !cell.is_empty())
    }

    /// Index of `name`, appending an empty column when it does not exist yet.
    pub fn ensure_column(&mut self, name: &str) -> usize {
        if let Some(col) = self.column_index(name) {
            return col;
        }
        self.headers.push(name.to_string());
        for row in self.rows.iter_mut() {
            row.push(String::new());
        }
        self.headers.len() - 1
    }

    pub fn set(&mut self, row: usize, col: usize, value: &str) {
        if let Some(cells) = self.rows.get_mut(row) {
            if cells.len() <= col {
                cells.resize(col + 1, String::new());
            }
            cells[col] = value.to_string();
        }
    }

    pub fn push_row(&mut self, mut cells: Vec<String>) {
        cells.resize(self.headers.len(), String::new());
        self.rows.push(cells);
    }

    pub fn read_csv(path: &Path, delimiter: u8) -> Result<Table> {
        let mut reader = ReaderBuilder::new()
            .delimiter(delimiter)
            .flexible(true)
            .from_path(path)
            .with_context(|| format!("Failed to open table {}", path.display()))?;

        let headers: Vec<String> = reader
            .headers()
            .with_context(|| format!("Failed to read headers of {}", path.display()))?
            .iter()
            .enumerate()
            .map(|(i, h)| {
                let h = if i == 0 { h.trim_start_matches('\u{feff}') } else { h };
                h.trim().to_string()
            })
            .collect();

        let mut table = Table::new(headers);
        for (line, record) in reader.records().enumerate() {
            let record = record
                .with_context(|| format!("Malformed row {} in {}", line + 2, path.display()))?;
            table.push_row(record.iter().map(str::to_string).collect());
        }
        Ok(table)
    }

    /// Writes to a sibling temporary file then renames it over `path`, so an
    /// interrupted write never leaves a truncated table behind.
    pub fn write_csv(&self, path: &Path, delimiter: u8) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }
        let tmp = temporary_path(path);
        {
            let file = File::create(&tmp)
                .with_context(|| format!("Failed to create {}", tmp.display()))?;
            let buf_writer = BufWriter::with_capacity(512 * 1024, file);
            let mut writer = WriterBuilder::new()
                .delimiter(delimiter)
                .from_writer(buf_writer);
            writer.write_record(&self.headers)?;
            for row in &self.rows {
                writer.write_record(row)?;
            }
            writer.flush()?;
        }
        fs::rename(&tmp, path)
            .with_context(|| format!("Failed to move {} to {}", tmp.display(), path.display()))?;
        Ok(())
    }
}

fn temporary_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
