// src/resolution/records.rs
//! Conversion between tables and the records the resolver works on.

use log::{debug, warn};

use crate::matching::text::normalize_division;
use crate::models::{
    ReferenceRecord, ResolutionOutcome, ResolutionStage, SourceRecord, AMBIGUOUS_LABEL,
};
use crate::storage::table::Table;
use crate::utils::columns::{ColumnMapping, OutputColumns};

/// Separator between identifiers in the candidates column.
pub const CANDIDATE_SEPARATOR: &str = "|";

pub fn source_records(table: &Table, columns: &ColumnMapping) -> Vec<SourceRecord> {
    (0..table.len())
        .map(|row| {
            let named = columns
                .source_names
                .iter()
                .find_map(|col| table.value(row, col).map(|name| (col, name)));
            let locality = columns
                .source_locality
                .as_deref()
                .and_then(|col| table.value(row, col))
                .unwrap_or_default();
            let division = columns
                .source_division
                .as_deref()
                .and_then(|col| table.value(row, col))
                .and_then(normalize_division);
            let mut record = SourceRecord::new(
                row,
                named.map(|(_, name)| name).unwrap_or_default(),
                locality,
                division,
            );
            record.name_field = named.map(|(col, _)| col.clone());
            record
        })
        .collect()
}

/// Registry rows without a name or an identifier cannot be matched and are
/// left out. Returns the records and the number of rows skipped.
pub fn reference_records(table: &Table, columns: &ColumnMapping) -> (Vec<ReferenceRecord>, usize) {
    let mut records = Vec::with_capacity(table.len());
    let mut skipped = 0;
    for row in 0..table.len() {
        let name = table.value(row, &columns.reference_name);
        let identifier = table.value(row, &columns.reference_identifier);
        let (Some(name), Some(identifier)) = (name, identifier) else {
            skipped += 1;
            continue;
        };
        records.push(ReferenceRecord {
            name: name.to_string(),
            secondary_name: columns
                .reference_secondary_name
                .as_deref()
                .and_then(|col| table.value(row, col))
                .map(str::to_string),
            locality: columns
                .reference_locality
                .as_deref()
                .and_then(|col| table.value(row, col))
                .unwrap_or_default()
                .to_string(),
            division: columns
                .reference_division
                .as_deref()
                .and_then(|col| table.value(row, col))
                .map(str::to_string),
            identifier: identifier.to_string(),
        });
    }
    if skipped > 0 {
        warn!("⚠️ Skipped {} registry rows without a name or identifier", skipped);
    }
    (records, skipped)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestoreStatus {
    /// Number of records that already carried an identifier.
    Restored(usize),
    /// The previous output does not line up with the roster and was ignored.
    Incompatible(String),
}

/// Copies earlier results onto the records. Only identified rows are
/// restored; ambiguous or unresolved rows get processed again.
///
/// Every identified row of the previous output must carry the same source
/// cells as the current roster and a known stage, otherwise nothing is
/// restored.
pub fn restore_previous(
    records: &mut [SourceRecord],
    previous: &Table,
    source: &Table,
    output: &OutputColumns,
) -> RestoreStatus {
    if previous.len() != records.len() {
        return RestoreStatus::Incompatible(format!(
            "previous output has {} rows, the roster has {}",
            previous.len(),
            records.len()
        ));
    }
    if !previous.has_column(&output.identifier) {
        return RestoreStatus::Incompatible(format!(
            "previous output has no '{}' column",
            output.identifier
        ));
    }

    let output_columns = output.all();
    let source_columns: Vec<&String> = source
        .headers
        .iter()
        .filter(|h| !output_columns.contains(&h.as_str()))
        .collect();

    let mut restored = Vec::new();
    for record in records.iter() {
        let row = record.row_index;
        let Some(identifier) = previous.value(row, &output.identifier) else {
            continue;
        };
        if let Some(column) = source_columns
            .iter()
            .find(|column| previous.value(row, column.as_str()) != source.value(row, column.as_str()))
        {
            return RestoreStatus::Incompatible(format!(
                "row {} differs from the roster in column '{}'",
                row, column
            ));
        }
        let stage_label = previous.value(row, &output.stage).unwrap_or_default();
        let stage = match ResolutionStage::from_label(stage_label) {
            Some(stage) if stage != ResolutionStage::None => stage,
            _ => {
                return RestoreStatus::Incompatible(format!(
                    "row {} has identifier {} but stage '{}'",
                    row, identifier, stage_label
                ))
            }
        };
        restored.push((
            row,
            ResolutionOutcome::resolved(
                identifier,
                previous.value(row, &output.matched_name).unwrap_or_default(),
                previous
                    .value(row, &output.confidence)
                    .and_then(|c| c.parse().ok())
                    .unwrap_or(0),
                stage,
            ),
        ));
    }

    let count = restored.len();
    for (row, outcome) in restored {
        if let Some(record) = records.iter_mut().find(|r| r.row_index == row) {
            record.outcome = Some(outcome);
        }
    }
    debug!("{} rows of the previous output match the roster", count);
    RestoreStatus::Restored(count)
}

/// The source table with the five output columns filled from the records.
/// Records not processed yet get empty output cells.
pub fn render_snapshot(source: &Table, records: &[SourceRecord], output: &OutputColumns) -> Table {
    let mut snapshot = source.clone();
    let [id_col, name_col, confidence_col, stage_col, candidates_col] =
        output.all().map(|column| snapshot.ensure_column(column));

    for record in records {
        let (identifier, matched_name, confidence, stage, candidates) = match &record.outcome {
            None => Default::default(),
            Some(ResolutionOutcome::Resolved {
                identifier,
                matched_name,
                confidence,
                stage,
            }) => (
                identifier.clone(),
                matched_name.clone(),
                confidence.to_string(),
                stage.label().to_string(),
                String::new(),
            ),
            Some(ResolutionOutcome::Ambiguous { candidates }) => (
                String::new(),
                String::new(),
                String::new(),
                AMBIGUOUS_LABEL.to_string(),
                candidates.join(CANDIDATE_SEPARATOR),
            ),
            Some(ResolutionOutcome::Unresolved) => (
                String::new(),
                String::new(),
                String::new(),
                ResolutionStage::None.label().to_string(),
                String::new(),
            ),
        };
        let row = record.row_index;
        snapshot.set(row, id_col, &identifier);
        snapshot.set(row, name_col, &matched_name);
        snapshot.set(row, confidence_col, &confidence);
        snapshot.set(row, stage_col, &stage);
        snapshot.set(row, candidates_col, &candidates);
    }
    snapshot
}
