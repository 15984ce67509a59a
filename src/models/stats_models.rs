use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

use super::outcome::{ResolutionOutcome, ResolutionStage};

/// Counters gathered over one resolution run.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub total_records: usize,
    /// Records restored from a previous run and left untouched.
    pub skipped_existing: usize,
    pub processed: usize,
    pub resolved: usize,
    pub ambiguous: usize,
    pub unresolved: usize,
    pub oracle_calls: usize,
    pub stage_counts: BTreeMap<ResolutionStage, usize>,
    pub tier_counts: BTreeMap<String, usize>,
    pub checkpoints_written: usize,
    pub checkpoint_failures: usize,
    pub elapsed_secs: f64,
}

impl RunSummary {
    pub fn new(run_id: &str, total_records: usize) -> Self {
        Self {
            run_id: run_id.to_string(),
            started_at: Utc::now(),
            total_records,
            skipped_existing: 0,
            processed: 0,
            resolved: 0,
            ambiguous: 0,
            unresolved: 0,
            oracle_calls: 0,
            stage_counts: BTreeMap::new(),
            tier_counts: BTreeMap::new(),
            checkpoints_written: 0,
            checkpoint_failures: 0,
            elapsed_secs: 0.0,
        }
    }

    /// Counts an outcome produced in this run, with the tier that decided it.
    pub fn record_outcome(&mut self, outcome: &ResolutionOutcome, tier: Option<&str>) {
        self.processed += 1;
        match outcome {
            ResolutionOutcome::Resolved { stage, .. } => {
                self.resolved += 1;
                *self.stage_counts.entry(*stage).or_insert(0) += 1;
            }
            ResolutionOutcome::Ambiguous { .. } => self.ambiguous += 1,
            ResolutionOutcome::Unresolved => self.unresolved += 1,
        }
        if let Some(tier) = tier {
            *self.tier_counts.entry(tier.to_string()).or_insert(0) += 1;
        }
    }

    pub fn resolution_rate(&self) -> f64 {
        let resolved_overall = self.resolved + self.skipped_existing;
        if self.total_records == 0 {
            0.0
        } else {
            resolved_overall as f64 / self.total_records as f64 * 100.0
        }
    }
}
