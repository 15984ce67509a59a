// src/utils/progress_bars/logging.rs - Logging helpers for the resolution pipeline
use log::{debug, error, info, warn};
use std::time::Instant;

use crate::models::{ResolutionOutcome, RunSummary};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineComponent {
    Index,
    Resolver,
    Oracle,
    Checkpoint,
}

#[derive(Clone)]
pub struct ResolutionLogger {
    component_name: &'static str,
    component_emoji: &'static str,
    start_time: Instant,
}

impl ResolutionLogger {
    pub fn new(component: PipelineComponent) -> Self {
        let (component_name, component_emoji) = match component {
            PipelineComponent::Index => ("INDEX", "🗺️"),
            PipelineComponent::Resolver => ("RESOLVE", "🔗"),
            PipelineComponent::Oracle => ("ORACLE", "🤖"),
            PipelineComponent::Checkpoint => ("CHECKPOINT", "💾"),
        };
        Self {
            component_name,
            component_emoji,
            start_time: Instant::now(),
        }
    }

    pub fn log_start(&self, run_id: &str, total_records: usize, oracle_enabled: bool) {
        info!(
            "[{}] {} 🚀 Starting resolution of {} records (run ID: {}){}",
            self.component_name,
            self.component_emoji,
            total_records,
            run_id,
            if oracle_enabled { " with AI oracle" } else { " (no AI oracle)" }
        );
    }

    pub fn log_phase(&self, phase: &str, details: Option<&str>) {
        let elapsed = self.start_time.elapsed();
        let msg = if let Some(details) = details {
            format!(
                "[{}] {} 🔄 Phase: {} - {} [+{:.1}s]",
                self.component_name, self.component_emoji, phase, details, elapsed.as_secs_f32()
            )
        } else {
            format!(
                "[{}] {} 🔄 Phase: {} [+{:.1}s]",
                self.component_name, self.component_emoji, phase, elapsed.as_secs_f32()
            )
        };
        info!("{}", msg);
    }

    pub fn log_data_loaded(&self, count: usize, data_type: &str) {
        info!(
            "[{}] {} 📊 Loaded {} {} records",
            self.component_name, self.component_emoji, count, data_type
        );
    }

    pub fn log_index_built(&self, entries: usize, divisions: usize, undivided: usize) {
        info!(
            "[{}] {} 🧭 Indexed {} registry entries across {} divisions ({} without a division)",
            self.component_name, self.component_emoji, entries, divisions, undivided
        );
    }

    pub fn log_resume(&self, restored: usize, total: usize) {
        if restored > 0 {
            info!(
                "[{}] {} ⏭️  Restored {} of {} records from a previous run (will skip them)",
                self.component_name, self.component_emoji, restored, total
            );
        } else {
            info!(
                "[{}] {} ✨ No previous results to reuse - clean slate",
                self.component_name, self.component_emoji
            );
        }
    }

    pub fn log_record_outcome(&self, row: usize, name: &str, outcome: &ResolutionOutcome, tier: Option<&str>) {
        let tier = tier.unwrap_or("-");
        match outcome {
            ResolutionOutcome::Resolved {
                identifier,
                matched_name,
                confidence,
                stage,
            } => debug!(
                "[{}] {} ✅ Row {} '{}' → {} '{}' ({}, {}%, tier {})",
                self.component_name,
                self.component_emoji,
                row,
                name,
                identifier,
                matched_name,
                stage,
                confidence,
                tier
            ),
            ResolutionOutcome::Ambiguous { candidates } => debug!(
                "[{}] {} 🤷 Row {} '{}' ambiguous between {:?} (tier {})",
                self.component_name, self.component_emoji, row, name, candidates, tier
            ),
            ResolutionOutcome::Unresolved => debug!(
                "[{}] {} ❔ Row {} '{}' unresolved",
                self.component_name, self.component_emoji, row, name
            ),
        }
    }

    pub fn log_checkpoint(&self, processed: usize) {
        info!(
            "[{}] {} 💾 Checkpoint saved after {} processed records",
            self.component_name, self.component_emoji, processed
        );
    }

    pub fn log_progress_update(&self, current: usize, total: usize, additional_info: Option<&str>) {
        // Log at each 10% milestone and at the end
        let should_log = current == total || (total >= 100 && current % (total / 10) == 0);

        if should_log && current > 0 {
            let percent = (current as f64 / total as f64) * 100.0;
            let msg = if let Some(info) = additional_info {
                format!("Progress: {}/{} ({:.1}%) - {}", current, total, percent, info)
            } else {
                format!("Progress: {}/{} ({:.1}%)", current, total, percent)
            };
            info!("[{}] {} 📊 {}", self.component_name, self.component_emoji, msg);
        }
    }

    pub fn log_summary(&self, summary: &RunSummary) {
        let duration = self.start_time.elapsed();
        info!(
            "[{}] {} 🎉 COMPLETED: {} records processed in {:.2?} ({} restored from earlier runs)",
            self.component_name, self.component_emoji, summary.processed, duration, summary.skipped_existing
        );
        info!(
            "[{}] {} 📊 Results: {} resolved, {} ambiguous, {} unresolved ({:.1}% of the roster resolved)",
            self.component_name,
            self.component_emoji,
            summary.resolved,
            summary.ambiguous,
            summary.unresolved,
            summary.resolution_rate()
        );
        for (stage, count) in &summary.stage_counts {
            info!(
                "[{}] {}    {:<18} {}",
                self.component_name, self.component_emoji, stage.label(), count
            );
        }
        if summary.oracle_calls > 0 {
            info!(
                "[{}] {} 🤖 AI oracle calls: {}",
                self.component_name, self.component_emoji, summary.oracle_calls
            );
        }
        if summary.checkpoint_failures > 0 {
            warn!(
                "[{}] {} ⚠️  {} checkpoint writes failed ({} succeeded)",
                self.component_name,
                self.component_emoji,
                summary.checkpoint_failures,
                summary.checkpoints_written
            );
        }
    }

    pub fn log_warning(&self, message: &str) {
        warn!("[{}] {} ⚠️  {}", self.component_name, self.component_emoji, message);
    }

    pub fn log_error(&self, message: &str) {
        error!("[{}] {} ❌ {}", self.component_name, self.component_emoji, message);
    }

    pub fn log_debug(&self, message: &str) {
        debug!("[{}] {} {}", self.component_name, self.component_emoji, message);
    }
}
