// src/utils/progress_bars/progress_config.rs

use indicatif::{ProgressBar, ProgressStyle};
use std::env;
use std::time::Duration;

/// Configuration for progress tracking during a resolution run
#[derive(Debug, Clone)]
pub struct ProgressConfig {
    /// Whether to show progress bars at all
    pub enabled: bool,
    /// Refresh rate for progress bars in milliseconds
    pub refresh_rate_ms: u64,
    /// Whether to show the running stage counts in the bar message
    pub show_stage_counts: bool,
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            refresh_rate_ms: 100,
            show_stage_counts: true,
        }
    }
}

impl ProgressConfig {
    /// Create progress configuration from environment variables
    pub fn from_env() -> Self {
        Self {
            enabled: env::var("PROGRESS_ENABLED")
                .unwrap_or_else(|_| "true".to_string())
                .parse()
                .unwrap_or(true),
            refresh_rate_ms: env::var("PROGRESS_REFRESH_RATE_MS")
                .unwrap_or_else(|_| "100".to_string())
                .parse()
                .unwrap_or(100),
            show_stage_counts: env::var("PROGRESS_SHOW_STAGE_COUNTS")
                .unwrap_or_else(|_| "true".to_string())
                .parse()
                .unwrap_or(true),
        }
    }

    /// Record-level progress bar, or `None` when progress display is off.
    pub fn create_bar(&self, total: usize) -> Option<ProgressBar> {
        if !self.enabled {
            return None;
        }
        let pb = ProgressBar::new(total as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template(
                    "{spinner:.green} [{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}",
                )
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        pb.enable_steady_tick(Duration::from_millis(self.refresh_rate_ms.max(10)));
        Some(pb)
    }

    pub fn should_show_stage_counts(&self) -> bool {
        self.enabled && self.show_stage_counts
    }
}
