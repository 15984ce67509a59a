// src/utils/engine_config.rs
//! Runtime knobs of the resolution engine, read from the environment and
//! overridable from the command line.

use anyhow::{bail, Result};
use log::info;
use std::fmt;
use std::str::FromStr;

use super::constants::{
    DEFAULT_CHECKPOINT_INTERVAL, DEFAULT_ORACLE_MAX_REQUESTS, DEFAULT_ORACLE_WINDOW_SECS,
};
use super::env::{env_opt, env_or};
use crate::matching::fuzzy::Strictness;
use crate::models::EstablishmentType;

/// What to do with results persisted by an earlier run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResumeMode {
    /// Keep resolved records and continue with the rest.
    #[default]
    Resume,
    /// Void every earlier result and process the whole roster.
    Restart,
}

impl FromStr for ResumeMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "resume" | "continue" => Ok(ResumeMode::Resume),
            "restart" | "reset" => Ok(ResumeMode::Restart),
            other => Err(format!(
                "unknown resume mode '{}' (expected resume or restart)",
                other
            )),
        }
    }
}

impl fmt::Display for ResumeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResumeMode::Resume => f.write_str("resume"),
            ResumeMode::Restart => f.write_str("restart"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub strictness: Strictness,
    /// Persist a snapshot every N processed records.
    pub checkpoint_interval: usize,
    pub resume_mode: ResumeMode,
    pub ai_enabled: bool,
    /// Ask the oracle to score its own pick when the reply carries no confidence.
    pub ai_coherence_check: bool,
    pub ai_max_requests: usize,
    pub ai_window_secs: u64,
    /// Prefer registry entries of the same establishment type when possible.
    pub differentiate_types: bool,
    pub forced_type: Option<EstablishmentType>,
    /// Also consult secondary names when the ALL pass leaves several identifiers.
    pub disambiguate_all_pass: bool,
    /// Keep a per-record decision trace.
    pub trace_enabled: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            strictness: Strictness::Normal,
            checkpoint_interval: DEFAULT_CHECKPOINT_INTERVAL,
            resume_mode: ResumeMode::Resume,
            ai_enabled: true,
            ai_coherence_check: true,
            ai_max_requests: DEFAULT_ORACLE_MAX_REQUESTS,
            ai_window_secs: DEFAULT_ORACLE_WINDOW_SECS,
            differentiate_types: false,
            forced_type: None,
            disambiguate_all_pass: true,
            trace_enabled: false,
        }
    }
}

impl EngineConfig {
    /// Create configuration from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            strictness: env_or("MATCH_STRICTNESS", defaults.strictness),
            checkpoint_interval: env_or("CHECKPOINT_INTERVAL", defaults.checkpoint_interval),
            resume_mode: env_or("RESUME_MODE", defaults.resume_mode),
            ai_enabled: env_or("AI_ENABLED", defaults.ai_enabled),
            ai_coherence_check: env_or("AI_COHERENCE_CHECK", defaults.ai_coherence_check),
            ai_max_requests: env_or("AI_MAX_REQUESTS_PER_WINDOW", defaults.ai_max_requests),
            ai_window_secs: env_or("AI_WINDOW_SECS", defaults.ai_window_secs),
            differentiate_types: env_or("DIFFERENTIATE_TYPES", defaults.differentiate_types),
            forced_type: env_opt("FORCED_ESTABLISHMENT_TYPE")
                .and_then(|raw| raw.parse().ok())
                .filter(|t| *t != EstablishmentType::Unknown),
            disambiguate_all_pass: env_or(
                "DISAMBIGUATE_ALL_PASS",
                defaults.disambiguate_all_pass,
            ),
            trace_enabled: env_or("TRACE_ENABLED", defaults.trace_enabled),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.checkpoint_interval == 0 {
            bail!("CHECKPOINT_INTERVAL must be at least 1");
        }
        if self.ai_enabled && self.ai_max_requests == 0 {
            bail!("AI_MAX_REQUESTS_PER_WINDOW must be at least 1 when the oracle is enabled");
        }
        if self.ai_enabled && self.ai_window_secs == 0 {
            bail!("AI_WINDOW_SECS must be at least 1 when the oracle is enabled");
        }
        Ok(())
    }

    /// Type hint passed down the pipeline for a given source name.
    pub fn type_hint_for(&self, name: &str) -> EstablishmentType {
        if !self.differentiate_types {
            return EstablishmentType::Unknown;
        }
        self.forced_type
            .unwrap_or_else(|| crate::matching::text::detect_establishment_type(name))
    }

    pub fn log_config(&self) {
        info!("⚙️  Resolution engine configuration:");
        info!("   Fuzzy strictness: {}", self.strictness);
        info!(
            "   Checkpoint every {} processed records, mode: {}",
            self.checkpoint_interval, self.resume_mode
        );
        if self.ai_enabled {
            info!(
                "🤖 AI oracle ENABLED: at most {} calls per {}s window, coherence check {}",
                self.ai_max_requests,
                self.ai_window_secs,
                if self.ai_coherence_check { "on" } else { "off" }
            );
        } else {
            info!("🤖 AI oracle DISABLED - contested records stay ambiguous");
        }
        if self.differentiate_types {
            match self.forced_type {
                Some(t) => info!("🏥 Establishment type narrowing ENABLED (forced: {})", t),
                None => info!("🏥 Establishment type narrowing ENABLED (detected per record)"),
            }
        }
        if !self.disambiguate_all_pass {
            info!("   Secondary names only consulted after an ambiguous ANY pass");
        }
    }
}
