// src/resolution/trace.rs

use anyhow::{Context, Result};
use serde::Serialize;
use std::fs;
use std::path::Path;

use super::cascade::GeoTier;
use crate::matching::fuzzy::FuzzyMatch;
use crate::matching::token::TokenMatch;
use crate::models::{EstablishmentType, ResolutionOutcome};
use crate::oracle::OracleVerdict;

/// What happened inside one geographic tier.
#[derive(Debug, Clone, Serialize)]
pub struct TierTrace {
    pub tier: GeoTier,
    pub candidates: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub narrowed_to_type: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tokens: Option<TokenMatch>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fuzzy: Option<FuzzyMatch>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub oracle: Option<OracleVerdict>,
    pub outcome: &'static str,
}

impl TierTrace {
    pub fn new(tier: GeoTier, candidates: usize) -> Self {
        Self {
            tier,
            candidates,
            narrowed_to_type: None,
            tokens: None,
            fuzzy: None,
            oracle: None,
            outcome: "none",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RecordTrace {
    pub row: usize,
    pub name: String,
    pub locality: String,
    pub division: Option<String>,
    pub required_tokens: Vec<String>,
    pub type_hint: EstablishmentType,
    pub tiers: Vec<TierTrace>,
    pub outcome: Option<ResolutionOutcome>,
}

/// Writes the collected traces as a pretty-printed JSON array.
pub fn write_traces(path: &Path, traces: &[RecordTrace]) -> Result<()> {
    let json = serde_json::to_string_pretty(traces).context("Failed to serialize decision traces")?;
    fs::write(path, json).with_context(|| format!("Failed to write traces to {}", path.display()))?;
    Ok(())
}
