use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::outcome::ResolutionOutcome;

/// Broad category of a healthcare establishment, inferred from its name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EstablishmentType {
    Hospital,
    Clinic,
    #[default]
    Unknown,
}

impl EstablishmentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EstablishmentType::Hospital => "hospital",
            EstablishmentType::Clinic => "clinic",
            EstablishmentType::Unknown => "unknown",
        }
    }
}

impl fmt::Display for EstablishmentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EstablishmentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "hospital" | "hopital" | "hôpital" => Ok(EstablishmentType::Hospital),
            "clinic" | "clinique" => Ok(EstablishmentType::Clinic),
            "unknown" | "" => Ok(EstablishmentType::Unknown),
            other => Err(format!(
                "unknown establishment type '{}' (expected hospital, clinic or unknown)",
                other
            )),
        }
    }
}

/// One row of the roster being resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceRecord {
    /// Position of the row in the source table.
    pub row_index: usize,
    pub name: String,
    /// Column the name was taken from, when several name columns exist.
    pub name_field: Option<String>,
    pub locality: String,
    pub division: Option<String>,
    /// `None` until the record has been processed (or restored from a checkpoint).
    pub outcome: Option<ResolutionOutcome>,
}

impl SourceRecord {
    pub fn new(row_index: usize, name: &str, locality: &str, division: Option<String>) -> Self {
        Self {
            row_index,
            name: name.to_string(),
            name_field: None,
            locality: locality.to_string(),
            division,
            outcome: None,
        }
    }

    pub fn identifier(&self) -> Option<&str> {
        self.outcome.as_ref().and_then(|o| o.identifier())
    }

    /// Records carrying an identifier are never re-processed.
    pub fn is_resolved(&self) -> bool {
        self.identifier().is_some()
    }

    pub fn clear_outcome(&mut self) {
        self.outcome = None;
    }
}

/// One entry of the FINESS registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceRecord {
    pub name: String,
    pub secondary_name: Option<String>,
    pub locality: String,
    pub division: Option<String>,
    pub identifier: String,
}

/// Reference entry reduced to what the matchers need.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Candidate {
    pub name: String,
    pub secondary_name: Option<String>,
    pub identifier: String,
}

impl From<&ReferenceRecord> for Candidate {
    fn from(record: &ReferenceRecord) -> Self {
        Candidate {
            name: record.name.clone(),
            secondary_name: record
                .secondary_name
                .as_ref()
                .filter(|s| !s.trim().is_empty())
                .cloned(),
            identifier: record.identifier.clone(),
        }
    }
}

pub type CandidateSet = Vec<Candidate>;

/// Distinct identifiers of a candidate list, in first-seen order.
pub fn distinct_identifiers<'a, I>(candidates: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a Candidate>,
{
    let mut seen: Vec<String> = Vec::new();
    for candidate in candidates {
        if !seen.iter().any(|id| id == &candidate.identifier) {
            seen.push(candidate.identifier.clone());
        }
    }
    seen
}
