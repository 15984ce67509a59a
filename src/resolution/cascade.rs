// src/resolution/cascade.rs

use serde::Serialize;

use crate::matching::geo_index::GeographicIndex;
use crate::matching::text::{division_from_postal, normalize_division, normalize_locality};
use crate::models::{CandidateSet, SourceRecord};

/// Geographic scope of a record: its department code and normalized locality.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeoKey {
    pub division: Option<String>,
    pub locality: String,
}

impl GeoKey {
    /// The explicit division wins; otherwise one is derived from a postal
    /// code written in front of the locality, and that code is then dropped
    /// from the locality like on the registry side.
    pub fn for_record(record: &SourceRecord) -> Self {
        if let Some(division) = record.division.as_deref().and_then(normalize_division) {
            return GeoKey {
                division: Some(division),
                locality: normalize_locality(&record.locality, false),
            };
        }
        match division_from_postal(&record.locality) {
            Some(division) => GeoKey {
                division: Some(division),
                locality: normalize_locality(&record.locality, true),
            },
            None => GeoKey {
                division: None,
                locality: normalize_locality(&record.locality, false),
            },
        }
    }
}

/// Geographic tiers, tightest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum GeoTier {
    DivisionAndLocality,
    Division,
    Locality,
}

impl GeoTier {
    pub const CASCADE: [GeoTier; 3] = [
        GeoTier::DivisionAndLocality,
        GeoTier::Division,
        GeoTier::Locality,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            GeoTier::DivisionAndLocality => "division+locality",
            GeoTier::Division => "division",
            GeoTier::Locality => "locality",
        }
    }

    /// Candidates of this tier, or `None` when the record lacks the fields
    /// the tier needs.
    pub fn candidates(&self, index: &GeographicIndex, key: &GeoKey) -> Option<CandidateSet> {
        let has_locality = !key.locality.is_empty();
        match (self, key.division.as_deref()) {
            (GeoTier::DivisionAndLocality, Some(division)) if has_locality => {
                Some(index.scope_within(division, &key.locality))
            }
            (GeoTier::Division, Some(division)) => Some(index.scope(division)),
            (GeoTier::Locality, _) if has_locality => Some(index.scope_by_locality(&key.locality)),
            _ => None,
        }
    }
}

/// Matching steps run inside every tier, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum MatchStep {
    SingleCandidate,
    Tokens,
    Fuzzy,
    Oracle,
}

impl MatchStep {
    pub const PIPELINE: [MatchStep; 4] = [
        MatchStep::SingleCandidate,
        MatchStep::Tokens,
        MatchStep::Fuzzy,
        MatchStep::Oracle,
    ];
}
