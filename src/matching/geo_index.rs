// src/matching/geo_index.rs

use std::collections::BTreeMap;

use super::text::{division_from_postal, normalize_division, normalize_locality};
use crate::models::{Candidate, CandidateSet, ReferenceRecord};

#[derive(Debug, Clone)]
struct IndexedReference {
    candidate: Candidate,
    locality: String,
}

/// Registry entries grouped by department code, with each entry's
/// normalized locality kept alongside for exact lookups.
#[derive(Debug, Clone, Default)]
pub struct GeographicIndex {
    divisions: BTreeMap<String, Vec<IndexedReference>>,
    undivided: Vec<IndexedReference>,
}

impl GeographicIndex {
    /// The division comes from the explicit field when it normalizes to a
    /// code, otherwise from the postal code that prefixes the locality.
    pub fn build<'a, I>(references: I) -> Self
    where
        I: IntoIterator<Item = &'a ReferenceRecord>,
    {
        let mut index = GeographicIndex::default();
        for record in references {
            let entry = IndexedReference {
                candidate: Candidate::from(record),
                locality: normalize_locality(&record.locality, true),
            };
            let division = record
                .division
                .as_deref()
                .and_then(normalize_division)
                .or_else(|| division_from_postal(&record.locality));
            match division {
                Some(code) => index.divisions.entry(code).or_default().push(entry),
                None => index.undivided.push(entry),
            }
        }
        index
    }

    pub fn len(&self) -> usize {
        self.divisions.values().map(Vec::len).sum::<usize>() + self.undivided.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn division_count(&self) -> usize {
        self.divisions.len()
    }

    pub fn undivided_count(&self) -> usize {
        self.undivided.len()
    }

    /// Every entry of a division, in registry order.
    pub fn scope(&self, division: &str) -> CandidateSet {
        self.division_entries(division)
            .map(|entry| entry.candidate.clone())
            .collect()
    }

    /// Entries of a division whose normalized locality equals `locality`.
    pub fn scope_within(&self, division: &str, locality: &str) -> CandidateSet {
        if locality.is_empty() {
            return Vec::new();
        }
        self.division_entries(division)
            .filter(|entry| entry.locality == locality)
            .map(|entry| entry.candidate.clone())
            .collect()
    }

    /// Entries anywhere in the registry with this normalized locality.
    pub fn scope_by_locality(&self, locality: &str) -> CandidateSet {
        if locality.is_empty() {
            return Vec::new();
        }
        self.divisions
            .values()
            .flatten()
            .chain(self.undivided.iter())
            .filter(|entry| entry.locality == locality)
            .map(|entry| entry.candidate.clone())
            .collect()
    }

    fn division_entries(&self, division: &str) -> impl Iterator<Item = &IndexedReference> {
        normalize_division(division)
            .and_then(|code| self.divisions.get(&code))
            .into_iter()
            .flatten()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference(name: &str, locality: &str, division: Option<&str>, id: &str) -> ReferenceRecord {
        ReferenceRecord {
            name: name.to_string(),
            secondary_name: None,
            locality: locality.to_string(),
            division: division.map(str::to_string),
            identifier: id.to_string(),
        }
    }

    fn ids(set: &CandidateSet) -> Vec<&str> {
        set.iter().map(|c| c.identifier.as_str()).collect()
    }

    fn registry() -> Vec<ReferenceRecord> {
        vec![
            reference("CH SAINT LOUIS", "75000 PARIS CEDEX", None, "750000001"),
            reference("CLINIQUE DU PARC", "75015 PARIS", None, "750000002"),
            reference("CLINIQUE BELLEVUE", "92100 BOULOGNE BILLANCOURT", None, "920000001"),
            reference("CENTRE DE SOINS", "01000 BOURG EN BRESSE", Some("1"), "010000001"),
            reference("CH DE PARIS", "PARIS", Some("Ain"), "010000002"),
            reference("HOPITAL SANS ADRESSE", "LIEU DIT", None, "990000001"),
        ]
    }

    #[test]
    fn test_build_groups_by_division() {
        let refs = registry();
        let index = GeographicIndex::build(&refs);
        assert_eq!(index.len(), 6);
        assert_eq!(index.division_count(), 3);
        assert_eq!(index.undivided_count(), 1);
    }

    #[test]
    fn test_scope_pads_division_codes() {
        let refs = registry();
        let index = GeographicIndex::build(&refs);
        assert_eq!(ids(&index.scope("1")), vec!["010000001", "010000002"]);
        assert_eq!(ids(&index.scope("01")), vec!["010000001", "010000002"]);
        assert!(index.scope("13").is_empty());
    }

    #[test]
    fn test_scope_within_requires_exact_locality() {
        let refs = registry();
        let index = GeographicIndex::build(&refs);
        assert_eq!(
            ids(&index.scope_within("75", "PARIS")),
            vec!["750000001", "750000002"]
        );
        assert!(index.scope_within("75", "PARI").is_empty());
        assert!(index.scope_within("75", "").is_empty());
        assert!(index.scope_within("92", "BOULOGNE").is_empty());
    }

    #[test]
    fn test_scope_by_locality_crosses_divisions() {
        let refs = registry();
        let index = GeographicIndex::build(&refs);
        assert_eq!(
            ids(&index.scope_by_locality("PARIS")),
            vec!["010000002", "750000001", "750000002"]
        );
        assert_eq!(ids(&index.scope_by_locality("LIEU DIT")), vec!["990000001"]);
    }
}
