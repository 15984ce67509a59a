// src/matching/fuzzy.rs

use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use strsim::normalized_levenshtein;

use super::text::clean_name;
use crate::models::Candidate;

/// Named acceptance thresholds for the fuzzy stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Strictness {
    VeryStrict,
    Strict,
    #[default]
    Normal,
    Lenient,
    VeryLenient,
}

impl Strictness {
    pub const ALL: [Strictness; 5] = [
        Strictness::VeryStrict,
        Strictness::Strict,
        Strictness::Normal,
        Strictness::Lenient,
        Strictness::VeryLenient,
    ];

    /// A fuzzy score must exceed this value to be accepted.
    pub fn threshold(&self) -> u8 {
        match self {
            Strictness::VeryStrict => 95,
            Strictness::Strict => 90,
            Strictness::Normal => 85,
            Strictness::Lenient => 80,
            Strictness::VeryLenient => 75,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Strictness::VeryStrict => "very-strict",
            Strictness::Strict => "strict",
            Strictness::Normal => "normal",
            Strictness::Lenient => "lenient",
            Strictness::VeryLenient => "very-lenient",
        }
    }
}

impl fmt::Display for Strictness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (>{})", self.name(), self.threshold())
    }
}

impl FromStr for Strictness {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase().replace('_', "-");
        Self::ALL
            .into_iter()
            .find(|level| level.name() == wanted)
            .ok_or_else(|| {
                format!(
                    "unknown strictness '{}' (expected one of: very-strict, strict, normal, lenient, very-lenient)",
                    s
                )
            })
    }
}

/// Word-order-insensitive similarity of two names on a 0..=100 scale.
/// Both names are split on whitespace, sorted and re-joined before the
/// normalized Levenshtein ratio is taken. Empty input scores 0.
pub fn score(a: &str, b: &str) -> u8 {
    let a = sorted_words(a);
    let b = sorted_words(b);
    if a.is_empty() || b.is_empty() {
        return 0;
    }
    (normalized_levenshtein(&a, &b) * 100.0).round() as u8
}

fn sorted_words(name: &str) -> String {
    let mut words: Vec<&str> = name.split_whitespace().collect();
    words.sort_unstable();
    words.join(" ")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FuzzyMatch {
    pub index: usize,
    pub score: u8,
}

#[derive(Debug, Clone, Copy)]
pub struct FuzzyScorer {
    threshold: u8,
}

impl FuzzyScorer {
    pub fn new(strictness: Strictness) -> Self {
        Self::with_threshold(strictness.threshold())
    }

    pub fn with_threshold(threshold: u8) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> u8 {
        self.threshold
    }

    /// Strictly greater than the threshold.
    pub fn accepts(&self, score: u8) -> bool {
        score > self.threshold
    }

    /// Highest scoring candidate by cleaned primary name. The first candidate
    /// wins ties. `None` only for an empty candidate list.
    pub fn best_match(&self, name: &str, candidates: &[Candidate]) -> Option<FuzzyMatch> {
        let query = clean_name(name);
        let mut best: Option<FuzzyMatch> = None;
        for (index, candidate) in candidates.iter().enumerate() {
            let candidate_score = score(&query, &clean_name(&candidate.name));
            match best {
                Some(current) if candidate_score <= current.score => {}
                _ => {
                    best = Some(FuzzyMatch {
                        index,
                        score: candidate_score,
                    })
                }
            }
        }
        best
    }

    /// Best candidate only when its score clears the threshold.
    pub fn accepted_match(&self, name: &str, candidates: &[Candidate]) -> Option<FuzzyMatch> {
        self.best_match(name, candidates)
            .filter(|found| self.accepts(found.score))
    }
}
