// src/matching/token.rs

use serde::Serialize;
use std::collections::HashSet;

use super::text::{fallback_abbreviations, tokenize, TokenMode};
use crate::models::{distinct_identifiers, Candidate};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenPass {
    /// Every required token is present.
    All,
    /// At least one required token is present.
    Any,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NameField {
    Primary,
    Secondary,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenMatch {
    pub pass: TokenPass,
    pub field: NameField,
    /// Positions of the matching candidates in the input list.
    pub indices: Vec<usize>,
    /// Distinct identifiers of those candidates, first-seen order.
    pub identifiers: Vec<String>,
}

impl TokenMatch {
    pub fn is_unique(&self) -> bool {
        self.identifiers.len() == 1
    }
}

/// Tokens a registry name must contain for a source name. Falls back to the
/// hospital abbreviations of the name when no significant word survives.
pub fn required_tokens(source_name: &str) -> Vec<String> {
    let tokens = tokenize(source_name, TokenMode::Source);
    if tokens.is_empty() {
        fallback_abbreviations(source_name)
    } else {
        tokens
    }
}

fn field_text(candidate: &Candidate, field: NameField) -> Option<&str> {
    let text = match field {
        NameField::Primary => Some(candidate.name.as_str()),
        NameField::Secondary => candidate.secondary_name.as_deref(),
    };
    text.filter(|text| !text.trim().is_empty())
}

/// Name of the candidate in the field a token pass matched on.
pub fn matched_text(candidate: &Candidate, field: NameField) -> &str {
    field_text(candidate, field).unwrap_or(&candidate.name)
}

#[derive(Debug, Clone, Copy)]
pub struct TokenMatcher {
    /// Consult secondary names when the ALL pass leaves several identifiers,
    /// not only after an ambiguous ANY pass.
    disambiguate_all_pass: bool,
}

impl Default for TokenMatcher {
    fn default() -> Self {
        Self::new(true)
    }
}

impl TokenMatcher {
    pub fn new(disambiguate_all_pass: bool) -> Self {
        Self {
            disambiguate_all_pass,
        }
    }

    /// ALL pass, then ANY pass, on primary names. When the surviving
    /// identifiers are not unique and some candidate has a secondary name,
    /// both passes are repeated on secondary names and that result is
    /// preferred when it is non-empty.
    pub fn match_candidates(&self, candidates: &[Candidate], required: &[String]) -> Option<TokenMatch> {
        if required.is_empty() || candidates.is_empty() {
            return None;
        }
        let primary = run_passes(candidates, required, NameField::Primary)?;
        let wants_secondary = !primary.is_unique()
            && match primary.pass {
                TokenPass::Any => true,
                TokenPass::All => self.disambiguate_all_pass,
            };
        if wants_secondary && candidates.iter().any(|c| field_text(c, NameField::Secondary).is_some()) {
            if let Some(secondary) = run_passes(candidates, required, NameField::Secondary) {
                return Some(secondary);
            }
        }
        Some(primary)
    }

    /// Identifiers retained by `match_candidates`; empty when nothing matched.
    pub fn match_identifiers(&self, candidates: &[Candidate], required: &[String]) -> Vec<String> {
        self.match_candidates(candidates, required)
            .map(|found| found.identifiers)
            .unwrap_or_default()
    }
}

fn token_sets(candidates: &[Candidate], field: NameField) -> Vec<Option<HashSet<String>>> {
    candidates
        .iter()
        .map(|c| field_text(c, field).map(|text| tokenize(text, TokenMode::Reference).into_iter().collect()))
        .collect()
}

/// Candidate positions passing the ALL and ANY tests on one field.
pub fn pass_indices(candidates: &[Candidate], required: &[String], field: NameField) -> (Vec<usize>, Vec<usize>) {
    let sets = token_sets(candidates, field);
    let mut all = Vec::new();
    let mut any = Vec::new();
    for (index, set) in sets.iter().enumerate() {
        let Some(set) = set else { continue };
        if required.iter().all(|t| set.contains(t)) {
            all.push(index);
        }
        if required.iter().any(|t| set.contains(t)) {
            any.push(index);
        }
    }
    (all, any)
}

fn run_passes(candidates: &[Candidate], required: &[String], field: NameField) -> Option<TokenMatch> {
    let (all, any) = pass_indices(candidates, required, field);
    let (pass, indices) = if !all.is_empty() {
        (TokenPass::All, all)
    } else if !any.is_empty() {
        (TokenPass::Any, any)
    } else {
        return None;
    };
    let identifiers = distinct_identifiers(indices.iter().map(|&i| &candidates[i]));
    Some(TokenMatch {
        pass,
        field,
        indices,
        identifiers,
    })
}
