// src/matching/text.rs
//
// Normalization of establishment names, localities and department codes.
// Everything here is pure and shared by the source roster and the registry.

use once_cell::sync::Lazy;
use regex::Regex;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use crate::models::EstablishmentType;
use crate::utils::constants::{
    DEPARTMENT_CODES, DIVISION_CODE_WIDTH, HOSPITAL_ABBREVIATIONS, MIN_TOKEN_LENGTH,
    NAME_STOPWORDS,
};

static POSTAL_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{5}\s*").expect("postal prefix pattern"));
static CEDEX_SUFFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+CEDEX(\s+\d+)?$").expect("cedex suffix pattern"));
static SAINT_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bSAINT\b").expect("saint pattern"));
static SAINTE_WORD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bSAINTE\b").expect("sainte pattern"));

/// Which side of the match a name comes from. Registry names also keep
/// hospital abbreviations and their expansions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenMode {
    Source,
    Reference,
}

pub fn strip_accents(input: &str) -> String {
    input.nfd().filter(|c| !is_combining_mark(*c)).collect()
}

pub fn collapse_whitespace(input: &str) -> String {
    input.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn is_stopword(word: &str) -> bool {
    NAME_STOPWORDS.contains(&word)
}

pub fn is_hospital_abbreviation(word: &str) -> bool {
    HOSPITAL_ABBREVIATIONS.iter().any(|(abbrev, _)| *abbrev == word)
}

fn abbreviation_expansion(word: &str) -> &'static [&'static str] {
    HOSPITAL_ABBREVIATIONS
        .iter()
        .find(|(abbrev, _)| *abbrev == word)
        .map(|(_, expansion)| *expansion)
        .unwrap_or(&[])
}

/// Uppercase, accent-free words of a name. Any non-letter separates words.
fn words(raw: &str) -> Vec<String> {
    strip_accents(raw)
        .to_uppercase()
        .split(|c: char| !c.is_alphabetic())
        .filter(|w| !w.is_empty())
        .map(str::to_string)
        .collect()
}

/// Significant tokens of an establishment name.
///
/// Words shorter than four letters and generic stopwords are dropped. In
/// `Reference` mode hospital abbreviations survive regardless of length and
/// are followed by their expansion, so `CH` also yields `HOSPITALIER`.
pub fn tokenize(raw: &str, mode: TokenMode) -> Vec<String> {
    let mut tokens = Vec::new();
    for word in words(raw) {
        let significant = word.chars().count() >= MIN_TOKEN_LENGTH && !is_stopword(&word);
        let abbreviation = mode == TokenMode::Reference && is_hospital_abbreviation(&word);
        if significant || abbreviation {
            tokens.push(word.clone());
        }
        if abbreviation {
            tokens.extend(abbreviation_expansion(&word).iter().map(|s| s.to_string()));
        }
    }
    tokens
}

/// Hospital abbreviations found in a name, used when `tokenize` finds nothing.
pub fn fallback_abbreviations(raw: &str) -> Vec<String> {
    let mut found: Vec<String> = Vec::new();
    for word in words(raw) {
        if is_hospital_abbreviation(&word) && !found.contains(&word) {
            found.push(word);
        }
    }
    found
}

/// Comparable form of a locality. Registry localities carry a postal code
/// prefix and sometimes a CEDEX suffix; both are removed in reference mode.
pub fn normalize_locality(raw: &str, is_reference: bool) -> String {
    let mut locality = strip_accents(raw).trim().to_uppercase();
    if is_reference {
        locality = POSTAL_PREFIX.replace(&locality, "").into_owned();
        locality = CEDEX_SUFFIX.replace(&locality, "").into_owned();
    }
    locality = locality.replace(['\'', '’', '-', '–'], " ");
    locality = SAINTE_WORD.replace_all(&locality, "STE").into_owned();
    locality = SAINT_WORD.replace_all(&locality, "ST").into_owned();
    collapse_whitespace(&locality)
}

/// Name form used by the fuzzy scorer: uppercase, no accents, no joining
/// particles, `ST` spelled out.
pub fn clean_name(raw: &str) -> String {
    let separators = ['-', '–', '’', '.', ',', '(', ')', '/', '_'];
    let mut cleaned = format!(" {} ", strip_accents(raw).to_uppercase().replace(separators, " "));
    cleaned = cleaned.replace("D'", " ").replace('\'', " ");
    cleaned = collapse_whitespace(&cleaned);
    // Particles are matched with surrounding spaces, so pad and repeat until stable.
    let mut padded = format!(" {} ", cleaned);
    loop {
        let next = padded
            .replace(" DE ", " ")
            .replace(" DU ", " ")
            .replace(" DES ", " ")
            .replace(" ST ", " SAINT ");
        if next == padded {
            break;
        }
        padded = next;
    }
    collapse_whitespace(&padded)
}

/// Zero-padded department code, or the recognised code for a department name.
pub fn normalize_division(raw: &str) -> Option<String> {
    let mut value = strip_accents(raw).trim().to_uppercase();
    if value.is_empty() || value == "NAN" {
        return None;
    }
    if let Some(stripped) = value.strip_suffix(".0") {
        if stripped.chars().all(|c| c.is_ascii_digit()) {
            value = stripped.to_string();
        }
    }
    if value.chars().all(|c| c.is_ascii_digit()) {
        return Some(format!("{:0>width$}", value, width = DIVISION_CODE_WIDTH));
    }
    if value == "2A" || value == "2B" {
        return Some(value);
    }
    let name = collapse_whitespace(&value.replace(['\'', '’', '-', '–'], " "));
    let code = DEPARTMENT_CODES
        .iter()
        .find(|(department, _)| *department == name)
        .map(|(_, code)| code.to_string());
    Some(code.unwrap_or(name))
}

/// Department code implied by a leading five-digit postal code.
pub fn division_from_postal(raw_locality: &str) -> Option<String> {
    let digits: String = raw_locality
        .trim()
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    if digits.len() != 5 {
        return None;
    }
    let code = match &digits[..2] {
        "97" | "98" => digits[..3].to_string(),
        "20" => {
            // 200xx and 201xx belong to Corse-du-Sud.
            if digits.as_bytes()[2] < b'2' {
                "2A".to_string()
            } else {
                "2B".to_string()
            }
        }
        prefix => prefix.to_string(),
    };
    Some(code)
}

/// Establishment category suggested by the words of a name. Clinic markers
/// are checked first so `POLYCLINIQUE DU CH` stays a clinic.
pub fn detect_establishment_type(name: &str) -> EstablishmentType {
    let upper = strip_accents(name).to_uppercase();
    let name_words = words(name);
    let has_word = |w: &str| name_words.iter().any(|nw| nw == w);

    let clinic_indicators = ["CLINIQUE", "CLINIC", "POLYCLINIQUE", "POLICLINIQUE"];
    if clinic_indicators.iter().any(|k| upper.contains(k)) {
        return EstablishmentType::Clinic;
    }

    let hospital_words = ["CHU", "CHR", "CHRU", "CH", "CHI"];
    let hospital_phrases = ["HOPITAL", "HOSPITAL", "CENTRE HOSPITALIER"];
    if hospital_words.iter().any(|w| has_word(w))
        || hospital_phrases.iter().any(|p| upper.contains(p))
    {
        return EstablishmentType::Hospital;
    }
    EstablishmentType::Unknown
}
