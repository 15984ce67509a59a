// src/oracle/prompts.rs

use crate::models::{Candidate, EstablishmentType};

fn type_context(hint: EstablishmentType) -> &'static str {
    match hint {
        EstablishmentType::Hospital => {
            "The establishment is a HOSPITAL. Prefer public hospitals and hospital centres \
             (CH, CHU, CHR, HOPITAL) over clinics."
        }
        EstablishmentType::Clinic => {
            "The establishment is a CLINIC. Prefer private clinics (CLINIQUE, POLYCLINIQUE) \
             over public hospitals."
        }
        EstablishmentType::Unknown => {
            "The establishment type is unknown. Judge on the name alone."
        }
    }
}

/// Lists the candidates as numbered options and asks for the number of the
/// one naming the same establishment, with 0 meaning none.
pub fn build_choice_prompt(
    source_name: &str,
    candidates: &[Candidate],
    type_hint: EstablishmentType,
) -> String {
    let options = candidates
        .iter()
        .enumerate()
        .map(|(i, c)| format!("- Option {}: \"{}\" (FINESS: {})", i + 1, c.name, c.identifier))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "You are an expert in French healthcare establishment registries.\n\
         Pick the registry entry that designates the same establishment as the searched name.\n\
         \n\
         Searched establishment: \"{source_name}\"\n\
         {context}\n\
         \n\
         Available options:\n\
         {options}\n\
         \n\
         Rules:\n\
         - Ignore differences in accents, spacing, hyphens and punctuation\n\
         - \"ST\" = \"SAINT\", \"CH\" = \"CENTRE HOSPITALIER\", \"CHU\" = \"CENTRE HOSPITALIER UNIVERSITAIRE\"\n\
         - \"POLYCLINIQUE\" and \"POLICLINIQUE\" are the same word\n\
         - Between entries of the same type, prefer the most detailed name\n\
         - Answer 0 if no option designates the same establishment\n\
         \n\
         Answer with the option number only, optionally followed by ';' and your confidence \
         from 0 to 100 (for example: 2;85).",
        source_name = source_name,
        context = type_context(type_hint),
        options = options,
    )
}

/// Asks how confident the oracle is that two names designate the same establishment.
pub fn build_coherence_prompt(source_name: &str, chosen_name: &str) -> String {
    format!(
        "You are an expert in French healthcare establishment registries.\n\
         How confident are you that these two names designate the same establishment?\n\
         \n\
         Name 1: \"{}\"\n\
         Name 2: \"{}\"\n\
         \n\
         Answer with a single integer between 0 and 100.",
        source_name, chosen_name
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_choice_prompt_numbers_options_from_one() {
        let candidates = vec![
            Candidate {
                name: "CLINIQUE DU PARC".to_string(),
                secondary_name: None,
                identifier: "330000001".to_string(),
            },
            Candidate {
                name: "POLYCLINIQUE BORDEAUX NORD".to_string(),
                secondary_name: None,
                identifier: "330000002".to_string(),
            },
        ];
        let prompt = build_choice_prompt("Polyclinique du Parc", &candidates, EstablishmentType::Clinic);
        assert!(prompt.contains("Searched establishment: \"Polyclinique du Parc\""));
        assert!(prompt.contains("- Option 1: \"CLINIQUE DU PARC\" (FINESS: 330000001)"));
        assert!(prompt.contains("- Option 2: \"POLYCLINIQUE BORDEAUX NORD\" (FINESS: 330000002)"));
        assert!(prompt.contains("CLINIC"));
        assert!(!prompt.contains("Option 3"));
    }

    #[test]
    fn test_coherence_prompt_quotes_both_names() {
        let prompt = build_coherence_prompt("CH Dax", "CENTRE HOSPITALIER DE DAX");
        assert!(prompt.contains("Name 1: \"CH Dax\""));
        assert!(prompt.contains("Name 2: \"CENTRE HOSPITALIER DE DAX\""));
    }
}
