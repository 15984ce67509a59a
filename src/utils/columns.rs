// src/utils/columns.rs
//! Column identities of the source roster, the reference registry and the
//! output. Resolved once against the actual headers before any matching.

use anyhow::{bail, Result};
use log::{info, warn};

use super::env::{env_opt, env_or};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputColumns {
    pub identifier: String,
    pub matched_name: String,
    pub confidence: String,
    pub stage: String,
    pub candidates: String,
}

impl Default for OutputColumns {
    fn default() -> Self {
        Self {
            identifier: "FINESS".to_string(),
            matched_name: "Nom_Match_Retenu".to_string(),
            confidence: "Confiance_Match".to_string(),
            stage: "Source_Match".to_string(),
            candidates: "Candidats_Match".to_string(),
        }
    }
}

impl OutputColumns {
    pub fn all(&self) -> [&str; 5] {
        [
            &self.identifier,
            &self.matched_name,
            &self.confidence,
            &self.stage,
            &self.candidates,
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMapping {
    /// Source name columns in priority order; the first non-empty value wins.
    pub source_names: Vec<String>,
    pub source_locality: Option<String>,
    pub source_division: Option<String>,
    pub reference_name: String,
    pub reference_secondary_name: Option<String>,
    pub reference_locality: Option<String>,
    pub reference_division: Option<String>,
    pub reference_identifier: String,
    pub output: OutputColumns,
}

impl Default for ColumnMapping {
    fn default() -> Self {
        Self {
            source_names: vec![
                "Nom hopital".to_string(),
                "Nom clinique".to_string(),
                "Nom".to_string(),
            ],
            source_locality: Some("Ville".to_string()),
            source_division: Some("Departement".to_string()),
            reference_name: "Nom".to_string(),
            reference_secondary_name: Some("Nom2".to_string()),
            reference_locality: Some("Ville".to_string()),
            reference_division: None,
            reference_identifier: "FINESS".to_string(),
            output: OutputColumns::default(),
        }
    }
}

fn comma_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

impl ColumnMapping {
    /// Create configuration from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let source_names = env_opt("SOURCE_NAME_COLUMNS")
            .map(|raw| comma_list(&raw))
            .filter(|names| !names.is_empty())
            .unwrap_or(defaults.source_names);
        let output = OutputColumns {
            identifier: env_or("OUTPUT_IDENTIFIER_COLUMN", defaults.output.identifier),
            matched_name: env_or("OUTPUT_MATCHED_NAME_COLUMN", defaults.output.matched_name),
            confidence: env_or("OUTPUT_CONFIDENCE_COLUMN", defaults.output.confidence),
            stage: env_or("OUTPUT_STAGE_COLUMN", defaults.output.stage),
            candidates: env_or("OUTPUT_CANDIDATES_COLUMN", defaults.output.candidates),
        };
        Self {
            source_names,
            source_locality: env_opt("SOURCE_LOCALITY_COLUMN").or(defaults.source_locality),
            source_division: env_opt("SOURCE_DIVISION_COLUMN").or(defaults.source_division),
            reference_name: env_or("REFERENCE_NAME_COLUMN", defaults.reference_name),
            reference_secondary_name: env_opt("REFERENCE_SECONDARY_NAME_COLUMN")
                .or(defaults.reference_secondary_name),
            reference_locality: env_opt("REFERENCE_LOCALITY_COLUMN")
                .or(defaults.reference_locality),
            reference_division: env_opt("REFERENCE_DIVISION_COLUMN")
                .or(defaults.reference_division),
            reference_identifier: env_or(
                "REFERENCE_IDENTIFIER_COLUMN",
                defaults.reference_identifier,
            ),
            output,
        }
    }

    /// Checks the mapping against real headers. Optional columns that are
    /// missing are dropped with a warning; missing required columns, or a
    /// side with no geographic field at all, are configuration errors.
    pub fn resolve_against(
        &self,
        source_headers: &[String],
        reference_headers: &[String],
    ) -> Result<ColumnMapping> {
        let has = |headers: &[String], name: &str| headers.iter().any(|h| h == name);
        let keep_optional = |headers: &[String], column: &Option<String>, side: &str| {
            column.as_ref().and_then(|name| {
                if has(headers, name.as_str()) {
                    Some(name.clone())
                } else {
                    warn!("⚠️ {} column '{}' not found, ignoring it", side, name);
                    None
                }
            })
        };

        let source_names: Vec<String> = self
            .source_names
            .iter()
            .filter(|name| has(source_headers, name.as_str()))
            .cloned()
            .collect();
        if source_names.is_empty() {
            bail!(
                "None of the source name columns {:?} exist (available: {:?})",
                self.source_names,
                source_headers
            );
        }
        for (label, column) in [
            ("reference name", &self.reference_name),
            ("reference identifier", &self.reference_identifier),
        ] {
            if !has(reference_headers, column.as_str()) {
                bail!(
                    "Missing {} column '{}' (available: {:?})",
                    label,
                    column,
                    reference_headers
                );
            }
        }

        let resolved = ColumnMapping {
            source_names,
            source_locality: keep_optional(source_headers, &self.source_locality, "Source locality"),
            source_division: keep_optional(source_headers, &self.source_division, "Source division"),
            reference_name: self.reference_name.clone(),
            reference_secondary_name: keep_optional(
                reference_headers,
                &self.reference_secondary_name,
                "Reference secondary name",
            ),
            reference_locality: keep_optional(
                reference_headers,
                &self.reference_locality,
                "Reference locality",
            ),
            reference_division: keep_optional(
                reference_headers,
                &self.reference_division,
                "Reference division",
            ),
            reference_identifier: self.reference_identifier.clone(),
            output: self.output.clone(),
        };

        if resolved.source_locality.is_none() && resolved.source_division.is_none() {
            bail!("The source roster has no usable locality or division column");
        }
        if resolved.reference_locality.is_none() && resolved.reference_division.is_none() {
            bail!("The reference registry has no usable locality or division column");
        }
        Ok(resolved)
    }

    pub fn log_config(&self) {
        info!("📋 Column mapping:");
        info!("   Source names (by priority): {:?}", self.source_names);
        info!(
            "   Source geography: locality={:?}, division={:?}",
            self.source_locality, self.source_division
        );
        info!(
            "   Reference: name='{}', secondary={:?}, identifier='{}'",
            self.reference_name, self.reference_secondary_name, self.reference_identifier
        );
        info!(
            "   Reference geography: locality={:?}, division={:?}",
            self.reference_locality, self.reference_division
        );
        info!("   Output columns: {:?}", self.output.all());
    }
}
