use serde::{Deserialize, Serialize};
use std::fmt;

/// Stage of the pipeline that produced a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResolutionStage {
    SingleCandidate,
    TokenAll,
    TokenAny,
    Fuzzy,
    Ai,
    None,
}

impl ResolutionStage {
    pub const ALL: [ResolutionStage; 6] = [
        ResolutionStage::SingleCandidate,
        ResolutionStage::TokenAll,
        ResolutionStage::TokenAny,
        ResolutionStage::Fuzzy,
        ResolutionStage::Ai,
        ResolutionStage::None,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            ResolutionStage::SingleCandidate => "single-candidate",
            ResolutionStage::TokenAll => "token-all",
            ResolutionStage::TokenAny => "token-any",
            ResolutionStage::Fuzzy => "fuzzy",
            ResolutionStage::Ai => "ai",
            ResolutionStage::None => "none",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        let label = label.trim();
        Self::ALL.into_iter().find(|stage| stage.label() == label)
    }
}

impl fmt::Display for ResolutionStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Label written to the stage column for ambiguous records.
pub const AMBIGUOUS_LABEL: &str = "ambiguous";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ResolutionOutcome {
    Resolved {
        identifier: String,
        matched_name: String,
        confidence: u8,
        stage: ResolutionStage,
    },
    /// Several identifiers survived and nothing could separate them.
    Ambiguous { candidates: Vec<String> },
    Unresolved,
}

impl ResolutionOutcome {
    pub fn resolved(
        identifier: &str,
        matched_name: &str,
        confidence: u8,
        stage: ResolutionStage,
    ) -> Self {
        ResolutionOutcome::Resolved {
            identifier: identifier.to_string(),
            matched_name: matched_name.to_string(),
            confidence: confidence.min(100),
            stage,
        }
    }

    pub fn identifier(&self) -> Option<&str> {
        match self {
            ResolutionOutcome::Resolved { identifier, .. } => Some(identifier.as_str()),
            _ => None,
        }
    }

    /// Resolved and Ambiguous stop the geographic cascade; Unresolved does not.
    pub fn is_definitive(&self) -> bool {
        !matches!(self, ResolutionOutcome::Unresolved)
    }

    pub fn stage_label(&self) -> &'static str {
        match self {
            ResolutionOutcome::Resolved { stage, .. } => stage.label(),
            ResolutionOutcome::Ambiguous { .. } => AMBIGUOUS_LABEL,
            ResolutionOutcome::Unresolved => ResolutionStage::None.label(),
        }
    }
}
