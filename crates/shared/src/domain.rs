use serde::{Deserialize, Serialize};

/// Which backend judgment a workflow asks for. Fixed for the lifetime of a
/// controller; it selects how many slots must be populated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationMode {
    SingleAnalysis,
    Comparison,
}

impl VerificationMode {
    pub fn slot_count(self) -> usize {
        match self {
            Self::SingleAnalysis => 1,
            Self::Comparison => 2,
        }
    }

    pub fn endpoint_path(self) -> &'static str {
        match self {
            Self::SingleAnalysis => "/api/predict-single",
            Self::Comparison => "/api/compare-signatures",
        }
    }

    /// Multipart field names, one per slot.
    pub fn field_names(self) -> &'static [&'static str] {
        match self {
            Self::SingleAnalysis => &["file"],
            Self::Comparison => &["file1", "file2"],
        }
    }

    pub fn analysis_type(self) -> &'static str {
        match self {
            Self::SingleAnalysis => "Single Signature Analysis",
            Self::Comparison => "Signature Comparison",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Judgment {
    Authentic,
    Forged,
    Match,
    NoMatch,
}

impl Judgment {
    /// Authentic and Match are the favourable outcomes.
    pub fn is_positive(self) -> bool {
        matches!(self, Self::Authentic | Self::Match)
    }

    pub fn mode(self) -> VerificationMode {
        match self {
            Self::Authentic | Self::Forged => VerificationMode::SingleAnalysis,
            Self::Match | Self::NoMatch => VerificationMode::Comparison,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationResult {
    pub judgment: Judgment,
    /// Always within `[0, 1]`.
    pub score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processing_time_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_version: Option<String>,
}
