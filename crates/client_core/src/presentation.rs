//! User-facing wording for results and failures.

use shared::{
    domain::{Judgment, VerificationMode, VerificationResult},
    error::FailureCode,
};

use crate::{
    error::{SlotError, VerificationError, WorkflowError},
    preview::format_file_size,
};

/// Rounded whole percentage, e.g. `0.95` -> `"95%"`.
pub fn format_percentage(score: f64) -> String {
    if !score.is_finite() {
        return "0%".to_string();
    }
    format!("{}%", (score * 100.0).round() as i64)
}

/// Reading guide band for a displayed percentage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreBand {
    /// 90-100%
    VeryHigh,
    /// 70-89%
    High,
    /// 50-69%
    Moderate,
    /// Below 50%
    Low,
}

impl ScoreBand {
    /// Bands follow the rounded percentage so they agree with `format_percentage`.
    pub fn from_score(score: f64) -> Self {
        let percent = if score.is_finite() {
            (score * 100.0).round() as i64
        } else {
            0
        };
        match percent {
            p if p >= 90 => Self::VeryHigh,
            70..=89 => Self::High,
            50..=69 => Self::Moderate,
            _ => Self::Low,
        }
    }

    pub fn range_label(self) -> &'static str {
        match self {
            Self::VeryHigh => "90-100%",
            Self::High => "70-89%",
            Self::Moderate => "50-69%",
            Self::Low => "Below 50%",
        }
    }

    pub fn guidance(self, mode: VerificationMode) -> &'static str {
        match (mode, self) {
            (VerificationMode::SingleAnalysis, Self::VeryHigh) => {
                "Very high confidence in the result"
            }
            (VerificationMode::SingleAnalysis, Self::High) => "High confidence, reliable result",
            (VerificationMode::SingleAnalysis, Self::Moderate) => {
                "Moderate confidence, consider additional verification"
            }
            (VerificationMode::SingleAnalysis, Self::Low) => {
                "Low confidence, manual review recommended"
            }
            (VerificationMode::Comparison, Self::VeryHigh) => {
                "Very high similarity, likely same person"
            }
            (VerificationMode::Comparison, Self::High) => "High similarity, probable match",
            (VerificationMode::Comparison, Self::Moderate) => "Moderate similarity, inconclusive",
            (VerificationMode::Comparison, Self::Low) => {
                "Low similarity, likely different signatures"
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interpretation {
    pub band: ScoreBand,
    pub guidance: &'static str,
}

pub const INTERPRETATION_DISCLAIMER: &str = "This analysis is for reference purposes. \
For legal or critical decisions, please consult with forensic handwriting experts.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultPresentation {
    pub status_text: &'static str,
    pub is_positive: bool,
    pub score_label: &'static str,
    pub score_text: String,
    pub interpretation: Interpretation,
}

impl ResultPresentation {
    pub fn from_result(result: &VerificationResult) -> Self {
        let status_text = match result.judgment {
            Judgment::Authentic => "Genuine Signature",
            Judgment::Forged => "Potential Forgery Detected",
            Judgment::Match => "Signatures Match",
            Judgment::NoMatch => "Signatures Do Not Match",
        };
        let mode = result.judgment.mode();
        let band = ScoreBand::from_score(result.score);
        let score_label = match mode {
            VerificationMode::SingleAnalysis => "Confidence Level",
            VerificationMode::Comparison => "Similarity Score",
        };
        Self {
            status_text,
            is_positive: result.judgment.is_positive(),
            score_label,
            score_text: format_percentage(result.score),
            interpretation: Interpretation {
                band,
                guidance: band.guidance(mode),
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeSeverity {
    /// The action was refused locally; fix the input and try again.
    Warning,
    Error,
}

/// Message shown when an action is refused or a submission fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureNotice {
    pub code: FailureCode,
    pub severity: NoticeSeverity,
    pub message: String,
}

impl FailureNotice {
    pub fn from_workflow_error(error: &WorkflowError) -> Self {
        let message = match error {
            WorkflowError::Precondition { mode, .. } => precondition_message(*mode).to_string(),
            WorkflowError::Slot(SlotError::InvalidFileType { name, .. }) => {
                format!("'{name}' is not an image; please choose a signature image file.")
            }
            WorkflowError::Slot(SlotError::FileTooLarge {
                name, limit_bytes, ..
            }) => format!(
                "'{name}' is larger than the {} upload limit.",
                format_file_size(*limit_bytes)
            ),
            WorkflowError::SlotOutOfRange { mode, .. } => precondition_message(*mode).to_string(),
        };
        Self {
            code: error.code(),
            severity: NoticeSeverity::Warning,
            message,
        }
    }

    pub fn from_verification_error(mode: VerificationMode, error: &VerificationError) -> Self {
        let generic = match mode {
            VerificationMode::SingleAnalysis => "Failed to get prediction from the server.",
            VerificationMode::Comparison => "Failed to get comparison from the server.",
        };
        let message = match error {
            VerificationError::Backend {
                status_code,
                detail: Some(detail),
            } => format!("{generic} (status {status_code}: {detail})"),
            VerificationError::Backend { status_code, .. } => {
                format!("{generic} (status {status_code})")
            }
            VerificationError::Network(_) | VerificationError::MalformedResponse(_) => {
                generic.to_string()
            }
        };
        Self {
            code: error.code(),
            severity: NoticeSeverity::Error,
            message,
        }
    }
}

fn precondition_message(mode: VerificationMode) -> &'static str {
    match mode {
        VerificationMode::SingleAnalysis => "Please upload a signature image first.",
        VerificationMode::Comparison => "Please upload both signature images.",
    }
}

#[cfg(test)]
#[path = "tests/presentation_tests.rs"]
mod tests;
