use serde::{Deserialize, Serialize};

use crate::{
    domain::{Judgment, VerificationResult},
    error::NormalizationError,
};

/// Union of the single-analysis and comparison response shapes. Which one the
/// backend sent is decided by the discriminant field present, not by the
/// endpoint that was called.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawVerificationPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_forged: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    /// Also read from `match`. A payload carrying both keys is a duplicate
    /// field and fails to parse.
    #[serde(default, alias = "match", skip_serializing_if = "Option::is_none")]
    pub is_match: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub similarity_score: Option<f64>,
    /// Also read from `verdict`, with the same duplicate-key rule.
    #[serde(default, alias = "verdict", skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processing_time: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_version: Option<String>,
}

impl RawVerificationPayload {
    pub fn from_slice(bytes: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(bytes)
    }

    /// Maps either response shape onto [`VerificationResult`].
    ///
    /// `is_forged` wins when both discriminants are present. A missing score
    /// counts as `0.0`; out-of-range scores are clamped into `[0, 1]`.
    pub fn normalize(&self) -> Result<VerificationResult, NormalizationError> {
        let (judgment, score) = if let Some(is_forged) = self.is_forged {
            let judgment = if is_forged {
                Judgment::Forged
            } else {
                Judgment::Authentic
            };
            (judgment, clamp_score(self.confidence, "confidence")?)
        } else if let Some(is_match) = self.is_match {
            let judgment = if is_match {
                Judgment::Match
            } else {
                Judgment::NoMatch
            };
            (judgment, clamp_score(self.similarity_score, "similarity_score")?)
        } else {
            return Err(NormalizationError::MissingDiscriminant);
        };

        Ok(VerificationResult {
            judgment,
            score,
            detail: self.details.clone(),
            processing_time_ms: self
                .processing_time
                .filter(|ms| ms.is_finite() && *ms >= 0.0)
                .map(|ms| ms.round() as u64),
            model_version: self.model_version.clone(),
        })
    }
}

fn clamp_score(raw: Option<f64>, field: &'static str) -> Result<f64, NormalizationError> {
    match raw {
        None => Ok(0.0),
        Some(value) if value.is_finite() => Ok(value.clamp(0.0, 1.0)),
        Some(_) => Err(NormalizationError::NonFiniteScore { field }),
    }
}

#[cfg(test)]
#[path = "tests/protocol_tests.rs"]
mod tests;
