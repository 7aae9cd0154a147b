use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shared::domain::{VerificationMode, VerificationResult};

use crate::presentation::ResultPresentation;

/// Downloadable record of one settled verification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationReport {
    pub timestamp: DateTime<Utc>,
    pub analysis_type: String,
    pub status: String,
    pub result: VerificationResult,
}

impl VerificationReport {
    pub fn new(mode: VerificationMode, result: &VerificationResult) -> Self {
        Self::at(Utc::now(), mode, result)
    }

    pub fn at(timestamp: DateTime<Utc>, mode: VerificationMode, result: &VerificationResult) -> Self {
        Self {
            timestamp,
            analysis_type: mode.analysis_type().to_string(),
            status: ResultPresentation::from_result(result).status_text.to_string(),
            result: result.clone(),
        }
    }

    /// `signature-analysis-<unix millis>.json`
    pub fn default_file_name(&self) -> String {
        format!("signature-analysis-{}.json", self.timestamp.timestamp_millis())
    }

    /// Where to write the report: `requested` as given, the default file name
    /// inside `requested` when it is a directory, or the default file name in
    /// the working directory when nothing was requested.
    pub fn resolve_path(&self, requested: Option<&Path>) -> PathBuf {
        match requested {
            Some(dir) if dir.is_dir() => dir.join(self.default_file_name()),
            Some(path) => path.to_path_buf(),
            None => PathBuf::from(self.default_file_name()),
        }
    }

    pub fn to_pretty_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("failed to serialize verification report")
    }

    pub fn write_to(&self, path: &Path) -> Result<()> {
        let json = self.to_pretty_json()?;
        std::fs::write(path, json)
            .with_context(|| format!("failed to write report to '{}'", path.display()))
    }
}

#[cfg(test)]
#[path = "tests/report_tests.rs"]
mod tests;
