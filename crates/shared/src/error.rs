use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Stable, serializable name for every failure the workflow can surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureCode {
    InvalidFileType,
    FileTooLarge,
    Precondition,
    Network,
    Backend,
    MalformedResponse,
}

/// Error body the backend attaches to non-success responses.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BackendErrorBody {
    #[serde(default)]
    pub detail: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NormalizationError {
    #[error("payload carries neither `is_forged` nor `is_match`")]
    MissingDiscriminant,
    #[error("payload field `{field}` is not a finite number")]
    NonFiniteScore { field: &'static str },
}
