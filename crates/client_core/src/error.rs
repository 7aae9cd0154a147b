use shared::{domain::VerificationMode, error::FailureCode};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SlotError {
    #[error("`{name}` is not an image (mime type `{mime_type}`)")]
    InvalidFileType { name: String, mime_type: String },
    #[error("`{name}` is {size_bytes} bytes, above the {limit_bytes} byte limit")]
    FileTooLarge {
        name: String,
        size_bytes: u64,
        limit_bytes: u64,
    },
}

impl SlotError {
    pub fn code(&self) -> FailureCode {
        match self {
            Self::InvalidFileType { .. } => FailureCode::InvalidFileType,
            Self::FileTooLarge { .. } => FailureCode::FileTooLarge,
        }
    }
}

/// Failure of one round trip to the verification backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerificationError {
    #[error("network error: {0}")]
    Network(String),
    #[error("backend responded with status {status_code}")]
    Backend {
        status_code: u16,
        detail: Option<String>,
    },
    #[error("malformed backend response: {0}")]
    MalformedResponse(String),
}

impl VerificationError {
    pub fn code(&self) -> FailureCode {
        match self {
            Self::Network(_) => FailureCode::Network,
            Self::Backend { .. } => FailureCode::Backend,
            Self::MalformedResponse(_) => FailureCode::MalformedResponse,
        }
    }
}

/// Local rejection of a workflow action. State is left untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorkflowError {
    #[error("{mode:?} needs every slot populated; empty slots: {missing_slots:?}")]
    Precondition {
        mode: VerificationMode,
        missing_slots: Vec<usize>,
    },
    #[error(transparent)]
    Slot(#[from] SlotError),
    #[error("slot {index} does not exist; {mode:?} has {slot_count} slot(s)")]
    SlotOutOfRange {
        mode: VerificationMode,
        index: usize,
        slot_count: usize,
    },
}

impl WorkflowError {
    pub fn code(&self) -> FailureCode {
        match self {
            Self::Precondition { .. } | Self::SlotOutOfRange { .. } => FailureCode::Precondition,
            Self::Slot(err) => err.code(),
        }
    }
}
