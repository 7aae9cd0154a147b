//! Client-side signature verification workflow: file slots, preview
//! resources, the backend adapter and the controller that ties them together.

pub mod client;
pub mod config;
pub mod error;
pub mod file_slot;
pub mod presentation;
pub mod preview;
pub mod report;
pub mod workflow;

pub use client::{VerificationBackend, VerificationClient};
pub use error::{SlotError, VerificationError, WorkflowError};
pub use file_slot::{FileCandidate, FileHandle, FileSlot, SizePolicy};
pub use preview::{PreviewRegistry, PreviewResource, PreviewSession};
pub use workflow::{
    RequestState, RequestStateKind, SubmitOutcome, WorkflowController, WorkflowEvent,
    WorkflowOptions, WorkflowSnapshot,
};
