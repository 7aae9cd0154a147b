//! Verification workflow controller: slot acquisition, preview lifecycle and
//! the `Idle -> Submitting -> Succeeded | Failed` request state machine.
//!
//! One controller serves either mode; the mode only decides how many slots
//! must be filled and which backend call a submission makes. Every submission
//! and every reset advances an epoch counter, and a settling response is only
//! applied while the epoch it captured is still current.

use std::sync::Arc;

use shared::domain::{VerificationMode, VerificationResult};
use tokio::{
    runtime::Handle,
    sync::{broadcast, Mutex},
};
use tracing::{debug, info, warn};

use crate::{
    client::VerificationBackend,
    error::{SlotError, VerificationError, WorkflowError},
    file_slot::{FileCandidate, FileHandle, FileSlot, SizePolicy},
    preview::{format_file_size, PreviewRegistry, PreviewSession},
};

const EVENT_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone, PartialEq)]
pub enum RequestState {
    Idle,
    Submitting,
    Succeeded(VerificationResult),
    Failed(VerificationError),
}

impl RequestState {
    pub fn kind(&self) -> RequestStateKind {
        match self {
            Self::Idle => RequestStateKind::Idle,
            Self::Submitting => RequestStateKind::Submitting,
            Self::Succeeded(_) => RequestStateKind::Succeeded,
            Self::Failed(_) => RequestStateKind::Failed,
        }
    }

    pub fn is_settled(&self) -> bool {
        matches!(self, Self::Succeeded(_) | Self::Failed(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestStateKind {
    Idle,
    Submitting,
    Succeeded,
    Failed,
}

#[derive(Debug, Clone, PartialEq)]
pub enum WorkflowEvent {
    SlotChanged {
        slot: usize,
        file: Option<SlotSnapshot>,
    },
    SelectionRejected {
        slot: usize,
        error: SlotError,
    },
    SubmitRejected {
        error: WorkflowError,
    },
    StateChanged {
        epoch: u64,
        state: RequestState,
    },
    StaleResponseDiscarded {
        epoch: u64,
        current_epoch: u64,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotSnapshot {
    pub name: String,
    pub mime_type: String,
    pub size_bytes: u64,
    pub size_label: String,
    pub preview_url: Option<String>,
    pub exceeds_advisory_limit: bool,
}

/// Read-only view handed to the presentation layer.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkflowSnapshot {
    pub mode: VerificationMode,
    pub state: RequestState,
    pub epoch: u64,
    pub slots: Vec<Option<SlotSnapshot>>,
    pub can_submit: bool,
    /// A slot changed after the shown result or error was produced.
    pub result_is_stale: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    Settled(RequestState),
    /// A submission was already in flight; nothing was sent.
    AlreadyInFlight,
    /// The workflow was reset while the request was in flight; the response was dropped.
    Discarded,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct WorkflowOptions {
    pub size_policy: SizePolicy,
}

struct SlotEntry {
    slot: FileSlot,
    preview: PreviewSession,
}

impl SlotSnapshot {
    fn describe(file: &FileHandle, preview_url: Option<String>, policy: &SizePolicy) -> Self {
        Self {
            name: file.name().to_string(),
            mime_type: file.mime_type().to_string(),
            size_bytes: file.size_bytes(),
            size_label: format_file_size(file.size_bytes()),
            preview_url,
            exceeds_advisory_limit: policy.exceeds(file.size_bytes()),
        }
    }
}

impl SlotEntry {
    fn snapshot(&self, policy: &SizePolicy) -> Option<SlotSnapshot> {
        let file = self.slot.file()?;
        let preview_url = self.preview.current().map(|p| p.url().to_string());
        Some(SlotSnapshot::describe(file, preview_url, policy))
    }
}

struct WorkflowState {
    slots: Vec<SlotEntry>,
    request: RequestState,
    epoch: u64,
    result_is_stale: bool,
    /// Epoch of the backend call still awaiting its response. Outlives a reset.
    in_flight: Option<u64>,
    slots_changed_in_flight: bool,
}

impl WorkflowState {
    fn missing_slots(&self) -> Vec<usize> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, entry)| !entry.slot.is_populated())
            .map(|(index, _)| index)
            .collect()
    }

    fn handles(&self) -> Vec<FileHandle> {
        self.slots
            .iter()
            .filter_map(|entry| entry.slot.file().cloned())
            .collect()
    }

    fn note_slot_mutation(&mut self) {
        if self.request.is_settled() {
            self.result_is_stale = true;
        } else if self.request == RequestState::Submitting {
            self.slots_changed_in_flight = true;
        }
    }

    /// Unwinds a submission whose future was dropped before it settled.
    fn abandon_submission(&mut self, epoch: u64) -> Option<WorkflowEvent> {
        if self.in_flight == Some(epoch) {
            self.in_flight = None;
        }
        if self.epoch != epoch || self.request != RequestState::Submitting {
            return None;
        }
        warn!(epoch, "verification submission cancelled before it settled");
        self.request = RequestState::Failed(VerificationError::Network(
            "submission cancelled before a response arrived".to_string(),
        ));
        self.result_is_stale = self.slots_changed_in_flight;
        Some(WorkflowEvent::StateChanged {
            epoch,
            state: self.request.clone(),
        })
    }
}

/// Armed for the lifetime of a pending backend call.
struct InFlightGuard {
    inner: Arc<Mutex<WorkflowState>>,
    events: broadcast::Sender<WorkflowEvent>,
    epoch: u64,
    armed: bool,
}

impl InFlightGuard {
    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let epoch = self.epoch;
        if let Ok(mut state) = self.inner.try_lock() {
            let event = state.abandon_submission(epoch);
            drop(state);
            if let Some(event) = event {
                let _ = self.events.send(event);
            }
            return;
        }

        let Ok(runtime) = Handle::try_current() else {
            warn!(epoch, "no runtime to unwind cancelled submission");
            return;
        };
        let inner = Arc::clone(&self.inner);
        let events = self.events.clone();
        runtime.spawn(async move {
            let event = inner.lock().await.abandon_submission(epoch);
            if let Some(event) = event {
                let _ = events.send(event);
            }
        });
    }
}

pub struct WorkflowController {
    mode: VerificationMode,
    backend: Arc<dyn VerificationBackend>,
    previews: PreviewRegistry,
    size_policy: SizePolicy,
    inner: Arc<Mutex<WorkflowState>>,
    events: broadcast::Sender<WorkflowEvent>,
}

impl WorkflowController {
    pub fn new(mode: VerificationMode, backend: Arc<dyn VerificationBackend>) -> Arc<Self> {
        Self::new_with_options(mode, backend, PreviewRegistry::new(), WorkflowOptions::default())
    }

    pub fn new_with_options(
        mode: VerificationMode,
        backend: Arc<dyn VerificationBackend>,
        previews: PreviewRegistry,
        options: WorkflowOptions,
    ) -> Arc<Self> {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let slots = (0..mode.slot_count())
            .map(|_| SlotEntry {
                slot: FileSlot::new(),
                preview: PreviewSession::new(previews.clone()),
            })
            .collect();
        Arc::new(Self {
            mode,
            backend,
            previews,
            size_policy: options.size_policy,
            inner: Arc::new(Mutex::new(WorkflowState {
                slots,
                request: RequestState::Idle,
                epoch: 0,
                result_is_stale: false,
                in_flight: None,
                slots_changed_in_flight: false,
            })),
            events,
        })
    }

    pub fn mode(&self) -> VerificationMode {
        self.mode
    }

    pub fn previews(&self) -> &PreviewRegistry {
        &self.previews
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<WorkflowEvent> {
        self.events.subscribe()
    }

    fn emit(&self, event: WorkflowEvent) {
        // No subscribers is fine; the caller still gets the Result.
        let _ = self.events.send(event);
    }

    fn check_slot(&self, index: usize) -> Result<(), WorkflowError> {
        let slot_count = self.mode.slot_count();
        if index < slot_count {
            Ok(())
        } else {
            Err(WorkflowError::SlotOutOfRange {
                mode: self.mode,
                index,
                slot_count,
            })
        }
    }

    /// Puts `candidate` into slot `index` and regenerates its preview.
    ///
    /// A settled result is kept as-is and only flagged stale.
    pub async fn select(
        &self,
        index: usize,
        candidate: FileCandidate,
    ) -> Result<SlotSnapshot, WorkflowError> {
        self.check_slot(index)?;
        let mut state = self.inner.lock().await;
        let entry = &mut state.slots[index];
        let selected = entry
            .slot
            .select(candidate, &self.size_policy)
            .map(FileHandle::clone);
        let handle = match selected {
            Ok(handle) => handle,
            Err(error) => {
                drop(state);
                self.emit(WorkflowEvent::SelectionRejected {
                    slot: index,
                    error: error.clone(),
                });
                return Err(error.into());
            }
        };
        let preview_url = entry.preview.attach(&handle).url().to_string();
        let snapshot = SlotSnapshot::describe(&handle, Some(preview_url), &self.size_policy);
        state.note_slot_mutation();
        drop(state);

        info!(
            slot = index,
            file = %handle.name(),
            size_bytes = handle.size_bytes(),
            "signature image selected"
        );
        self.emit(WorkflowEvent::SlotChanged {
            slot: index,
            file: Some(snapshot.clone()),
        });
        Ok(snapshot)
    }

    /// Empties slot `index` and revokes its preview. Idempotent.
    pub async fn clear(&self, index: usize) -> Result<(), WorkflowError> {
        self.check_slot(index)?;
        let mut state = self.inner.lock().await;
        let entry = &mut state.slots[index];
        let removed = entry.slot.clear();
        entry.preview.release();
        if removed.is_some() {
            state.note_slot_mutation();
        }
        drop(state);

        debug!(slot = index, had_file = removed.is_some(), "slot cleared");
        self.emit(WorkflowEvent::SlotChanged {
            slot: index,
            file: None,
        });
        Ok(())
    }

    /// Sends the populated slots to the backend and settles the state.
    ///
    /// Returns `AlreadyInFlight` without touching the network while a
    /// backend call is pending, even one orphaned by a reset, and `Discarded`
    /// when a reset happened before the response arrived. Dropping the
    /// returned future settles the request as a cancelled network failure.
    pub async fn submit(&self) -> Result<SubmitOutcome, WorkflowError> {
        let (epoch, handles, guard) = {
            let mut state = self.inner.lock().await;
            if let Some(pending) = state.in_flight {
                debug!(
                    epoch = state.epoch,
                    pending, "submit ignored, request already in flight"
                );
                return Ok(SubmitOutcome::AlreadyInFlight);
            }

            let missing_slots = state.missing_slots();
            if !missing_slots.is_empty() {
                drop(state);
                let error = WorkflowError::Precondition {
                    mode: self.mode,
                    missing_slots,
                };
                debug!(mode = ?self.mode, "submit rejected: {error}");
                self.emit(WorkflowEvent::SubmitRejected {
                    error: error.clone(),
                });
                return Err(error);
            }

            state.epoch += 1;
            state.request = RequestState::Submitting;
            state.result_is_stale = false;
            state.slots_changed_in_flight = false;
            state.in_flight = Some(state.epoch);
            let guard = InFlightGuard {
                inner: Arc::clone(&self.inner),
                events: self.events.clone(),
                epoch: state.epoch,
                armed: true,
            };
            (state.epoch, state.handles(), guard)
        };

        info!(mode = ?self.mode, epoch, "submitting verification request");
        self.emit(WorkflowEvent::StateChanged {
            epoch,
            state: RequestState::Submitting,
        });

        let outcome = match handles.as_slice() {
            [file] => self.backend.submit_single(file).await,
            [first, second] => self.backend.submit_comparison(first, second).await,
            _ => Err(VerificationError::MalformedResponse(format!(
                "unsupported slot arity {}",
                handles.len()
            ))),
        };

        let mut state = self.inner.lock().await;
        guard.disarm();
        state.in_flight = None;
        if state.epoch != epoch || state.request != RequestState::Submitting {
            let current_epoch = state.epoch;
            drop(state);
            warn!(epoch, current_epoch, "discarding verification response after reset");
            self.emit(WorkflowEvent::StaleResponseDiscarded {
                epoch,
                current_epoch,
            });
            return Ok(SubmitOutcome::Discarded);
        }

        state.request = match outcome {
            Ok(result) => RequestState::Succeeded(result),
            Err(error) => {
                warn!(epoch, code = ?error.code(), "verification request failed: {error}");
                RequestState::Failed(error)
            }
        };
        state.result_is_stale = state.slots_changed_in_flight;
        let settled = state.request.clone();
        drop(state);

        info!(epoch, state = ?settled.kind(), "verification request settled");
        self.emit(WorkflowEvent::StateChanged {
            epoch,
            state: settled.clone(),
        });
        Ok(SubmitOutcome::Settled(settled))
    }

    /// Clears every slot, revokes every preview and returns to `Idle`.
    /// Any in-flight response is dropped when it lands.
    pub async fn reset(&self) {
        let mut state = self.inner.lock().await;
        for entry in &mut state.slots {
            entry.slot.clear();
            entry.preview.release();
        }
        state.epoch += 1;
        state.request = RequestState::Idle;
        state.result_is_stale = false;
        state.slots_changed_in_flight = false;
        let epoch = state.epoch;
        drop(state);

        info!(mode = ?self.mode, epoch, "workflow reset");
        for slot in 0..self.mode.slot_count() {
            self.emit(WorkflowEvent::SlotChanged { slot, file: None });
        }
        self.emit(WorkflowEvent::StateChanged {
            epoch,
            state: RequestState::Idle,
        });
    }

    /// Releases every preview resource. Slots keep their files.
    pub async fn shutdown(&self) {
        let mut state = self.inner.lock().await;
        for entry in &mut state.slots {
            entry.preview.release();
        }
        debug!(mode = ?self.mode, "workflow previews released");
    }

    pub async fn state(&self) -> RequestState {
        self.inner.lock().await.request.clone()
    }

    pub async fn snapshot(&self) -> WorkflowSnapshot {
        let state = self.inner.lock().await;
        let slots = state
            .slots
            .iter()
            .map(|entry| entry.snapshot(&self.size_policy))
            .collect();
        WorkflowSnapshot {
            mode: self.mode,
            state: state.request.clone(),
            epoch: state.epoch,
            slots,
            can_submit: state.in_flight.is_none() && state.missing_slots().is_empty(),
            result_is_stale: state.result_is_stale,
        }
    }
}

#[cfg(test)]
#[path = "tests/workflow_tests.rs"]
mod tests;
