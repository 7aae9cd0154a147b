use std::{fmt, sync::Arc};

use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::SlotError;

/// Upload ceiling shown to users; only enforced when [`SizePolicy::enforce`] is set.
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;

/// Raw file-like input from a picker or a drop target.
#[derive(Debug, Clone)]
pub struct FileCandidate {
    pub name: String,
    pub mime_type: String,
    pub content: Vec<u8>,
}

impl FileCandidate {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, content: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            content,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizePolicy {
    pub limit_bytes: u64,
    pub enforce: bool,
}

impl Default for SizePolicy {
    fn default() -> Self {
        Self {
            limit_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            enforce: false,
        }
    }
}

impl SizePolicy {
    pub fn exceeds(&self, size_bytes: u64) -> bool {
        size_bytes > self.limit_bytes
    }
}

struct FileHandleInner {
    id: Uuid,
    name: String,
    mime_type: String,
    content: Vec<u8>,
}

/// Immutable, cheaply clonable view of an accepted file.
#[derive(Clone)]
pub struct FileHandle(Arc<FileHandleInner>);

impl FileHandle {
    fn from_candidate(candidate: FileCandidate) -> Self {
        Self(Arc::new(FileHandleInner {
            id: Uuid::new_v4(),
            name: candidate.name,
            mime_type: candidate.mime_type,
            content: candidate.content,
        }))
    }

    pub fn id(&self) -> Uuid {
        self.0.id
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn mime_type(&self) -> &str {
        &self.0.mime_type
    }

    pub fn size_bytes(&self) -> u64 {
        self.0.content.len() as u64
    }

    pub fn content(&self) -> &[u8] {
        &self.0.content
    }
}

impl fmt::Debug for FileHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileHandle")
            .field("id", &self.0.id)
            .field("name", &self.0.name)
            .field("mime_type", &self.0.mime_type)
            .field("size_bytes", &self.size_bytes())
            .finish()
    }
}

impl PartialEq for FileHandle {
    fn eq(&self, other: &Self) -> bool {
        self.0.id == other.0.id
    }
}

impl Eq for FileHandle {}

pub fn is_image_mime(mime_type: &str) -> bool {
    mime_type
        .trim()
        .to_ascii_lowercase()
        .starts_with("image/")
}

/// One upload target. Holds at most one [`FileHandle`].
#[derive(Debug, Default)]
pub struct FileSlot {
    current: Option<FileHandle>,
}

impl FileSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the slot's file. On rejection the slot keeps whatever it had.
    pub fn select(
        &mut self,
        candidate: FileCandidate,
        policy: &SizePolicy,
    ) -> Result<&FileHandle, SlotError> {
        if !is_image_mime(&candidate.mime_type) {
            debug!(
                name = %candidate.name,
                mime_type = %candidate.mime_type,
                "rejecting non-image selection"
            );
            return Err(SlotError::InvalidFileType {
                name: candidate.name,
                mime_type: candidate.mime_type,
            });
        }

        let size_bytes = candidate.content.len() as u64;
        if policy.exceeds(size_bytes) {
            if policy.enforce {
                return Err(SlotError::FileTooLarge {
                    name: candidate.name,
                    size_bytes,
                    limit_bytes: policy.limit_bytes,
                });
            }
            warn!(
                name = %candidate.name,
                size_bytes,
                limit_bytes = policy.limit_bytes,
                "accepting file above advisory size limit"
            );
        }

        Ok(self.current.insert(FileHandle::from_candidate(candidate)))
    }

    /// Empties the slot, returning the handle it held. Idempotent.
    pub fn clear(&mut self) -> Option<FileHandle> {
        self.current.take()
    }

    pub fn file(&self) -> Option<&FileHandle> {
        self.current.as_ref()
    }

    pub fn is_populated(&self) -> bool {
        self.current.is_some()
    }
}

#[cfg(test)]
#[path = "tests/file_slot_tests.rs"]
mod tests;
