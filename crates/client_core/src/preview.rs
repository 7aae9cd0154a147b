use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use base64::{engine::general_purpose::STANDARD, Engine as _};
use tracing::debug;
use uuid::Uuid;

use crate::file_slot::FileHandle;

const PREVIEW_URL_PREFIX: &str = "blob:sigverify/";
const SIZE_UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];

/// Revocable reference to a file's renderable form.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PreviewResource {
    id: Uuid,
    url: String,
}

impl PreviewResource {
    pub fn url(&self) -> &str {
        &self.url
    }
}

/// Table of live preview resources. Clones share the same table.
#[derive(Clone, Default)]
pub struct PreviewRegistry {
    live: Arc<Mutex<HashMap<Uuid, FileHandle>>>,
}

impl PreviewRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn table(&self) -> MutexGuard<'_, HashMap<Uuid, FileHandle>> {
        self.live.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn create(&self, handle: &FileHandle) -> PreviewResource {
        let id = Uuid::new_v4();
        self.table().insert(id, handle.clone());
        PreviewResource {
            id,
            url: format!("{PREVIEW_URL_PREFIX}{id}"),
        }
    }

    fn revoke(&self, resource: &PreviewResource) -> bool {
        self.table().remove(&resource.id).is_some()
    }

    /// Looks up the file behind a preview URL. Revoked URLs resolve to nothing.
    pub fn resolve(&self, url: &str) -> Option<FileHandle> {
        let id = url
            .strip_prefix(PREVIEW_URL_PREFIX)
            .and_then(|raw| Uuid::parse_str(raw).ok())?;
        self.table().get(&id).cloned()
    }

    /// Inline `data:` URL for a live preview.
    pub fn data_url(&self, url: &str) -> Option<String> {
        let handle = self.resolve(url)?;
        Some(format!(
            "data:{};base64,{}",
            handle.mime_type(),
            STANDARD.encode(handle.content())
        ))
    }

    pub fn is_live(&self, resource: &PreviewResource) -> bool {
        self.table().contains_key(&resource.id)
    }

    pub fn live_count(&self) -> usize {
        self.table().len()
    }
}

/// Keeps at most one live [`PreviewResource`] for a slot and revokes it on
/// replacement, release, or drop.
pub struct PreviewSession {
    registry: PreviewRegistry,
    current: Option<PreviewResource>,
}

impl PreviewSession {
    pub fn new(registry: PreviewRegistry) -> Self {
        Self {
            registry,
            current: None,
        }
    }

    pub fn attach(&mut self, handle: &FileHandle) -> &PreviewResource {
        self.release();
        let resource = self.registry.create(handle);
        debug!(url = %resource.url, file = %handle.name(), "preview attached");
        self.current.insert(resource)
    }

    /// Revokes the current resource. Returns whether one was live.
    pub fn release(&mut self) -> bool {
        match self.current.take() {
            Some(resource) => {
                debug!(url = %resource.url, "preview revoked");
                self.registry.revoke(&resource)
            }
            None => false,
        }
    }

    pub fn current(&self) -> Option<&PreviewResource> {
        self.current.as_ref()
    }
}

impl Drop for PreviewSession {
    fn drop(&mut self) {
        self.release();
    }
}

/// Base-1024 size label with at most two decimals, e.g. `1.5 KB`.
pub fn format_file_size(bytes: u64) -> String {
    if bytes == 0 {
        return "0 Bytes".to_string();
    }

    let mut exponent = 0;
    let mut scale = 1u64;
    while exponent < SIZE_UNITS.len() - 1 && bytes >= scale * 1024 {
        scale *= 1024;
        exponent += 1;
    }

    let value_text = format!("{:.2}", bytes as f64 / scale as f64);
    let compact_value = value_text.trim_end_matches('0').trim_end_matches('.');
    format!("{compact_value} {}", SIZE_UNITS[exponent])
}

#[cfg(test)]
#[path = "tests/preview_tests.rs"]
mod tests;
