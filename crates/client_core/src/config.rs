use std::{fs, path::Path};

use anyhow::Context;
use serde::Deserialize;

use crate::file_slot::{SizePolicy, DEFAULT_MAX_UPLOAD_BYTES};

pub const DEFAULT_SETTINGS_FILE: &str = "sigverify.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub server_url: String,
    pub max_upload_bytes: u64,
    pub enforce_size_limit: bool,
    pub log_filter: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_url: "http://localhost:8000".into(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            enforce_size_limit: false,
            log_filter: "info".into(),
        }
    }
}

impl Settings {
    pub fn size_policy(&self) -> SizePolicy {
        SizePolicy {
            limit_bytes: self.max_upload_bytes,
            enforce: self.enforce_size_limit,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct FileSettings {
    server_url: Option<String>,
    max_upload_bytes: Option<u64>,
    enforce_size_limit: Option<bool>,
    log_filter: Option<String>,
}

/// Defaults, then `path` if it exists, then environment overrides.
pub fn load_settings(path: &Path) -> anyhow::Result<Settings> {
    let mut settings = Settings::default();

    if path.exists() {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read settings file '{}'", path.display()))?;
        let file_cfg: FileSettings = toml::from_str(&raw)
            .with_context(|| format!("failed to parse settings file '{}'", path.display()))?;
        apply_file_settings(&mut settings, file_cfg);
    }

    apply_env_overrides(&mut settings, |key| std::env::var(key).ok())?;
    Ok(settings)
}

fn apply_file_settings(settings: &mut Settings, file_cfg: FileSettings) {
    if let Some(v) = file_cfg.server_url {
        settings.server_url = v;
    }
    if let Some(v) = file_cfg.max_upload_bytes {
        settings.max_upload_bytes = v;
    }
    if let Some(v) = file_cfg.enforce_size_limit {
        settings.enforce_size_limit = v;
    }
    if let Some(v) = file_cfg.log_filter {
        settings.log_filter = v;
    }
}

fn apply_env_overrides(
    settings: &mut Settings,
    lookup: impl Fn(&str) -> Option<String>,
) -> anyhow::Result<()> {
    if let Some(v) = lookup("SIGVERIFY_SERVER_URL") {
        settings.server_url = v;
    }
    if let Some(v) = lookup("APP__SERVER_URL") {
        settings.server_url = v;
    }

    if let Some(v) = lookup("APP__MAX_UPLOAD_BYTES") {
        settings.max_upload_bytes = v
            .trim()
            .parse()
            .with_context(|| format!("APP__MAX_UPLOAD_BYTES is not a byte count: '{v}'"))?;
    }

    if let Some(v) = lookup("APP__ENFORCE_SIZE_LIMIT") {
        settings.enforce_size_limit = parse_flag(&v)
            .with_context(|| format!("APP__ENFORCE_SIZE_LIMIT is not a boolean: '{v}'"))?;
    }

    if let Some(v) = lookup("APP__LOG_FILTER") {
        settings.log_filter = v;
    }

    Ok(())
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
