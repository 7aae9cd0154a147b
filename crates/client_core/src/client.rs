use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{
    multipart::{Form, Part},
    Client,
};
use shared::{
    domain::{VerificationMode, VerificationResult},
    error::BackendErrorBody,
    protocol::RawVerificationPayload,
};
use tracing::{info, warn};
use url::Url;

use crate::{error::VerificationError, file_slot::FileHandle};

/// Outbound seam to the verification service. One call is one network attempt.
#[async_trait]
pub trait VerificationBackend: Send + Sync {
    async fn submit_single(
        &self,
        file: &FileHandle,
    ) -> std::result::Result<VerificationResult, VerificationError>;

    async fn submit_comparison(
        &self,
        first: &FileHandle,
        second: &FileHandle,
    ) -> std::result::Result<VerificationResult, VerificationError>;
}

/// HTTP adapter for the verification backend. Sends multipart uploads and
/// normalizes whichever JSON shape comes back.
pub struct VerificationClient {
    http: Client,
    base_url: Url,
}

impl VerificationClient {
    pub fn new(server_url: &str) -> Result<Self> {
        Self::with_http_client(Client::new(), server_url)
    }

    pub fn with_http_client(http: Client, server_url: &str) -> Result<Self> {
        let mut base_url = Url::parse(server_url.trim())
            .with_context(|| format!("invalid verification server url '{server_url}'"))?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Ok(Self { http, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn endpoint(&self, mode: VerificationMode) -> std::result::Result<Url, VerificationError> {
        self.base_url
            .join(mode.endpoint_path().trim_start_matches('/'))
            .map_err(|err| VerificationError::Network(format!("invalid endpoint url: {err}")))
    }

    async fn post_files(
        &self,
        mode: VerificationMode,
        files: &[&FileHandle],
    ) -> std::result::Result<VerificationResult, VerificationError> {
        let url = self.endpoint(mode)?;
        let form = mode
            .field_names()
            .iter()
            .zip(files)
            .fold(Form::new(), |form, (field, file)| {
                form.part(*field, file_part(file))
            });

        let response = self
            .http
            .post(url.clone())
            .multipart(form)
            .send()
            .await
            .map_err(|err| VerificationError::Network(err.to_string()))?;
        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|err| VerificationError::Network(err.to_string()))?;

        if !status.is_success() {
            let detail = serde_json::from_slice::<BackendErrorBody>(&body)
                .ok()
                .and_then(|body| body.detail);
            warn!(
                %url,
                status = status.as_u16(),
                detail = detail.as_deref().unwrap_or(""),
                "verification backend rejected request"
            );
            return Err(VerificationError::Backend {
                status_code: status.as_u16(),
                detail,
            });
        }

        let payload = RawVerificationPayload::from_slice(&body)
            .map_err(|err| VerificationError::MalformedResponse(err.to_string()))?;
        if payload.confidence.is_none() && payload.similarity_score.is_none() {
            warn!(%url, "verification payload carries no score; treating it as 0");
        }
        let result = payload
            .normalize()
            .map_err(|err| VerificationError::MalformedResponse(err.to_string()))?;
        info!(
            ?mode,
            judgment = ?result.judgment,
            score = result.score,
            "verification response normalized"
        );
        Ok(result)
    }
}

fn file_part(file: &FileHandle) -> Part {
    let part = Part::bytes(file.content().to_vec()).file_name(file.name().to_string());
    match part.mime_str(file.mime_type()) {
        Ok(part) => part,
        Err(err) => {
            warn!(
                file = %file.name(),
                mime_type = %file.mime_type(),
                "unparseable mime type, sending part untyped: {err}"
            );
            Part::bytes(file.content().to_vec()).file_name(file.name().to_string())
        }
    }
}

#[async_trait]
impl VerificationBackend for VerificationClient {
    async fn submit_single(
        &self,
        file: &FileHandle,
    ) -> std::result::Result<VerificationResult, VerificationError> {
        self.post_files(VerificationMode::SingleAnalysis, &[file])
            .await
    }

    async fn submit_comparison(
        &self,
        first: &FileHandle,
        second: &FileHandle,
    ) -> std::result::Result<VerificationResult, VerificationError> {
        self.post_files(VerificationMode::Comparison, &[first, second])
            .await
    }
}

#[cfg(test)]
#[path = "tests/client_tests.rs"]
mod tests;
