//! Remote document generation over HTTP. The local synopsis stands in
//! whenever the endpoint is unconfigured, unreachable, or answers with
//! something other than a base64 document.

use std::sync::Arc;
use std::time::{Duration, Instant};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use super::{report_filename, LocalReportGenerator, ReportArtifact, TempReportStore};
use crate::config::RemoteReportConfig;
use crate::wizard::domain::Choice;
use crate::wizard::pointer::Node;
use crate::wizard::sanitize::sanitize_for_submission;
use crate::wizard::submission::{ReportDescriptor, ReportGenerationError, ReportGenerator};
use crate::wizard::validation::{validate_form_document, Issue};
use crate::wizard::FormDocument;

pub const REMOTE_MODEL: &str = "ccne-iv";
pub const DOCX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
const REMOTE_TIMEOUT: Duration = Duration::from_secs(60);
const ERROR_BODY_LIMIT: usize = 200;

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("remote request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("remote generator answered {status}: {body}")]
    Status { status: u16, body: String },
    #[error("remote response is missing the document payload")]
    MissingPayload,
    #[error("remote document is not valid base64: {0}")]
    Decode(#[from] base64::DecodeError),
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'static str,
    payload: &'a FormDocument,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    base64: Option<String>,
    #[serde(default)]
    filename: Option<String>,
    #[serde(default)]
    mime_type: Option<String>,
}

#[derive(Debug)]
struct Endpoint {
    config: RemoteReportConfig,
    client: reqwest::Client,
}

impl Endpoint {
    async fn request(
        &self,
        document: &FormDocument,
        now: DateTime<Utc>,
    ) -> Result<ReportArtifact, RemoteError> {
        let response = self
            .client
            .post(&self.config.endpoint)
            .bearer_auth(&self.config.api_key)
            .json(&GenerateRequest {
                model: REMOTE_MODEL,
                payload: document,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RemoteError::Status {
                status: status.as_u16(),
                body: body.chars().take(ERROR_BODY_LIMIT).collect(),
            });
        }

        let reply: GenerateResponse = response.json().await?;
        let encoded = reply
            .base64
            .filter(|encoded| !encoded.trim().is_empty())
            .ok_or(RemoteError::MissingPayload)?;
        let bytes = STANDARD.decode(encoded.trim())?;

        Ok(ReportArtifact {
            bytes,
            content_type: reply
                .mime_type
                .filter(|mime| !mime.trim().is_empty())
                .unwrap_or_else(|| DOCX_CONTENT_TYPE.to_string()),
            filename: reply
                .filename
                .filter(|name| is_safe_filename(name))
                .unwrap_or_else(|| report_filename(now, "docx")),
        })
    }
}

/// Names end up in a `Content-Disposition` header.
fn is_safe_filename(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= 128
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | ' '))
}

/// Sends sanitized documents to the configured endpoint and falls back to
/// [`LocalReportGenerator`] on any failure.
#[derive(Debug)]
pub struct RemoteReportGenerator {
    endpoint: Option<Endpoint>,
    fallback: LocalReportGenerator,
}

impl RemoteReportGenerator {
    pub fn new(remote: Option<RemoteReportConfig>, fallback: LocalReportGenerator) -> Self {
        let endpoint = remote.and_then(|config| {
            match reqwest::Client::builder().timeout(REMOTE_TIMEOUT).build() {
                Ok(client) => Some(Endpoint { config, client }),
                Err(error) => {
                    warn!(%error, "remote report client unavailable; using local synopsis");
                    None
                }
            }
        });
        Self { endpoint, fallback }
    }

    /// A generator that always renders the local synopsis.
    pub fn local(store: Arc<TempReportStore>) -> Self {
        Self::new(None, LocalReportGenerator::new(store))
    }

    pub fn is_remote(&self) -> bool {
        self.endpoint.is_some()
    }

    pub fn store(&self) -> &Arc<TempReportStore> {
        self.fallback.store()
    }

    /// Validates an untyped payload, sanitizes it, and produces a report.
    /// Only validation issues are errors; generation failures fall back.
    pub async fn generate_from_node(
        &self,
        payload: &Node,
    ) -> Result<ReportDescriptor, Vec<Issue>> {
        let request_id = Uuid::new_v4();
        let started = Instant::now();

        let document = validate_form_document(payload).map_err(|issues| {
            warn!(%request_id, issues = issues.len(), "report payload failed validation");
            issues
        })?;
        info!(
            %request_id,
            program_level = document.program_info.program_level.value(),
            window = document.reporting_window.selection.value(),
            cohorts = document.reporting_window.cohorts.len(),
            "report request accepted"
        );
        let document = sanitize_for_submission(&document);
        let descriptor = self.produce(&document, request_id).await;

        info!(
            %request_id,
            filename = %descriptor.filename,
            duration_ms = started.elapsed().as_millis() as u64,
            "report generated"
        );
        Ok(descriptor)
    }

    async fn produce(&self, document: &FormDocument, request_id: Uuid) -> ReportDescriptor {
        let Some(endpoint) = &self.endpoint else {
            info!(%request_id, reason = "missing_env", "rendering local synopsis");
            return self.fallback.render(document, Utc::now());
        };

        let now = Utc::now();
        match endpoint.request(document, now).await {
            Ok(artifact) => self.fallback.publish(artifact, now),
            Err(error) => {
                warn!(%request_id, %error, "remote report generation failed; rendering local synopsis");
                self.fallback.render(document, Utc::now())
            }
        }
    }
}

impl ReportGenerator for RemoteReportGenerator {
    async fn generate(
        &self,
        document: FormDocument,
    ) -> Result<ReportDescriptor, ReportGenerationError> {
        let payload = Node::from_serialize(&document)
            .map_err(|err| ReportGenerationError::MalformedResponse(err.to_string()))?;
        self.generate_from_node(&payload)
            .await
            .map_err(ReportGenerationError::Invalid)
    }
}
