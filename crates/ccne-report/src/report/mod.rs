//! Report generation: validates a submitted document, renders it (remotely
//! when configured, else as a local synopsis), and parks it behind an
//! expiring download token.

pub mod remote;
pub mod router;
pub mod storage;
pub mod template;

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use tracing::{info, warn};
use uuid::Uuid;

use crate::wizard::pointer::Node;
use crate::wizard::sanitize::sanitize_for_submission;
use crate::wizard::submission::{ReportDescriptor, ReportGenerationError, ReportGenerator};
use crate::wizard::validation::{validate_form_document, Issue};
use crate::wizard::FormDocument;

pub use remote::{RemoteError, RemoteReportGenerator};
pub use router::report_router;
pub use storage::{ReportArtifact, TempReportStore, DEFAULT_REPORT_TTL_SECS};
pub use template::create_report_synopsis;

pub const REPORT_ROUTE: &str = "/api/generateReport";
pub const REPORT_CONTENT_TYPE: &str = "text/markdown; charset=utf-8";

/// Renders reports in-process and stores them in a [`TempReportStore`].
#[derive(Debug, Clone)]
pub struct LocalReportGenerator {
    store: Arc<TempReportStore>,
}

impl LocalReportGenerator {
    pub fn new(store: Arc<TempReportStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<TempReportStore> {
        &self.store
    }

    /// Validates an untyped payload and renders it. Validation issues are
    /// returned unchanged so callers can report their paths.
    pub fn generate_from_node(&self, payload: &Node) -> Result<ReportDescriptor, Vec<Issue>> {
        let request_id = Uuid::new_v4();
        let started = Instant::now();

        let document = validate_form_document(payload).map_err(|issues| {
            warn!(%request_id, issues = issues.len(), "report payload failed validation");
            issues
        })?;
        let document = sanitize_for_submission(&document);
        let descriptor = self.render(&document, Utc::now());

        info!(
            %request_id,
            filename = %descriptor.filename,
            cohorts = document.reporting_window.cohorts.len(),
            duration_ms = started.elapsed().as_millis() as u64,
            "report generated"
        );
        Ok(descriptor)
    }

    pub(crate) fn render(&self, document: &FormDocument, now: DateTime<Utc>) -> ReportDescriptor {
        let artifact = ReportArtifact {
            bytes: create_report_synopsis(document).into_bytes(),
            content_type: REPORT_CONTENT_TYPE.to_string(),
            filename: report_filename(now, "md"),
        };
        self.publish(artifact, now)
    }

    /// Stores a finished artifact and describes its download link.
    pub(crate) fn publish(&self, artifact: ReportArtifact, now: DateTime<Utc>) -> ReportDescriptor {
        let filename = artifact.filename.clone();
        let (token, expires_at) = self.store.put_at(artifact, now);
        ReportDescriptor {
            report_url: format!("{REPORT_ROUTE}/{token}"),
            filename,
            expires_at: Some(expires_at),
        }
    }
}

pub(crate) fn report_filename(now: DateTime<Utc>, extension: &str) -> String {
    format!(
        "ccne-standard-iv-report-{}.{extension}",
        now.format("%Y-%m-%dT%H-%M-%S")
    )
}

impl ReportGenerator for LocalReportGenerator {
    async fn generate(
        &self,
        document: FormDocument,
    ) -> Result<ReportDescriptor, ReportGenerationError> {
        let payload = Node::from_serialize(&document)
            .map_err(|err| ReportGenerationError::MalformedResponse(err.to_string()))?;
        self.generate_from_node(&payload)
            .map_err(ReportGenerationError::Invalid)
    }
}
