use std::future::Future;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use super::domain::FormDocument;
use super::validation::Issue;

/// Success payload returned by a report generator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportDescriptor {
    pub report_url: String,
    pub filename: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

/// Failure reported by a report generator.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReportGenerationError {
    #[error("report service unreachable: {0}")]
    Network(String),
    #[error("{message}")]
    Rejected { message: String },
    #[error("report service returned an unexpected payload: {0}")]
    MalformedResponse(String),
    #[error("report request failed validation")]
    Invalid(Vec<Issue>),
}

/// Asynchronous, fallible document-generation collaborator.
pub trait ReportGenerator: Send + Sync {
    fn generate(
        &self,
        document: FormDocument,
    ) -> impl Future<Output = Result<ReportDescriptor, ReportGenerationError>> + Send;
}

/// User-facing reason a submission did not produce a report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SubmissionFailure {
    Blocked,
    Network,
    Rejected { message: String },
    MalformedResponse,
    Cancelled,
}

impl SubmissionFailure {
    pub fn message(&self) -> &str {
        match self {
            Self::Blocked => "Resolve validation issues on previous steps before submitting.",
            Self::Network => "Network request failed.",
            Self::Rejected { message } => message,
            Self::MalformedResponse => "Unexpected response payload.",
            Self::Cancelled => "Submission cancelled.",
        }
    }
}

impl From<ReportGenerationError> for SubmissionFailure {
    fn from(error: ReportGenerationError) -> Self {
        match error {
            ReportGenerationError::Network(_) => Self::Network,
            ReportGenerationError::Rejected { message } => Self::Rejected { message },
            ReportGenerationError::MalformedResponse(_) => Self::MalformedResponse,
            ReportGenerationError::Invalid(_) => Self::Rejected {
                message: "Validation failed.".to_string(),
            },
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SubmissionState {
    #[default]
    Idle,
    Submitting,
    Succeeded {
        report: ReportDescriptor,
    },
    Failed {
        failure: SubmissionFailure,
        message: String,
    },
}

impl SubmissionState {
    pub fn failed(failure: SubmissionFailure) -> Self {
        let message = failure.message().to_string();
        Self::Failed { failure, message }
    }

    pub fn is_submitting(&self) -> bool {
        matches!(self, Self::Submitting)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SubmitOutcome {
    /// Another submission is already in flight.
    Ignored,
    Succeeded { report: ReportDescriptor },
    Failed { failure: SubmissionFailure, message: String },
}

impl SubmitOutcome {
    pub fn failed(failure: SubmissionFailure) -> Self {
        let message = failure.message().to_string();
        Self::Failed { failure, message }
    }
}

/// Sender half of a cooperative cancellation signal.
#[derive(Debug)]
pub struct AbortController {
    sender: watch::Sender<bool>,
}

/// Receiver half handed to the in-flight request.
#[derive(Debug, Clone)]
pub struct AbortSignal {
    receiver: watch::Receiver<bool>,
}

impl AbortController {
    pub fn channel() -> (Self, AbortSignal) {
        let (sender, receiver) = watch::channel(false);
        (Self { sender }, AbortSignal { receiver })
    }

    pub fn abort(&self) {
        self.sender.send_replace(true);
    }
}

impl AbortSignal {
    pub fn is_aborted(&self) -> bool {
        *self.receiver.borrow()
    }

    /// Resolves once `abort` is called. Never resolves if the controller is
    /// dropped without aborting.
    pub async fn aborted(&mut self) {
        if self.receiver.wait_for(|aborted| *aborted).await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

/// Runs one generator call, racing it against the abort signal.
pub async fn run_generator<G: ReportGenerator>(
    generator: &G,
    document: FormDocument,
    mut signal: AbortSignal,
) -> Result<ReportDescriptor, SubmissionFailure> {
    if signal.is_aborted() {
        return Err(SubmissionFailure::Cancelled);
    }
    tokio::select! {
        biased;
        _ = signal.aborted() => Err(SubmissionFailure::Cancelled),
        result = generator.generate(document) => result.map_err(SubmissionFailure::from),
    }
}
