//! Step-gated CCNE Standard IV report wizard.
//!
//! Field edits flow through pointer updates on the session document; blur
//! events re-validate a single field, "next" validates the whole step slice
//! and unlocks the following step, and submission re-validates every slice
//! before the sanitized document reaches the report generator.

pub mod calculators;
pub mod domain;
pub mod persistence;
pub mod pointer;
pub mod review;
pub mod router;
pub mod sanitize;
pub mod service;
pub mod session;
pub mod steps;
pub mod submission;
pub mod validation;

#[cfg(test)]
pub(crate) mod tests;

pub use calculators::{adjusted_denominator, completion_rate, format_bytes, rate};
pub use domain::{
    Choice, Cohort, Completion, DataSource, ElaOverride, Employment, EvidenceAttachment,
    EvidenceList, Exclusion, ExclusionCategory, ExpectedOutcomes, FormDocument, IvaEvidence,
    Licensure, OutcomeKey, ProgramInfo, ProgramLevel, ReportingWindow, ReportingWindowId, Slice,
    MAX_COHORTS, MAX_SUPPORTING_EVIDENCE, MIN_NARRATIVE_LENGTH,
};
pub use persistence::{
    DirectorySnapshotStore, MemorySnapshotStore, PersistenceError, SnapshotStore,
    COMPLETED_STEPS_KEY, DEFAULT_PERSIST_DEBOUNCE, FORM_DATA_KEY,
};
pub use pointer::{Node, Pointer, PointerTypeError, Segment};
pub use review::ReviewSummary;
pub use router::wizard_router;
pub use sanitize::sanitize_for_submission;
pub use service::WizardService;
pub use session::{
    Advance, FieldIssue, FormSession, ProgressView, RouteResolution, SessionError, StepValidation,
    StepView,
};
pub use steps::{MarkOutcome, StepPath, StepTracker};
pub use submission::{
    AbortController, AbortSignal, ReportDescriptor, ReportGenerationError, ReportGenerator,
    SubmissionFailure, SubmissionState, SubmitOutcome,
};
pub use validation::{Issue, Outcome};
