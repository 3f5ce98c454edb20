use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use super::domain::{
    Choice, Cohort, EvidenceAttachment, EvidenceList, Exclusion, ExclusionCategory, FormDocument,
    OutcomeKey, ProgramLevel, Slice, MAX_COHORTS, MAX_SUPPORTING_EVIDENCE,
};
use super::persistence::{
    DebounceWindow, PersistenceError, SnapshotStore, COMPLETED_STEPS_KEY, FORM_DATA_KEY,
};
use super::pointer::{self, Node, Pointer, PointerTypeError};
use super::review::{live_cohort_rates, CohortRates, ReviewSummary};
use super::sanitize::sanitize_for_submission;
use super::steps::{MarkOutcome, StepPath, StepTracker};
use super::submission::{ReportDescriptor, SubmissionFailure, SubmissionState, SubmitOutcome};
use super::validation::{validate_form_document, validate_slice, Issue};

/// Validation issue addressed by an absolute document pointer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldIssue {
    pub pointer: Pointer,
    pub message: String,
}

impl FieldIssue {
    fn from_issue(prefix: &Pointer, issue: Issue) -> Self {
        Self {
            pointer: prefix.join(&issue.path),
            message: issue.message,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StepValidation {
    pub step: StepPath,
    pub valid: bool,
    pub issues: Vec<FieldIssue>,
    /// First issue in document order.
    pub focus: Option<Pointer>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Advance {
    Advanced { completed: StepPath, next: StepPath },
    Blocked { validation: StepValidation },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "resolution", content = "step", rename_all = "snake_case")]
pub enum RouteResolution {
    Allowed(StepPath),
    Redirect(StepPath),
}

/// Result of the synchronous half of a submission.
#[derive(Debug, Clone)]
pub enum SubmissionStart {
    /// A submission is already in flight.
    Ignored,
    Blocked(StepValidation),
    /// Sanitized document ready for the report generator.
    Ready(FormDocument),
}

#[derive(Debug, Clone, Serialize)]
pub struct StepProgress {
    pub step: StepPath,
    pub route: &'static str,
    pub label: &'static str,
    pub completed: bool,
    pub unlocked: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProgressView {
    pub steps: Vec<StepProgress>,
    pub first_incomplete: &'static str,
    pub errors: BTreeMap<Pointer, String>,
    pub focus: Option<Pointer>,
    pub submission: SubmissionState,
}

#[derive(Debug, Clone, Serialize)]
pub struct StepView {
    pub step: StepPath,
    pub label: &'static str,
    pub completed: bool,
    /// Slice edited on this step; the whole document for review and submit.
    pub data: Node,
    pub errors: BTreeMap<Pointer, String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub cohort_rates: Vec<CohortRates>,
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Pointer(#[from] PointerTypeError),
    #[error("'{0}' does not address a form section")]
    UnknownSection(String),
    #[error("step '{}' is locked; continue at '{}'", .step.key(), .redirect.route())]
    Locked { step: StepPath, redirect: StepPath },
    #[error("the submit step completes only through a successful submission")]
    TerminalStep,
    #[error("a reporting window holds at most 6 cohorts")]
    CohortLimit,
    #[error("at least one cohort is required")]
    LastCohort,
    #[error("supporting evidence is limited to 12 items")]
    EvidenceLimit,
    #[error("MEP evidence accepts uploaded files only")]
    FilesOnly,
    #[error("an exclusion for '{0}' already exists")]
    DuplicateExclusion(&'static str),
    #[error("no {kind} with id '{id}'")]
    UnknownId { kind: &'static str, id: String },
    #[error("{kind} {index} does not exist")]
    OutOfRange { kind: &'static str, index: usize },
    #[error("failed to encode form value: {0}")]
    Encode(#[from] serde_json::Error),
}

fn default_document() -> Node {
    // Plain structs with string keys always serialize.
    Node::from_serialize(&FormDocument::default()).unwrap_or_else(|_| Node::record())
}

fn slice_pointer(slice: Slice) -> Pointer {
    Pointer::root().key(slice.key())
}

fn cohorts_pointer() -> Pointer {
    slice_pointer(Slice::ReportingWindow).key("cohorts")
}

fn evidence_pointer(list: EvidenceList) -> Pointer {
    slice_pointer(Slice::IvaEvidence).key(list.key())
}

fn slices_for(step: StepPath) -> Vec<Slice> {
    match step.slice() {
        Some(slice) => vec![slice],
        None => Slice::ordered().to_vec(),
    }
}

/// Parses a stored form snapshot and keeps it only when the whole document
/// validates; the stored node is the validator's coerced output.
fn validated_snapshot(raw: &str) -> Result<Node, PersistenceError> {
    let corrupt = |source| PersistenceError::Corrupt {
        key: FORM_DATA_KEY.to_string(),
        source,
    };
    let node = serde_json::from_str::<Node>(raw).map_err(corrupt)?;
    let document = validate_form_document(&node).map_err(|issues| PersistenceError::Invalid {
        key: FORM_DATA_KEY.to_string(),
        issues: issues.len(),
    })?;
    Node::from_serialize(&document).map_err(corrupt)
}

/// The single source of truth for one wizard run: document, step
/// completion, touched fields, validation errors, and submission state.
pub struct FormSession {
    document: Node,
    steps: StepTracker,
    touched: BTreeSet<Pointer>,
    errors: BTreeMap<Pointer, String>,
    focus: Option<Pointer>,
    submission: SubmissionState,
    store: Option<Arc<dyn SnapshotStore>>,
    debounce: DebounceWindow,
}

impl FormSession {
    /// Creates a session and restores any persisted snapshot from `store`.
    pub fn new(store: Option<Arc<dyn SnapshotStore>>, debounce: Duration) -> Self {
        let mut session = Self {
            document: default_document(),
            steps: StepTracker::new(),
            touched: BTreeSet::new(),
            errors: BTreeMap::new(),
            focus: None,
            submission: SubmissionState::Idle,
            store,
            debounce: DebounceWindow::new(debounce),
        };
        session.restore();
        session
    }

    fn restore(&mut self) {
        let Some(store) = self.store.clone() else {
            return;
        };

        match store.load(COMPLETED_STEPS_KEY) {
            Ok(Some(raw)) => match serde_json::from_str::<Value>(&raw) {
                Ok(snapshot) => {
                    self.steps.merge_snapshot(&snapshot);
                    debug!(first_incomplete = self.steps.first_incomplete().key(), "restored step progress");
                }
                Err(source) => {
                    let error = PersistenceError::Corrupt {
                        key: COMPLETED_STEPS_KEY.to_string(),
                        source,
                    };
                    warn!(%error, "discarding step progress snapshot");
                }
            },
            Ok(None) => {}
            Err(error) => warn!(%error, "failed to load step progress snapshot"),
        }

        match store.load(FORM_DATA_KEY) {
            Ok(Some(raw)) => match validated_snapshot(&raw) {
                Ok(document) => {
                    self.document = document;
                    info!("restored form snapshot");
                }
                Err(error) => {
                    warn!(%error, "discarding form snapshot");
                    if self.steps.reset_from(StepPath::Step1) {
                        self.persist_steps();
                    }
                }
            },
            Ok(None) => {}
            Err(error) => warn!(%error, "failed to load form snapshot"),
        }
    }

    pub fn document(&self) -> &Node {
        &self.document
    }

    /// Typed view of the current document; fails while fields hold unfinished input.
    pub fn typed_document(&self) -> Result<FormDocument, serde_json::Error> {
        self.document.to_typed()
    }

    pub fn steps(&self) -> &StepTracker {
        &self.steps
    }

    pub fn errors(&self) -> &BTreeMap<Pointer, String> {
        &self.errors
    }

    pub fn focus(&self) -> Option<&Pointer> {
        self.focus.as_ref()
    }

    pub fn is_touched(&self, pointer: &Pointer) -> bool {
        self.touched.contains(pointer)
    }

    pub fn submission(&self) -> &SubmissionState {
        &self.submission
    }

    pub fn progress(&self) -> ProgressView {
        ProgressView {
            steps: StepPath::ordered()
                .into_iter()
                .map(|step| StepProgress {
                    step,
                    route: step.route(),
                    label: step.label(),
                    completed: self.steps.is_complete(step),
                    unlocked: self.steps.is_unlocked(step),
                })
                .collect(),
            first_incomplete: self.steps.first_incomplete().route(),
            errors: self.errors.clone(),
            focus: self.focus.clone(),
            submission: self.submission.clone(),
        }
    }

    pub fn step_view(&self, step: StepPath) -> Result<StepView, SessionError> {
        self.ensure_unlocked(step)?;
        let (data, prefix) = match step.slice() {
            Some(slice) => {
                let prefix = slice_pointer(slice);
                let data = pointer::get(&self.document, &prefix).cloned().unwrap_or_default();
                (data, Some(prefix))
            }
            None => (self.document.clone(), None),
        };
        let errors = self
            .errors
            .iter()
            .filter(|(pointer, _)| prefix.as_ref().map_or(true, |prefix| pointer.starts_with(prefix)))
            .map(|(pointer, message)| (pointer.clone(), message.clone()))
            .collect();
        let cohort_rates = if step.slice() == Some(Slice::ReportingWindow) {
            live_cohort_rates(&data)
        } else {
            Vec::new()
        };
        Ok(StepView {
            step,
            label: step.label(),
            completed: self.steps.is_complete(step),
            data,
            errors,
            cohort_rates,
        })
    }

    fn ensure_unlocked(&self, step: StepPath) -> Result<(), SessionError> {
        if self.steps.is_unlocked(step) {
            Ok(())
        } else {
            Err(SessionError::Locked {
                step,
                redirect: self.steps.first_incomplete(),
            })
        }
    }

    fn ensure_section(pointer: &Pointer) -> Result<Slice, SessionError> {
        pointer
            .first_key()
            .and_then(Slice::from_key)
            .ok_or_else(|| SessionError::UnknownSection(pointer.to_string()))
    }

    fn commit(&mut self, document: Node, now: Instant) {
        self.document = document;
        if self.store.is_some() {
            self.debounce.schedule(now);
        }
    }

    /// Writes `value` at `pointer`; the snapshot write is debounced.
    pub fn update_field(
        &mut self,
        pointer: &Pointer,
        value: Node,
        now: Instant,
    ) -> Result<(), SessionError> {
        Self::ensure_section(pointer)?;
        let document = pointer::set(&self.document, pointer, value)?;
        self.commit(document, now);
        Ok(())
    }

    pub fn remove_field(&mut self, pointer: &Pointer, now: Instant) -> Result<(), SessionError> {
        Self::ensure_section(pointer)?;
        let document = pointer::delete(&self.document, pointer);
        self.commit(document, now);
        Ok(())
    }

    /// Replaces the document with a function of its previous value.
    pub fn update_document(&mut self, update: impl FnOnce(&Node) -> Node, now: Instant) {
        let document = update(&self.document);
        self.commit(document, now);
    }

    /// Validates the slice owned by `step` (every slice for review and
    /// submit), replacing the recorded errors under those slices.
    pub fn validate_step(&mut self, step: StepPath) -> StepValidation {
        let mut issues = Vec::new();
        for slice in slices_for(step) {
            let prefix = slice_pointer(slice);
            self.errors.retain(|pointer, _| !pointer.starts_with(&prefix));
            let node = pointer::get(&self.document, &prefix).cloned().unwrap_or_default();
            if let Err(found) = validate_slice(slice, &node) {
                issues.extend(found.into_iter().map(|issue| FieldIssue::from_issue(&prefix, issue)));
            }
        }

        for issue in &issues {
            self.errors
                .entry(issue.pointer.clone())
                .or_insert_with(|| issue.message.clone());
        }
        self.focus = issues.first().map(|issue| issue.pointer.clone());

        if !issues.is_empty() {
            debug!(step = step.key(), issues = issues.len(), "step validation failed");
        }
        StepValidation {
            step,
            valid: issues.is_empty(),
            focus: self.focus.clone(),
            issues,
        }
    }

    /// On-blur check: marks the field touched, re-runs its whole slice, and
    /// keeps only the issue addressed at `pointer`.
    pub fn validate_field(&mut self, pointer: &Pointer) -> Result<Option<String>, SessionError> {
        let slice = Self::ensure_section(pointer)?;
        self.touched.insert(pointer.clone());

        let prefix = slice_pointer(slice);
        let node = pointer::get(&self.document, &prefix).cloned().unwrap_or_default();
        let message = validate_slice(slice, &node).err().and_then(|issues| {
            issues
                .into_iter()
                .map(|issue| FieldIssue::from_issue(&prefix, issue))
                .find(|issue| issue.pointer == *pointer)
                .map(|issue| issue.message)
        });

        match &message {
            Some(message) => {
                self.errors.insert(pointer.clone(), message.clone());
            }
            None => {
                self.errors.remove(pointer);
            }
        }
        Ok(message)
    }

    /// Side-effect free validity check.
    pub fn is_step_valid(&self, step: StepPath) -> bool {
        slices_for(step).into_iter().all(|slice| {
            let node = pointer::get(&self.document, &slice_pointer(slice))
                .cloned()
                .unwrap_or_default();
            validate_slice(slice, &node).is_ok()
        })
    }

    /// Validates `step` and, when it passes, completes it and names the next step.
    pub fn advance(&mut self, step: StepPath) -> Result<Advance, SessionError> {
        if step == StepPath::terminal() {
            return Err(SessionError::TerminalStep);
        }
        self.ensure_unlocked(step)?;

        let validation = self.validate_step(step);
        if !validation.valid {
            return Ok(Advance::Blocked { validation });
        }

        self.steps.mark_complete(step);
        self.persist_steps();
        let next = step.next().unwrap_or_else(StepPath::terminal);
        info!(step = step.key(), next = next.key(), "step completed");
        Ok(Advance::Advanced {
            completed: step,
            next,
        })
    }

    /// Re-opens `step` for editing, clearing it and everything downstream.
    pub fn edit_from(&mut self, step: StepPath) -> StepPath {
        if self.steps.reset_from(step) {
            self.persist_steps();
            info!(step = step.key(), "steps reset for editing");
        }
        if !self.submission.is_submitting() {
            self.submission = SubmissionState::Idle;
        }
        step
    }

    pub fn resolve_route(&self, step: StepPath) -> RouteResolution {
        if self.steps.is_unlocked(step) {
            RouteResolution::Allowed(step)
        } else {
            RouteResolution::Redirect(self.steps.first_incomplete())
        }
    }

    /// Validated document for the review screen, or the blocking issues.
    pub fn review(&self) -> Result<ReviewSummary, Vec<FieldIssue>> {
        validate_form_document(&self.document)
            .map(|document| ReviewSummary::build(&document))
            .map_err(|issues| {
                issues
                    .into_iter()
                    .map(|issue| FieldIssue::from_issue(&Pointer::root(), issue))
                    .collect()
            })
    }

    fn list_items(&self, pointer: &Pointer) -> &[Node] {
        pointer::get(&self.document, pointer)
            .and_then(Node::as_array)
            .unwrap_or_default()
    }

    fn append_item(&mut self, list: &Pointer, item: Node, now: Instant) -> Result<(), SessionError> {
        let document = match pointer::get(&self.document, list) {
            None | Some(Node::Null) => {
                pointer::set(&self.document, &list.clone().index(0), item)?
            }
            Some(_) => pointer::set(&self.document, &list.clone().append(), item)?,
        };
        self.commit(document, now);
        Ok(())
    }

    fn position_of(&self, list: &Pointer, id: &str) -> Option<usize> {
        self.list_items(list)
            .iter()
            .position(|item| item.field("id").and_then(Node::as_str) == Some(id))
    }

    fn clear_errors_under(&mut self, prefix: &Pointer) {
        self.errors.retain(|pointer, _| !pointer.starts_with(prefix));
        if self
            .focus
            .as_ref()
            .is_some_and(|focus| focus.starts_with(prefix))
        {
            self.focus = None;
        }
    }

    /// Appends a blank cohort and returns its id.
    pub fn add_cohort(&mut self, now: Instant) -> Result<String, SessionError> {
        let list = cohorts_pointer();
        if self.list_items(&list).len() >= MAX_COHORTS {
            return Err(SessionError::CohortLimit);
        }
        let cohort = Cohort::default();
        let id = cohort.id.clone();
        self.append_item(&list, Node::from_serialize(&cohort)?, now)?;
        Ok(id)
    }

    pub fn remove_cohort(&mut self, id: &str, now: Instant) -> Result<(), SessionError> {
        let list = cohorts_pointer();
        let index = self
            .position_of(&list, id)
            .ok_or_else(|| SessionError::UnknownId {
                kind: "cohort",
                id: id.to_string(),
            })?;
        if self.list_items(&list).len() <= 1 {
            return Err(SessionError::LastCohort);
        }
        let document = pointer::delete(&self.document, &list.clone().index(index));
        self.commit(document, now);
        self.clear_errors_under(&list);
        Ok(())
    }

    /// Adds an exclusion for a category the cohort does not list yet.
    pub fn add_exclusion(
        &mut self,
        cohort_index: usize,
        category: ExclusionCategory,
        now: Instant,
    ) -> Result<(), SessionError> {
        let cohort = cohorts_pointer().index(cohort_index);
        if pointer::get(&self.document, &cohort).is_none() {
            return Err(SessionError::OutOfRange {
                kind: "cohort",
                index: cohort_index,
            });
        }
        let list = cohort.key("completion").key("exclusions");
        let taken = self.list_items(&list).iter().any(|item| {
            item.field("category").and_then(Node::as_str) == Some(category.value())
        });
        if taken {
            return Err(SessionError::DuplicateExclusion(category.value()));
        }
        let exclusion = Exclusion {
            category,
            count: 0,
            note: None,
        };
        self.append_item(&list, Node::from_serialize(&exclusion)?, now)
    }

    pub fn remove_exclusion(
        &mut self,
        cohort_index: usize,
        exclusion_index: usize,
        now: Instant,
    ) -> Result<(), SessionError> {
        let list = cohorts_pointer()
            .index(cohort_index)
            .key("completion")
            .key("exclusions");
        if exclusion_index >= self.list_items(&list).len() {
            return Err(SessionError::OutOfRange {
                kind: "exclusion",
                index: exclusion_index,
            });
        }
        let document = pointer::delete(&self.document, &list.clone().index(exclusion_index));
        self.commit(document, now);
        self.clear_errors_under(&list);
        Ok(())
    }

    /// Switches an outcome between the level default and an override. Turning
    /// the override on seeds it with the default; turning it off clears the
    /// override value and rationale.
    pub fn set_ela_override(
        &mut self,
        outcome: OutcomeKey,
        use_default: bool,
        now: Instant,
    ) -> Result<(), SessionError> {
        let base = slice_pointer(Slice::ExpectedOutcomes).key(outcome.key());
        let value_pointer = base.clone().key("overrideValue");
        let mut document =
            pointer::set(&self.document, &base.clone().key("useDefault"), Node::from(use_default))?;

        if use_default {
            document = pointer::set(&document, &value_pointer, Node::Null)?;
            document = pointer::delete(&document, &base.clone().key("rationale"));
        } else {
            let unset = pointer::get(&document, &value_pointer).map_or(true, Node::is_null);
            if unset {
                let level = pointer::get(
                    &document,
                    &slice_pointer(Slice::ProgramInfo).key("programLevel"),
                )
                .and_then(Node::as_str)
                .and_then(ProgramLevel::from_value)
                .unwrap_or_default();
                let seeded = u32::from(level.default_ela(outcome));
                document = pointer::set(&document, &value_pointer, Node::from(seeded))?;
            }
        }

        self.commit(document, now);
        self.clear_errors_under(&base);
        Ok(())
    }

    fn ensure_capacity(&self, list: EvidenceList) -> Result<(), SessionError> {
        if list == EvidenceList::SupportingEvidence
            && self.list_items(&evidence_pointer(list)).len() >= MAX_SUPPORTING_EVIDENCE
        {
            return Err(SessionError::EvidenceLimit);
        }
        Ok(())
    }

    /// Records uploaded file metadata; the mime type is inferred from the
    /// file name when the client sends none.
    pub fn add_file_evidence(
        &mut self,
        list: EvidenceList,
        name: &str,
        size: u64,
        mime_type: Option<String>,
        now: Instant,
    ) -> Result<String, SessionError> {
        self.ensure_capacity(list)?;
        let mime_type = mime_type
            .filter(|value| !value.trim().is_empty())
            .or_else(|| {
                mime_guess::from_path(name)
                    .first()
                    .map(|mime| mime.essence_str().to_string())
            });
        let attachment = EvidenceAttachment::file(name, size, mime_type);
        let id = attachment.id().to_string();
        self.append_item(&evidence_pointer(list), Node::from_serialize(&attachment)?, now)?;
        Ok(id)
    }

    pub fn add_link_evidence(
        &mut self,
        list: EvidenceList,
        title: &str,
        url: &str,
        now: Instant,
    ) -> Result<String, SessionError> {
        if list == EvidenceList::MepEvidence {
            return Err(SessionError::FilesOnly);
        }
        self.ensure_capacity(list)?;
        let attachment = EvidenceAttachment::link(title, url);
        let id = attachment.id().to_string();
        self.append_item(&evidence_pointer(list), Node::from_serialize(&attachment)?, now)?;
        Ok(id)
    }

    pub fn remove_evidence(
        &mut self,
        list: EvidenceList,
        id: &str,
        now: Instant,
    ) -> Result<(), SessionError> {
        let pointer = evidence_pointer(list);
        let index = self
            .position_of(&pointer, id)
            .ok_or_else(|| SessionError::UnknownId {
                kind: "evidence",
                id: id.to_string(),
            })?;
        let document = pointer::delete(&self.document, &pointer.clone().index(index));
        self.commit(document, now);
        self.clear_errors_under(&pointer);
        Ok(())
    }

    /// Gates a submission: ignored while one is in flight, blocked unless
    /// every earlier step is complete and the whole document validates.
    pub fn begin_submission(&mut self) -> SubmissionStart {
        if self.submission.is_submitting() {
            return SubmissionStart::Ignored;
        }

        let validation = self.validate_step(StepPath::Submit);
        let prior_complete = self.steps.is_unlocked(StepPath::Submit);
        let document = match validate_form_document(&self.document) {
            Ok(document) if validation.valid && prior_complete => document,
            _ => {
                self.submission = SubmissionState::failed(SubmissionFailure::Blocked);
                warn!(
                    issues = validation.issues.len(),
                    prior_complete, "submission blocked"
                );
                return SubmissionStart::Blocked(validation);
            }
        };

        self.submission = SubmissionState::Submitting;
        info!("submission accepted");
        SubmissionStart::Ready(sanitize_for_submission(&document))
    }

    /// Records the generator's answer. Only success completes the submit step;
    /// a report that arrives after earlier steps were reopened is discarded.
    pub fn finish_submission(
        &mut self,
        result: Result<ReportDescriptor, SubmissionFailure>,
    ) -> SubmitOutcome {
        let result = result.and_then(|report| match self.steps.mark_complete(StepPath::Submit) {
            MarkOutcome::Locked => {
                warn!(filename = %report.filename, "steps reopened during submission; report discarded");
                Err(SubmissionFailure::Cancelled)
            }
            MarkOutcome::Completed | MarkOutcome::AlreadyComplete => Ok(report),
        });
        match result {
            Ok(report) => {
                self.persist_steps();
                info!(filename = %report.filename, "submission succeeded");
                self.submission = SubmissionState::Succeeded {
                    report: report.clone(),
                };
                SubmitOutcome::Succeeded { report }
            }
            Err(failure) => {
                warn!(reason = failure.message(), "submission failed");
                self.submission = SubmissionState::failed(failure.clone());
                SubmitOutcome::failed(failure)
            }
        }
    }

    pub fn has_pending_write(&self) -> bool {
        self.debounce.is_pending()
    }

    /// Writes the document snapshot once the debounce window has elapsed.
    pub fn flush_due(&mut self, now: Instant) -> bool {
        if self.debounce.take_due(now) {
            self.write_document();
            true
        } else {
            false
        }
    }

    /// Writes any pending document snapshot immediately.
    pub fn flush(&mut self) -> bool {
        if self.debounce.take_pending() {
            self.write_document();
            true
        } else {
            false
        }
    }

    fn write_document(&self) {
        let Some(store) = &self.store else {
            return;
        };
        let result = serde_json::to_string(&self.document)
            .map_err(|source| PersistenceError::Corrupt {
                key: FORM_DATA_KEY.to_string(),
                source,
            })
            .and_then(|json| store.save(FORM_DATA_KEY, &json));
        if let Err(error) = result {
            warn!(%error, "failed to persist form snapshot");
        }
    }

    fn persist_steps(&self) {
        let Some(store) = &self.store else {
            return;
        };
        let result = serde_json::to_string(&self.steps.snapshot())
            .map_err(|source| PersistenceError::Corrupt {
                key: COMPLETED_STEPS_KEY.to_string(),
                source,
            })
            .and_then(|json| store.save(COMPLETED_STEPS_KEY, &json));
        if let Err(error) = result {
            warn!(%error, "failed to persist step progress");
        }
    }
}
