use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Notify;

use crate::wizard::domain::{
    Cohort, Completion, DataSource, Employment, EvidenceAttachment, FormDocument, IvaEvidence,
    Licensure, ProgramInfo, ProgramLevel, ReportingWindow, ReportingWindowId,
};
use crate::wizard::persistence::{MemorySnapshotStore, SnapshotStore, DEFAULT_PERSIST_DEBOUNCE};
use crate::wizard::pointer::{Node, Pointer};
use crate::wizard::session::{Advance, FormSession};
use crate::wizard::steps::StepPath;
use crate::wizard::submission::{ReportDescriptor, ReportGenerationError, ReportGenerator};

pub(super) const NARRATIVE: &str = "The program systematically collects licensure, completion, \
and employment data for every graduating cohort and reviews it each semester with faculty.";

pub(super) fn cohort(year: &str) -> Cohort {
    Cohort {
        id: format!("cohort-{year}"),
        year: year.to_string(),
        notes: None,
        licensure: Licensure {
            first_time_candidates: 40,
            first_time_passes: 36,
        },
        completion: Completion {
            numerator: 45,
            denominator: 50,
            exclusions: Vec::new(),
        },
        employment: Employment {
            seekers: 38,
            employed: 35,
            data_source: DataSource::EmployerSurvey,
            other_source_label: None,
        },
    }
}

pub(crate) fn valid_document() -> FormDocument {
    FormDocument {
        program_info: ProgramInfo {
            institution_name: "Riverside University".to_string(),
            program_name: "Bachelor of Science in Nursing".to_string(),
            program_level: ProgramLevel::Bsn,
            accreditation_cycle: "2024-2029".to_string(),
            contact_email: "dean@riverside.edu".to_string(),
            dean_name: "Dr. Ada Finch".to_string(),
        },
        reporting_window: ReportingWindow {
            selection: ReportingWindowId::Rolling3,
            start_year: "2021".to_string(),
            end_year: "2023".to_string(),
            cohorts: vec![cohort("2021"), cohort("2022"), cohort("2023")],
        },
        expected_outcomes: Default::default(),
        iva_evidence: IvaEvidence {
            iva_narrative: NARRATIVE.to_string(),
            mep_evidence: vec![EvidenceAttachment::file(
                "mep-plan.pdf",
                48_000,
                Some("application/pdf".to_string()),
            )],
            supporting_evidence: vec![EvidenceAttachment::link(
                "Outcome dashboard",
                "https://riverside.edu/outcomes",
            )],
            ..Default::default()
        },
    }
}

pub(super) fn session_with(document: &FormDocument) -> FormSession {
    let mut session = FormSession::new(None, DEFAULT_PERSIST_DEBOUNCE);
    let node = Node::from_serialize(document).expect("document serializes");
    session.update_document(|_| node, Instant::now());
    session
}

pub(super) fn stored_session(store: &MemorySnapshotStore) -> FormSession {
    let store: Arc<dyn SnapshotStore> = Arc::new(store.clone());
    FormSession::new(Some(store), Duration::from_millis(300))
}

/// Advances every step before `until`.
pub(super) fn complete_through(session: &mut FormSession, until: StepPath) {
    for step in StepPath::ordered() {
        if step == until {
            break;
        }
        let advance = session.advance(step).expect("step is reachable");
        assert!(
            matches!(advance, Advance::Advanced { .. }),
            "{step:?} should advance, got {advance:?}"
        );
    }
}

pub(super) fn ptr(raw: &str) -> Pointer {
    Pointer::parse(raw)
}

pub(super) fn descriptor() -> ReportDescriptor {
    ReportDescriptor {
        report_url: "/api/generateReport/token-1".to_string(),
        filename: "ccne-standard-iv-report.md".to_string(),
        expires_at: None,
    }
}

/// Counts calls and answers immediately.
#[derive(Default)]
pub(super) struct CountingGenerator {
    pub(super) calls: AtomicUsize,
}

impl CountingGenerator {
    pub(super) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ReportGenerator for CountingGenerator {
    async fn generate(
        &self,
        _document: FormDocument,
    ) -> Result<ReportDescriptor, ReportGenerationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(descriptor())
    }
}

/// Holds every call open until `release` is notified.
#[derive(Default)]
pub(super) struct GatedGenerator {
    pub(super) calls: AtomicUsize,
    pub(super) started: Notify,
    pub(super) release: Notify,
}

impl GatedGenerator {
    pub(super) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ReportGenerator for GatedGenerator {
    async fn generate(
        &self,
        _document: FormDocument,
    ) -> Result<ReportDescriptor, ReportGenerationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.started.notify_one();
        self.release.notified().await;
        Ok(descriptor())
    }
}
