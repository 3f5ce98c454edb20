use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use ccne_report::report::{report_router, RemoteReportGenerator, TempReportStore};
use ccne_report::wizard::{
    wizard_router, Advance, Cohort, Completion, DataSource, Employment, EvidenceAttachment,
    EvidenceList, FormDocument, FormSession, Licensure, MemorySnapshotStore, Node, Pointer,
    ProgramInfo, ProgramLevel, ReportingWindow, ReportingWindowId, SnapshotStore, StepPath,
    SubmitOutcome, WizardService, FORM_DATA_KEY,
};
use serde_json::Value;
use tower::ServiceExt;

fn cohort(year: &str, completed: u32) -> Cohort {
    Cohort {
        id: format!("cohort-{year}"),
        year: year.to_string(),
        notes: None,
        licensure: Licensure {
            first_time_candidates: 30,
            first_time_passes: 27,
        },
        completion: Completion {
            numerator: completed,
            denominator: 32,
            exclusions: Vec::new(),
        },
        employment: Employment {
            seekers: 28,
            employed: 26,
            data_source: DataSource::Consortium,
            other_source_label: None,
        },
    }
}

fn program_document() -> FormDocument {
    let mut document = FormDocument {
        program_info: ProgramInfo {
            institution_name: "Lakeshore College".to_string(),
            program_name: "Master of Science in Nursing".to_string(),
            program_level: ProgramLevel::Msn,
            accreditation_cycle: "2025-2030".to_string(),
            contact_email: "outcomes@lakeshore.edu".to_string(),
            dean_name: "Dr. Imani Cole".to_string(),
        },
        reporting_window: ReportingWindow {
            selection: ReportingWindowId::Rolling3,
            start_year: "2022".to_string(),
            end_year: "2024".to_string(),
            cohorts: vec![cohort("2022", 28), cohort("2023", 30), cohort("2024", 29)],
        },
        ..FormDocument::default()
    };
    document.iva_evidence.iva_narrative = "Faculty review aggregate licensure, completion, and \
employment outcomes every term and document program improvements in the annual evaluation plan."
        .to_string();
    document
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body readable");
    serde_json::from_slice(&bytes).expect("json body")
}

#[tokio::test]
async fn completed_wizard_produces_a_downloadable_report() {
    let store = MemorySnapshotStore::new();
    let snapshot: Arc<dyn SnapshotStore> = Arc::new(store.clone());
    let mut session = FormSession::new(Some(snapshot), Duration::from_millis(300));
    let now = Instant::now();

    let document = Node::from_serialize(&program_document()).expect("document serializes");
    session.update_document(|_| document, now);
    session
        .add_file_evidence(EvidenceList::MepEvidence, "mep-2024.pdf", 120_000, None, now)
        .expect("mep file accepted");
    session
        .add_link_evidence(
            EvidenceList::SupportingEvidence,
            "Outcomes dashboard",
            "https://lakeshore.edu/outcomes",
            now,
        )
        .expect("link accepted");

    for step in &StepPath::ordered()[..5] {
        let advance = session.advance(*step).expect("step reachable");
        assert!(matches!(advance, Advance::Advanced { .. }), "{step:?}: {advance:?}");
    }
    assert!(session.flush());
    assert!(store
        .load(FORM_DATA_KEY)
        .expect("store readable")
        .is_some_and(|raw| raw.contains("Lakeshore College")));

    let reports = Arc::new(TempReportStore::new(Duration::from_secs(600)));
    let generator = Arc::new(RemoteReportGenerator::local(Arc::clone(&reports)));
    let service = Arc::new(WizardService::new(session, Arc::clone(&generator)));
    let app: Router = wizard_router(Arc::clone(&service)).merge(report_router(generator));

    let outcome = service.submit().await;
    let SubmitOutcome::Succeeded { report } = outcome else {
        panic!("submission should succeed, got {outcome:?}");
    };
    assert!(report.filename.starts_with("ccne-standard-iv-report-"));
    assert!(report.expires_at.is_some());
    assert_eq!(reports.len(), 1);

    let response = app
        .clone()
        .oneshot(
            Request::get(report.report_url.as_str())
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("router responds");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CACHE_CONTROL],
        "no-store"
    );
    let disposition = response.headers()[header::CONTENT_DISPOSITION]
        .to_str()
        .expect("ascii header")
        .to_string();
    assert!(disposition.contains(&report.filename));
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body readable");
    let synopsis = String::from_utf8(bytes.to_vec()).expect("utf-8 report");
    assert!(synopsis.contains("Institution: Lakeshore College"));
    assert!(synopsis.contains("## Cohort 3: 2024"));
    assert!(synopsis.contains("- Licensure: 82% (default)"));

    let progress = body_json(
        app.oneshot(
            Request::get("/api/v1/wizard")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("router responds"),
    )
    .await;
    assert_eq!(progress["submission"]["status"], "succeeded");
    let steps = progress["steps"].as_array().expect("steps listed");
    assert!(steps.iter().all(|step| step["completed"] == true));
}

#[tokio::test]
async fn report_endpoint_accepts_a_full_document() {
    let mut document = program_document();
    document
        .iva_evidence
        .mep_evidence
        .push(EvidenceAttachment::file("mep.pdf", 10, None));
    document
        .iva_evidence
        .supporting_evidence
        .push(EvidenceAttachment::file("minutes.docx", 10, None));

    let generator = Arc::new(RemoteReportGenerator::local(Arc::new(TempReportStore::default())));
    let response = report_router(generator)
        .oneshot(
            Request::post("/api/generateReport")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    serde_json::to_vec(&document).expect("document serializes"),
                ))
                .expect("request"),
        )
        .await
        .expect("router responds");

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "success");
    assert!(body["reportUrl"]
        .as_str()
        .is_some_and(|url| url.starts_with("/api/generateReport/")));
    assert!(body["expiresAt"].is_string());
}

#[test]
fn pointer_edits_through_the_public_api() {
    let mut session = FormSession::new(None, Duration::from_millis(300));
    let pointer = Pointer::parse("/reportingWindow/cohorts/0/year");
    session
        .update_field(&pointer, Node::from("2024"), Instant::now())
        .expect("pointer valid");
    assert_eq!(session.validate_field(&pointer).expect("known section"), None);
    assert_eq!(
        session.typed_document().expect("typed").reporting_window.cohorts[0].year,
        "2024"
    );
}
