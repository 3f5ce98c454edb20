use std::sync::Arc;
use std::time::{Duration, Instant};

use super::common::*;
use crate::wizard::domain::FormDocument;
use crate::wizard::pointer::Node;
use crate::wizard::service::WizardService;
use crate::wizard::steps::StepPath;
use crate::wizard::submission::{
    ReportDescriptor, ReportGenerationError, ReportGenerator, SubmissionFailure, SubmissionState,
    SubmitOutcome,
};

fn ready_service<G: ReportGenerator + 'static>(generator: Arc<G>) -> Arc<WizardService<G>> {
    let mut session = session_with(&valid_document());
    complete_through(&mut session, StepPath::Submit);
    Arc::new(WizardService::new(session, generator))
}

#[tokio::test]
async fn invalid_earlier_step_blocks_without_calling_generator() {
    let generator = Arc::new(CountingGenerator::default());
    let service = ready_service(Arc::clone(&generator));
    service.with_session(|session| {
        session
            .update_field(
                &ptr("reportingWindow/cohorts/0/year"),
                Node::from("21"),
                Instant::now(),
            )
            .expect("pointer is valid")
    });

    let outcome = service.submit().await;

    assert_eq!(outcome, SubmitOutcome::failed(SubmissionFailure::Blocked));
    assert_eq!(generator.calls(), 0);
    service.with_session(|session| {
        assert_eq!(
            session.focus(),
            Some(&ptr("reportingWindow/cohorts/0/year"))
        );
        assert_eq!(
            session.submission().clone(),
            SubmissionState::failed(SubmissionFailure::Blocked)
        );
        assert!(!session.steps().is_complete(StepPath::Submit));
    });
}

#[tokio::test]
async fn incomplete_steps_block_even_a_valid_document() {
    let generator = Arc::new(CountingGenerator::default());
    let mut session = session_with(&valid_document());
    complete_through(&mut session, StepPath::Step4);
    let service = WizardService::new(session, Arc::clone(&generator));

    let outcome = service.submit().await;

    assert_eq!(outcome, SubmitOutcome::failed(SubmissionFailure::Blocked));
    assert_eq!(generator.calls(), 0);
}

#[tokio::test]
async fn valid_submission_calls_generator_once_and_completes_submit() {
    let generator = Arc::new(CountingGenerator::default());
    let service = ready_service(Arc::clone(&generator));

    let outcome = service.submit().await;

    assert_eq!(
        outcome,
        SubmitOutcome::Succeeded {
            report: descriptor()
        }
    );
    assert_eq!(generator.calls(), 1);
    service.with_session(|session| {
        assert!(session.steps().is_complete(StepPath::Submit));
        assert!(matches!(
            session.submission(),
            SubmissionState::Succeeded { .. }
        ));
    });
}

#[tokio::test]
async fn second_click_while_in_flight_is_ignored() {
    let generator = Arc::new(GatedGenerator::default());
    let service = ready_service(Arc::clone(&generator));

    let first = tokio::spawn({
        let service = Arc::clone(&service);
        async move { service.submit().await }
    });
    generator.started.notified().await;

    assert_eq!(service.submit().await, SubmitOutcome::Ignored);
    assert_eq!(generator.calls(), 1);
    assert!(service.with_session(|session| session.submission().is_submitting()));

    generator.release.notify_one();
    let outcome = first.await.expect("submission task joins");
    assert!(matches!(outcome, SubmitOutcome::Succeeded { .. }));
    assert_eq!(generator.calls(), 1);
}

#[tokio::test]
async fn cancelling_reports_cancellation_and_leaves_submit_open() {
    let generator = Arc::new(GatedGenerator::default());
    let service = ready_service(Arc::clone(&generator));
    assert!(!service.cancel_submission(), "nothing in flight yet");

    let pending = tokio::spawn({
        let service = Arc::clone(&service);
        async move { service.submit().await }
    });
    generator.started.notified().await;
    assert!(service.cancel_submission());

    let outcome = pending.await.expect("submission task joins");
    assert_eq!(outcome, SubmitOutcome::failed(SubmissionFailure::Cancelled));
    let SubmitOutcome::Failed { message, .. } = outcome else {
        panic!("cancelled submissions fail");
    };
    assert_eq!(message, "Submission cancelled.");
    service.with_session(|session| {
        assert!(!session.steps().is_complete(StepPath::Submit));
        assert!(!session.submission().is_submitting());
    });
}

#[tokio::test]
async fn dropped_submit_future_settles_as_cancelled() {
    let generator = Arc::new(GatedGenerator::default());
    let service = ready_service(Arc::clone(&generator));

    let abandoned = tokio::time::timeout(Duration::from_millis(50), service.submit()).await;
    assert!(abandoned.is_err(), "generator never answered");
    assert_eq!(generator.calls(), 1);

    service.with_session(|session| {
        assert_eq!(
            session.submission().clone(),
            SubmissionState::failed(SubmissionFailure::Cancelled)
        );
        assert!(!session.steps().is_complete(StepPath::Submit));
    });
    assert!(!service.cancel_submission(), "abort slot was cleared");

    generator.release.notify_one();
    let retry = service.submit().await;
    assert!(matches!(retry, SubmitOutcome::Succeeded { .. }));
    assert_eq!(generator.calls(), 2);
}

#[tokio::test]
async fn report_arriving_after_steps_reopen_is_discarded() {
    let generator = Arc::new(GatedGenerator::default());
    let service = ready_service(Arc::clone(&generator));

    let pending = tokio::spawn({
        let service = Arc::clone(&service);
        async move { service.submit().await }
    });
    generator.started.notified().await;
    service.with_session(|session| session.edit_from(StepPath::Step2));
    generator.release.notify_one();

    let outcome = pending.await.expect("submission task joins");
    assert_eq!(outcome, SubmitOutcome::failed(SubmissionFailure::Cancelled));
    service.with_session(|session| {
        assert!(!session.steps().is_complete(StepPath::Submit));
        assert!(!session.steps().is_complete(StepPath::Step2));
        assert_eq!(
            session.submission().clone(),
            SubmissionState::failed(SubmissionFailure::Cancelled)
        );
    });
}

struct RejectingGenerator;

impl ReportGenerator for RejectingGenerator {
    async fn generate(
        &self,
        _document: FormDocument,
    ) -> Result<ReportDescriptor, ReportGenerationError> {
        Err(ReportGenerationError::Rejected {
            message: "Unable to generate report.".to_string(),
        })
    }
}

#[tokio::test]
async fn generator_rejection_is_surfaced_and_retry_is_allowed() {
    let service = ready_service(Arc::new(RejectingGenerator));

    let outcome = service.submit().await;
    assert_eq!(
        outcome,
        SubmitOutcome::failed(SubmissionFailure::Rejected {
            message: "Unable to generate report.".to_string()
        })
    );

    let retry = service.submit().await;
    assert!(
        !matches!(retry, SubmitOutcome::Ignored),
        "a failed submission does not hold the in-flight guard"
    );
    service.with_session(|session| {
        assert!(!session.steps().is_complete(StepPath::Submit));
    });
}

#[tokio::test]
async fn submitted_document_is_sanitized() {
    struct CapturingGenerator(std::sync::Mutex<Option<FormDocument>>);

    impl ReportGenerator for CapturingGenerator {
        async fn generate(
            &self,
            document: FormDocument,
        ) -> Result<ReportDescriptor, ReportGenerationError> {
            if let Ok(mut slot) = self.0.lock() {
                *slot = Some(document);
            }
            Ok(descriptor())
        }
    }

    let mut document = valid_document();
    document.program_info.institution_name = "  Riverside University  ".to_string();
    document.reporting_window.cohorts[0].notes = Some("   ".to_string());
    let mut session = session_with(&document);
    complete_through(&mut session, StepPath::Submit);
    let generator = Arc::new(CapturingGenerator(std::sync::Mutex::new(None)));
    let service = WizardService::new(session, Arc::clone(&generator));

    service.submit().await;

    let sent = generator
        .0
        .lock()
        .expect("capture lock")
        .clone()
        .expect("generator was called");
    assert_eq!(sent.program_info.institution_name, "Riverside University");
    assert_eq!(sent.reporting_window.cohorts[0].notes, None);
}
