use crate::infra::{build_wizard, Wizard};
use ccne_report::config::WizardConfig;
use ccne_report::error::AppError;
use ccne_report::report::DEFAULT_REPORT_TTL_SECS;
use ccne_report::wizard::{
    Advance, Choice, DataSource, EvidenceList, ExclusionCategory, FormSession, Node, OutcomeKey,
    Pointer, ReportingWindowId, ReviewSummary, SessionError, StepPath, SubmitOutcome,
    DEFAULT_PERSIST_DEBOUNCE, MAX_COHORTS,
};
use chrono::{Datelike, Local};
use clap::Args;
use std::process::ExitCode;
use std::time::{Duration, Instant};

const DEMO_NARRATIVE: &str = "Faculty review licensure, completion, and employment outcomes \
each term against the expected levels of achievement and record program changes in the \
master evaluation plan.";

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// Number of graduating cohorts to fill in
    #[arg(long, default_value_t = 3, value_parser = clap::value_parser!(u8).range(1..=6))]
    pub(crate) cohorts: u8,
    /// Stop after the review summary without generating a report
    #[arg(long)]
    pub(crate) skip_submit: bool,
    /// Print the generated report synopsis
    #[arg(long)]
    pub(crate) print_report: bool,
}

impl Default for DemoArgs {
    fn default() -> Self {
        Self {
            cohorts: 3,
            skip_submit: false,
            print_report: false,
        }
    }
}

fn demo_config() -> WizardConfig {
    WizardConfig {
        snapshot_dir: None,
        persist_debounce: DEFAULT_PERSIST_DEBOUNCE,
        report_ttl: Duration::from_secs(DEFAULT_REPORT_TTL_SECS),
        remote: None,
    }
}

fn set(session: &mut FormSession, raw: &str, value: impl Into<Node>) -> Result<(), SessionError> {
    session.update_field(&Pointer::parse(raw), value.into(), Instant::now())
}

/// Fills every step with a sample MSN program whose last cohort graduated
/// the year before `current_year`.
pub(crate) fn fill_sample(
    session: &mut FormSession,
    cohorts: usize,
    current_year: i32,
) -> Result<(), SessionError> {
    let cohorts = cohorts.clamp(1, MAX_COHORTS);
    let end_year = current_year - 1;
    let start_year = end_year - (cohorts as i32 - 1);
    let selection = match cohorts {
        3 => ReportingWindowId::Rolling3,
        4 => ReportingWindowId::Rolling4,
        _ => ReportingWindowId::Custom,
    };

    set(session, "programInfo/institutionName", "Lakeshore College")?;
    set(session, "programInfo/programName", "Master of Science in Nursing")?;
    set(session, "programInfo/programLevel", "msn")?;
    set(
        session,
        "programInfo/accreditationCycle",
        format!("{}-{}", current_year, current_year + 5),
    )?;
    set(session, "programInfo/contactEmail", "accreditation@lakeshore.edu")?;
    set(session, "programInfo/deanName", "Dr. Imani Okafor")?;

    set(session, "reportingWindow/selection", selection.value())?;
    set(session, "reportingWindow/startYear", start_year.to_string())?;
    set(session, "reportingWindow/endYear", end_year.to_string())?;
    for _ in 1..cohorts {
        session.add_cohort(Instant::now())?;
    }
    for index in 0..cohorts {
        let offset = index as u32;
        let base = format!("reportingWindow/cohorts/{index}");
        set(session, &format!("{base}/year"), (start_year + index as i32).to_string())?;
        set(session, &format!("{base}/licensure/firstTimeCandidates"), 30 + offset * 2)?;
        set(session, &format!("{base}/licensure/firstTimePasses"), 26 + offset * 2)?;
        set(session, &format!("{base}/completion/numerator"), 33 + offset)?;
        set(session, &format!("{base}/completion/denominator"), 40 + offset)?;
        set(session, &format!("{base}/employment/seekers"), 31 + offset)?;
        set(session, &format!("{base}/employment/employed"), 29 + offset)?;
        set(
            session,
            &format!("{base}/employment/dataSource"),
            DataSource::EmployerSurvey.value(),
        )?;
    }
    session.add_exclusion(0, ExclusionCategory::MilitaryDeployment, Instant::now())?;
    set(session, "reportingWindow/cohorts/0/completion/exclusions/0/count", 2u32)?;

    session.set_ela_override(OutcomeKey::Employment, false, Instant::now())?;
    set(session, "expectedOutcomes/employment/overrideValue", 75u32)?;
    set(
        session,
        "expectedOutcomes/employment/rationale",
        "Regional hiring freeze for advanced practice roles",
    )?;

    set(session, "ivaEvidence/ivaNarrative", DEMO_NARRATIVE)?;
    session.add_file_evidence(
        EvidenceList::MepEvidence,
        "master-evaluation-plan.pdf",
        245_760,
        None,
        Instant::now(),
    )?;
    session.add_file_evidence(
        EvidenceList::SupportingEvidence,
        "faculty-minutes.docx",
        38_912,
        None,
        Instant::now(),
    )?;
    session.add_link_evidence(
        EvidenceList::SupportingEvidence,
        "Outcomes dashboard",
        "https://lakeshore.edu/nursing/outcomes",
        Instant::now(),
    )?;
    Ok(())
}

/// Walks the steps before submit; returns false at the first blocked step.
fn walk_steps(service: &Wizard) -> Result<bool, SessionError> {
    println!("\nStep progress");
    for step in StepPath::ordered() {
        if step == StepPath::Submit {
            break;
        }
        match service.with_session(|session| session.advance(step))? {
            Advance::Advanced { .. } => println!("- {}: complete", step.label()),
            Advance::Blocked { validation } => {
                println!("- {}: blocked", step.label());
                for issue in &validation.issues {
                    println!("    {}: {}", issue.pointer, issue.message);
                }
                return Ok(false);
            }
        }
    }
    Ok(true)
}

fn render_review(review: &ReviewSummary) {
    let program = &review.program;
    println!("\nReview");
    println!(
        "{} / {} ({})",
        program.institution, program.program, program.program_level
    );
    println!(
        "Reporting window: {} ({} to {})",
        review.window.selection, review.window.start_year, review.window.end_year
    );
    for cohort in &review.window.cohorts {
        println!(
            "- {}: licensure {} | completion {} (adjusted denominator {}) | employment {}",
            cohort.year,
            cohort.licensure.rate,
            cohort.completion.rate,
            cohort.completion.adjusted_denominator,
            cohort.employment.rate
        );
    }
    println!("Expected levels of achievement");
    for outcome in &review.outcomes {
        let source = if outcome.using_default {
            "default"
        } else {
            "override"
        };
        println!("- {}: {}% ({source})", outcome.label, outcome.selected_ela);
    }
    println!(
        "Evidence: {} MEP file(s), {} supporting item(s), {} uploaded",
        review.evidence.mep_evidence.len(),
        review.evidence.supporting_evidence.len(),
        review.evidence.total_upload_size
    );
}

pub(crate) async fn run_demo(args: DemoArgs) -> Result<ExitCode, AppError> {
    let DemoArgs {
        cohorts,
        skip_submit,
        print_report,
    } = args;

    println!("CCNE Standard IV report wizard demo");
    let stack = build_wizard(&demo_config());
    let current_year = Local::now().year();
    stack
        .service
        .with_session(|session| fill_sample(session, usize::from(cohorts), current_year))?;

    if !walk_steps(&stack.service)? {
        return Ok(ExitCode::FAILURE);
    }

    match stack.service.with_session(|session| session.review()) {
        Ok(review) => render_review(&review),
        Err(issues) => {
            println!("\nReview found {} issue(s)", issues.len());
            for issue in &issues {
                println!("- {}: {}", issue.pointer, issue.message);
            }
            return Ok(ExitCode::FAILURE);
        }
    }

    if skip_submit {
        return Ok(ExitCode::SUCCESS);
    }

    println!("\nSubmitting");
    let report = match stack.service.submit().await {
        SubmitOutcome::Succeeded { report } => report,
        SubmitOutcome::Failed { message, .. } => {
            println!("Submission failed: {message}");
            return Ok(ExitCode::FAILURE);
        }
        SubmitOutcome::Ignored => {
            println!("Submission already in progress");
            return Ok(ExitCode::FAILURE);
        }
    };
    println!("Report ready: {} ({})", report.report_url, report.filename);
    if let Some(expires_at) = report.expires_at {
        println!(
            "Link expires at {}",
            expires_at.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S")
        );
    }

    if print_report {
        let token = report.report_url.rsplit('/').next().unwrap_or_default();
        match stack.generator.store().get(token) {
            Some(artifact) => println!("\n{}", String::from_utf8_lossy(&artifact.bytes)),
            None => println!("Report link expired before it could be printed"),
        }
    }

    Ok(ExitCode::SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ccne_report::wizard::SubmissionState;

    #[test]
    fn sample_fills_every_step_for_each_window_size() {
        for cohorts in [1, 3, 4, MAX_COHORTS] {
            let mut session = FormSession::new(None, DEFAULT_PERSIST_DEBOUNCE);
            fill_sample(&mut session, cohorts, 2025).expect("sample fields apply");

            let document = session.typed_document().expect("typed document");
            assert_eq!(document.reporting_window.cohorts.len(), cohorts);
            assert_eq!(document.reporting_window.end_year, "2024");
            for step in StepPath::ordered() {
                if step == StepPath::Submit {
                    break;
                }
                assert!(
                    matches!(session.advance(step), Ok(Advance::Advanced { .. })),
                    "{step:?} should advance with {cohorts} cohorts"
                );
            }
        }
    }

    #[test]
    fn sample_window_matches_rolling_selection() {
        let mut session = FormSession::new(None, DEFAULT_PERSIST_DEBOUNCE);
        fill_sample(&mut session, 4, 2025).expect("sample fields apply");
        let window = session.typed_document().expect("typed").reporting_window;
        assert_eq!(window.selection, ReportingWindowId::Rolling4);
        assert_eq!(window.start_year, "2021");
        assert_eq!(window.cohorts[0].completion.exclusions.len(), 1);
    }

    #[tokio::test]
    async fn demo_submits_and_stores_a_report() {
        let stack = build_wizard(&demo_config());
        stack
            .service
            .with_session(|session| fill_sample(session, 3, 2025))
            .expect("sample fields apply");
        assert!(walk_steps(&stack.service).expect("steps reachable"));

        let outcome = stack.service.submit().await;
        assert!(matches!(outcome, SubmitOutcome::Succeeded { .. }));
        assert_eq!(stack.generator.store().len(), 1);
        let state = stack
            .service
            .with_session(|session| session.submission().clone());
        assert!(matches!(state, SubmissionState::Succeeded { .. }));
    }
}
