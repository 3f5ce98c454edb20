use serde_json::json;

use super::common::*;
use crate::wizard::pointer::Node;
use crate::wizard::validation::{
    validate_completion, validate_exclusion, validate_expected_outcomes, validate_form_document,
    validate_iva_evidence, validate_licensure, validate_program_info, validate_reporting_window,
    Issue,
};

fn node(value: serde_json::Value) -> Node {
    Node::from(value)
}

fn messages_at(issues: &[Issue], path: &str) -> Vec<String> {
    issues
        .iter()
        .filter(|issue| issue.path.to_string() == path)
        .map(|issue| issue.message.clone())
        .collect()
}

#[test]
fn fixture_document_validates() {
    let document = valid_document();
    let validated = validate_form_document(&Node::from_serialize(&document).expect("serializes"))
        .expect("fixture is valid");
    assert_eq!(validated, document);
}

#[test]
fn numerator_above_denominator_is_reported_on_numerator() {
    let issues = validate_completion(&node(json!({ "numerator": 10, "denominator": 5 })))
        .expect_err("numerator exceeds denominator");
    assert_eq!(
        messages_at(&issues, "numerator"),
        vec!["Numerator cannot exceed denominator".to_string()]
    );
}

#[test]
fn zero_denominator_must_be_positive() {
    let issues =
        validate_completion(&node(json!({ "denominator": 0 }))).expect_err("zero denominator");
    assert_eq!(
        messages_at(&issues, "denominator"),
        vec!["Denominator must be greater than zero".to_string()]
    );
}

#[test]
fn exclusion_total_cannot_exceed_denominator() {
    let issues = validate_completion(&node(json!({
        "denominator": 100,
        "exclusions": [
            { "category": "military_deployment", "count": 60 },
            { "category": "death", "count": 50 }
        ]
    })))
    .expect_err("exclusions exceed denominator");
    assert_eq!(
        messages_at(&issues, "exclusions"),
        vec!["Exclusions (110) cannot exceed the denominator (100)".to_string()]
    );
}

#[test]
fn other_exclusion_requires_a_note() {
    let issues = validate_exclusion(&node(json!({ "category": "other", "count": 2 })))
        .expect_err("note missing");
    assert_eq!(
        messages_at(&issues, "note"),
        vec!["Describe the reason for this exclusion".to_string()]
    );

    let blank = validate_exclusion(&node(json!({ "category": "other", "count": 2, "note": "  " })));
    assert!(blank.is_err(), "blank note counts as missing");

    let exclusion = validate_exclusion(&node(json!({
        "category": "other",
        "count": 2,
        "note": "Transferred to partner campus"
    })))
    .expect("note clears the issue");
    assert_eq!(exclusion.note.as_deref(), Some("Transferred to partner campus"));
}

#[test]
fn numeric_input_is_coerced_leniently() {
    let licensure = validate_licensure(&node(json!({
        "firstTimeCandidates": "12",
        "firstTimePasses": ""
    })))
    .expect("string digits are accepted");
    assert_eq!(licensure.first_time_candidates, 12);
    assert_eq!(licensure.first_time_passes, 0);

    let issues = validate_licensure(&node(json!({
        "firstTimeCandidates": 4,
        "firstTimePasses": 2.5
    })))
    .expect_err("fractional count");
    assert_eq!(
        messages_at(&issues, "firstTimePasses"),
        vec!["First-time passes must be a whole number".to_string()]
    );

    let issues = validate_licensure(&node(json!({ "firstTimeCandidates": -3 })))
        .expect_err("negative count");
    assert_eq!(
        messages_at(&issues, "firstTimeCandidates"),
        vec!["First-time candidates cannot be negative".to_string()]
    );
}

#[test]
fn cross_field_checks_wait_for_a_valid_shape() {
    let issues = validate_licensure(&node(json!({
        "firstTimeCandidates": 0,
        "firstTimePasses": 5
    })))
    .expect_err("candidates missing");
    assert!(messages_at(&issues, "firstTimePasses").is_empty());
    assert_eq!(issues.len(), 1);
}

#[test]
fn program_info_reports_each_missing_field() {
    let issues = validate_program_info(&node(json!({
        "institutionName": "   ",
        "programLevel": "phd",
        "contactEmail": "dean@"
    })))
    .expect_err("incomplete program info");

    assert_eq!(
        messages_at(&issues, "institutionName"),
        vec!["Institution name is required".to_string()]
    );
    assert_eq!(
        messages_at(&issues, "programLevel"),
        vec!["Program level must be one of: bsn, msn, post_msn, dnp".to_string()]
    );
    assert_eq!(
        messages_at(&issues, "contactEmail"),
        vec!["Valid email required".to_string()]
    );
    assert!(!messages_at(&issues, "deanName").is_empty());
}

#[test]
fn reporting_window_checks_year_order_and_duplicate_cohorts() {
    let mut window = valid_document().reporting_window;
    window.start_year = "2024".to_string();
    window.end_year = "2022".to_string();
    window.cohorts[1].year = " 2021 ".to_string();

    let issues = validate_reporting_window(&Node::from_serialize(&window).expect("serializes"))
        .expect_err("window is inconsistent");

    assert_eq!(
        messages_at(&issues, "endYear"),
        vec!["End year must be on or after the start year".to_string()]
    );
    assert_eq!(
        messages_at(&issues, "cohorts/1/year"),
        vec!["Cohort year 2021 appears more than once".to_string()]
    );
}

#[test]
fn nested_cohort_issues_carry_full_paths() {
    let mut window = valid_document().reporting_window;
    window.cohorts[2].employment.employed = 60;

    let issues = validate_reporting_window(&Node::from_serialize(&window).expect("serializes"))
        .expect_err("employed exceeds seekers");

    assert_eq!(
        messages_at(&issues, "cohorts/2/employment/employed"),
        vec!["Employed graduates cannot exceed graduates seeking employment".to_string()]
    );
}

#[test]
fn override_requires_value_and_rationale() {
    let issues = validate_expected_outcomes(&node(json!({
        "licensure": { "useDefault": false, "overrideValue": null },
        "completion": { "useDefault": true },
        "employment": { "useDefault": false, "overrideValue": 140, "rationale": "x" }
    })))
    .expect_err("override incomplete");

    assert_eq!(
        messages_at(&issues, "licensure/overrideValue"),
        vec!["Enter an override percentage".to_string()]
    );
    assert_eq!(
        messages_at(&issues, "licensure/rationale"),
        vec!["Explain why the default is overridden".to_string()]
    );
    assert_eq!(
        messages_at(&issues, "employment/overrideValue"),
        vec!["Must be between 0 and 100".to_string()]
    );
    assert!(messages_at(&issues, "completion/overrideValue").is_empty());
}

#[test]
fn mep_evidence_rejects_links_and_short_narratives() {
    let mut evidence = valid_document().iva_evidence;
    evidence.iva_narrative = "Too short.".to_string();
    evidence.mep_evidence = vec![crate::wizard::EvidenceAttachment::link(
        "Plan",
        "https://riverside.edu/plan",
    )];
    evidence.supporting_evidence = Vec::new();

    let issues = validate_iva_evidence(&Node::from_serialize(&evidence).expect("serializes"))
        .expect_err("evidence incomplete");

    assert_eq!(
        messages_at(&issues, "ivaNarrative"),
        vec!["Narrative must be at least 100 characters".to_string()]
    );
    assert_eq!(
        messages_at(&issues, "supportingEvidence"),
        vec!["Add at least one supporting evidence item".to_string()]
    );

    let mut evidence = valid_document().iva_evidence;
    evidence.mep_evidence = vec![crate::wizard::EvidenceAttachment::link(
        "Plan",
        "https://riverside.edu/plan",
    )];
    let issues = validate_iva_evidence(&Node::from_serialize(&evidence).expect("serializes"))
        .expect_err("link in mep list");
    assert_eq!(
        messages_at(&issues, "mepEvidence/0"),
        vec!["MEP evidence must be an uploaded file".to_string()]
    );
}

#[test]
fn links_need_http_urls() {
    let mut evidence = valid_document().iva_evidence;
    evidence.supporting_evidence = vec![crate::wizard::EvidenceAttachment::link(
        "Shared drive",
        "ftp://files.riverside.edu",
    )];
    let issues = validate_iva_evidence(&Node::from_serialize(&evidence).expect("serializes"))
        .expect_err("ftp link");
    assert_eq!(
        messages_at(&issues, "supportingEvidence/0/url"),
        vec!["Enter a valid http(s) URL".to_string()]
    );
}
