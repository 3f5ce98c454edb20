use std::collections::HashSet;

use super::{is_http_url, normalized_text, refine, Issue, ListBounds, Outcome, Scope};
use crate::wizard::domain::{
    CertificationStatus, Cohort, Completion, DataSource, ElaOverride, Employment,
    EvidenceAttachment, Exclusion, ExclusionCategory, ExpectedOutcomes, FormDocument, IvaEvidence,
    Licensure, OutcomeKey, ProgramInfo, ProgramLevel, ReportingWindow, ReportingWindowId, Slice,
    MAX_COHORTS, MAX_SUPPORTING_EVIDENCE, MIN_NARRATIVE_LENGTH,
};
use crate::wizard::pointer::{Node, Pointer};

/// Validates the slice owned by one step, discarding the typed value.
pub fn validate_slice(slice: Slice, node: &Node) -> Outcome<()> {
    match slice {
        Slice::ProgramInfo => validate_program_info(node).map(drop),
        Slice::ReportingWindow => validate_reporting_window(node).map(drop),
        Slice::ExpectedOutcomes => validate_expected_outcomes(node).map(drop),
        Slice::IvaEvidence => validate_iva_evidence(node).map(drop),
    }
}

pub fn validate_form_document(node: &Node) -> Outcome<FormDocument> {
    let mut scope = Scope::new(node);
    let program_info = scope.nested(Slice::ProgramInfo.key(), validate_program_info);
    let reporting_window = scope.nested(Slice::ReportingWindow.key(), validate_reporting_window);
    let expected_outcomes = scope.nested(Slice::ExpectedOutcomes.key(), validate_expected_outcomes);
    let iva_evidence = scope.nested(Slice::IvaEvidence.key(), validate_iva_evidence);
    scope.finish(|| {
        Some(FormDocument {
            program_info: program_info?,
            reporting_window: reporting_window?,
            expected_outcomes: expected_outcomes?,
            iva_evidence: iva_evidence?,
        })
    })
}

pub fn validate_program_info(node: &Node) -> Outcome<ProgramInfo> {
    let mut scope = Scope::new(node);
    let institution_name = scope.required_text("institutionName", "Institution name is required");
    let program_name = scope.required_text("programName", "Program name is required");
    let program_level = scope.choice::<ProgramLevel>("programLevel", "Program level");
    let accreditation_cycle =
        scope.required_text("accreditationCycle", "Accreditation cycle is required");
    let contact_email = scope.email("contactEmail", "Valid email required");
    let dean_name = scope.required_text("deanName", "Dean or director name is required");
    scope.finish(|| {
        Some(ProgramInfo {
            institution_name,
            program_name,
            program_level: program_level?,
            accreditation_cycle,
            contact_email,
            dean_name,
        })
    })
}

pub fn validate_reporting_window(node: &Node) -> Outcome<ReportingWindow> {
    let mut scope = Scope::new(node);
    let selection = scope.choice::<ReportingWindowId>("selection", "Reporting window");
    let start_year = scope.year("startYear", "Start year must be a 4-digit year");
    let end_year = scope.year("endYear", "End year must be a 4-digit year");
    let cohorts = scope.list(
        "cohorts",
        ListBounds::between(
            1,
            MAX_COHORTS,
            "Add at least one cohort",
            "A reporting window holds at most 6 cohorts",
        ),
        validate_cohort,
    );
    let shaped = scope.finish(|| {
        Some(ReportingWindow {
            selection: selection?,
            start_year,
            end_year,
            cohorts,
        })
    });

    refine(shaped, |window, issues| {
        let start = window.start_year.trim().parse::<u16>().unwrap_or_default();
        let end = window.end_year.trim().parse::<u16>().unwrap_or_default();
        if start > end {
            issues.push(Issue::at(
                "endYear",
                "End year must be on or after the start year",
            ));
        }

        let mut seen = HashSet::new();
        for (index, cohort) in window.cohorts.iter().enumerate() {
            if !seen.insert(normalized_text(&cohort.year)) {
                issues.push(Issue::new(
                    Pointer::root().key("cohorts").index(index).key("year"),
                    format!("Cohort year {} appears more than once", cohort.year.trim()),
                ));
            }
        }
    })
}

pub fn validate_cohort(node: &Node) -> Outcome<Cohort> {
    let mut scope = Scope::new(node);
    let id = scope.required_text("id", "Cohort id is missing");
    let year = scope.year("year", "Cohort year must be a 4-digit year");
    let notes = scope.optional_text("notes");
    let licensure = scope.nested("licensure", validate_licensure);
    let completion = scope.nested("completion", validate_completion);
    let employment = scope.nested("employment", validate_employment);
    scope.finish(|| {
        Some(Cohort {
            id,
            year,
            notes,
            licensure: licensure?,
            completion: completion?,
            employment: employment?,
        })
    })
}

pub fn validate_licensure(node: &Node) -> Outcome<Licensure> {
    let mut scope = Scope::new(node);
    let first_time_candidates =
        scope.positive_count("firstTimeCandidates", "First-time candidates");
    let first_time_passes = scope.count("firstTimePasses", "First-time passes");
    let shaped = scope.finish(|| {
        Some(Licensure {
            first_time_candidates,
            first_time_passes,
        })
    });

    refine(shaped, |licensure, issues| {
        if licensure.first_time_passes > licensure.first_time_candidates {
            issues.push(Issue::at(
                "firstTimePasses",
                "Passes cannot exceed first-time candidates",
            ));
        }
    })
}

pub fn validate_completion(node: &Node) -> Outcome<Completion> {
    let mut scope = Scope::new(node);
    let numerator = scope.count("numerator", "Numerator");
    let denominator = scope.positive_count("denominator", "Denominator");
    let exclusions = scope.list("exclusions", ListBounds::any(), validate_exclusion);
    let shaped = scope.finish(|| {
        Some(Completion {
            numerator,
            denominator,
            exclusions,
        })
    });

    refine(shaped, |completion, issues| {
        if completion.numerator > completion.denominator {
            issues.push(Issue::at("numerator", "Numerator cannot exceed denominator"));
        }
        let excluded: u64 = completion
            .exclusions
            .iter()
            .map(|exclusion| u64::from(exclusion.count))
            .sum();
        if excluded > u64::from(completion.denominator) {
            issues.push(Issue::at(
                "exclusions",
                format!(
                    "Exclusions ({excluded}) cannot exceed the denominator ({})",
                    completion.denominator
                ),
            ));
        }
    })
}

pub fn validate_exclusion(node: &Node) -> Outcome<Exclusion> {
    let mut scope = Scope::new(node);
    let category = scope.choice::<ExclusionCategory>("category", "Exclusion category");
    let count = scope.count("count", "Exclusion count");
    let note = scope.optional_text("note");
    let shaped = scope.finish(|| {
        Some(Exclusion {
            category: category?,
            count,
            note,
        })
    });

    refine(shaped, |exclusion, issues| {
        if exclusion.category == ExclusionCategory::Other && exclusion.note.is_none() {
            issues.push(Issue::at("note", "Describe the reason for this exclusion"));
        }
    })
}

pub fn validate_employment(node: &Node) -> Outcome<Employment> {
    let mut scope = Scope::new(node);
    let seekers = scope.positive_count("seekers", "Graduates seeking employment");
    let employed = scope.count("employed", "Employed graduates");
    let data_source = scope.choice::<DataSource>("dataSource", "Data source");
    let other_source_label = scope.optional_text("otherSourceLabel");
    let shaped = scope.finish(|| {
        Some(Employment {
            seekers,
            employed,
            data_source: data_source?,
            other_source_label,
        })
    });

    refine(shaped, |employment, issues| {
        if employment.employed > employment.seekers {
            issues.push(Issue::at(
                "employed",
                "Employed graduates cannot exceed graduates seeking employment",
            ));
        }
        if employment.data_source == DataSource::Other && employment.other_source_label.is_none() {
            issues.push(Issue::at("otherSourceLabel", "Name the data source"));
        }
    })
}

pub fn validate_expected_outcomes(node: &Node) -> Outcome<ExpectedOutcomes> {
    let mut scope = Scope::new(node);
    let [licensure, completion, employment] =
        OutcomeKey::ordered().map(|key| scope.nested(key.key(), validate_ela_override));
    scope.finish(|| {
        Some(ExpectedOutcomes {
            licensure: licensure?,
            completion: completion?,
            employment: employment?,
        })
    })
}

pub fn validate_ela_override(node: &Node) -> Outcome<ElaOverride> {
    let mut scope = Scope::new(node);
    let use_default = scope.flag("useDefault", true);
    let override_value = scope.optional_number_in_range("overrideValue", 0.0, 100.0);
    let rationale = scope.optional_text("rationale");
    let shaped = scope.finish(|| {
        Some(ElaOverride {
            use_default,
            override_value,
            rationale,
        })
    });

    refine(shaped, |outcome, issues| {
        if outcome.use_default {
            return;
        }
        if outcome.override_value.is_none() {
            issues.push(Issue::at("overrideValue", "Enter an override percentage"));
        }
        if outcome.rationale.is_none() {
            issues.push(Issue::at("rationale", "Explain why the default is overridden"));
        }
    })
}

pub fn validate_iva_evidence(node: &Node) -> Outcome<IvaEvidence> {
    let mut scope = Scope::new(node);
    let certification_status =
        scope.choice::<CertificationStatus>("certificationStatus", "Certification status");
    let certification_note = scope.optional_text("certificationNote");
    let iva_narrative = scope.text_min_length(
        "ivaNarrative",
        MIN_NARRATIVE_LENGTH,
        "Narrative must be at least 100 characters",
    );
    let mep_evidence = scope.list(
        "mepEvidence",
        ListBounds::at_least(1, "Upload at least one MEP evidence file"),
        validate_attachment,
    );
    let supporting_evidence = scope.list(
        "supportingEvidence",
        ListBounds::between(
            1,
            MAX_SUPPORTING_EVIDENCE,
            "Add at least one supporting evidence item",
            "Supporting evidence is limited to 12 items",
        ),
        validate_attachment,
    );
    let shaped = scope.finish(|| {
        Some(IvaEvidence {
            certification_status: certification_status?,
            certification_note,
            iva_narrative,
            mep_evidence,
            supporting_evidence,
        })
    });

    refine(shaped, |evidence, issues| {
        if evidence.certification_status == CertificationStatus::NotApplicable
            && evidence.certification_note.is_none()
        {
            issues.push(Issue::at(
                "certificationNote",
                "Explain why certification is not applicable",
            ));
        }
        for (index, attachment) in evidence.mep_evidence.iter().enumerate() {
            if let EvidenceAttachment::Link { .. } = attachment {
                issues.push(Issue::new(
                    Pointer::root().key("mepEvidence").index(index),
                    "MEP evidence must be an uploaded file",
                ));
            }
        }
    })
}

pub fn validate_attachment(node: &Node) -> Outcome<EvidenceAttachment> {
    let mut scope = Scope::new(node);
    let kind = scope.text("kind");
    let id = scope.required_text("id", "Attachment id is missing");
    match kind.as_str() {
        "file" => {
            let name = scope.required_text("name", "File name is required");
            let size = scope.whole_number("size", "File size", u64::MAX);
            let mime_type = scope.optional_text("type");
            scope.finish(|| {
                Some(EvidenceAttachment::File {
                    id,
                    name,
                    size,
                    mime_type,
                })
            })
        }
        "link" => {
            let title = scope.required_text("title", "Link title is required");
            let url = scope.text("url");
            if !is_http_url(url.trim()) {
                scope.issue("url", "Enter a valid http(s) URL");
            }
            scope.finish(|| Some(EvidenceAttachment::Link { id, title, url }))
        }
        _ => {
            scope.issue("kind", "Attachment must be a file or a link");
            scope.finish(|| None)
        }
    }
}
