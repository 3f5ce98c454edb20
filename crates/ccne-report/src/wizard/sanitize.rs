use super::domain::{EvidenceAttachment, FormDocument};

fn trim(value: &mut String) {
    let trimmed = value.trim();
    if trimmed.len() != value.len() {
        *value = trimmed.to_string();
    }
}

/// Blank optional text collapses to `None`.
fn trim_optional(value: &mut Option<String>) {
    if let Some(text) = value {
        trim(text);
        if text.is_empty() {
            *value = None;
        }
    }
}

/// Copy of `document` with every free-text field trimmed, ready to leave the session.
pub fn sanitize_for_submission(document: &FormDocument) -> FormDocument {
    let mut clean = document.clone();

    let info = &mut clean.program_info;
    trim(&mut info.institution_name);
    trim(&mut info.program_name);
    trim(&mut info.accreditation_cycle);
    trim(&mut info.contact_email);
    trim(&mut info.dean_name);

    let window = &mut clean.reporting_window;
    trim(&mut window.start_year);
    trim(&mut window.end_year);
    for cohort in &mut window.cohorts {
        trim(&mut cohort.year);
        trim_optional(&mut cohort.notes);
        for exclusion in &mut cohort.completion.exclusions {
            trim_optional(&mut exclusion.note);
        }
        trim_optional(&mut cohort.employment.other_source_label);
    }

    for outcome in [
        &mut clean.expected_outcomes.licensure,
        &mut clean.expected_outcomes.completion,
        &mut clean.expected_outcomes.employment,
    ] {
        trim_optional(&mut outcome.rationale);
    }

    let evidence = &mut clean.iva_evidence;
    trim_optional(&mut evidence.certification_note);
    trim(&mut evidence.iva_narrative);
    for attachment in evidence
        .mep_evidence
        .iter_mut()
        .chain(evidence.supporting_evidence.iter_mut())
    {
        match attachment {
            EvidenceAttachment::File { name, .. } => trim(name),
            EvidenceAttachment::Link { title, url, .. } => {
                trim(title);
                trim(url);
            }
        }
    }

    clean
}
