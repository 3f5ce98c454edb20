use std::fmt::Write;

use crate::wizard::calculators::{adjusted_denominator, completion_rate, format_bytes, rate};
use crate::wizard::domain::{Choice, EvidenceAttachment, FormDocument, OutcomeKey};

/// Markdown synopsis of the Standard IV report.
pub fn create_report_synopsis(document: &FormDocument) -> String {
    let mut out = String::new();
    // Writing into a String cannot fail.
    let _ = write_synopsis(&mut out, document);
    out
}

fn write_synopsis(out: &mut String, document: &FormDocument) -> std::fmt::Result {
    let info = &document.program_info;
    let window = &document.reporting_window;
    let evidence = &document.iva_evidence;
    let level = info.program_level;

    writeln!(out, "# CCNE Standard IV Report")?;
    writeln!(out)?;
    writeln!(out, "Institution: {}", info.institution_name)?;
    writeln!(out, "Program: {} ({})", info.program_name, level.label())?;
    writeln!(out, "Accreditation cycle: {}", info.accreditation_cycle)?;
    writeln!(out, "Dean/Director: {}", info.dean_name)?;
    writeln!(out, "Primary contact: {}", info.contact_email)?;
    writeln!(out)?;
    writeln!(
        out,
        "Reporting window: {} ({} to {})",
        window.selection.label(),
        window.start_year,
        window.end_year
    )?;
    writeln!(out)?;

    for (index, cohort) in window.cohorts.iter().enumerate() {
        let licensure = &cohort.licensure;
        let completion = &cohort.completion;
        let employment = &cohort.employment;

        writeln!(out, "## Cohort {}: {}", index + 1, cohort.year)?;
        writeln!(
            out,
            "Licensure: {}/{} ({})",
            licensure.first_time_passes,
            licensure.first_time_candidates,
            rate(
                f64::from(licensure.first_time_passes),
                f64::from(licensure.first_time_candidates)
            )
        )?;
        writeln!(
            out,
            "Completion: {}/{} adjusted to {} ({})",
            completion.numerator,
            completion.denominator,
            adjusted_denominator(completion.denominator, &completion.exclusions),
            completion_rate(completion)
        )?;
        writeln!(
            out,
            "Employment: {}/{} ({}) via {}",
            employment.employed,
            employment.seekers,
            rate(f64::from(employment.employed), f64::from(employment.seekers)),
            employment
                .other_source_label
                .as_deref()
                .unwrap_or(employment.data_source.label())
        )?;
        if !completion.exclusions.is_empty() {
            writeln!(out, "Exclusions:")?;
            for exclusion in &completion.exclusions {
                match &exclusion.note {
                    Some(note) => writeln!(
                        out,
                        "- {}: {} ({note})",
                        exclusion.category.label(),
                        exclusion.count
                    )?,
                    None => writeln!(out, "- {}: {}", exclusion.category.label(), exclusion.count)?,
                }
            }
        }
        if let Some(notes) = &cohort.notes {
            writeln!(out, "Notes: {notes}")?;
        }
        writeln!(out)?;
    }

    writeln!(out, "## Expected Levels of Achievement")?;
    for key in OutcomeKey::ordered() {
        let outcome = document.expected_outcomes.get(key);
        let target = outcome.effective_target(level, key);
        if outcome.use_default {
            writeln!(out, "- {}: {target}% (default)", key.label())?;
        } else {
            writeln!(out, "- {}: {target}% (override)", key.label())?;
            if let Some(rationale) = &outcome.rationale {
                writeln!(out, "  Rationale: {rationale}")?;
            }
        }
    }
    writeln!(out)?;

    writeln!(out, "## IV-A Narrative")?;
    writeln!(out, "{}", evidence.iva_narrative)?;
    writeln!(out)?;
    writeln!(
        out,
        "Certification status: {}",
        evidence.certification_status.label()
    )?;
    if let Some(note) = &evidence.certification_note {
        writeln!(out, "Certification note: {note}")?;
    }
    writeln!(out)?;

    writeln!(out, "## Evidence")?;
    for (heading, items) in [
        ("MEP evidence", &evidence.mep_evidence),
        ("Supporting evidence", &evidence.supporting_evidence),
    ] {
        writeln!(out, "{heading} ({}):", items.len())?;
        for item in items {
            match item {
                EvidenceAttachment::File { name, size, .. } => {
                    writeln!(out, "- {name} ({})", format_bytes(*size))?
                }
                EvidenceAttachment::Link { title, url, .. } => writeln!(out, "- {title} <{url}>")?,
            }
        }
    }

    Ok(())
}
