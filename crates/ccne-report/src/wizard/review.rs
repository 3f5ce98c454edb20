use serde::Serialize;

use super::calculators::{adjusted_denominator, completion_rate, format_bytes, rate};
use super::domain::{
    Choice, Cohort, Completion, EvidenceAttachment, Exclusion, ExclusionCategory, FormDocument,
    OutcomeKey,
};
use super::pointer::Node;
use super::steps::StepPath;
use super::validation::coerce_number;

const MISSING: &str = "—";

#[derive(Debug, Clone, Serialize)]
pub struct ReviewSummary {
    pub program: ProgramSummary,
    pub window: WindowSummary,
    pub outcomes: Vec<OutcomeSummary>,
    pub evidence: EvidenceSummary,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProgramSummary {
    pub edit_path: &'static str,
    pub institution: String,
    pub program: String,
    pub program_level: String,
    pub accreditation_cycle: String,
    pub dean_name: String,
    pub contact_email: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct WindowSummary {
    pub edit_path: &'static str,
    pub selection: String,
    pub start_year: String,
    pub end_year: String,
    pub cohorts: Vec<CohortSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RatioSummary {
    pub numerator: u32,
    pub denominator: u32,
    pub rate: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CompletionSummary {
    pub numerator: u32,
    pub denominator: u32,
    pub adjusted_denominator: u32,
    pub rate: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExclusionSummary {
    pub category: ExclusionCategory,
    pub category_label: &'static str,
    pub count: u32,
    pub note: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CohortSummary {
    pub id: String,
    pub year: String,
    pub notes: Option<String>,
    pub licensure: RatioSummary,
    pub completion: CompletionSummary,
    pub employment: RatioSummary,
    pub employment_source: String,
    pub exclusions: Vec<ExclusionSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OutcomeSummary {
    pub key: OutcomeKey,
    pub label: &'static str,
    pub using_default: bool,
    pub default_ela: u8,
    pub selected_ela: f64,
    pub rationale: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AttachmentSummary {
    pub id: String,
    pub kind: &'static str,
    pub name: String,
    /// Formatted size for files, URL for links.
    pub detail: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct EvidenceSummary {
    pub edit_path: &'static str,
    pub certification_status: String,
    pub certification_note: Option<String>,
    pub narrative: String,
    pub mep_evidence: Vec<AttachmentSummary>,
    pub supporting_evidence: Vec<AttachmentSummary>,
    pub total_upload_size: String,
}

fn or_missing(value: &str) -> String {
    if value.trim().is_empty() {
        MISSING.to_string()
    } else {
        value.to_string()
    }
}

fn ratio(numerator: u32, denominator: u32) -> RatioSummary {
    RatioSummary {
        numerator,
        denominator,
        rate: rate(f64::from(numerator), f64::from(denominator)),
    }
}

fn exclusion_summary(exclusion: &Exclusion) -> ExclusionSummary {
    ExclusionSummary {
        category: exclusion.category,
        category_label: exclusion.category.label(),
        count: exclusion.count,
        note: exclusion.note.clone(),
    }
}

fn cohort_summary(cohort: &Cohort) -> CohortSummary {
    let completion = &cohort.completion;
    let employment = &cohort.employment;
    let employment_source = match &employment.other_source_label {
        Some(label) => format!("{} ({label})", employment.data_source.label()),
        None => employment.data_source.label().to_string(),
    };

    CohortSummary {
        id: cohort.id.clone(),
        year: or_missing(&cohort.year),
        notes: cohort.notes.clone(),
        licensure: ratio(
            cohort.licensure.first_time_passes,
            cohort.licensure.first_time_candidates,
        ),
        completion: CompletionSummary {
            numerator: completion.numerator,
            denominator: completion.denominator,
            adjusted_denominator: adjusted_denominator(
                completion.denominator,
                &completion.exclusions,
            ),
            rate: completion_rate(completion),
        },
        employment: ratio(employment.employed, employment.seekers),
        employment_source,
        exclusions: completion.exclusions.iter().map(exclusion_summary).collect(),
    }
}

fn attachment_summary(attachment: &EvidenceAttachment) -> AttachmentSummary {
    match attachment {
        EvidenceAttachment::File { id, name, size, .. } => AttachmentSummary {
            id: id.clone(),
            kind: "file",
            name: name.clone(),
            detail: format_bytes(*size),
        },
        EvidenceAttachment::Link { id, title, url } => AttachmentSummary {
            id: id.clone(),
            kind: "link",
            name: title.clone(),
            detail: url.clone(),
        },
    }
}

impl ReviewSummary {
    pub fn build(document: &FormDocument) -> Self {
        let info = &document.program_info;
        let window = &document.reporting_window;
        let evidence = &document.iva_evidence;
        let level = info.program_level;

        let outcomes = OutcomeKey::ordered()
            .into_iter()
            .map(|key| {
                let outcome = document.expected_outcomes.get(key);
                OutcomeSummary {
                    key,
                    label: key.label(),
                    using_default: outcome.use_default,
                    default_ela: level.default_ela(key),
                    selected_ela: outcome.effective_target(level, key),
                    rationale: outcome.rationale.clone().filter(|_| !outcome.use_default),
                }
            })
            .collect();

        let total_upload_size: u64 = evidence
            .mep_evidence
            .iter()
            .chain(evidence.supporting_evidence.iter())
            .map(EvidenceAttachment::byte_size)
            .sum();

        Self {
            program: ProgramSummary {
                edit_path: StepPath::Step1.route(),
                institution: or_missing(&info.institution_name),
                program: or_missing(&info.program_name),
                program_level: level.label().to_string(),
                accreditation_cycle: or_missing(&info.accreditation_cycle),
                dean_name: or_missing(&info.dean_name),
                contact_email: or_missing(&info.contact_email),
            },
            window: WindowSummary {
                edit_path: StepPath::Step2.route(),
                selection: window.selection.label().to_string(),
                start_year: or_missing(&window.start_year),
                end_year: or_missing(&window.end_year),
                cohorts: window.cohorts.iter().map(cohort_summary).collect(),
            },
            outcomes,
            evidence: EvidenceSummary {
                edit_path: StepPath::Step4.route(),
                certification_status: evidence.certification_status.label().to_string(),
                certification_note: evidence.certification_note.clone(),
                narrative: or_missing(&evidence.iva_narrative),
                mep_evidence: evidence.mep_evidence.iter().map(attachment_summary).collect(),
                supporting_evidence: evidence
                    .supporting_evidence
                    .iter()
                    .map(attachment_summary)
                    .collect(),
                total_upload_size: format_bytes(total_upload_size),
            },
        }
    }
}

/// Rates shown next to a cohort while it is being edited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CohortRates {
    pub index: usize,
    pub licensure: String,
    pub completion: String,
    pub adjusted_denominator: u32,
    pub employment: String,
}

fn lenient_count(node: Option<&Node>) -> u32 {
    let number = coerce_number(node);
    if number <= 0.0 {
        0
    } else {
        number.min(f64::from(u32::MAX)) as u32
    }
}

fn count_at(node: &Node, section: &str, key: &str) -> u32 {
    lenient_count(node.field(section).and_then(|section| section.field(key)))
}

/// Computes live rates from the raw reporting-window slice, reading
/// unfinished input the same way validation does.
pub fn live_cohort_rates(window: &Node) -> Vec<CohortRates> {
    let cohorts = window
        .field("cohorts")
        .and_then(Node::as_array)
        .unwrap_or_default();

    cohorts
        .iter()
        .enumerate()
        .map(|(index, cohort)| {
            let exclusions: Vec<Exclusion> = cohort
                .field("completion")
                .and_then(|completion| completion.field("exclusions"))
                .and_then(Node::as_array)
                .unwrap_or_default()
                .iter()
                .map(|exclusion| Exclusion {
                    category: exclusion
                        .field("category")
                        .and_then(Node::as_str)
                        .and_then(ExclusionCategory::from_value)
                        .unwrap_or(ExclusionCategory::Other),
                    count: lenient_count(exclusion.field("count")),
                    note: None,
                })
                .collect();
            let completion = Completion {
                numerator: count_at(cohort, "completion", "numerator"),
                denominator: count_at(cohort, "completion", "denominator"),
                exclusions,
            };
            CohortRates {
                index,
                licensure: rate(
                    f64::from(count_at(cohort, "licensure", "firstTimePasses")),
                    f64::from(count_at(cohort, "licensure", "firstTimeCandidates")),
                ),
                completion: completion_rate(&completion),
                adjusted_denominator: adjusted_denominator(
                    completion.denominator,
                    &completion.exclusions,
                ),
                employment: rate(
                    f64::from(count_at(cohort, "employment", "employed")),
                    f64::from(count_at(cohort, "employment", "seekers")),
                ),
            }
        })
        .collect()
}
