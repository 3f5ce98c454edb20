use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const MAX_COHORTS: usize = 6;
pub const MAX_SUPPORTING_EVIDENCE: usize = 12;
pub const MIN_NARRATIVE_LENGTH: usize = 100;

/// Closed option list validated by membership.
pub trait Choice: Sized + Copy + 'static {
    fn options() -> &'static [Self];
    fn value(self) -> &'static str;
    fn label(self) -> &'static str;

    fn from_value(raw: &str) -> Option<Self> {
        Self::options()
            .iter()
            .copied()
            .find(|option| option.value() == raw)
    }

    fn allowed_values() -> String {
        Self::options()
            .iter()
            .map(|option| option.value())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgramLevel {
    #[default]
    Bsn,
    Msn,
    PostMsn,
    Dnp,
}

impl ProgramLevel {
    pub const fn ordered() -> [Self; 4] {
        [Self::Bsn, Self::Msn, Self::PostMsn, Self::Dnp]
    }

    /// Default expected level of achievement (percent) for an outcome.
    pub const fn default_ela(self, outcome: OutcomeKey) -> u8 {
        match (self, outcome) {
            (Self::Bsn, OutcomeKey::Licensure) => 80,
            (Self::Bsn, OutcomeKey::Completion) => 70,
            (Self::Bsn, OutcomeKey::Employment) => 80,
            (Self::Msn, OutcomeKey::Licensure) => 82,
            (Self::Msn, OutcomeKey::Completion) => 75,
            (Self::Msn, OutcomeKey::Employment) => 85,
            (Self::PostMsn, OutcomeKey::Licensure) => 85,
            (Self::PostMsn, OutcomeKey::Completion) => 80,
            (Self::PostMsn, OutcomeKey::Employment) => 88,
            (Self::Dnp, OutcomeKey::Licensure) => 90,
            (Self::Dnp, OutcomeKey::Completion) => 85,
            (Self::Dnp, OutcomeKey::Employment) => 90,
        }
    }
}

impl Choice for ProgramLevel {
    fn options() -> &'static [Self] {
        const OPTIONS: [ProgramLevel; 4] = ProgramLevel::ordered();
        &OPTIONS
    }

    fn value(self) -> &'static str {
        match self {
            Self::Bsn => "bsn",
            Self::Msn => "msn",
            Self::PostMsn => "post_msn",
            Self::Dnp => "dnp",
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::Bsn => "BSN (Baccalaureate)",
            Self::Msn => "MSN (Master's)",
            Self::PostMsn => "Post-MSN",
            Self::Dnp => "DNP",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ReportingWindowId {
    #[default]
    #[serde(rename = "rolling-3")]
    Rolling3,
    #[serde(rename = "rolling-4")]
    Rolling4,
    #[serde(rename = "custom")]
    Custom,
}

impl ReportingWindowId {
    /// Number of cohorts the window implies; `None` for a custom window.
    pub const fn cohort_count(self) -> Option<usize> {
        match self {
            Self::Rolling3 => Some(3),
            Self::Rolling4 => Some(4),
            Self::Custom => None,
        }
    }
}

impl Choice for ReportingWindowId {
    fn options() -> &'static [Self] {
        &[Self::Rolling3, Self::Rolling4, Self::Custom]
    }

    fn value(self) -> &'static str {
        match self {
            Self::Rolling3 => "rolling-3",
            Self::Rolling4 => "rolling-4",
            Self::Custom => "custom",
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::Rolling3 => "Most recent 3 cohorts",
            Self::Rolling4 => "Most recent 4 cohorts",
            Self::Custom => "Custom window",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExclusionCategory {
    MilitaryDeployment,
    ExtendedMedicalLeave,
    MissionaryService,
    Death,
    Other,
}

impl Choice for ExclusionCategory {
    fn options() -> &'static [Self] {
        &[
            Self::MilitaryDeployment,
            Self::ExtendedMedicalLeave,
            Self::MissionaryService,
            Self::Death,
            Self::Other,
        ]
    }

    fn value(self) -> &'static str {
        match self {
            Self::MilitaryDeployment => "military_deployment",
            Self::ExtendedMedicalLeave => "extended_medical_leave",
            Self::MissionaryService => "missionary_service",
            Self::Death => "death",
            Self::Other => "other",
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::MilitaryDeployment => "Military deployment",
            Self::ExtendedMedicalLeave => "Extended medical leave",
            Self::MissionaryService => "Missionary/service obligations",
            Self::Death => "Deceased",
            Self::Other => "Other (specify)",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataSource {
    #[default]
    EmployerSurvey,
    LicensureBoard,
    DeanReport,
    Consortium,
    Other,
}

impl Choice for DataSource {
    fn options() -> &'static [Self] {
        &[
            Self::EmployerSurvey,
            Self::LicensureBoard,
            Self::DeanReport,
            Self::Consortium,
            Self::Other,
        ]
    }

    fn value(self) -> &'static str {
        match self {
            Self::EmployerSurvey => "employer_survey",
            Self::LicensureBoard => "licensure_board",
            Self::DeanReport => "dean_report",
            Self::Consortium => "consortium",
            Self::Other => "other",
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::EmployerSurvey => "Employer survey",
            Self::LicensureBoard => "Licensure board",
            Self::DeanReport => "Dean/Director report",
            Self::Consortium => "Consortium",
            Self::Other => "Other (specify)",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CertificationStatus {
    #[default]
    Applicable,
    NotApplicable,
    Pending,
}

impl Choice for CertificationStatus {
    fn options() -> &'static [Self] {
        &[Self::Applicable, Self::NotApplicable, Self::Pending]
    }

    fn value(self) -> &'static str {
        match self {
            Self::Applicable => "applicable",
            Self::NotApplicable => "not_applicable",
            Self::Pending => "pending",
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::Applicable => "Certification applicable",
            Self::NotApplicable => "Certification not applicable",
            Self::Pending => "Certification pending",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeKey {
    Licensure,
    Completion,
    Employment,
}

impl OutcomeKey {
    pub const fn ordered() -> [Self; 3] {
        [Self::Licensure, Self::Completion, Self::Employment]
    }

    pub const fn key(self) -> &'static str {
        match self {
            Self::Licensure => "licensure",
            Self::Completion => "completion",
            Self::Employment => "employment",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Licensure => "Licensure",
            Self::Completion => "Program completion",
            Self::Employment => "Employment",
        }
    }
}

/// Top-level section of the document owned by one editing step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Slice {
    ProgramInfo,
    ReportingWindow,
    ExpectedOutcomes,
    IvaEvidence,
}

impl Slice {
    pub const fn ordered() -> [Self; 4] {
        [
            Self::ProgramInfo,
            Self::ReportingWindow,
            Self::ExpectedOutcomes,
            Self::IvaEvidence,
        ]
    }

    pub const fn key(self) -> &'static str {
        match self {
            Self::ProgramInfo => "programInfo",
            Self::ReportingWindow => "reportingWindow",
            Self::ExpectedOutcomes => "expectedOutcomes",
            Self::IvaEvidence => "ivaEvidence",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ordered().into_iter().find(|slice| slice.key() == key)
    }
}

/// Evidence list owned by the IV-A step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EvidenceList {
    MepEvidence,
    SupportingEvidence,
}

impl EvidenceList {
    pub const fn key(self) -> &'static str {
        match self {
            Self::MepEvidence => "mepEvidence",
            Self::SupportingEvidence => "supportingEvidence",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "mepEvidence" | "mep" => Some(Self::MepEvidence),
            "supportingEvidence" | "supporting" => Some(Self::SupportingEvidence),
            _ => None,
        }
    }
}

pub fn generate_id() -> String {
    Uuid::new_v4().to_string()
}

/// The single nested document edited across all steps.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormDocument {
    pub program_info: ProgramInfo,
    pub reporting_window: ReportingWindow,
    pub expected_outcomes: ExpectedOutcomes,
    pub iva_evidence: IvaEvidence,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgramInfo {
    pub institution_name: String,
    pub program_name: String,
    pub program_level: ProgramLevel,
    pub accreditation_cycle: String,
    pub contact_email: String,
    pub dean_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportingWindow {
    pub selection: ReportingWindowId,
    pub start_year: String,
    pub end_year: String,
    pub cohorts: Vec<Cohort>,
}

impl Default for ReportingWindow {
    fn default() -> Self {
        Self {
            selection: ReportingWindowId::default(),
            start_year: String::new(),
            end_year: String::new(),
            cohorts: vec![Cohort::default()],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cohort {
    pub id: String,
    pub year: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub licensure: Licensure,
    pub completion: Completion,
    pub employment: Employment,
}

impl Default for Cohort {
    fn default() -> Self {
        Self {
            id: generate_id(),
            year: String::new(),
            notes: None,
            licensure: Licensure::default(),
            completion: Completion::default(),
            employment: Employment::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Licensure {
    pub first_time_candidates: u32,
    pub first_time_passes: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Completion {
    pub numerator: u32,
    pub denominator: u32,
    #[serde(default)]
    pub exclusions: Vec<Exclusion>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Exclusion {
    pub category: ExclusionCategory,
    pub count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Employment {
    pub seekers: u32,
    pub employed: u32,
    pub data_source: DataSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub other_source_label: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpectedOutcomes {
    pub licensure: ElaOverride,
    pub completion: ElaOverride,
    pub employment: ElaOverride,
}

impl ExpectedOutcomes {
    pub fn get(&self, key: OutcomeKey) -> &ElaOverride {
        match key {
            OutcomeKey::Licensure => &self.licensure,
            OutcomeKey::Completion => &self.completion,
            OutcomeKey::Employment => &self.employment,
        }
    }

    pub fn get_mut(&mut self, key: OutcomeKey) -> &mut ElaOverride {
        match key {
            OutcomeKey::Licensure => &mut self.licensure,
            OutcomeKey::Completion => &mut self.completion,
            OutcomeKey::Employment => &mut self.employment,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElaOverride {
    pub use_default: bool,
    pub override_value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rationale: Option<String>,
}

impl Default for ElaOverride {
    fn default() -> Self {
        Self {
            use_default: true,
            override_value: None,
            rationale: None,
        }
    }
}

impl ElaOverride {
    /// Target percentage in effect for the given program level.
    pub fn effective_target(&self, level: ProgramLevel, outcome: OutcomeKey) -> f64 {
        match (self.use_default, self.override_value) {
            (false, Some(value)) => value,
            _ => f64::from(level.default_ela(outcome)),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IvaEvidence {
    pub certification_status: CertificationStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub certification_note: Option<String>,
    pub iva_narrative: String,
    pub mep_evidence: Vec<EvidenceAttachment>,
    pub supporting_evidence: Vec<EvidenceAttachment>,
}

impl IvaEvidence {
    pub fn list(&self, list: EvidenceList) -> &[EvidenceAttachment] {
        match list {
            EvidenceList::MepEvidence => &self.mep_evidence,
            EvidenceList::SupportingEvidence => &self.supporting_evidence,
        }
    }
}

/// Uploaded file metadata or an external link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum EvidenceAttachment {
    File {
        id: String,
        name: String,
        size: u64,
        #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
        mime_type: Option<String>,
    },
    Link {
        id: String,
        title: String,
        url: String,
    },
}

impl EvidenceAttachment {
    pub fn file(name: impl Into<String>, size: u64, mime_type: Option<String>) -> Self {
        Self::File {
            id: generate_id(),
            name: name.into(),
            size,
            mime_type,
        }
    }

    pub fn link(title: impl Into<String>, url: impl Into<String>) -> Self {
        Self::Link {
            id: generate_id(),
            title: title.into(),
            url: url.into(),
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Self::File { id, .. } | Self::Link { id, .. } => id,
        }
    }

    pub fn display_name(&self) -> &str {
        match self {
            Self::File { name, .. } => name,
            Self::Link { title, .. } => title,
        }
    }

    /// Byte size counted towards uploads; links carry none.
    pub fn byte_size(&self) -> u64 {
        match self {
            Self::File { size, .. } => *size,
            Self::Link { .. } => 0,
        }
    }
}
