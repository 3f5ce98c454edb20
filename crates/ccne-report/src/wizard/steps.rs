use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use super::domain::Slice;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepPath {
    Step1,
    Step2,
    Step3,
    Step4,
    Review,
    Submit,
}

impl StepPath {
    pub const fn ordered() -> [Self; 6] {
        [
            Self::Step1,
            Self::Step2,
            Self::Step3,
            Self::Step4,
            Self::Review,
            Self::Submit,
        ]
    }

    const fn position(self) -> usize {
        match self {
            Self::Step1 => 0,
            Self::Step2 => 1,
            Self::Step3 => 2,
            Self::Step4 => 3,
            Self::Review => 4,
            Self::Submit => 5,
        }
    }

    pub const fn key(self) -> &'static str {
        match self {
            Self::Step1 => "step1",
            Self::Step2 => "step2",
            Self::Step3 => "step3",
            Self::Step4 => "step4",
            Self::Review => "review",
            Self::Submit => "submit",
        }
    }

    /// Route path, also used as the persisted snapshot key.
    pub const fn route(self) -> &'static str {
        match self {
            Self::Step1 => "/step1",
            Self::Step2 => "/step2",
            Self::Step3 => "/step3",
            Self::Step4 => "/step4",
            Self::Review => "/review",
            Self::Submit => "/submit",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Step1 => "Program information",
            Self::Step2 => "Reporting window & cohorts",
            Self::Step3 => "Expected levels of achievement",
            Self::Step4 => "IV-A evidence",
            Self::Review => "Review",
            Self::Submit => "Submit",
        }
    }

    /// Document slice edited on this step; review and submit own none.
    pub const fn slice(self) -> Option<Slice> {
        match self {
            Self::Step1 => Some(Slice::ProgramInfo),
            Self::Step2 => Some(Slice::ReportingWindow),
            Self::Step3 => Some(Slice::ExpectedOutcomes),
            Self::Step4 => Some(Slice::IvaEvidence),
            Self::Review | Self::Submit => None,
        }
    }

    pub fn next(self) -> Option<Self> {
        Self::ordered().get(self.position() + 1).copied()
    }

    /// Accepts `step1` or `/step1`.
    pub fn parse(raw: &str) -> Option<Self> {
        let key = raw.trim().trim_start_matches('/');
        Self::ordered().into_iter().find(|step| step.key() == key)
    }

    pub fn terminal() -> Self {
        Self::Submit
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkOutcome {
    Completed,
    AlreadyComplete,
    /// An earlier step is still incomplete; nothing changed.
    Locked,
}

/// Completion flags in fixed step order. Unlock state is derived.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StepTracker {
    completed: [bool; 6],
}

impl StepTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_complete(&self, step: StepPath) -> bool {
        self.completed[step.position()]
    }

    /// The first step is always unlocked; any later step once every earlier one is complete.
    pub fn is_unlocked(&self, step: StepPath) -> bool {
        self.completed[..step.position()].iter().all(|done| *done)
    }

    pub fn mark_complete(&mut self, step: StepPath) -> MarkOutcome {
        if self.is_complete(step) {
            return MarkOutcome::AlreadyComplete;
        }
        if !self.is_unlocked(step) {
            return MarkOutcome::Locked;
        }
        self.completed[step.position()] = true;
        MarkOutcome::Completed
    }

    /// Clears `step` and every later step; returns whether anything changed.
    pub fn reset_from(&mut self, step: StepPath) -> bool {
        let mut changed = false;
        for flag in &mut self.completed[step.position()..] {
            changed |= *flag;
            *flag = false;
        }
        changed
    }

    /// Earliest incomplete step, or the terminal step when all are complete.
    pub fn first_incomplete(&self) -> StepPath {
        StepPath::ordered()
            .into_iter()
            .find(|step| !self.is_complete(*step))
            .unwrap_or_else(StepPath::terminal)
    }

    pub fn snapshot(&self) -> BTreeMap<String, bool> {
        StepPath::ordered()
            .into_iter()
            .map(|step| (step.route().to_string(), self.is_complete(step)))
            .collect()
    }

    /// Overlays persisted flags keyed by route; unknown keys and non-boolean
    /// values are ignored.
    pub fn merge_snapshot(&mut self, snapshot: &Value) {
        let Some(entries) = snapshot.as_object() else {
            return;
        };
        for (key, value) in entries {
            if let (Some(step), Some(flag)) = (StepPath::parse(key), value.as_bool()) {
                self.completed[step.position()] = flag;
            }
        }
    }
}
