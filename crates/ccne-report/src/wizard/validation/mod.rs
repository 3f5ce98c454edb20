//! Composable slice validators.
//!
//! A validator reads one record through a [`Scope`], collecting shape issues
//! per field. Cross-field refinements run on the typed value only once the
//! shape succeeded, so a relation like numerator ≤ denominator is never
//! checked against a field that already failed on its own.

mod rules;
pub mod schema;

use serde::Serialize;

use super::domain::Choice;
use super::pointer::{Node, Pointer, Segment};

pub use rules::{coerce_number, is_email, is_http_url, is_year, normalized_text};
pub use schema::{
    validate_attachment, validate_cohort, validate_completion, validate_ela_override,
    validate_employment, validate_exclusion, validate_expected_outcomes, validate_form_document,
    validate_iva_evidence, validate_licensure, validate_program_info, validate_reporting_window,
    validate_slice,
};

/// A single validation failure, addressed relative to the validated value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Issue {
    pub path: Pointer,
    pub message: String,
}

impl Issue {
    pub fn new(path: impl Into<Pointer>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn at(key: &str, message: impl Into<String>) -> Self {
        Self::new(Pointer::root().key(key), message)
    }

    /// Re-addresses the issue below `prefix`.
    pub fn prefixed(self, prefix: &Pointer) -> Self {
        Self {
            path: prefix.join(&self.path),
            message: self.message,
        }
    }
}

pub type Outcome<T> = Result<T, Vec<Issue>>;

/// Runs `check` against a successfully shaped value and folds its issues in.
pub fn refine<T>(outcome: Outcome<T>, check: impl FnOnce(&T, &mut Vec<Issue>)) -> Outcome<T> {
    let value = outcome?;
    let mut issues = Vec::new();
    check(&value, &mut issues);
    if issues.is_empty() {
        Ok(value)
    } else {
        Err(issues)
    }
}

/// Field reader over one record node.
pub struct Scope<'a> {
    node: &'a Node,
    issues: Vec<Issue>,
}

impl<'a> Scope<'a> {
    pub fn new(node: &'a Node) -> Self {
        Self {
            node,
            issues: Vec::new(),
        }
    }

    fn value(&self, key: &str) -> Option<&'a Node> {
        self.node.field(key)
    }

    pub fn issue(&mut self, key: &str, message: impl Into<String>) {
        self.issues.push(Issue::at(key, message));
    }

    /// Non-blank text; the stored value is returned untrimmed.
    pub fn required_text(&mut self, key: &str, message: &str) -> String {
        let text = self.text(key);
        if text.trim().is_empty() {
            self.issue(key, message);
        }
        text
    }

    pub fn text_min_length(&mut self, key: &str, min: usize, message: &str) -> String {
        let text = self.text(key);
        if text.trim().chars().count() < min {
            self.issue(key, message);
        }
        text
    }

    pub fn email(&mut self, key: &str, message: &str) -> String {
        let text = self.text(key);
        if !is_email(text.trim()) {
            self.issue(key, message);
        }
        text
    }

    pub fn year(&mut self, key: &str, message: &str) -> String {
        let text = self.text(key);
        if !is_year(text.trim()) {
            self.issue(key, message);
        }
        text
    }

    pub fn text(&self, key: &str) -> String {
        self.value(key)
            .and_then(Node::as_str)
            .map(str::to_string)
            .unwrap_or_default()
    }

    /// Optional free text; blank values read as absent.
    pub fn optional_text(&self, key: &str) -> Option<String> {
        self.value(key)
            .and_then(Node::as_str)
            .filter(|text| !text.trim().is_empty())
            .map(str::to_string)
    }

    pub fn flag(&self, key: &str, default: bool) -> bool {
        self.value(key).and_then(Node::as_bool).unwrap_or(default)
    }

    /// Whole, non-negative number; missing or non-numeric input reads as 0.
    pub fn whole_number(&mut self, key: &str, label: &str, max: u64) -> u64 {
        let number = coerce_number(self.value(key));
        if number < 0.0 {
            self.issue(key, format!("{label} cannot be negative"));
            return 0;
        }
        if number.fract() != 0.0 {
            self.issue(key, format!("{label} must be a whole number"));
            return 0;
        }
        if number > max as f64 {
            self.issue(key, format!("{label} is too large"));
            return 0;
        }
        number as u64
    }

    pub fn count(&mut self, key: &str, label: &str) -> u32 {
        let number = self.whole_number(key, label, u64::from(u32::MAX));
        u32::try_from(number).unwrap_or(u32::MAX)
    }

    /// Whole count that must be greater than zero.
    pub fn positive_count(&mut self, key: &str, label: &str) -> u32 {
        let before = self.issues.len();
        let count = self.count(key, label);
        if self.issues.len() == before && count == 0 {
            self.issue(key, format!("{label} must be greater than zero"));
        }
        count
    }

    /// Optional number in `[min, max]`; null, missing and blank input read as absent.
    pub fn optional_number_in_range(&mut self, key: &str, min: f64, max: f64) -> Option<f64> {
        let node = self.value(key)?;
        let blank = match node {
            Node::Null => true,
            Node::String(text) => text.trim().is_empty(),
            _ => false,
        };
        if blank {
            return None;
        }
        let number = coerce_number(Some(node));
        if number < min || number > max {
            self.issue(key, format!("Must be between {min} and {max}"));
        }
        Some(number)
    }

    /// Membership in the closed option list of `C`.
    pub fn choice<C: Choice>(&mut self, key: &str, label: &str) -> Option<C> {
        let raw = self.value(key).and_then(Node::as_str).unwrap_or_default();
        match C::from_value(raw) {
            Some(choice) => Some(choice),
            None => {
                self.issue(
                    key,
                    format!("{label} must be one of: {}", C::allowed_values()),
                );
                None
            }
        }
    }

    /// Validates a nested record, re-prefixing its issues with `key`.
    pub fn nested<T>(&mut self, key: &str, validate: impl FnOnce(&Node) -> Outcome<T>) -> Option<T> {
        let empty = Node::record();
        let node = self.value(key).unwrap_or(&empty);
        match validate(node) {
            Ok(value) => Some(value),
            Err(issues) => {
                let prefix = Pointer::root().key(key);
                self.issues
                    .extend(issues.into_iter().map(|issue| issue.prefixed(&prefix)));
                None
            }
        }
    }

    /// Validates every item of a list within `bounds`; item issues are
    /// re-prefixed with `key/<index>`. Missing or null lists read as empty.
    pub fn list<T>(
        &mut self,
        key: &str,
        bounds: ListBounds<'_>,
        mut validate: impl FnMut(&Node) -> Outcome<T>,
    ) -> Vec<T> {
        let items = self.value(key).and_then(Node::as_array).unwrap_or_default();
        if items.len() < bounds.min {
            self.issue(key, bounds.too_few);
        }
        if let Some(max) = bounds.max {
            if items.len() > max {
                self.issue(key, bounds.too_many);
            }
        }
        let mut values = Vec::with_capacity(items.len());
        for (index, item) in items.iter().enumerate() {
            match validate(item) {
                Ok(value) => values.push(value),
                Err(issues) => {
                    let prefix = Pointer::from_segments([Segment::from(key), Segment::from(index)]);
                    self.issues
                        .extend(issues.into_iter().map(|issue| issue.prefixed(&prefix)));
                }
            }
        }
        values
    }

    /// Completes the shape phase. `build` sees every field valid, so its
    /// `Option`s are all populated; a `None` still reports an issue at the root.
    pub fn finish<T>(self, build: impl FnOnce() -> Option<T>) -> Outcome<T> {
        if !self.issues.is_empty() {
            return Err(self.issues);
        }
        build().ok_or_else(|| vec![Issue::new(Pointer::root(), "Invalid value")])
    }
}

/// Size bounds and messages for [`Scope::list`].
#[derive(Debug, Clone, Copy)]
pub struct ListBounds<'m> {
    pub min: usize,
    pub max: Option<usize>,
    pub too_few: &'m str,
    pub too_many: &'m str,
}

impl<'m> ListBounds<'m> {
    pub const fn any() -> Self {
        Self {
            min: 0,
            max: None,
            too_few: "",
            too_many: "",
        }
    }

    pub const fn between(min: usize, max: usize, too_few: &'m str, too_many: &'m str) -> Self {
        Self {
            min,
            max: Some(max),
            too_few,
            too_many,
        }
    }

    pub const fn at_least(min: usize, too_few: &'m str) -> Self {
        Self {
            min,
            max: None,
            too_few,
            too_many: "",
        }
    }
}
