//! Persistent document tree addressed by slash-delimited pointers.
//!
//! Containers are reference counted so that `set` and `delete` only copy the
//! containers on the addressed path; every other subtree is shared with the
//! input document.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Number, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// A JSON-shaped value with shared containers.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Node {
    #[default]
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    Array(Arc<Vec<Node>>),
    Record(Arc<BTreeMap<String, Node>>),
}

impl Node {
    pub fn record() -> Self {
        Self::Record(Arc::new(BTreeMap::new()))
    }

    pub fn array() -> Self {
        Self::Array(Arc::new(Vec::new()))
    }

    pub fn from_serialize<T: Serialize>(value: &T) -> Result<Self, serde_json::Error> {
        serde_json::to_value(value).map(Self::from)
    }

    pub fn to_typed<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(Value::from(self))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(value) => value.as_f64(),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Node]> {
        match self {
            Self::Array(items) => Some(items.as_slice()),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&BTreeMap<String, Node>> {
        match self {
            Self::Record(map) => Some(map),
            _ => None,
        }
    }

    /// Looks up a record field; `None` for missing keys and non-records.
    pub fn field(&self, key: &str) -> Option<&Node> {
        self.as_record().and_then(|map| map.get(key))
    }

    /// True when both values are the same shared container allocation.
    pub fn shares_container(&self, other: &Node) -> bool {
        match (self, other) {
            (Self::Array(a), Self::Array(b)) => Arc::ptr_eq(a, b),
            (Self::Record(a), Self::Record(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    fn empty_container(array: bool) -> Self {
        if array {
            Self::array()
        } else {
            Self::record()
        }
    }
}

impl From<Value> for Node {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(flag) => Self::Bool(flag),
            Value::Number(number) => Self::Number(number),
            Value::String(text) => Self::String(text),
            Value::Array(items) => Self::Array(Arc::new(items.into_iter().map(Node::from).collect())),
            Value::Object(map) => Self::Record(Arc::new(
                map.into_iter()
                    .map(|(key, value)| (key, Node::from(value)))
                    .collect(),
            )),
        }
    }
}

impl From<&Node> for Value {
    fn from(node: &Node) -> Self {
        match node {
            Node::Null => Value::Null,
            Node::Bool(flag) => Value::Bool(*flag),
            Node::Number(number) => Value::Number(number.clone()),
            Node::String(text) => Value::String(text.clone()),
            Node::Array(items) => Value::Array(items.iter().map(Value::from).collect()),
            Node::Record(map) => Value::Object(
                map.iter()
                    .map(|(key, value)| (key.clone(), Value::from(value)))
                    .collect::<Map<String, Value>>(),
            ),
        }
    }
}

impl From<&str> for Node {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for Node {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<bool> for Node {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<u32> for Node {
    fn from(value: u32) -> Self {
        Self::Number(Number::from(value))
    }
}

impl From<u64> for Node {
    fn from(value: u64) -> Self {
        Self::Number(Number::from(value))
    }
}

impl From<i64> for Node {
    fn from(value: i64) -> Self {
        Self::Number(Number::from(value))
    }
}

impl From<f64> for Node {
    fn from(value: f64) -> Self {
        Number::from_f64(value).map_or(Self::Null, Self::Number)
    }
}

impl Serialize for Node {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        Value::from(self).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Node {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Value::deserialize(deserializer).map(Node::from)
    }
}

/// One step of a pointer path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Segment {
    Key(String),
    Index(usize),
    /// Trailing `-`: append to the array at this path.
    Append,
}

impl Segment {
    fn parse(raw: &str) -> Self {
        if raw == "-" {
            return Self::Append;
        }
        if raw.bytes().all(|byte| byte.is_ascii_digit()) {
            if let Ok(index) = raw.parse::<usize>() {
                return Self::Index(index);
            }
        }
        Self::Key(raw.to_string())
    }

    fn record_key(&self) -> Option<String> {
        match self {
            Self::Key(key) => Some(key.clone()),
            Self::Index(index) => Some(index.to_string()),
            Self::Append => None,
        }
    }
}

impl From<&str> for Segment {
    fn from(value: &str) -> Self {
        Self::Key(value.to_string())
    }
}

impl From<usize> for Segment {
    fn from(value: usize) -> Self {
        Self::Index(value)
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Key(key) => write!(f, "{}", key.replace('~', "~0").replace('/', "~1")),
            Self::Index(index) => write!(f, "{index}"),
            Self::Append => write!(f, "-"),
        }
    }
}

/// Parsed pointer. Formats without a leading slash (`programInfo/contactEmail`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Pointer {
    segments: Vec<Segment>,
}

impl Pointer {
    pub fn root() -> Self {
        Self::default()
    }

    /// Parses `a/b/0/-`; a leading slash is optional, `~1` and `~0` unescape to
    /// `/` and `~`, and segments are trimmed with empty ones dropped.
    pub fn parse(raw: &str) -> Self {
        let segments = raw
            .split('/')
            .map(|segment| segment.replace("~1", "/").replace("~0", "~"))
            .map(|segment| segment.trim().to_string())
            .filter(|segment| !segment.is_empty())
            .map(|segment| Segment::parse(&segment))
            .collect();
        Self { segments }
    }

    pub fn from_segments<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Segment>,
    {
        Self {
            segments: segments.into_iter().map(Into::into).collect(),
        }
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.segments.push(Segment::Key(key.into()));
        self
    }

    pub fn index(mut self, index: usize) -> Self {
        self.segments.push(Segment::Index(index));
        self
    }

    pub fn append(mut self) -> Self {
        self.segments.push(Segment::Append);
        self
    }

    pub fn join(&self, other: &Pointer) -> Self {
        let mut segments = self.segments.clone();
        segments.extend(other.segments.iter().cloned());
        Self { segments }
    }

    pub fn first_key(&self) -> Option<&str> {
        match self.segments.first() {
            Some(Segment::Key(key)) => Some(key),
            _ => None,
        }
    }

    pub fn starts_with(&self, prefix: &Pointer) -> bool {
        self.segments.starts_with(&prefix.segments)
    }
}

impl From<&str> for Pointer {
    fn from(value: &str) -> Self {
        Self::parse(value)
    }
}

impl fmt::Display for Pointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (position, segment) in self.segments.iter().enumerate() {
            if position > 0 {
                f.write_str("/")?;
            }
            write!(f, "{segment}")?;
        }
        Ok(())
    }
}

impl Serialize for Pointer {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Pointer {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(|raw| Pointer::parse(&raw))
    }
}

/// A mutation request that does not fit the document's shape.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("cannot apply pointer '{pointer}': {reason}")]
pub struct PointerTypeError {
    pub pointer: String,
    pub reason: &'static str,
}

impl PointerTypeError {
    fn new(pointer: &Pointer, reason: &'static str) -> Self {
        Self {
            pointer: pointer.to_string(),
            reason,
        }
    }
}

/// Resolves `pointer` read-only.
pub fn get<'a>(document: &'a Node, pointer: &Pointer) -> Option<&'a Node> {
    pointer
        .segments()
        .iter()
        .try_fold(document, |current, segment| match (current, segment) {
            (_, Segment::Append) => None,
            (Node::Record(map), Segment::Key(key)) => map.get(key),
            (Node::Record(map), Segment::Index(index)) => map.get(&index.to_string()),
            (Node::Array(items), Segment::Index(index)) => items.get(*index),
            _ => None,
        })
}

/// Returns a copy of `document` with `value` written at `pointer`.
pub fn set(document: &Node, pointer: &Pointer, value: Node) -> Result<Node, PointerTypeError> {
    set_at(document, pointer.segments(), value, pointer)
}

fn set_at(
    current: &Node,
    segments: &[Segment],
    value: Node,
    pointer: &Pointer,
) -> Result<Node, PointerTypeError> {
    let Some((segment, rest)) = segments.split_first() else {
        return Ok(value);
    };

    if rest.is_empty() {
        return assign(current, segment, value, pointer);
    }

    let next_is_index = matches!(rest[0], Segment::Index(_));

    match current {
        Node::Record(map) => {
            let key = segment
                .record_key()
                .ok_or_else(|| PointerTypeError::new(pointer, "'-' must address an array"))?;
            let updated = descend(map.get(&key), next_is_index, rest, value, pointer)?;
            let mut copy = (**map).clone();
            copy.insert(key, updated);
            Ok(Node::Record(Arc::new(copy)))
        }
        Node::Array(items) => {
            let index = match segment {
                Segment::Index(index) => slot(items.len(), *index, pointer)?,
                Segment::Append => items.len(),
                Segment::Key(_) => {
                    return Err(PointerTypeError::new(
                        pointer,
                        "array segments must be numeric",
                    ))
                }
            };
            let updated = descend(items.get(index), next_is_index, rest, value, pointer)?;
            let mut copy = (**items).clone();
            if index == copy.len() {
                copy.push(updated);
            } else {
                copy[index] = updated;
            }
            Ok(Node::Array(Arc::new(copy)))
        }
        Node::Null => {
            let container = Node::empty_container(!matches!(segment, Segment::Key(_)));
            set_at(&container, segments, value, pointer)
        }
        _ => Err(PointerTypeError::new(
            pointer,
            "cannot descend into a scalar value",
        )),
    }
}

/// Validates an index write: an existing slot, or one past the end to append.
fn slot(len: usize, index: usize, pointer: &Pointer) -> Result<usize, PointerTypeError> {
    if index > len {
        Err(PointerTypeError::new(pointer, "array index is past the end"))
    } else {
        Ok(index)
    }
}

fn descend(
    child: Option<&Node>,
    next_is_index: bool,
    rest: &[Segment],
    value: Node,
    pointer: &Pointer,
) -> Result<Node, PointerTypeError> {
    match child {
        None | Some(Node::Null) => {
            set_at(&Node::empty_container(next_is_index), rest, value, pointer)
        }
        Some(existing) => set_at(existing, rest, value, pointer),
    }
}

fn assign(
    current: &Node,
    segment: &Segment,
    value: Node,
    pointer: &Pointer,
) -> Result<Node, PointerTypeError> {
    match (current, segment) {
        (Node::Array(items), Segment::Append) => {
            let mut copy = (**items).clone();
            copy.push(value);
            Ok(Node::Array(Arc::new(copy)))
        }
        (_, Segment::Append) => Err(PointerTypeError::new(
            pointer,
            "cannot append to a non-array value",
        )),
        (Node::Array(items), Segment::Index(index)) => {
            let index = slot(items.len(), *index, pointer)?;
            let mut copy = (**items).clone();
            if index == copy.len() {
                copy.push(value);
            } else {
                copy[index] = value;
            }
            Ok(Node::Array(Arc::new(copy)))
        }
        (Node::Array(_), Segment::Key(_)) => Err(PointerTypeError::new(
            pointer,
            "array segments must be numeric",
        )),
        (Node::Record(map), segment) => {
            let mut copy = (**map).clone();
            if let Some(key) = segment.record_key() {
                copy.insert(key, value);
            }
            Ok(Node::Record(Arc::new(copy)))
        }
        (Node::Null, Segment::Key(key)) => {
            let mut map = BTreeMap::new();
            map.insert(key.clone(), value);
            Ok(Node::Record(Arc::new(map)))
        }
        (Node::Null, Segment::Index(index)) => {
            slot(0, *index, pointer)?;
            Ok(Node::Array(Arc::new(vec![value])))
        }
        _ => Err(PointerTypeError::new(
            pointer,
            "cannot descend into a scalar value",
        )),
    }
}

/// Returns a copy of `document` without the value at `pointer`. Missing paths
/// leave the document as-is.
pub fn delete(document: &Node, pointer: &Pointer) -> Node {
    delete_at(document, pointer.segments()).unwrap_or_else(|| document.clone())
}

fn delete_at(current: &Node, segments: &[Segment]) -> Option<Node> {
    let (segment, rest) = segments.split_first()?;
    match current {
        Node::Record(map) => {
            let key = segment.record_key()?;
            let child = map.get(&key)?;
            let mut copy = (**map).clone();
            if rest.is_empty() {
                copy.remove(&key);
            } else {
                copy.insert(key, delete_at(child, rest)?);
            }
            Some(Node::Record(Arc::new(copy)))
        }
        Node::Array(items) => {
            let Segment::Index(index) = segment else {
                return None;
            };
            let child = items.get(*index)?;
            let mut copy = (**items).clone();
            if rest.is_empty() {
                copy.remove(*index);
            } else {
                copy[*index] = delete_at(child, rest)?;
            }
            Some(Node::Array(Arc::new(copy)))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Node {
        Node::from(json!({
            "programInfo": { "institutionName": "Mercy College", "programLevel": "bsn" },
            "reportingWindow": {
                "cohorts": [
                    { "year": "2021", "completion": { "exclusions": [] } },
                    { "year": "2022" }
                ]
            }
        }))
    }

    #[test]
    fn parse_unescapes_and_tags_segments() {
        let pointer = Pointer::parse("/a~1b/ 3 /~0c/-");
        assert_eq!(
            pointer.segments(),
            &[
                Segment::Key("a/b".to_string()),
                Segment::Index(3),
                Segment::Key("~c".to_string()),
                Segment::Append,
            ]
        );
        assert_eq!(pointer.to_string(), "a~1b/3/~0c/-");
    }

    #[test]
    fn set_then_get_returns_written_value() {
        let doc = sample();
        let pointer = Pointer::parse("reportingWindow/cohorts/1/year");
        let updated = set(&doc, &pointer, Node::from("2023")).expect("set succeeds");
        assert_eq!(get(&updated, &pointer), Some(&Node::from("2023")));
        assert_eq!(
            get(&doc, &pointer),
            Some(&Node::from("2022")),
            "input document is untouched"
        );
    }

    #[test]
    fn set_shares_untouched_subtrees() {
        let doc = sample();
        let updated = set(
            &doc,
            &Pointer::parse("reportingWindow/cohorts/0/year"),
            Node::from("2020"),
        )
        .expect("set succeeds");

        let program_before = get(&doc, &Pointer::parse("programInfo")).expect("present");
        let program_after = get(&updated, &Pointer::parse("programInfo")).expect("present");
        assert!(program_before.shares_container(program_after));

        let untouched_before = get(&doc, &Pointer::parse("reportingWindow/cohorts/1"))
            .expect("present");
        let untouched_after = get(&updated, &Pointer::parse("reportingWindow/cohorts/1"))
            .expect("present");
        assert!(untouched_before.shares_container(untouched_after));

        for path in ["", "reportingWindow", "reportingWindow/cohorts", "reportingWindow/cohorts/0"] {
            let pointer = Pointer::parse(path);
            let before = get(&doc, &pointer).expect("present");
            let after = get(&updated, &pointer).expect("present");
            assert!(!before.shares_container(after), "{path} must be copied");
        }
    }

    #[test]
    fn set_creates_missing_containers_by_next_segment() {
        let updated = set(&Node::record(), &Pointer::parse("a/0/b"), Node::from(true))
            .expect("set succeeds");
        assert!(get(&updated, &Pointer::parse("a")).and_then(Node::as_array).is_some());
        assert!(get(&updated, &Pointer::parse("a/0")).and_then(Node::as_record).is_some());
        assert_eq!(get(&updated, &Pointer::parse("a/0/b")), Some(&Node::Bool(true)));
    }

    #[test]
    fn append_adds_to_arrays() {
        let doc = sample();
        let pointer = Pointer::parse("reportingWindow/cohorts/0/completion/exclusions/-");
        let updated = set(&doc, &pointer, Node::from(json!({"category": "death", "count": 1})))
            .expect("append succeeds");
        let exclusions = get(&updated, &Pointer::parse("reportingWindow/cohorts/0/completion/exclusions"))
            .and_then(Node::as_array)
            .expect("array present");
        assert_eq!(exclusions.len(), 1);
    }

    #[test]
    fn index_past_the_end_is_refused() {
        let doc = sample();
        for raw in [
            "reportingWindow/cohorts/3",
            "reportingWindow/cohorts/18446744073709551615",
            "reportingWindow/cohorts/1000000000/year",
            "programInfo/aliases/2",
        ] {
            let err = set(&doc, &Pointer::parse(raw), Node::from("x"))
                .expect_err("index beyond the array end fails");
            assert_eq!(err.reason, "array index is past the end", "{raw}");
        }

        let appended = set(&doc, &Pointer::parse("reportingWindow/cohorts/2/year"), Node::from("2023"))
            .expect("index equal to the length appends");
        assert_eq!(
            get(&appended, &Pointer::parse("reportingWindow/cohorts"))
                .and_then(Node::as_array)
                .map(<[Node]>::len),
            Some(3)
        );
    }

    #[test]
    fn append_on_non_array_fails() {
        let doc = sample();
        let err = set(&doc, &Pointer::parse("programInfo/-"), Node::from("x"))
            .expect_err("append on record fails");
        assert_eq!(err.pointer, "programInfo/-");
        assert_eq!(get(&doc, &Pointer::parse("programInfo/-")), None);
    }

    #[test]
    fn get_stops_at_missing_or_append_segments() {
        let doc = sample();
        assert_eq!(get(&doc, &Pointer::parse("missing/deeper")), None);
        assert_eq!(get(&doc, &Pointer::parse("reportingWindow/cohorts/-")), None);
        assert_eq!(get(&doc, &Pointer::parse("reportingWindow/cohorts/9")), None);
    }

    #[test]
    fn delete_splices_arrays_and_removes_keys() {
        let doc = sample();
        let without_first = delete(&doc, &Pointer::parse("reportingWindow/cohorts/0"));
        assert_eq!(
            get(&without_first, &Pointer::parse("reportingWindow/cohorts/0/year")),
            Some(&Node::from("2022"))
        );

        let without_level = delete(&doc, &Pointer::parse("programInfo/programLevel"));
        assert_eq!(get(&without_level, &Pointer::parse("programInfo/programLevel")), None);
        assert!(get(&doc, &Pointer::parse("programInfo/programLevel")).is_some());

        let unchanged = delete(&doc, &Pointer::parse("nope/0"));
        assert_eq!(unchanged, doc);
    }
}
