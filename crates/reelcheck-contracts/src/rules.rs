//! Compiled rule tree.
//!
//! A `RuleSet` is the immutable form of a declarative rule document. The
//! loader in `reelcheck-rules` builds it once; validators only ever read it.
//! Each node is an exhaustive variant so the validator pattern-matches
//! instead of probing for optional keys.

use std::fmt;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{ReelcheckError, ReelcheckResult};

/// Name of the root field holding the segment array.
pub const SEGMENTS_FIELD: &str = "segments";

/// AI-reported certainty bucket.
///
/// Ordering is defined by [`ConfidenceLevel::rank`], never by the spelling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceLevel {
    Low,
    Medium,
    High,
}

impl ConfidenceLevel {
    /// Explicit rank: low = 1, medium = 2, high = 3.
    pub fn rank(self) -> u8 {
        match self {
            ConfidenceLevel::Low => 1,
            ConfidenceLevel::Medium => 2,
            ConfidenceLevel::High => 3,
        }
    }

    /// Parse a level case-insensitively. Unknown spellings return `None`.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "low" => Some(ConfidenceLevel::Low),
            "medium" => Some(ConfidenceLevel::Medium),
            "high" => Some(ConfidenceLevel::High),
            _ => None,
        }
    }

    /// True when this level is at least `threshold`.
    pub fn meets(self, threshold: ConfidenceLevel) -> bool {
        self.rank() >= threshold.rank()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ConfidenceLevel::Low => "low",
            ConfidenceLevel::Medium => "medium",
            ConfidenceLevel::High => "high",
        }
    }
}

impl fmt::Display for ConfidenceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// JSON value types a rule can declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    String,
    Number,
    Array,
    Object,
}

impl ValueType {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "string" => Some(ValueType::String),
            "number" | "integer" => Some(ValueType::Number),
            "array" => Some(ValueType::Array),
            "object" => Some(ValueType::Object),
            _ => None,
        }
    }

    pub fn matches(self, value: &Value) -> bool {
        match self {
            ValueType::String => value.is_string(),
            ValueType::Number => value.is_number(),
            ValueType::Array => value.is_array(),
            ValueType::Object => value.is_object(),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ValueType::String => "string",
            ValueType::Number => "number",
            ValueType::Array => "array",
            ValueType::Object => "object",
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A compiled regular expression that remembers its source text.
///
/// Matching is anchored at the start of the value only; a pattern that must
/// consume the whole value ends in `$`.
#[derive(Clone)]
pub struct Pattern {
    source: String,
    regex: Regex,
}

impl Pattern {
    pub fn new(source: &str) -> ReelcheckResult<Self> {
        let regex = Regex::new(&format!("^(?:{source})")).map_err(|e| ReelcheckError::RuleParse {
            reason: format!("invalid pattern '{source}': {e}"),
        })?;
        Ok(Self {
            source: source.to_string(),
            regex,
        })
    }

    pub fn is_match(&self, value: &str) -> bool {
        self.regex.is_match(value)
    }

    pub fn source(&self) -> &str {
        &self.source
    }
}

impl fmt::Debug for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Pattern").field(&self.source).finish()
    }
}

/// Confidence requirements attached to a field.
///
/// Both thresholds are optional and evaluated independently.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfidenceThresholds {
    /// Minimum categorical level.
    pub level: Option<ConfidenceLevel>,
    /// Minimum numeric score (1–100).
    pub score: Option<f64>,
}

impl ConfidenceThresholds {
    pub fn is_empty(&self) -> bool {
        self.level.is_none() && self.score.is_none()
    }
}

#[derive(Debug, Clone, Default)]
pub struct StringRule {
    pub min_length: Option<usize>,
    pub pattern: Option<Pattern>,
    pub allowed: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default)]
pub struct NumberRule {
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub allowed: Option<Vec<f64>>,
}

/// What each element of an array must look like.
#[derive(Debug, Clone)]
pub enum ItemRule {
    /// Full nested rule applied to every element.
    Schema(Box<RuleNode>),
    /// Bare element type with no further constraints.
    Element(ValueType),
}

#[derive(Debug, Clone)]
pub struct ArrayRule {
    pub min_items: Option<usize>,
    pub items: ItemRule,
}

impl ArrayRule {
    pub fn item_schema(&self) -> Option<&RuleNode> {
        match &self.items {
            ItemRule::Schema(node) => Some(node),
            ItemRule::Element(_) => None,
        }
    }
}

/// Object rule. `fields` keeps declaration order and is never empty.
#[derive(Debug, Clone)]
pub struct ObjectRule {
    pub fields: Vec<(String, RuleNode)>,
}

impl ObjectRule {
    pub fn field(&self, name: &str) -> Option<&RuleNode> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, node)| node)
    }

    /// Find the value for `name` in `object`, trying the canonical key first
    /// and then the field's declared aliases.
    ///
    /// Returns the JSON key that was actually present alongside the value.
    /// JSON `null` counts as absent.
    pub fn resolve<'v>(&self, name: &str, object: &'v Map<String, Value>) -> Option<(&'v str, &'v Value)> {
        let aliases = self
            .field(name)
            .map(|node| node.aliases.as_slice())
            .unwrap_or_default();
        std::iter::once(name)
            .chain(aliases.iter().map(String::as_str))
            .find_map(|key| object.get_key_value(key))
            .filter(|(_, value)| !value.is_null())
            .map(|(key, value)| (key.as_str(), value))
    }
}

/// The type-specific part of a rule node.
#[derive(Debug, Clone)]
pub enum RuleKind {
    String(StringRule),
    Number(NumberRule),
    Array(ArrayRule),
    Object(ObjectRule),
}

/// One node of the rule tree.
#[derive(Debug, Clone)]
pub struct RuleNode {
    pub required: bool,
    /// Alternative document keys accepted for this field.
    pub aliases: Vec<String>,
    pub confidence: ConfidenceThresholds,
    pub kind: RuleKind,
}

impl RuleNode {
    pub fn value_type(&self) -> ValueType {
        match self.kind {
            RuleKind::String(_) => ValueType::String,
            RuleKind::Number(_) => ValueType::Number,
            RuleKind::Array(_) => ValueType::Array,
            RuleKind::Object(_) => ValueType::Object,
        }
    }

    pub fn as_object(&self) -> Option<&ObjectRule> {
        match &self.kind {
            RuleKind::Object(object) => Some(object),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&ArrayRule> {
        match &self.kind {
            RuleKind::Array(array) => Some(array),
            _ => None,
        }
    }
}

/// Cross-segment quality configuration. Every check is optional.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QualityChecks {
    pub min_segments: Option<usize>,
    /// Largest tolerated gap between consecutive segments, in timeline units.
    pub max_time_gap: Option<u32>,
    pub min_editorial_subjects: Option<usize>,
    pub min_visual_subjects: Option<usize>,
    pub enforce_sequence: bool,
    pub must_cover_full_video: bool,
}

/// Immutable compiled rule set.
///
/// Construction checks the one structural invariant the validator depends
/// on: the root is an object whose `segments` field is an array of objects.
#[derive(Debug, Clone)]
pub struct RuleSet {
    root: RuleNode,
    quality: QualityChecks,
}

impl RuleSet {
    pub fn new(root: RuleNode, quality: QualityChecks) -> ReelcheckResult<Self> {
        let root_object = root.as_object().ok_or_else(|| ReelcheckError::RuleParse {
            reason: "validation.structure must be an object rule".to_string(),
        })?;
        let segments = root_object
            .field(SEGMENTS_FIELD)
            .ok_or_else(|| ReelcheckError::RuleParse {
                reason: format!("validation.structure has no '{SEGMENTS_FIELD}' field"),
            })?;
        let is_array_of_objects = segments
            .as_array()
            .and_then(ArrayRule::item_schema)
            .and_then(RuleNode::as_object)
            .is_some();
        if !is_array_of_objects {
            return Err(ReelcheckError::RuleParse {
                reason: format!("'{SEGMENTS_FIELD}' must be an array with an object item_schema"),
            });
        }
        Ok(Self { root, quality })
    }

    pub fn root(&self) -> &RuleNode {
        &self.root
    }

    pub fn quality_checks(&self) -> &QualityChecks {
        &self.quality
    }

    /// Top-level object rule.
    pub fn root_object(&self) -> &ObjectRule {
        self.root
            .as_object()
            .unwrap_or_else(|| unreachable!("RuleSet::new guarantees an object root"))
    }

    /// The `segments` array rule.
    pub fn segments_rule(&self) -> &ArrayRule {
        self.root_object()
            .field(SEGMENTS_FIELD)
            .and_then(RuleNode::as_array)
            .unwrap_or_else(|| unreachable!("RuleSet::new guarantees a segments array"))
    }

    /// The object rule every segment is validated against.
    pub fn segment_schema(&self) -> &ObjectRule {
        self.segments_rule()
            .item_schema()
            .and_then(RuleNode::as_object)
            .unwrap_or_else(|| unreachable!("RuleSet::new guarantees an object item_schema"))
    }

    /// Resolve a dotted path such as `segments.timestamps`.
    ///
    /// Arrays are traversed transparently into their item schema; the
    /// spellings `segments[].timestamps` and `segments.item_schema.timestamps`
    /// resolve to the same node.
    pub fn lookup(&self, path: &str) -> Option<&RuleNode> {
        let mut current = &self.root;
        for raw in path.split('.').filter(|part| !part.is_empty()) {
            let part = raw.trim_end_matches("[]");
            if part == "item_schema" {
                current = current.as_array()?.item_schema()?;
                continue;
            }
            let object = match &current.kind {
                RuleKind::Object(object) => object,
                RuleKind::Array(array) => array.item_schema()?.as_object()?,
                RuleKind::String(_) | RuleKind::Number(_) => return None,
            };
            current = object.field(part)?;
        }
        Some(current)
    }
}
