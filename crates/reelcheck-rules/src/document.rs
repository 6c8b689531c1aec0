//! Raw rule document schema.
//!
//! These types mirror the on-disk layout one-to-one and carry no
//! invariants; [`crate::compile`] turns them into a checked `RuleSet`.
//!
//! ```yaml
//! validation:
//!   structure:
//!     type: object
//!     fields:
//!       segments:
//!         type: array
//!         required: true
//!         min_items: 3
//!         item_schema:
//!           type: object
//!           fields:
//!             timestamps:
//!               type: string
//!               required: true
//!               pattern: "^\\d{2}:\\d{2}[–-]\\d{2}:\\d{2}$"
//!               aliases: ["Timestamps"]
//!   quality_checks:
//!     segment_coverage:
//!       max_time_gap: 15
//! ```

use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Top-level rule document.
#[derive(Debug, Clone, Deserialize)]
pub struct RuleDocument {
    pub validation: Option<ValidationSection>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ValidationSection {
    pub structure: Option<RawNode>,
    #[serde(default)]
    pub quality_checks: RawQualityChecks,
}

/// One node as written in the rule document.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawNode {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub aliases: Vec<String>,

    // string
    pub min_length: Option<usize>,
    pub pattern: Option<String>,
    #[serde(rename = "enum")]
    pub allowed: Option<Vec<Value>>,

    // number
    pub min: Option<f64>,
    pub max: Option<f64>,
    /// Older documents spell a numeric lower bound as `threshold`.
    pub threshold: Option<f64>,

    // array
    pub min_items: Option<usize>,
    pub item_schema: Option<Box<RawNode>>,
    pub items: Option<RawItems>,

    // object
    pub fields: Option<FieldList>,

    // confidence sub-rules
    pub confidence: Option<RawThreshold>,
    pub score: Option<RawThreshold>,
}

/// `items:` accepts either a bare type name or a full nested node.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawItems {
    Type(String),
    Node(Box<RawNode>),
}

/// A confidence or score sub-rule.
///
/// Either `{threshold: high}` (extra keys such as `type` and `enum` are
/// ignored) or the bare threshold value. A map without `threshold`, or a
/// null threshold, declares no check.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawThreshold {
    Rule {
        #[serde(default)]
        threshold: Option<Value>,
    },
    Bare(Value),
}

impl RawThreshold {
    pub fn value(&self) -> Option<&Value> {
        let value = match self {
            RawThreshold::Rule { threshold } => threshold.as_ref()?,
            RawThreshold::Bare(value) => value,
        };
        (!value.is_null()).then_some(value)
    }
}

/// Object fields in document order.
///
/// Deserialized through a map visitor rather than a map type so the
/// declaration order survives every input format.
#[derive(Debug, Clone, Default)]
pub struct FieldList(pub Vec<(String, RawNode)>);

impl<'de> Deserialize<'de> for FieldList {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct FieldListVisitor;

        impl<'de> Visitor<'de> for FieldListVisitor {
            type Value = FieldList;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a mapping of field names to rule nodes")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<FieldList, A::Error> {
                let mut fields = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some((name, node)) = map.next_entry::<String, RawNode>()? {
                    fields.push((name, node));
                }
                Ok(FieldList(fields))
            }
        }

        deserializer.deserialize_map(FieldListVisitor)
    }
}

/// `validation.quality_checks`. Every group and every key is optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawQualityChecks {
    #[serde(default)]
    pub segment_coverage: SegmentCoverage,
    #[serde(default)]
    pub content_quality: ContentQuality,
    #[serde(default)]
    pub timestamp_validation: TimestampValidation,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SegmentCoverage {
    pub min_segments: Option<usize>,
    pub max_time_gap: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContentQuality {
    pub min_editorial_subjects: Option<usize>,
    pub min_visual_subjects: Option<usize>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TimestampValidation {
    #[serde(default)]
    pub enforce_sequence: bool,
    #[serde(default)]
    pub must_cover_full_video: bool,
}
