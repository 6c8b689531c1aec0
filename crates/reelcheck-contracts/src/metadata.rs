//! Metadata documents produced by the generation service.
//!
//! Segments stay as JSON objects: the validator must be able to report a
//! missing or mistyped field instead of failing to deserialize the whole
//! document. Typed accessors cover the few fields the quality checks read.

use std::fmt;

use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

use crate::error::{ReelcheckError, ReelcheckResult};
use crate::rules::{ConfidenceLevel, SEGMENTS_FIELD};

/// Key holding the per-field confidence map inside a segment.
pub const CONFIDENCE_FIELD: &str = "confidence_level";

/// A metadata document: top-level fields plus an ordered segment list.
#[derive(Debug, Clone, PartialEq)]
pub struct MetadataDocument {
    root: Map<String, Value>,
    segments: Vec<Segment>,
}

impl MetadataDocument {
    /// Parse a raw JSON document.
    ///
    /// Fails with `MetadataParse` when the text is not JSON, the top level is
    /// not an object, `segments` is missing or not an array, or a segment is
    /// not an object.
    pub fn from_json_str(raw: &str) -> ReelcheckResult<Self> {
        let value: Value = serde_json::from_str(raw).map_err(|e| ReelcheckError::MetadataParse {
            reason: format!("invalid JSON: {e}"),
        })?;
        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> ReelcheckResult<Self> {
        let Value::Object(mut root) = value else {
            return Err(ReelcheckError::MetadataParse {
                reason: "top-level value must be an object".to_string(),
            });
        };
        let raw_segments = match root.remove(SEGMENTS_FIELD) {
            Some(Value::Array(items)) => items,
            Some(_) => {
                return Err(ReelcheckError::MetadataParse {
                    reason: format!("field '{SEGMENTS_FIELD}' should be an array"),
                })
            }
            None => {
                return Err(ReelcheckError::MetadataParse {
                    reason: format!("required field '{SEGMENTS_FIELD}' is missing"),
                })
            }
        };

        let segments = raw_segments
            .into_iter()
            .enumerate()
            .map(|(index, item)| match item {
                Value::Object(fields) => Ok(Segment { index, fields }),
                other => Err(ReelcheckError::MetadataParse {
                    reason: format!("segment {index} should be an object, found {}", json_kind(&other)),
                }),
            })
            .collect::<ReelcheckResult<Vec<_>>>()?;

        Ok(Self { root, segments })
    }

    /// Top-level fields other than `segments`.
    pub fn root(&self) -> &Map<String, Value> {
        &self.root
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Rebuild the full JSON value, segments included.
    pub fn to_value(&self) -> Value {
        let mut root = self.root.clone();
        root.insert(
            SEGMENTS_FIELD.to_string(),
            Value::Array(
                self.segments
                    .iter()
                    .map(|s| Value::Object(s.fields.clone()))
                    .collect(),
            ),
        );
        Value::Object(root)
    }
}

impl Serialize for MetadataDocument {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

/// One time-bounded region of the video.
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    index: usize,
    fields: Map<String, Value>,
}

impl Segment {
    /// Position of the segment in the document, starting at 0.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// Confidence reported for `field`.
    ///
    /// Reads `confidence_level.<field>` first. When the map has no entry for
    /// the field, falls back to flat segment-wide `confidence` / `score`
    /// keys, which older generators emitted.
    pub fn confidence_for(&self, field: &str) -> Option<ConfidenceEntry> {
        let entry = self
            .fields
            .get(CONFIDENCE_FIELD)
            .and_then(Value::as_object)
            .and_then(|map| map.get(field))
            .and_then(Value::as_object);

        if let Some(entry) = entry {
            return Some(ConfidenceEntry {
                score: entry.get("score").and_then(Value::as_f64),
                level: entry.get("level").and_then(Value::as_str).map(str::to_string),
            });
        }

        let score = self.fields.get("score").and_then(Value::as_f64);
        let level = self
            .fields
            .get("confidence")
            .and_then(Value::as_str)
            .map(str::to_string);
        if score.is_none() && level.is_none() {
            None
        } else {
            Some(ConfidenceEntry { score, level })
        }
    }
}

/// Confidence reported by the generator for one field.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfidenceEntry {
    pub score: Option<f64>,
    /// Raw level text; may be misspelled, in which case it has no rank.
    pub level: Option<String>,
}

impl ConfidenceEntry {
    pub fn parsed_level(&self) -> Option<ConfidenceLevel> {
        self.level.as_deref().and_then(ConfidenceLevel::parse)
    }
}

/// A `HH:MM` clock value folded into a single number of minor units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ClockValue(pub u32);

impl ClockValue {
    pub fn parse(raw: &str) -> Option<Self> {
        let (major, minor) = raw.trim().split_once(':')?;
        let major: u32 = major.parse().ok()?;
        let minor: u32 = minor.parse().ok()?;
        if minor >= 60 {
            return None;
        }
        // Out-of-range clock text counts as unparseable.
        Some(Self(major.checked_mul(60)?.checked_add(minor)?))
    }
}

impl fmt::Display for ClockValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.0 / 60, self.0 % 60)
    }
}

/// Parsed `start–end` timestamp range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    pub start: ClockValue,
    pub end: ClockValue,
}

impl TimeRange {
    /// Parse `HH:MM–HH:MM`. En dash, em dash and hyphen separators are accepted.
    pub fn parse(raw: &str) -> Option<Self> {
        let (start, end) = raw.split_once(['–', '—', '-'])?;
        Some(Self {
            start: ClockValue::parse(start)?,
            end: ClockValue::parse(end)?,
        })
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}–{}", self.start, self.end)
    }
}

/// Human name of a JSON value's type, used in error details.
pub fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
