//! Raw document → compiled `RuleSet`.
//!
//! Compilation is total: every structural problem in the document is a
//! `RuleParse` error naming the dotted path of the offending node. Nothing
//! is defaulted silently except constraint keys that do not apply to the
//! node's declared type, which are ignored with a warning.

use serde_json::Value;
use tracing::{debug, warn};

use reelcheck_contracts::{
    error::{ReelcheckError, ReelcheckResult},
    rules::{
        ArrayRule, ConfidenceLevel, ConfidenceThresholds, ItemRule, NumberRule, ObjectRule,
        Pattern, QualityChecks, RuleKind, RuleNode, RuleSet, StringRule, ValueType,
    },
};

use crate::document::{RawItems, RawNode, RawQualityChecks, RawThreshold, RuleDocument};

const ROOT_PATH: &str = "validation.structure";

/// Compile a deserialized rule document.
pub fn compile(document: RuleDocument) -> ReelcheckResult<RuleSet> {
    let validation = document.validation.ok_or_else(|| parse_error("document has no 'validation' section"))?;
    let structure = validation
        .structure
        .ok_or_else(|| parse_error("document has no 'validation.structure' section"))?;

    let root = compile_node(ROOT_PATH, structure)?;
    let quality = compile_quality(validation.quality_checks);
    let rules = RuleSet::new(root, quality)?;

    debug!(
        segment_fields = rules.segment_schema().fields.len(),
        "compiled rule set"
    );
    Ok(rules)
}

fn compile_node(path: &str, raw: RawNode) -> ReelcheckResult<RuleNode> {
    let type_name = raw
        .kind
        .as_deref()
        .ok_or_else(|| parse_error(format!("node '{path}' has no type")))?;
    let value_type = ValueType::parse(type_name)
        .ok_or_else(|| parse_error(format!("node '{path}' has unknown type '{type_name}'")))?;

    let confidence = ConfidenceThresholds {
        level: raw
            .confidence
            .as_ref()
            .and_then(RawThreshold::value)
            .map(|threshold| level_threshold(path, threshold))
            .transpose()?,
        score: raw
            .score
            .as_ref()
            .and_then(RawThreshold::value)
            .map(|threshold| score_threshold(path, threshold))
            .transpose()?,
    };

    warn_inapplicable(path, value_type, &raw);

    let kind = match value_type {
        ValueType::String => RuleKind::String(compile_string(path, &raw)?),
        ValueType::Number => RuleKind::Number(compile_number(path, &raw)?),
        ValueType::Array => RuleKind::Array(compile_array(path, raw.min_items, raw.item_schema, raw.items)?),
        ValueType::Object => {
            let fields = raw.fields.map(|list| list.0).unwrap_or_default();
            RuleKind::Object(compile_object(path, fields)?)
        }
    };

    Ok(RuleNode {
        required: raw.required,
        aliases: raw.aliases,
        confidence,
        kind,
    })
}

fn compile_string(path: &str, raw: &RawNode) -> ReelcheckResult<StringRule> {
    let pattern = raw
        .pattern
        .as_deref()
        .map(|source| {
            Pattern::new(source).map_err(|e| match e {
                ReelcheckError::RuleParse { reason } => parse_error(format!("node '{path}': {reason}")),
                other => other,
            })
        })
        .transpose()?;

    let allowed = raw
        .allowed
        .as_ref()
        .map(|values| {
            values
                .iter()
                .map(|value| {
                    value.as_str().map(str::to_string).ok_or_else(|| {
                        parse_error(format!("node '{path}': enum value {value} is not a string"))
                    })
                })
                .collect::<ReelcheckResult<Vec<_>>>()
        })
        .transpose()?;

    Ok(StringRule {
        min_length: raw.min_length,
        pattern,
        allowed,
    })
}

fn compile_number(path: &str, raw: &RawNode) -> ReelcheckResult<NumberRule> {
    let min = match (raw.min, raw.threshold) {
        (Some(a), Some(b)) => Some(a.max(b)),
        (a, b) => a.or(b),
    };
    if let (Some(min), Some(max)) = (min, raw.max) {
        if min > max {
            return Err(parse_error(format!("node '{path}': min {min} is greater than max {max}")));
        }
    }

    let allowed = raw
        .allowed
        .as_ref()
        .map(|values| {
            values
                .iter()
                .map(|value| {
                    value.as_f64().ok_or_else(|| {
                        parse_error(format!("node '{path}': enum value {value} is not a number"))
                    })
                })
                .collect::<ReelcheckResult<Vec<_>>>()
        })
        .transpose()?;

    Ok(NumberRule {
        min,
        max: raw.max,
        allowed,
    })
}

fn compile_array(
    path: &str,
    min_items: Option<usize>,
    item_schema: Option<Box<RawNode>>,
    items: Option<RawItems>,
) -> ReelcheckResult<ArrayRule> {
    let items = match (item_schema, items) {
        (Some(schema), _) | (None, Some(RawItems::Node(schema))) => {
            let child = compile_node(&format!("{path}.item_schema"), *schema)?;
            ItemRule::Schema(Box::new(child))
        }
        (None, Some(RawItems::Type(name))) => {
            let element = ValueType::parse(&name).ok_or_else(|| {
                parse_error(format!("node '{path}' has unknown element type '{name}'"))
            })?;
            ItemRule::Element(element)
        }
        (None, None) => {
            return Err(parse_error(format!(
                "array node '{path}' has neither item_schema nor items"
            )))
        }
    };
    Ok(ArrayRule { min_items, items })
}

fn compile_object(path: &str, fields: Vec<(String, RawNode)>) -> ReelcheckResult<ObjectRule> {
    if fields.is_empty() {
        return Err(parse_error(format!("object node '{path}' has no fields")));
    }
    let mut compiled = Vec::with_capacity(fields.len());
    for (name, raw) in fields {
        if compiled.iter().any(|(existing, _): &(String, RuleNode)| *existing == name) {
            return Err(parse_error(format!("object node '{path}' declares '{name}' twice")));
        }
        let node = compile_node(&format!("{path}.{name}"), raw)?;
        compiled.push((name, node));
    }
    Ok(ObjectRule { fields: compiled })
}

fn level_threshold(path: &str, threshold: &Value) -> ReelcheckResult<ConfidenceLevel> {
    threshold
        .as_str()
        .and_then(ConfidenceLevel::parse)
        .ok_or_else(|| {
            parse_error(format!(
                "node '{path}': confidence threshold {threshold} is not one of low, medium, high"
            ))
        })
}

fn score_threshold(path: &str, threshold: &Value) -> ReelcheckResult<f64> {
    match threshold.as_f64() {
        Some(score) if (0.0..=100.0).contains(&score) => Ok(score),
        _ => Err(parse_error(format!(
            "node '{path}': score threshold {threshold} is not a number between 0 and 100"
        ))),
    }
}

fn compile_quality(raw: RawQualityChecks) -> QualityChecks {
    QualityChecks {
        min_segments: raw.segment_coverage.min_segments,
        max_time_gap: raw.segment_coverage.max_time_gap,
        min_editorial_subjects: raw.content_quality.min_editorial_subjects,
        min_visual_subjects: raw.content_quality.min_visual_subjects,
        enforce_sequence: raw.timestamp_validation.enforce_sequence,
        must_cover_full_video: raw.timestamp_validation.must_cover_full_video,
    }
}

fn warn_inapplicable(path: &str, value_type: ValueType, raw: &RawNode) {
    let string_keys = raw.min_length.is_some() || raw.pattern.is_some();
    let number_keys = raw.min.is_some() || raw.max.is_some() || raw.threshold.is_some();
    let array_keys = raw.min_items.is_some() || raw.item_schema.is_some() || raw.items.is_some();
    let stray = match value_type {
        ValueType::String => number_keys || array_keys || raw.fields.is_some(),
        ValueType::Number => string_keys || array_keys || raw.fields.is_some(),
        ValueType::Array => string_keys || number_keys || raw.allowed.is_some() || raw.fields.is_some(),
        ValueType::Object => string_keys || number_keys || array_keys || raw.allowed.is_some(),
    };
    if stray {
        warn!(path, declared = %value_type, "ignoring constraints that do not apply to the declared type");
    }
}

fn parse_error(reason: impl Into<String>) -> ReelcheckError {
    ReelcheckError::RuleParse { reason: reason.into() }
}

/// Convenience for callers holding an already-parsed JSON tree.
pub fn compile_value(value: Value) -> ReelcheckResult<RuleSet> {
    let document: RuleDocument = serde_json::from_value(value)
        .map_err(|e| parse_error(format!("rule document does not match the expected layout: {e}")))?;
    compile(document)
}
