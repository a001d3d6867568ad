//! Dotted field-path resolution over raw JSON documents.
//!
//! Arrays met anywhere along the path are flattened: the remaining path is
//! applied to every element and the hits are collected in document order.
//! Misses and malformed input resolve to [`ResolvedValue::Absent`] rather than
//! an error, since sparse schemas are the normal case for display columns.

use itertools::Itertools;
use serde_json::{Map, Number, Value};

#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    String(String),
    Number(Number),
    Bool(bool),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedValue {
    Absent,
    Scalar(Scalar),
    List(Vec<ResolvedValue>),
    Object(Map<String, Value>),
}

impl ResolvedValue {
    pub fn is_absent(&self) -> bool {
        matches!(self, ResolvedValue::Absent)
    }

    /// Leaf scalars in order, descending through nested lists.
    pub fn scalars(&self) -> Vec<&Scalar> {
        let mut out = Vec::new();
        collect_scalars(self, &mut out);
        out
    }
}

fn collect_scalars<'a>(value: &'a ResolvedValue, out: &mut Vec<&'a Scalar>) {
    match value {
        ResolvedValue::Scalar(s) => out.push(s),
        ResolvedValue::List(items) => {
            for item in items {
                collect_scalars(item, out);
            }
        }
        ResolvedValue::Absent | ResolvedValue::Object(_) => {}
    }
}

impl std::fmt::Display for Scalar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Scalar::String(s) => f.write_str(s),
            Scalar::Number(n) => write!(f, "{n}"),
            Scalar::Bool(b) => write!(f, "{b}"),
        }
    }
}

/// Resolve `path` against `document`.
pub fn resolve(document: &Value, path: &[&str]) -> ResolvedValue {
    if path.is_empty() {
        return ResolvedValue::Absent;
    }
    walk(document, path)
}

fn walk(node: &Value, remaining: &[&str]) -> ResolvedValue {
    let Some((head, rest)) = remaining.split_first() else {
        return ResolvedValue::Absent;
    };
    match node {
        Value::Array(items) => {
            let hits: Vec<ResolvedValue> = items
                .iter()
                .map(|item| walk(item, remaining))
                .filter(|v| !v.is_absent())
                .collect();
            if hits.is_empty() {
                ResolvedValue::Absent
            } else {
                ResolvedValue::List(hits)
            }
        }
        Value::Object(map) => match map.get(*head) {
            Some(child) if rest.is_empty() => leaf(child),
            Some(child) => walk(child, rest),
            None => ResolvedValue::Absent,
        },
        _ => ResolvedValue::Absent,
    }
}

fn leaf(value: &Value) -> ResolvedValue {
    match value {
        Value::Null => ResolvedValue::Absent,
        Value::Bool(b) => ResolvedValue::Scalar(Scalar::Bool(*b)),
        Value::Number(n) => ResolvedValue::Scalar(Scalar::Number(n.clone())),
        Value::String(s) => ResolvedValue::Scalar(Scalar::String(s.clone())),
        Value::Array(items) => {
            let kept: Vec<ResolvedValue> = items
                .iter()
                .map(leaf)
                .filter(|v| !v.is_absent())
                .collect();
            if kept.is_empty() {
                ResolvedValue::Absent
            } else {
                ResolvedValue::List(kept)
            }
        }
        Value::Object(map) => ResolvedValue::Object(map.clone()),
    }
}

/// Split a dotted path (`"stats.attack"`) into components.
pub fn split_path(path: &str) -> Vec<&str> {
    if path.is_empty() {
        return Vec::new();
    }
    path.split('.').collect()
}

/// Resolve a dotted path against an already parsed document.
pub fn resolve_path(document: &Value, path: &str) -> ResolvedValue {
    resolve(document, &split_path(path))
}

/// Parse `raw` and resolve a dotted path; unparseable input is `Absent`.
pub fn resolve_json(raw: &str, path: &str) -> ResolvedValue {
    if raw.is_empty() || path.is_empty() {
        return ResolvedValue::Absent;
    }
    match serde_json::from_str::<Value>(raw) {
        Ok(document) => resolve_path(&document, path),
        Err(err) => {
            tracing::debug!(error = %err, "document is not valid json");
            ResolvedValue::Absent
        }
    }
}

/// Render a resolved value as a single display string.
pub fn format_value(value: &ResolvedValue) -> String {
    match value {
        ResolvedValue::Absent => String::new(),
        ResolvedValue::Scalar(s) => s.to_string(),
        ResolvedValue::List(items) => items.iter().map(format_value).join(", "),
        ResolvedValue::Object(map) => {
            let inner = map
                .iter()
                .map(|(k, v)| format!("{}: {v}", Value::String(k.clone())))
                .join(", ");
            format!("{{{inner}}}")
        }
    }
}

/// `format_value(resolve_json(raw, path))`.
pub fn field_value(raw: &str, path: &str) -> String {
    format_value(&resolve_json(raw, path))
}
