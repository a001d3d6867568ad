//! JSON dataset loading and field detection.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::Value;

#[derive(Debug, thiserror::Error)]
pub enum DatasetError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid json in {path} (line {line}): {source}")]
    Json {
        path: PathBuf,
        line: usize,
        source: serde_json::Error,
    },
    #[error("{path}: expected a json array of objects or json lines")]
    Shape { path: PathBuf },
}

/// One dataset element, kept both raw (for storage) and parsed (for indexing).
#[derive(Debug, Clone)]
pub struct Document {
    pub raw: String,
    pub value: Value,
}

impl Document {
    pub fn new(value: Value) -> Self {
        Self {
            raw: value.to_string(),
            value,
        }
    }
}

/// Read a dataset: a top-level JSON array, or one JSON object per line.
pub fn load_documents(path: &Path) -> Result<Vec<Document>, DatasetError> {
    let body = std::fs::read_to_string(path).map_err(|source| DatasetError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_documents(&body).map_err(|err| match err {
        ParseFailure::Json { line, source } => DatasetError::Json {
            path: path.to_path_buf(),
            line,
            source,
        },
        ParseFailure::Shape => DatasetError::Shape {
            path: path.to_path_buf(),
        },
    })
}

#[derive(Debug)]
enum ParseFailure {
    Json {
        line: usize,
        source: serde_json::Error,
    },
    Shape,
}

fn parse_documents(body: &str) -> Result<Vec<Document>, ParseFailure> {
    let trimmed = body.trim_start();
    if trimmed.starts_with('[') {
        let value: Value = serde_json::from_str(body).map_err(|source| ParseFailure::Json {
            line: source.line(),
            source,
        })?;
        let Value::Array(items) = value else {
            return Err(ParseFailure::Shape);
        };
        if items.iter().any(|v| !v.is_object()) {
            return Err(ParseFailure::Shape);
        }
        return Ok(items.into_iter().map(Document::new).collect());
    }

    let mut docs = Vec::new();
    for (idx, line) in body.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let value: Value = serde_json::from_str(line).map_err(|source| ParseFailure::Json {
            line: idx + 1,
            source,
        })?;
        if !value.is_object() {
            return Err(ParseFailure::Shape);
        }
        docs.push(Document {
            raw: line.trim().to_string(),
            value,
        });
    }
    Ok(docs)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FieldKind {
    String,
    Number,
    Bool,
    Object,
    Mixed,
}

impl std::fmt::Display for FieldKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            FieldKind::String => "String",
            FieldKind::Number => "Number",
            FieldKind::Bool => "Bool",
            FieldKind::Object => "Object",
            FieldKind::Mixed => "Mixed",
        })
    }
}

/// A dotted field path seen in the dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DetectedField {
    pub name: String,
    pub kind: FieldKind,
    pub is_array: bool,
    /// Missing (or null) in at least one document.
    pub optional: bool,
}

#[derive(Default)]
struct FieldStats {
    kind: Option<FieldKind>,
    is_array: bool,
    present_in: usize,
}

impl FieldStats {
    fn observe(&mut self, kind: FieldKind) {
        self.kind = match self.kind {
            None => Some(kind),
            Some(prev) if prev == kind => Some(prev),
            Some(_) => Some(FieldKind::Mixed),
        };
    }
}

/// Walk every document and report the dotted paths found, sorted by name.
pub fn detect_fields(docs: &[Document]) -> Vec<DetectedField> {
    let mut stats: BTreeMap<String, FieldStats> = BTreeMap::new();
    for doc in docs {
        let mut seen = Vec::new();
        if let Value::Object(map) = &doc.value {
            for (key, value) in map {
                observe(key, value, &mut stats, &mut seen);
            }
        }
        seen.sort();
        seen.dedup();
        for name in seen {
            if let Some(entry) = stats.get_mut(&name) {
                entry.present_in += 1;
            }
        }
    }
    stats
        .into_iter()
        .map(|(name, s)| DetectedField {
            name,
            kind: s.kind.unwrap_or(FieldKind::Mixed),
            is_array: s.is_array,
            optional: s.present_in < docs.len(),
        })
        .collect()
}

fn observe(
    path: &str,
    value: &Value,
    stats: &mut BTreeMap<String, FieldStats>,
    seen: &mut Vec<String>,
) {
    match value {
        Value::Null => {}
        Value::Array(items) => {
            stats.entry(path.to_string()).or_default().is_array = true;
            for item in items {
                observe(path, item, stats, seen);
            }
        }
        Value::Object(map) => {
            stats
                .entry(path.to_string())
                .or_default()
                .observe(FieldKind::Object);
            seen.push(path.to_string());
            for (key, child) in map {
                observe(&format!("{path}.{key}"), child, stats, seen);
            }
        }
        scalar => {
            let kind = match scalar {
                Value::Bool(_) => FieldKind::Bool,
                Value::Number(_) => FieldKind::Number,
                _ => FieldKind::String,
            };
            stats.entry(path.to_string()).or_default().observe(kind);
            seen.push(path.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_array_and_json_lines() {
        let arr = parse_documents(r#"[{"a": 1}, {"a": 2}]"#).unwrap();
        assert_eq!(arr.len(), 2);
        assert_eq!(arr[1].value["a"], 2);

        let lines = parse_documents("{\"a\": 1}\n\n{\"a\": 3}\n").unwrap();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1].raw, "{\"a\": 3}");
    }

    #[test]
    fn rejects_non_object_elements() {
        assert!(matches!(
            parse_documents("[1, 2]"),
            Err(ParseFailure::Shape)
        ));
        assert!(matches!(
            parse_documents("{\"a\": 1}\n{oops"),
            Err(ParseFailure::Json { line: 2, .. })
        ));
    }

    #[test]
    fn load_reports_path_on_failure() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "[{\"a\": ").unwrap();
        let err = load_documents(&path).unwrap_err();
        assert!(err.to_string().contains("broken.json"), "{err}");
    }

    #[test]
    fn detects_nested_array_and_optional_fields() {
        let docs = vec![
            Document::new(json!({"name": "Bulbasaur", "abilities": ["Overgrow"], "stats": {"hp": 45}, "type2": "poison"})),
            Document::new(json!({"name": "Charmander", "abilities": ["Blaze"], "stats": {"hp": 39}, "type2": null})),
        ];
        let fields = detect_fields(&docs);
        let by_name = |n: &str| fields.iter().find(|f| f.name == n).unwrap().clone();

        assert_eq!(by_name("name").kind, FieldKind::String);
        assert!(!by_name("name").optional);
        assert!(by_name("abilities").is_array);
        assert_eq!(by_name("stats").kind, FieldKind::Object);
        assert_eq!(by_name("stats.hp").kind, FieldKind::Number);
        assert!(by_name("type2").optional);

        let names: Vec<_> = fields.iter().map(|f| f.name.as_str()).collect();
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);
    }
}
