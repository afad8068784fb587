//! Shape checks on an index before typed decoding.
//!
//! Unlike deserialization, which stops at the first bad record, validation
//! walks every entry and reports all problems with their position.

use crate::entry::Category;
use crate::persist::split_js_assignment;
use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::Value;

pub const FIELDS: [&str; 5] = ["location", "page", "title", "text", "category"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Problem {
    /// Entry position, `None` for problems with the container itself.
    pub entry: Option<usize>,
    pub message: String,
}

#[derive(Debug, Default, Serialize)]
pub struct ValidationReport {
    pub entries: usize,
    pub errors: Vec<Problem>,
    pub warnings: Vec<Problem>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool { self.errors.is_empty() }

    fn error(&mut self, entry: Option<usize>, message: impl Into<String>) {
        self.errors.push(Problem { entry, message: message.into() });
    }

    fn warn(&mut self, entry: usize, message: impl Into<String>) {
        self.warnings.push(Problem { entry: Some(entry), message: message.into() });
    }
}

/// Validate the text of an artifact, JS assignment or bare JSON.
pub fn validate_str(s: &str) -> Result<ValidationReport> {
    let json = if s.trim_start().starts_with('{') { s } else { split_js_assignment(s)?.1 };
    let value: Value = serde_json::from_str(json).context("index is not valid JSON")?;
    Ok(validate_value(&value))
}

pub fn validate_value(value: &Value) -> ValidationReport {
    let mut report = ValidationReport::default();
    let docs = match value.get("docs") {
        Some(Value::Array(docs)) => docs,
        Some(_) => {
            report.error(None, "`docs` is not an array");
            return report;
        }
        None => {
            report.error(None, "missing `docs` array");
            return report;
        }
    };
    report.entries = docs.len();

    for (i, doc) in docs.iter().enumerate() {
        let obj = match doc.as_object() {
            Some(obj) => obj,
            None => {
                report.error(Some(i), "entry is not an object");
                continue;
            }
        };
        for field in FIELDS {
            match obj.get(field) {
                None => report.error(Some(i), format!("missing field `{field}`")),
                Some(Value::String(_)) => {}
                Some(other) => report.error(Some(i), format!("field `{field}` is {}, expected string", kind(other))),
            }
        }
        for key in obj.keys().filter(|k| !FIELDS.contains(&k.as_str())) {
            report.error(Some(i), format!("unexpected field `{key}`"));
        }
        if let Some(Value::String(cat)) = obj.get("category") {
            match cat.parse::<Category>() {
                Ok(Category::Section) => {
                    if obj.get("text").and_then(Value::as_str).is_some_and(|t| !t.is_empty()) {
                        report.warn(i, "section entry carries body text");
                    }
                }
                Ok(_) => {}
                Err(e) => report.error(Some(i), e.to_string()),
            }
        }
    }
    report
}

fn kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
