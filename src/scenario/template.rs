//! Scenario context and `{{variable}}` templates
//!
//! Templates appear in URLs, headers, request bodies and expected values.
//! Resolution is pure: the same template and context always produce the
//! same output.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::common::{Error, Result};

/// Per-scenario variables, seeded from the scenario definition and
/// extended by captures as steps run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Context {
    values: BTreeMap<String, Value>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_variables(values: BTreeMap<String, Value>) -> Self {
        Self { values }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Set a variable, returning the previous value if it was overwritten
    pub fn set(&mut self, name: impl Into<String>, value: Value) -> Option<Value> {
        self.values.insert(name.into(), value)
    }
}

/// A piece of a parsed template
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment<'a> {
    Literal(&'a str),
    Variable(&'a str),
}

/// Syntax problem in a template
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyntaxError {
    Unterminated { offset: usize },
    EmptyName { offset: usize },
}

impl std::fmt::Display for SyntaxError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SyntaxError::Unterminated { offset } => {
                write!(f, "unterminated '{{{{' at offset {}", offset)
            }
            SyntaxError::EmptyName { offset } => {
                write!(f, "empty variable name at offset {}", offset)
            }
        }
    }
}

/// Split a template into literal text and variable references
pub fn parse(template: &str) -> std::result::Result<Vec<Segment<'_>>, SyntaxError> {
    let mut segments = Vec::new();
    let mut rest = template;
    let mut offset = 0;

    while let Some(start) = rest.find("{{") {
        if start > 0 {
            segments.push(Segment::Literal(&rest[..start]));
        }
        let after_open = &rest[start + 2..];
        let end = after_open.find("}}").ok_or(SyntaxError::Unterminated {
            offset: offset + start,
        })?;
        let name = after_open[..end].trim();
        if name.is_empty() {
            return Err(SyntaxError::EmptyName {
                offset: offset + start,
            });
        }
        segments.push(Segment::Variable(name));

        let consumed = start + 2 + end + 2;
        offset += consumed;
        rest = &rest[consumed..];
    }

    if !rest.is_empty() {
        segments.push(Segment::Literal(rest));
    }
    Ok(segments)
}

/// Names of the variables a template references, in order of appearance
pub fn references(template: &str) -> std::result::Result<Vec<String>, SyntaxError> {
    Ok(parse(template)?
        .into_iter()
        .filter_map(|s| match s {
            Segment::Variable(name) => Some(name.to_string()),
            Segment::Literal(_) => None,
        })
        .collect())
}

/// Variables referenced by any string inside a JSON value
pub fn value_references(value: &Value) -> std::result::Result<Vec<String>, SyntaxError> {
    let mut names = Vec::new();
    collect_references(value, &mut names)?;
    Ok(names)
}

fn collect_references(
    value: &Value,
    names: &mut Vec<String>,
) -> std::result::Result<(), SyntaxError> {
    match value {
        Value::String(s) => names.extend(references(s)?),
        Value::Array(items) => {
            for item in items {
                collect_references(item, names)?;
            }
        }
        Value::Object(map) => {
            for item in map.values() {
                collect_references(item, names)?;
            }
        }
        _ => {}
    }
    Ok(())
}

/// Text form of a context value when spliced into a string
pub fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Substitute context variables into a string template
///
/// Malformed placeholders are left as literal text; scenario validation
/// reports them before anything runs.
pub fn resolve_str(template: &str, context: &Context) -> Result<String> {
    let segments = match parse(template) {
        Ok(segments) => segments,
        Err(_) => return Ok(template.to_string()),
    };

    let mut out = String::with_capacity(template.len());
    for segment in segments {
        match segment {
            Segment::Literal(text) => out.push_str(text),
            Segment::Variable(name) => {
                let value = context
                    .get(name)
                    .ok_or_else(|| Error::template_resolution(template, name))?;
                out.push_str(&render(value));
            }
        }
    }
    Ok(out)
}

/// Substitute context variables into every string of a JSON value
///
/// A string consisting of a single placeholder is replaced by the
/// variable's JSON value itself, so numbers and objects keep their type.
pub fn resolve_value(value: &Value, context: &Context) -> Result<Value> {
    match value {
        Value::String(s) => {
            if let Ok(segments) = parse(s) {
                if let [Segment::Variable(name)] = segments.as_slice() {
                    return context
                        .get(name)
                        .cloned()
                        .ok_or_else(|| Error::template_resolution(s, name));
                }
            }
            Ok(Value::String(resolve_str(s, context)?))
        }
        Value::Array(items) => Ok(Value::Array(
            items
                .iter()
                .map(|item| resolve_value(item, context))
                .collect::<Result<_>>()?,
        )),
        Value::Object(map) => {
            let mut resolved = serde_json::Map::with_capacity(map.len());
            for (key, item) in map {
                resolved.insert(key.clone(), resolve_value(item, context)?);
            }
            Ok(Value::Object(resolved))
        }
        other => Ok(other.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn context() -> Context {
        let mut ctx = Context::new();
        ctx.set("base_url", json!("https://api.example.test"));
        ctx.set("createdId", json!("ff80"));
        ctx.set("count", json!(13));
        ctx
    }

    #[test]
    fn test_parse_segments() {
        let segments = parse("{{base_url}}/objects/{{ createdId }}").unwrap();
        assert_eq!(
            segments,
            vec![
                Segment::Variable("base_url"),
                Segment::Literal("/objects/"),
                Segment::Variable("createdId"),
            ]
        );
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(
            parse("/objects/{{id").unwrap_err(),
            SyntaxError::Unterminated { offset: 9 }
        );
        assert_eq!(
            parse("a{{ }}").unwrap_err(),
            SyntaxError::EmptyName { offset: 1 }
        );
    }

    #[test]
    fn test_resolve_str() {
        let url = resolve_str("{{base_url}}/objects/{{createdId}}", &context()).unwrap();
        assert_eq!(url, "https://api.example.test/objects/ff80");

        let n = resolve_str("limit={{count}}", &context()).unwrap();
        assert_eq!(n, "limit=13");
    }

    #[test]
    fn test_resolve_is_pure() {
        let ctx = context();
        let template = "{{base_url}}/objects/{{createdId}}";
        let first = resolve_str(template, &ctx).unwrap();
        let second = resolve_str(template, &ctx).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_resolve_missing_variable() {
        let err = resolve_str("/objects/{{missing}}", &context()).unwrap_err();
        match err {
            Error::TemplateResolution { variable, .. } => assert_eq!(variable, "missing"),
            other => panic!("Expected TemplateResolution, got {other:?}"),
        }
    }

    #[test]
    fn test_resolve_value_keeps_types() {
        let body = json!({
            "id": "{{createdId}}",
            "count": "{{count}}",
            "label": "item {{count}}",
            "nested": [{"ref": "{{createdId}}"}],
            "price": 3000.5
        });
        let resolved = resolve_value(&body, &context()).unwrap();
        assert_eq!(
            resolved,
            json!({
                "id": "ff80",
                "count": 13,
                "label": "item 13",
                "nested": [{"ref": "ff80"}],
                "price": 3000.5
            })
        );
    }

    #[test]
    fn test_value_references() {
        let names = value_references(&json!({"a": "{{x}}", "b": ["{{y}} and {{z}}"]})).unwrap();
        assert_eq!(names, vec!["x", "y", "z"]);
    }

    #[test]
    fn test_context_overwrite_returns_previous() {
        let mut ctx = Context::new();
        assert!(ctx.set("id", json!("1")).is_none());
        assert_eq!(ctx.set("id", json!("2")), Some(json!("1")));
        assert_eq!(ctx.get("id"), Some(&json!("2")));
    }
}
