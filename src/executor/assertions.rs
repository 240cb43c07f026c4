//! Assertion evaluation and JSON path lookup

use serde_json::Value;

use crate::http::HttpResponse;
use crate::report::{AssertionFailure, AssertionResult};
use crate::scenario::template::{self, Context};
use crate::scenario::Assertion;

/// JSON type name used in failure messages
pub fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Find the value at `path`
///
/// Accepts a dotted path (`data.CPU model`, `items.0.id`), a JSON pointer
/// (`/data/year`), or an empty path / `$` for the root.
pub fn lookup<'a>(root: &'a Value, path: &str) -> Result<&'a Value, AssertionFailure> {
    if path.is_empty() || path == "$" {
        return Ok(root);
    }
    if path.starts_with('/') {
        return root.pointer(path).ok_or_else(|| AssertionFailure::MissingField {
            path: path.to_string(),
        });
    }

    let mut current = root;
    let mut walked = String::new();
    for segment in path.split('.') {
        let next = match current {
            Value::Object(map) => map.get(segment),
            Value::Array(items) => match segment.parse::<usize>() {
                Ok(index) => items.get(index),
                Err(_) => {
                    return Err(wrong_type(&walked, "object", current));
                }
            },
            other => return Err(wrong_type(&walked, "object", other)),
        };
        current = next.ok_or_else(|| AssertionFailure::MissingField {
            path: path.to_string(),
        })?;

        if !walked.is_empty() {
            walked.push('.');
        }
        walked.push_str(segment);
    }
    Ok(current)
}

fn wrong_type(path: &str, expected: &str, actual: &Value) -> AssertionFailure {
    AssertionFailure::WrongType {
        path: if path.is_empty() {
            "body".to_string()
        } else {
            path.to_string()
        },
        expected: expected.to_string(),
        actual: type_name(actual).to_string(),
    }
}

/// JSON equality that treats `3500` and `3500.0` as the same number
pub fn json_eq(actual: &Value, expected: &Value) -> bool {
    match (actual, expected) {
        // Integers compare exactly; floats only when either side is one
        (Value::Number(a), Value::Number(b)) => {
            if a.is_f64() || b.is_f64() {
                a.as_f64() == b.as_f64()
            } else {
                a == b
            }
        }
        (Value::Array(a), Value::Array(b)) => {
            a.len() == b.len() && a.iter().zip(b).all(|(x, y)| json_eq(x, y))
        }
        (Value::Object(a), Value::Object(b)) => {
            a.len() == b.len()
                && a
                    .iter()
                    .all(|(k, v)| b.get(k).is_some_and(|other| json_eq(v, other)))
        }
        _ => actual == expected,
    }
}

/// Check the step's expected status code
pub fn check_status(expected: u16, response: &HttpResponse) -> AssertionResult {
    let description = format!("status == {}", expected);
    if response.status == expected {
        AssertionResult::pass(description)
    } else {
        AssertionResult::fail(
            description,
            AssertionFailure::Mismatch {
                expected: Value::from(expected),
                actual: Value::from(response.status),
            },
        )
    }
}

/// Evaluate one assertion against a response
///
/// `json` is the parsed body, or `None` when the body is not JSON.
pub fn evaluate(
    assertion: &Assertion,
    response: &HttpResponse,
    json: Option<&Value>,
    context: &Context,
) -> AssertionResult {
    let description = assertion.describe();
    match check(assertion, response, json, context) {
        Ok(()) => AssertionResult::pass(description),
        Err(failure) => AssertionResult::fail(description, failure),
    }
}

fn check(
    assertion: &Assertion,
    response: &HttpResponse,
    json: Option<&Value>,
    context: &Context,
) -> Result<(), AssertionFailure> {
    match assertion {
        Assertion::Status { equals } => {
            if response.status == *equals {
                Ok(())
            } else {
                Err(AssertionFailure::Mismatch {
                    expected: Value::from(*equals),
                    actual: Value::from(response.status),
                })
            }
        }
        Assertion::BodyContains { substring } => {
            if response.body.contains(substring.as_str()) {
                Ok(())
            } else {
                Err(AssertionFailure::Mismatch {
                    expected: Value::String(substring.clone()),
                    actual: Value::String(response.body.clone()),
                })
            }
        }
        Assertion::Equals { path, value } => {
            let actual = lookup(json.ok_or(AssertionFailure::NotJson)?, path)?;
            let expected = resolve_expected(value, context)?;
            if json_eq(actual, &expected) {
                Ok(())
            } else {
                Err(AssertionFailure::Mismatch {
                    expected,
                    actual: actual.clone(),
                })
            }
        }
        Assertion::Contains { path, value } => {
            let actual = lookup(json.ok_or(AssertionFailure::NotJson)?, path)?;
            let expected = resolve_expected(value, context)?;
            let found = match actual {
                Value::String(s) => s.contains(template::render(&expected).as_str()),
                Value::Array(items) => items.iter().any(|item| json_eq(item, &expected)),
                other => return Err(wrong_type(path, "string or array", other)),
            };
            if found {
                Ok(())
            } else {
                Err(AssertionFailure::Mismatch {
                    expected,
                    actual: actual.clone(),
                })
            }
        }
        Assertion::IsArray { path } => {
            match lookup(json.ok_or(AssertionFailure::NotJson)?, path)? {
                Value::Array(_) => Ok(()),
                other => Err(wrong_type(path, "array", other)),
            }
        }
        Assertion::Length { path, equals } => {
            let actual = lookup(json.ok_or(AssertionFailure::NotJson)?, path)?;
            let len = match actual {
                Value::Array(items) => items.len(),
                Value::Object(map) => map.len(),
                Value::String(s) => s.chars().count(),
                other => return Err(wrong_type(path, "array, object or string", other)),
            };
            if len == *equals {
                Ok(())
            } else {
                Err(AssertionFailure::Mismatch {
                    expected: Value::from(*equals),
                    actual: Value::from(len),
                })
            }
        }
        Assertion::Present { path } => {
            lookup(json.ok_or(AssertionFailure::NotJson)?, path)?;
            Ok(())
        }
    }
}

fn resolve_expected(value: &Value, context: &Context) -> Result<Value, AssertionFailure> {
    template::resolve_value(value, context).map_err(|e| AssertionFailure::Unresolved {
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn response(status: u16, body: Value) -> HttpResponse {
        HttpResponse {
            status,
            headers: Vec::new(),
            body: body.to_string(),
        }
    }

    fn run(assertion: Assertion, body: Value, context: &Context) -> AssertionResult {
        let response = response(200, body);
        let json = response.json();
        evaluate(&assertion, &response, json.as_ref(), context)
    }

    #[test]
    fn test_lookup_paths() {
        let body = json!({
            "id": "7",
            "data": {"CPU model": "Intel Core i9", "tags": ["a", "b"]}
        });
        assert_eq!(lookup(&body, "data.CPU model").unwrap(), "Intel Core i9");
        assert_eq!(lookup(&body, "data.tags.1").unwrap(), "b");
        assert_eq!(lookup(&body, "/data/tags/0").unwrap(), "a");
        assert_eq!(lookup(&body, "").unwrap(), &body);
        assert_eq!(
            lookup(&body, "data.year").unwrap_err(),
            AssertionFailure::MissingField {
                path: "data.year".into()
            }
        );
        assert_eq!(
            lookup(&body, "id.length").unwrap_err(),
            AssertionFailure::WrongType {
                path: "id".into(),
                expected: "object".into(),
                actual: "string".into()
            }
        );
    }

    #[test]
    fn test_equals_with_template_and_numbers() {
        let mut ctx = Context::new();
        ctx.set("createdId", json!("ff80"));

        let body = json!({"id": "ff80", "data": {"price": 3500}});
        assert!(run(Assertion::equals("id", json!("{{createdId}}")), body.clone(), &ctx).passed);
        assert!(run(Assertion::equals("data.price", json!(3500.00)), body.clone(), &ctx).passed);

        let failed = run(Assertion::equals("data.price", json!(3000.5)), body, &ctx);
        assert_eq!(
            failed.failure,
            Some(AssertionFailure::Mismatch {
                expected: json!(3000.5),
                actual: json!(3500)
            })
        );
    }

    #[test]
    fn test_large_integers_compare_exactly() {
        assert!(!json_eq(&json!(9007199254740993u64), &json!(9007199254740992u64)));
        assert!(json_eq(&json!(9007199254740993u64), &json!(9007199254740993u64)));
        assert!(!json_eq(&json!(-9007199254740993i64), &json!(-9007199254740992i64)));
        assert!(json_eq(&json!(2025), &json!(2025.0)));

        let result = run(
            Assertion::equals("id", json!(9007199254740992u64)),
            json!({"id": 9007199254740993u64}),
            &Context::new(),
        );
        assert!(!result.passed);
    }

    #[test]
    fn test_missing_field_is_shape_failure() {
        let result = run(
            Assertion::equals("data.year", json!(2025)),
            json!({"id": "1", "name": "X"}),
            &Context::new(),
        );
        assert!(!result.passed);
        assert!(matches!(
            result.failure,
            Some(AssertionFailure::MissingField { .. })
        ));
    }

    #[test]
    fn test_contains() {
        let ctx = Context::new();
        let body = json!({"message": "Object with id = 7 has been deleted.", "tags": [1, 2]});
        assert!(run(Assertion::contains("message", "deleted"), body.clone(), &ctx).passed);
        assert!(run(Assertion::contains("tags", 2), body.clone(), &ctx).passed);
        assert!(!run(Assertion::contains("message", "created"), body.clone(), &ctx).passed);

        let wrong = run(
            Assertion::contains("message", "x"),
            json!({"message": 5}),
            &ctx,
        );
        assert!(matches!(
            wrong.failure,
            Some(AssertionFailure::WrongType { .. })
        ));
    }

    #[test]
    fn test_is_array_and_length() {
        let ctx = Context::new();
        let list = json!([{"id": "1"}, {"id": "2"}]);
        assert!(run(Assertion::is_array(""), list.clone(), &ctx).passed);
        assert!(run(Assertion::length("", 2), list.clone(), &ctx).passed);
        assert!(!run(Assertion::length("", 13), list, &ctx).passed);

        let not_sized = run(Assertion::length("", 1), json!(42), &ctx);
        assert_eq!(
            not_sized.failure,
            Some(AssertionFailure::WrongType {
                path: "body".into(),
                expected: "array, object or string".into(),
                actual: "number".into()
            })
        );

        let not_array = run(Assertion::is_array(""), json!({"id": "1"}), &ctx);
        assert_eq!(
            not_array.failure,
            Some(AssertionFailure::WrongType {
                path: "body".into(),
                expected: "array".into(),
                actual: "object".into()
            })
        );
    }

    #[test]
    fn test_non_json_body() {
        let response = HttpResponse {
            status: 200,
            headers: Vec::new(),
            body: "<html>oops</html>".into(),
        };
        let ctx = Context::new();
        let result = evaluate(&Assertion::present("id"), &response, None, &ctx);
        assert_eq!(result.failure, Some(AssertionFailure::NotJson));

        let body = evaluate(
            &Assertion::BodyContains {
                substring: "oops".into(),
            },
            &response,
            None,
            &ctx,
        );
        assert!(body.passed);
    }

    #[test]
    fn test_check_status() {
        assert!(check_status(200, &response(200, json!({}))).passed);
        let failed = check_status(200, &response(404, json!({})));
        assert_eq!(
            failed.failure,
            Some(AssertionFailure::Mismatch {
                expected: json!(200),
                actual: json!(404)
            })
        );
    }

    #[test]
    fn test_unresolved_expected_value() {
        let result = run(
            Assertion::equals("id", json!("{{createdId}}")),
            json!({"id": "1"}),
            &Context::new(),
        );
        assert!(matches!(
            result.failure,
            Some(AssertionFailure::Unresolved { .. })
        ));
    }
}
