//! Scenario definitions
//!
//! A [`Scenario`] is a named, ordered list of [`Step`]s plus the initial
//! variables of its context. Steps are validated as they are added: every
//! variable a step references must be declared up front or captured by an
//! earlier step.

pub mod builtin;
mod file;
mod step;
pub mod template;

use std::collections::{BTreeMap, BTreeSet};

use serde_json::Value;

use crate::common::{Error, Result};

pub use file::{load, LoadOptions, ScenarioFile};
pub use step::{Assertion, Backoff, Capture, RetryPolicy, Step, MAX_RETRIES};
pub use template::Context;

/// An ordered, named sequence of steps sharing one context
#[derive(Debug, Clone)]
pub struct Scenario {
    name: String,
    description: Option<String>,
    variables: BTreeMap<String, Value>,
    retry: Option<RetryPolicy>,
    steps: Vec<Step>,
    /// Variables available to the next step added
    known: BTreeSet<String>,
}

impl Scenario {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            variables: BTreeMap::new(),
            retry: None,
            steps: Vec::new(),
            known: BTreeSet::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Declare an initial context variable (a named override)
    pub fn with_variable(mut self, name: impl Into<String>, value: Value) -> Self {
        self.set_variable(name, value);
        self
    }

    pub fn set_variable(&mut self, name: impl Into<String>, value: Value) {
        let name = name.into();
        self.known.insert(name.clone());
        self.variables.insert(name, value);
    }

    /// Default retry policy for steps that do not set one
    pub fn with_retry(mut self, retry: RetryPolicy) -> Result<Self> {
        if retry.max_retries > MAX_RETRIES {
            return Err(Error::validation(
                &self.name,
                format!("max_retries {} exceeds the limit of {}", retry.max_retries, MAX_RETRIES),
            ));
        }
        self.retry = Some(retry);
        Ok(self)
    }

    /// Builder form of [`Scenario::add_step`]
    pub fn step(mut self, step: Step) -> Result<Self> {
        self.add_step(step)?;
        Ok(self)
    }

    /// Append a step after validating it against what earlier steps provide
    pub fn add_step(&mut self, step: Step) -> Result<()> {
        self.validate_step(&step)?;
        for capture in &step.captures {
            self.known.insert(capture.var.clone());
        }
        self.steps.push(step);
        Ok(())
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn variables(&self) -> &BTreeMap<String, Value> {
        &self.variables
    }

    pub fn retry(&self) -> Option<&RetryPolicy> {
        self.retry.as_ref()
    }

    /// Fresh context for one run of this scenario
    pub fn initial_context(&self) -> Context {
        Context::with_variables(self.variables.clone())
    }

    fn invalid(&self, step: &Step, message: impl std::fmt::Display) -> Error {
        Error::validation(
            &self.name,
            format!(
                "step {} ('{}'): {}",
                self.steps.len() + 1,
                step.name,
                message
            ),
        )
    }

    fn validate_step(&self, step: &Step) -> Result<()> {
        if step.name.trim().is_empty() {
            return Err(self.invalid(step, "step name must not be empty"));
        }
        if !(100..=599).contains(&step.expect_status) {
            return Err(self.invalid(
                step,
                format!("expect_status {} is not an HTTP status code", step.expect_status),
            ));
        }

        let mut referenced = Vec::new();

        let url_refs = template::references(&step.url)
            .map_err(|e| self.invalid(step, format!("url '{}': {}", step.url, e)))?;
        referenced.extend(url_refs.into_iter().map(|name| ("url", name)));

        for (header, value) in &step.headers {
            let refs = template::references(value)
                .map_err(|e| self.invalid(step, format!("header '{}': {}", header, e)))?;
            referenced.extend(refs.into_iter().map(|name| ("header", name)));
        }

        if let Some(body) = &step.body {
            let refs = template::value_references(body)
                .map_err(|e| self.invalid(step, format!("body: {}", e)))?;
            referenced.extend(refs.into_iter().map(|name| ("body", name)));
        }

        // Assertions run before this step's captures are applied
        for assertion in &step.assertions {
            if let Some(value) = assertion.expected_value() {
                let refs = template::value_references(value).map_err(|e| {
                    self.invalid(step, format!("assertion '{}': {}", assertion.describe(), e))
                })?;
                referenced.extend(refs.into_iter().map(|name| ("assertion", name)));
            }
        }

        if let Some((place, name)) = referenced
            .iter()
            .find(|(_, name)| !self.known.contains(name.as_str()))
        {
            return Err(self.invalid(
                step,
                format!(
                    "{} references '{{{{{}}}}}', which is neither a scenario variable nor captured by an earlier step",
                    place, name
                ),
            ));
        }

        for capture in &step.captures {
            if capture.var.trim().is_empty() {
                return Err(self.invalid(step, "capture variable name must not be empty"));
            }
        }

        if let Some(retry) = &step.retry {
            if retry.max_retries > MAX_RETRIES {
                return Err(self.invalid(
                    step,
                    format!("max_retries {} exceeds the limit of {}", retry.max_retries, MAX_RETRIES),
                ));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::Method;
    use serde_json::json;

    #[test]
    fn test_steps_keep_declared_order() {
        let scenario = Scenario::new("order")
            .step(Step::new("one", Method::Get, "/a"))
            .unwrap()
            .step(Step::new("two", Method::Get, "/b"))
            .unwrap();
        let names: Vec<_> = scenario.steps().iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["one", "two"]);
    }

    #[test]
    fn test_undeclared_variable_is_rejected() {
        let mut scenario = Scenario::new("crud");
        let err = scenario
            .add_step(Step::new("get", Method::Get, "/objects/{{createdId}}"))
            .unwrap_err();
        match err {
            Error::Validation { scenario, message } => {
                assert_eq!(scenario, "crud");
                assert!(message.contains("createdId"), "{message}");
                assert!(message.contains("step 1"), "{message}");
            }
            other => panic!("Expected Validation, got {other:?}"),
        }
        assert!(scenario.steps().is_empty());
    }

    #[test]
    fn test_capture_makes_variable_available_to_later_steps() {
        let mut scenario = Scenario::new("crud").with_variable("base_url", json!("http://x"));
        scenario
            .add_step(
                Step::new("create", Method::Post, "{{base_url}}/objects")
                    .with_capture("createdId", "id"),
            )
            .unwrap();
        scenario
            .add_step(Step::new("get", Method::Get, "{{base_url}}/objects/{{createdId}}"))
            .unwrap();
        assert_eq!(scenario.steps().len(), 2);
    }

    #[test]
    fn test_assertion_cannot_use_own_capture() {
        let mut scenario = Scenario::new("crud");
        let err = scenario
            .add_step(
                Step::new("create", Method::Post, "/objects")
                    .with_capture("createdId", "id")
                    .with_assertion(Assertion::equals("id", json!("{{createdId}}"))),
            )
            .unwrap_err();
        assert!(matches!(err, Error::Validation { .. }));
    }

    #[test]
    fn test_body_and_header_references_are_checked() {
        let mut scenario = Scenario::new("s").with_variable("token", json!("abc"));
        scenario
            .add_step(Step::new("ok", Method::Get, "/").with_header("Authorization", "Bearer {{token}}"))
            .unwrap();
        assert!(scenario
            .add_step(Step::new("bad", Method::Post, "/").with_body(json!({"owner": "{{user}}"})))
            .is_err());
    }

    #[test]
    fn test_malformed_template_is_rejected() {
        let mut scenario = Scenario::new("s");
        let err = scenario
            .add_step(Step::new("bad", Method::Get, "/objects/{{id"))
            .unwrap_err();
        assert!(err.to_string().contains("unterminated"));
    }

    #[test]
    fn test_retry_cap_and_status_are_checked() {
        let mut scenario = Scenario::new("s");
        assert!(scenario
            .add_step(Step::new("a", Method::Get, "/").with_retry(RetryPolicy::fixed(
                MAX_RETRIES + 1,
                std::time::Duration::from_millis(1)
            )))
            .is_err());
        assert!(scenario
            .add_step(Step::new("b", Method::Get, "/").with_status(42))
            .is_err());

        let err = Scenario::new("too many")
            .with_retry(RetryPolicy::fixed(
                MAX_RETRIES + 1,
                std::time::Duration::from_millis(1),
            ))
            .unwrap_err();
        assert!(err.to_string().contains("exceeds the limit"));
        assert!(Scenario::new("ok")
            .with_retry(RetryPolicy::fixed(MAX_RETRIES, std::time::Duration::from_millis(1)))
            .is_ok());
        assert!(scenario.add_step(Step::new("  ", Method::Get, "/")).is_err());
    }

    #[test]
    fn test_initial_context_is_fresh_copy() {
        let scenario = Scenario::new("s").with_variable("fixedId", json!("ff80"));
        let mut first = scenario.initial_context();
        first.set("createdId", json!("1"));
        let second = scenario.initial_context();
        assert!(!second.contains("createdId"));
        assert_eq!(second.get("fixedId"), Some(&json!("ff80")));
    }
}
