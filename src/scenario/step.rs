//! Step, assertion, capture and retry types
//!
//! These types deserialize directly from scenario files and can also be
//! built in code with the `with_*` methods.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::http::Method;

/// Upper bound on retries for a single step
pub const MAX_RETRIES: u32 = 10;

/// One HTTP interaction and its expected outcome
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    /// Human readable step name, shown in reports
    pub name: String,
    pub method: Method,
    /// URL template, e.g. `{{base_url}}/objects/{{createdId}}`
    pub url: String,
    /// Header templates sent with this step only
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
    /// JSON body template
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
    #[serde(default = "default_status")]
    pub expect_status: u16,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub assertions: Vec<Assertion>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub captures: Vec<Capture>,
    /// JSON paths whose absence is noted as a warning instead of failing
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warn_if_missing: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
    /// Overrides the scenario's retry policy for this step
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry: Option<RetryPolicy>,
}

fn default_status() -> u16 {
    200
}

impl Step {
    pub fn new(name: impl Into<String>, method: Method, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            method,
            url: url.into(),
            headers: BTreeMap::new(),
            body: None,
            expect_status: default_status(),
            assertions: Vec::new(),
            captures: Vec::new(),
            warn_if_missing: Vec::new(),
            timeout_ms: None,
            retry: None,
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.expect_status = status;
        self
    }

    pub fn with_assertion(mut self, assertion: Assertion) -> Self {
        self.assertions.push(assertion);
        self
    }

    pub fn with_capture(mut self, var: impl Into<String>, path: impl Into<String>) -> Self {
        self.captures.push(Capture {
            var: var.into(),
            path: path.into(),
        });
        self
    }

    pub fn with_warn_if_missing(mut self, path: impl Into<String>) -> Self {
        self.warn_if_missing.push(path.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = Some(u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX));
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = Some(retry);
        self
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }
}

/// A predicate over a response
///
/// `path` is a dotted JSON path (`data.CPU model`, `items.0.id`) or a JSON
/// pointer when it starts with `/`. An empty path means the whole body.
/// Expected values may contain `{{variable}}` templates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Assertion {
    /// Status code equality, in addition to the step's `expect_status`
    Status { equals: u16 },
    /// Field equals the expected JSON value
    Equals { path: String, value: Value },
    /// String field contains a substring, or array field contains an element
    Contains { path: String, value: Value },
    /// Field is a JSON array
    IsArray {
        #[serde(default)]
        path: String,
    },
    /// Array, string or object at the path has this many elements
    Length {
        #[serde(default)]
        path: String,
        equals: usize,
    },
    /// Field exists (any value, including null)
    Present { path: String },
    /// Raw body contains a substring
    BodyContains { substring: String },
}

impl Assertion {
    pub fn equals(path: impl Into<String>, value: Value) -> Self {
        Self::Equals {
            path: path.into(),
            value,
        }
    }

    pub fn contains(path: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Contains {
            path: path.into(),
            value: value.into(),
        }
    }

    pub fn is_array(path: impl Into<String>) -> Self {
        Self::IsArray { path: path.into() }
    }

    pub fn length(path: impl Into<String>, equals: usize) -> Self {
        Self::Length {
            path: path.into(),
            equals,
        }
    }

    pub fn present(path: impl Into<String>) -> Self {
        Self::Present { path: path.into() }
    }

    /// Short description used in reports, before template resolution
    pub fn describe(&self) -> String {
        match self {
            Assertion::Status { equals } => format!("status == {}", equals),
            Assertion::Equals { path, value } => format!("{} == {}", display_path(path), value),
            Assertion::Contains { path, value } => {
                format!("{} contains {}", display_path(path), value)
            }
            Assertion::IsArray { path } => format!("{} is array", display_path(path)),
            Assertion::Length { path, equals } => {
                format!("len({}) == {}", display_path(path), equals)
            }
            Assertion::Present { path } => format!("{} is present", display_path(path)),
            Assertion::BodyContains { substring } => format!("body contains {:?}", substring),
        }
    }

    /// Expected value carrying templates, if any
    pub fn expected_value(&self) -> Option<&Value> {
        match self {
            Assertion::Equals { value, .. } | Assertion::Contains { value, .. } => Some(value),
            _ => None,
        }
    }
}

fn display_path(path: &str) -> &str {
    if path.is_empty() {
        "body"
    } else {
        path
    }
}

/// Copies a response field into the scenario context
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Capture {
    /// Context variable to set
    pub var: String,
    /// JSON path into the response body
    pub path: String,
}

/// Retry policy for transport failures
///
/// Assertion failures are never retried.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    pub max_retries: u32,
    #[serde(flatten)]
    pub backoff: Backoff,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "backoff", rename_all = "snake_case")]
pub enum Backoff {
    Fixed { delay_ms: u64 },
    /// Delay doubles after each attempt, starting at `base_ms`
    Exponential { base_ms: u64 },
}

impl RetryPolicy {
    pub fn fixed(max_retries: u32, delay: Duration) -> Self {
        Self {
            max_retries,
            backoff: Backoff::Fixed {
                delay_ms: u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            },
        }
    }

    pub fn exponential(max_retries: u32, base: Duration) -> Self {
        Self {
            max_retries,
            backoff: Backoff::Exponential {
                base_ms: u64::try_from(base.as_millis()).unwrap_or(u64::MAX),
            },
        }
    }

    /// Delay before retry number `retry` (1-based)
    pub fn delay(&self, retry: u32) -> Duration {
        match self.backoff {
            Backoff::Fixed { delay_ms } => Duration::from_millis(delay_ms),
            Backoff::Exponential { base_ms } => {
                let factor = 1u64
                    .checked_shl(retry.saturating_sub(1))
                    .unwrap_or(u64::MAX);
                Duration::from_millis(base_ms.saturating_mul(factor))
            }
        }
    }
}
