//! Step results, reports and summaries
//!
//! The executor appends one [`StepResult`] per step it attempts. A report
//! with fewer results than the scenario has steps was aborted; the last
//! result then carries the error that stopped it.

mod render;

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use serde_json::Value;

use crate::http::Method;

pub use render::{print_report, print_summary_line, to_json};

/// Outcome of one assertion
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssertionResult {
    pub description: String,
    pub passed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<AssertionFailure>,
}

impl AssertionResult {
    pub fn pass(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            passed: true,
            failure: None,
        }
    }

    pub fn fail(description: impl Into<String>, failure: AssertionFailure) -> Self {
        Self {
            description: description.into(),
            passed: false,
            failure: Some(failure),
        }
    }
}

/// Why an assertion failed
///
/// Shape problems (missing field, wrong JSON type, non-JSON body) are kept
/// apart from value mismatches.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AssertionFailure {
    Mismatch { expected: Value, actual: Value },
    MissingField { path: String },
    WrongType {
        path: String,
        expected: String,
        actual: String,
    },
    NotJson,
    /// An expected value referenced a variable missing from the context
    Unresolved { message: String },
}

impl fmt::Display for AssertionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssertionFailure::Mismatch { expected, actual } => {
                write!(f, "expected {}, got {}", expected, actual)
            }
            AssertionFailure::MissingField { path } => write!(f, "field '{}' is missing", path),
            AssertionFailure::WrongType {
                path,
                expected,
                actual,
            } => write!(f, "field '{}' is {}, expected {}", path, actual, expected),
            AssertionFailure::NotJson => f.write_str("response body is not JSON"),
            AssertionFailure::Unresolved { message } => f.write_str(message),
        }
    }
}

/// Step-level failure that stops the scenario
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepErrorKind {
    TemplateResolution,
    RequestFailed,
    Cancelled,
}

impl fmt::Display for StepErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            StepErrorKind::TemplateResolution => "template resolution failed",
            StepErrorKind::RequestFailed => "request failed",
            StepErrorKind::Cancelled => "cancelled",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepError {
    pub kind: StepErrorKind,
    pub message: String,
}

/// Outcome of running one step
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepResult {
    /// Zero-based position in the scenario
    pub index: usize,
    pub name: String,
    pub method: Method,
    /// Resolved URL, or the template when resolution failed
    pub url: String,
    pub status: Option<u16>,
    pub assertions: Vec<AssertionResult>,
    pub captured: BTreeMap<String, Value>,
    /// Warning-level observations that do not fail the step
    pub notes: Vec<String>,
    pub error: Option<StepError>,
    pub attempts: u32,
    pub duration_ms: u64,
}

impl StepResult {
    pub fn passed(&self) -> bool {
        self.error.is_none() && self.assertions.iter().all(|a| a.passed)
    }

    pub fn failed_assertions(&self) -> impl Iterator<Item = &AssertionResult> {
        self.assertions.iter().filter(|a| !a.passed)
    }
}

/// Ordered results of one scenario run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub scenario: String,
    pub total_steps: usize,
    pub results: Vec<StepResult>,
}

impl Report {
    pub fn new(scenario: impl Into<String>, total_steps: usize) -> Self {
        Self {
            scenario: scenario.into(),
            total_steps,
            results: Vec::with_capacity(total_steps),
        }
    }

    pub fn push(&mut self, result: StepResult) {
        self.results.push(result);
    }

    /// The step result that stopped the run, if any
    pub fn aborted_at(&self) -> Option<&StepResult> {
        self.results.iter().find(|r| r.error.is_some())
    }

    pub fn passed(&self) -> bool {
        self.results.len() == self.total_steps && self.results.iter().all(StepResult::passed)
    }
}

/// Per-step line of a [`Summary`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepSummary {
    pub name: String,
    pub passed: bool,
    pub passed_assertions: usize,
    pub failed_assertions: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<StepError>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<String>,
}

/// Aggregate view of a report
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub scenario: String,
    /// Assertions that passed
    pub passed_count: usize,
    /// Assertions that failed, plus one per step error
    pub failed_count: usize,
    pub overall_pass: bool,
    pub steps_run: usize,
    pub steps_total: usize,
    pub per_step: Vec<StepSummary>,
}

/// Reduce a report to counts and per-step detail
pub fn summarize(report: &Report) -> Summary {
    let mut passed_count = 0;
    let mut failed_count = 0;

    let per_step: Vec<StepSummary> = report
        .results
        .iter()
        .map(|result| {
            let passed_assertions = result.assertions.iter().filter(|a| a.passed).count();
            let failed_assertions: Vec<String> = result
                .failed_assertions()
                .map(|a| match &a.failure {
                    Some(failure) => format!("{}: {}", a.description, failure),
                    None => a.description.clone(),
                })
                .collect();

            passed_count += passed_assertions;
            failed_count += failed_assertions.len();
            if result.error.is_some() {
                failed_count += 1;
            }

            StepSummary {
                name: result.name.clone(),
                passed: result.passed(),
                passed_assertions,
                failed_assertions,
                error: result.error.clone(),
                notes: result.notes.clone(),
            }
        })
        .collect();

    Summary {
        scenario: report.scenario.clone(),
        passed_count,
        failed_count,
        overall_pass: failed_count == 0 && report.results.len() == report.total_steps,
        steps_run: report.results.len(),
        steps_total: report.total_steps,
        per_step,
    }
}
