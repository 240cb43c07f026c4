//! restprobe - scenario-driven HTTP API test runner
//!
//! A scenario is an ordered list of HTTP steps. Each step resolves its
//! URL and body templates against the scenario context, sends the request
//! through an [`http::HttpClient`], evaluates assertions, and captures
//! response fields into the context for later steps.

pub mod cli;
pub mod commands;
pub mod common;
pub mod executor;
pub mod http;
pub mod report;
pub mod scenario;

// Re-export commonly used types for tests
pub use common::{Error, Result};
pub use executor::{CancelHandle, ScenarioExecutor};
pub use report::{summarize, Report, StepResult, Summary};
pub use scenario::{Assertion, Capture, RetryPolicy, Scenario, Step};
