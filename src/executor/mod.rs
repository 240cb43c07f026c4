//! Scenario executor
//!
//! Runs the steps of a [`Scenario`] strictly in order against an
//! [`HttpClient`], threading captured values through a private context.
//!
//! - Template resolution failures and transport failures stop the run;
//!   the failing step is still recorded.
//! - Assertion failures are recorded and the run continues.
//! - Captures are applied whenever a response arrived, whatever the
//!   assertions said.

pub mod assertions;

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use futures_util::future::join_all;
use tokio::sync::watch;

use crate::common::{Error, Result};
use crate::http::{HttpClient, HttpRequest, HttpResponse};
use crate::report::{Report, StepError, StepErrorKind, StepResult};
use crate::scenario::template::{self, Context};
use crate::scenario::{RetryPolicy, Scenario, Step, MAX_RETRIES};

/// Cancels every run on the executor it came from
#[derive(Clone)]
pub struct CancelHandle {
    sender: Arc<watch::Sender<bool>>,
}

impl CancelHandle {
    /// Abort in-flight requests and skip remaining steps
    pub fn cancel(&self) {
        self.sender.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.sender.borrow()
    }
}

/// Executes scenarios; one executor can run many scenarios concurrently
pub struct ScenarioExecutor {
    client: Arc<dyn HttpClient>,
    cancel: Arc<watch::Sender<bool>>,
}

impl ScenarioExecutor {
    pub fn new(client: Arc<dyn HttpClient>) -> Self {
        let (sender, _) = watch::channel(false);
        Self {
            client,
            cancel: Arc::new(sender),
        }
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle {
            sender: self.cancel.clone(),
        }
    }

    fn is_cancelled(&self) -> bool {
        *self.cancel.borrow()
    }

    /// Resolves once cancellation has been requested
    async fn cancelled(&self) {
        let mut receiver = self.cancel.subscribe();
        if receiver.wait_for(|cancelled| *cancelled).await.is_err() {
            std::future::pending::<()>().await;
        }
    }

    /// Run several scenarios concurrently, each with its own context
    pub async fn run_all(&self, scenarios: &[Scenario]) -> Vec<Report> {
        join_all(scenarios.iter().map(|scenario| self.run(scenario))).await
    }

    /// Run one scenario to completion or to its first fatal step
    pub async fn run(&self, scenario: &Scenario) -> Report {
        let steps = scenario.steps();
        let mut context = scenario.initial_context();
        let mut report = Report::new(scenario.name(), steps.len());

        tracing::info!(
            "Running scenario '{}' ({} steps)",
            scenario.name(),
            steps.len()
        );

        for (index, step) in steps.iter().enumerate() {
            let result = if self.is_cancelled() {
                let mut result = blank_result(index, step, step.url.clone());
                result.error = Some(StepError {
                    kind: StepErrorKind::Cancelled,
                    message: Error::Cancelled.to_string(),
                });
                result
            } else {
                self.run_step(index, step, scenario.retry(), &mut context)
                    .await
            };

            let fatal = result.error.is_some();
            report.push(result);
            if fatal {
                tracing::warn!(
                    "Scenario '{}' stopped at step {} of {}",
                    scenario.name(),
                    index + 1,
                    steps.len()
                );
                break;
            }
        }

        report
    }

    async fn run_step(
        &self,
        index: usize,
        step: &Step,
        default_retry: Option<&RetryPolicy>,
        context: &mut Context,
    ) -> StepResult {
        let started = Instant::now();

        let request = match build_request(step, context) {
            Ok(request) => request,
            Err(e) => {
                tracing::warn!("Step {} '{}': {}", index + 1, step.name, e);
                let mut result = blank_result(index, step, step.url.clone());
                result.error = Some(StepError {
                    kind: StepErrorKind::TemplateResolution,
                    message: e.to_string(),
                });
                return result;
            }
        };

        let mut result = blank_result(index, step, request.url.clone());
        let policy = step.retry.as_ref().or(default_retry);

        let (outcome, attempts) = self.send_with_retry(request, policy).await;
        result.attempts = attempts;
        result.duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        let response = match outcome {
            Ok(response) => response,
            Err(e) => {
                let kind = match e {
                    Error::Cancelled => StepErrorKind::Cancelled,
                    _ => StepErrorKind::RequestFailed,
                };
                tracing::warn!(
                    "Step {} '{}': {} {} failed: {}",
                    index + 1,
                    step.name,
                    step.method,
                    result.url,
                    e
                );
                result.error = Some(StepError {
                    kind,
                    message: e.to_string(),
                });
                return result;
            }
        };

        tracing::info!(
            "Step {} '{}': {} {} -> {} ({} ms)",
            index + 1,
            step.name,
            step.method,
            result.url,
            response.status,
            result.duration_ms
        );
        tracing::debug!("Response headers: {:?}", response.headers);
        tracing::debug!("Response body: {}", response.body);

        result.status = Some(response.status);
        inspect_response(step, &response, context, &mut result);
        result
    }

    /// Send a request, retrying transport failures per `policy`
    ///
    /// Returns the final outcome and the number of attempts made.
    async fn send_with_retry(
        &self,
        request: HttpRequest,
        policy: Option<&RetryPolicy>,
    ) -> (Result<HttpResponse>, u32) {
        let max_retries = policy.map(|p| p.max_retries.min(MAX_RETRIES)).unwrap_or(0);
        let mut attempts = 0;

        loop {
            attempts += 1;
            let outcome = tokio::select! {
                outcome = self.client.send(request.clone()) => outcome,
                _ = self.cancelled() => Err(Error::Cancelled),
            };

            match outcome {
                Err(e) if e.is_transport() && attempts <= max_retries => {
                    let delay = policy.map(|p| p.delay(attempts)).unwrap_or_default();
                    tracing::warn!(
                        "{} {} failed ({}), retry {}/{} in {:?}",
                        request.method,
                        request.url,
                        e,
                        attempts,
                        max_retries,
                        delay
                    );
                    tokio::select! {
                        _ = tokio::time::sleep(delay) => {}
                        _ = self.cancelled() => return (Err(Error::Cancelled), attempts),
                    }
                }
                outcome => return (outcome, attempts),
            }
        }
    }
}

fn blank_result(index: usize, step: &Step, url: String) -> StepResult {
    StepResult {
        index,
        name: step.name.clone(),
        method: step.method,
        url,
        status: None,
        assertions: Vec::new(),
        captured: BTreeMap::new(),
        notes: Vec::new(),
        error: None,
        attempts: 0,
        duration_ms: 0,
    }
}

/// Evaluate assertions, note missing fields, then apply captures
fn inspect_response(
    step: &Step,
    response: &HttpResponse,
    context: &mut Context,
    result: &mut StepResult,
) {
    let json = response.json();

    result
        .assertions
        .push(assertions::check_status(step.expect_status, response));
    for assertion in &step.assertions {
        result.assertions.push(assertions::evaluate(
            assertion,
            response,
            json.as_ref(),
            context,
        ));
    }

    for path in &step.warn_if_missing {
        let present = json
            .as_ref()
            .is_some_and(|body| assertions::lookup(body, path).is_ok());
        if !present {
            let note = format!("'{}' field is missing in the response", path);
            tracing::warn!("Step '{}': {}", step.name, note);
            result.notes.push(note);
        }
    }

    for capture in &step.captures {
        let found = match json.as_ref() {
            Some(body) => assertions::lookup(body, &capture.path).map_err(|f| f.to_string()),
            None => Err("response body is not JSON".to_string()),
        };
        match found {
            Ok(value) => {
                if let Some(previous) = context.set(capture.var.clone(), value.clone()) {
                    if &previous != value {
                        tracing::debug!(
                            "Capture '{}' overwrote {} with {}",
                            capture.var,
                            previous,
                            value
                        );
                    }
                }
                result.captured.insert(capture.var.clone(), value.clone());
            }
            Err(reason) => {
                let note = format!(
                    "could not capture '{}' from '{}': {}",
                    capture.var, capture.path, reason
                );
                tracing::warn!("Step '{}': {}", step.name, note);
                result.notes.push(note);
            }
        }
    }
}

/// Resolve a step's templates against the current context
pub fn build_request(step: &Step, context: &Context) -> Result<HttpRequest> {
    let mut request = HttpRequest::new(step.method, template::resolve_str(&step.url, context)?);

    for (name, value) in &step.headers {
        request
            .headers
            .push((name.clone(), template::resolve_str(value, context)?));
    }

    if let Some(body) = &step.body {
        let body = template::resolve_value(body, context)?;
        let has_content_type = request
            .headers
            .iter()
            .any(|(name, _)| name.eq_ignore_ascii_case("content-type"));
        if !has_content_type {
            request
                .headers
                .push(("Content-Type".to_string(), "application/json".to_string()));
        }
        request.body = Some(body.to_string());
    }

    request.timeout = step.timeout();
    Ok(request)
}
