//! Terminal and JSON rendering of reports

use colored::Colorize;
use serde::Serialize;

use crate::common::Result;

use super::{summarize, Report, StepResult, Summary};

/// Print a report step by step, followed by its summary line
pub fn print_report(report: &Report, verbose: bool) {
    println!(
        "\n{} {}",
        "Scenario:".blue().bold(),
        report.scenario.white().bold()
    );

    for result in &report.results {
        print_step(result, verbose);
    }

    let skipped = report.total_steps.saturating_sub(report.results.len());
    if skipped > 0 {
        println!(
            "  {} {} step(s) not run",
            "-".dimmed(),
            skipped.to_string().dimmed()
        );
    }

    print_summary_line(&summarize(report));
}

fn print_step(result: &StepResult, verbose: bool) {
    let mark = if result.passed() {
        "✓".green()
    } else {
        "✗".red()
    };
    let status = result
        .status
        .map(|s| s.to_string())
        .unwrap_or_else(|| "---".to_string());

    println!(
        "  {} Step {}: {} {} {} ({}, {} ms)",
        mark,
        result.index + 1,
        result.name,
        result.method.as_str().dimmed(),
        result.url.dimmed(),
        status,
        result.duration_ms
    );

    if let Some(error) = &result.error {
        println!("      {} {}: {}", "error".red().bold(), error.kind, error.message);
    }

    for assertion in &result.assertions {
        if assertion.passed {
            if verbose {
                println!("      {} {}", "✓".green(), assertion.description.dimmed());
            }
        } else {
            let reason = assertion
                .failure
                .as_ref()
                .map(|f| f.to_string())
                .unwrap_or_default();
            println!("      {} {} ({})", "✗".red(), assertion.description, reason);
        }
    }

    for note in &result.notes {
        println!("      {} {}", "warning:".yellow(), note);
    }

    if verbose {
        for (var, value) in &result.captured {
            println!("      {} {} = {}", "captured".cyan(), var, value);
        }
        if result.attempts > 1 {
            println!("      {} {}", "attempts".cyan(), result.attempts);
        }
    }
}

/// Print the one-line verdict for a scenario
pub fn print_summary_line(summary: &Summary) {
    if summary.overall_pass {
        println!(
            "\n{} {} ({} assertions passed)\n",
            "✓".green().bold(),
            "Scenario Passed".green().bold(),
            summary.passed_count
        );
    } else {
        println!(
            "\n{} {} ({} passed, {} failed, {}/{} steps run)\n",
            "✗".red().bold(),
            "Scenario Failed".red().bold(),
            summary.passed_count,
            summary.failed_count,
            summary.steps_run,
            summary.steps_total
        );
    }
}

#[derive(Serialize)]
struct JsonEntry<'a> {
    summary: Summary,
    report: &'a Report,
}

/// Serialize reports with their summaries as a JSON array
pub fn to_json(reports: &[Report]) -> Result<String> {
    let entries: Vec<JsonEntry<'_>> = reports
        .iter()
        .map(|report| JsonEntry {
            summary: summarize(report),
            report,
        })
        .collect();
    Ok(serde_json::to_string_pretty(&entries)?)
}

#[cfg(test)]
mod tests {
    use super::super::tests::result;
    use super::super::AssertionResult;
    use super::*;

    #[test]
    fn test_to_json_includes_summary_and_results() {
        let mut report = Report::new("json", 1);
        report.push(result(0, vec![AssertionResult::pass("status == 200")]));

        let json: serde_json::Value = serde_json::from_str(&to_json(&[report]).unwrap()).unwrap();
        assert_eq!(json[0]["summary"]["overall_pass"], true);
        assert_eq!(json[0]["summary"]["passed_count"], 1);
        assert_eq!(json[0]["report"]["results"][0]["method"], "GET");
        assert_eq!(json[0]["report"]["results"][0]["status"], 200);
    }
}
