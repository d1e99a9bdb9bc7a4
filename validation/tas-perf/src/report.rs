//! Results reporting and formatting.

use crate::metrics::TestResults;
use comfy_table::{modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL, Table};

/// Formats test results for output.
pub struct ResultsReport;

impl ResultsReport {
    /// Format results as console tables: summary, requests, checks.
    pub fn format_table(results: &TestResults) -> String {
        let mut summary = Table::new();
        summary
            .load_preset(UTF8_FULL)
            .apply_modifier(UTF8_ROUND_CORNERS)
            .set_header(vec![format!(
                "Load Test Results: {} ({})",
                results.scenario_name, results.workflow
            )]);

        summary.add_row(vec!["Duration:", &format!("{:.1}s", results.duration_secs)]);
        summary.add_row(vec!["VUs:", &results.vus.to_string()]);
        summary.add_row(vec!["Iterations:", &results.total_iterations.to_string()]);
        summary.add_row(vec!["Pass Rate:", &format!("{:.1}%", results.pass_rate())]);
        summary.add_row(vec![
            "Iterations/sec:",
            &format!("{:.1}", results.iterations_per_second),
        ]);
        for (class, count) in &results.failures_by_class {
            summary.add_row(vec![format!("Failed ({class}):"), count.to_string()]);
        }
        if let Some(entries) = results.entries_collected {
            summary.add_row(vec!["Entries Collected:", &entries.to_string()]);
        }

        summary.add_row(vec!["", ""]);
        summary.add_row(vec!["Iteration (ms)", "p50 / p90 / p95 / p99 / max"]);
        summary.add_row(vec![
            "",
            &format!(
                "{:.1} / {:.1} / {:.1} / {:.1} / {:.1}",
                results.latency_p50,
                results.latency_p90,
                results.latency_p95,
                results.latency_p99,
                results.latency_max
            ),
        ]);

        let mut requests = Table::new();
        requests
            .load_preset(UTF8_FULL)
            .apply_modifier(UTF8_ROUND_CORNERS)
            .set_header(vec!["Request", "Count", "Errors", "Statuses", "p50 / p95 / p99 (ms)"]);
        for request in &results.requests {
            let statuses = request
                .status_counts
                .iter()
                .map(|(status, count)| format!("{status}x{count}"))
                .collect::<Vec<_>>()
                .join(" ");
            requests.add_row(vec![
                request.name.clone(),
                request.count.to_string(),
                request.transport_errors.to_string(),
                statuses,
                format!(
                    "{:.1} / {:.1} / {:.1}",
                    request.latency_p50, request.latency_p95, request.latency_p99
                ),
            ]);
        }

        let mut checks = Table::new();
        checks
            .load_preset(UTF8_FULL)
            .apply_modifier(UTF8_ROUND_CORNERS)
            .set_header(vec!["Check", "Passes", "Fails"]);
        for check in &results.checks {
            let mark = if check.fails == 0 { "✓" } else { "✗" };
            checks.add_row(vec![
                format!("{mark} {}", check.name),
                check.passes.to_string(),
                check.fails.to_string(),
            ]);
        }

        format!("{summary}\n{requests}\n{checks}")
    }

    /// Format results as JSON.
    pub fn format_json(results: &TestResults) -> anyhow::Result<String> {
        Ok(serde_json::to_string_pretty(results)?)
    }

    /// Format results as CSV row.
    pub fn format_csv(results: &TestResults) -> String {
        format!(
            "{},{},{},{:.1},{},{},{},{:.1},{:.1},{:.1},{:.1}",
            results.timestamp,
            results.scenario_name,
            results.workflow,
            results.duration_secs,
            results.total_iterations,
            results.passed_iterations,
            results.failed_iterations,
            results.iterations_per_second,
            results.latency_p50,
            results.latency_p90,
            results.latency_p99
        )
    }

    /// CSV header row.
    pub fn csv_header() -> &'static str {
        "timestamp,scenario,workflow,duration,iterations,passed,failed,ips,p50,p90,p99"
    }
}
