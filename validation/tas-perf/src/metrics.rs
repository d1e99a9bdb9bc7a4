//! Metrics collection and statistics.

use std::collections::BTreeMap;
use std::time::Duration;

use hdrhistogram::Histogram;
use serde::{Deserialize, Serialize};
use tas_protocol::{FailureClass, TasResult};

use crate::trace::IterationTrace;

/// Pass/fail classification of one iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IterationOutcome {
    Passed,
    Failed(FailureClass),
}

impl IterationOutcome {
    pub fn from_result<T>(result: &TasResult<T>) -> Self {
        match result {
            Ok(_) => IterationOutcome::Passed,
            Err(e) => IterationOutcome::Failed(e.class()),
        }
    }
}

fn new_histogram() -> Histogram<u64> {
    Histogram::new(3).expect("Failed to create histogram")
}

/// Latency and status counts for one request tag.
struct RequestStats {
    histogram: Histogram<u64>,
    count: u64,
    transport_errors: u64,
    status_counts: BTreeMap<u16, u64>,
}

impl RequestStats {
    fn new() -> Self {
        Self {
            histogram: new_histogram(),
            count: 0,
            transport_errors: 0,
            status_counts: BTreeMap::new(),
        }
    }
}

#[derive(Default)]
struct CheckStats {
    passes: u64,
    fails: u64,
}

/// Collects metrics during load test execution.
pub struct MetricsCollector {
    iteration_histogram: Histogram<u64>,
    iterations_total: u64,
    iterations_passed: u64,
    iterations_failed: u64,
    failures_by_class: BTreeMap<FailureClass, u64>,
    requests: BTreeMap<&'static str, RequestStats>,
    checks: BTreeMap<&'static str, CheckStats>,
}

impl MetricsCollector {
    /// Create a new metrics collector.
    pub fn new() -> Self {
        Self {
            iteration_histogram: new_histogram(),
            iterations_total: 0,
            iterations_passed: 0,
            iterations_failed: 0,
            failures_by_class: BTreeMap::new(),
            requests: BTreeMap::new(),
            checks: BTreeMap::new(),
        }
    }

    /// Record a finished iteration together with everything it observed.
    pub fn record_iteration(
        &mut self,
        trace: &IterationTrace,
        latency_us: u64,
        outcome: IterationOutcome,
    ) {
        self.iterations_total += 1;
        self.iteration_histogram.record(latency_us).ok();

        match outcome {
            IterationOutcome::Passed => self.iterations_passed += 1,
            IterationOutcome::Failed(class) => {
                self.iterations_failed += 1;
                *self.failures_by_class.entry(class).or_default() += 1;
            }
        }

        for sample in trace.requests() {
            let stats = self
                .requests
                .entry(sample.name)
                .or_insert_with(RequestStats::new);
            stats.count += 1;
            stats.histogram.record(sample.latency.as_micros() as u64).ok();
            match sample.status {
                Some(status) => *stats.status_counts.entry(status).or_default() += 1,
                None => stats.transport_errors += 1,
            }
        }

        for check in trace.checks() {
            let stats = self.checks.entry(check.name).or_default();
            if check.passed {
                stats.passes += 1;
            } else {
                stats.fails += 1;
            }
        }
    }

    /// Generate final test results for a run that lasted `elapsed`.
    pub fn results(
        &self,
        scenario_name: String,
        workflow: String,
        vus: u32,
        elapsed: Duration,
    ) -> TestResults {
        let duration_secs = elapsed.as_secs_f64();
        let ips = if duration_secs > 0.0 {
            self.iterations_total as f64 / duration_secs
        } else {
            0.0
        };

        let requests = self
            .requests
            .iter()
            .map(|(name, stats)| RequestSummary {
                name: name.to_string(),
                count: stats.count,
                transport_errors: stats.transport_errors,
                status_counts: stats.status_counts.clone(),
                latency_p50: ms(stats.histogram.value_at_percentile(50.0)),
                latency_p95: ms(stats.histogram.value_at_percentile(95.0)),
                latency_p99: ms(stats.histogram.value_at_percentile(99.0)),
                latency_max: ms(stats.histogram.max()),
                latency_avg: stats.histogram.mean() / 1000.0,
            })
            .collect();

        let checks = self
            .checks
            .iter()
            .map(|(name, stats)| CheckSummary {
                name: name.to_string(),
                passes: stats.passes,
                fails: stats.fails,
            })
            .collect();

        let failures_by_class = self
            .failures_by_class
            .iter()
            .map(|(class, count)| (class.as_str().to_string(), *count))
            .collect();

        let h = &self.iteration_histogram;
        TestResults {
            timestamp: chrono::Utc::now().to_rfc3339(),
            scenario_name,
            workflow,
            duration_secs,
            vus,
            total_iterations: self.iterations_total,
            passed_iterations: self.iterations_passed,
            failed_iterations: self.iterations_failed,
            iterations_per_second: ips,
            failures_by_class,
            latency_p50: ms(h.value_at_percentile(50.0)),
            latency_p90: ms(h.value_at_percentile(90.0)),
            latency_p95: ms(h.value_at_percentile(95.0)),
            latency_p99: ms(h.value_at_percentile(99.0)),
            latency_min: ms(h.min()),
            latency_max: ms(h.max()),
            latency_avg: h.mean() / 1000.0,
            requests,
            checks,
            entries_collected: None,
        }
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

fn ms(us: u64) -> f64 {
    us as f64 / 1000.0
}

/// Final test results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestResults {
    pub timestamp: String,
    pub scenario_name: String,
    pub workflow: String,
    pub duration_secs: f64,
    pub vus: u32,
    pub total_iterations: u64,
    pub passed_iterations: u64,
    pub failed_iterations: u64,
    pub iterations_per_second: f64,
    pub failures_by_class: BTreeMap<String, u64>,

    // Iteration latency percentiles (ms)
    pub latency_p50: f64,
    pub latency_p90: f64,
    pub latency_p95: f64,
    pub latency_p99: f64,
    pub latency_min: f64,
    pub latency_max: f64,
    pub latency_avg: f64,

    pub requests: Vec<RequestSummary>,
    pub checks: Vec<CheckSummary>,

    /// Entry identifiers collected in data-generation mode.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entries_collected: Option<u64>,
}

impl TestResults {
    /// Percentage of iterations that passed; 0 for an empty run.
    pub fn pass_rate(&self) -> f64 {
        if self.total_iterations == 0 {
            0.0
        } else {
            (self.passed_iterations as f64 / self.total_iterations as f64) * 100.0
        }
    }
}

/// Per request tag.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestSummary {
    pub name: String,
    pub count: u64,
    pub transport_errors: u64,
    pub status_counts: BTreeMap<u16, u64>,
    pub latency_p50: f64,
    pub latency_p95: f64,
    pub latency_p99: f64,
    pub latency_max: f64,
    pub latency_avg: f64,
}

/// Per named check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckSummary {
    pub name: String,
    pub passes: u64,
    pub fails: u64,
}
