//! Load test orchestration with controlled concurrency.

use std::future::pending;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::{Mutex, Semaphore};
use tokio::time::sleep_until;
use tracing::{debug, info};

use crate::config::TestConfig;
use crate::metrics::{IterationOutcome, MetricsCollector, TestResults};
use crate::trace::IterationTrace;

/// One kind of iteration the runner can drive.
///
/// Implementations hold only state that is shared read-only across
/// iterations; each iteration gets its own [`IterationTrace`].
#[async_trait]
pub trait Workflow: Send + Sync + 'static {
    fn name(&self) -> &'static str;

    /// Run iteration number `iteration` to completion.
    async fn iterate(&self, iteration: u64, trace: &mut IterationTrace) -> IterationOutcome;
}

/// Executes a workflow with up to `vus` iterations in flight.
pub struct LoadRunner {
    config: TestConfig,
}

impl LoadRunner {
    /// Create a new load runner.
    pub fn new(config: TestConfig) -> Self {
        Self { config }
    }

    /// Run the load test until the duration elapses or the iteration cap
    /// is reached, whichever comes first. In-flight iterations always finish.
    pub async fn run<W: Workflow>(&self, workflow: Arc<W>) -> anyhow::Result<TestResults> {
        let vus = self.config.vus;
        let warmup_duration = Duration::from_secs(self.config.warmup_secs);
        let start_time = Instant::now();

        let deadline = self
            .config
            .duration_secs
            .map(|secs| tokio::time::Instant::from_std(start_time + warmup_duration + Duration::from_secs(secs)));
        let deadline = async move {
            match deadline {
                Some(deadline) => sleep_until(deadline).await,
                None => pending::<()>().await,
            }
        };
        tokio::pin!(deadline);

        info!(
            scenario = %self.config.name,
            workflow = workflow.name(),
            vus,
            duration_secs = ?self.config.duration_secs,
            iterations = ?self.config.iterations,
            warmup_secs = self.config.warmup_secs,
            "Starting load test"
        );

        let pb = self.progress_bar()?;

        // Shared state
        let metrics = Arc::new(Mutex::new(MetricsCollector::new()));
        let semaphore = Arc::new(Semaphore::new(vus as usize));

        let mut started = 0u64;
        let mut warmup_complete = warmup_duration.is_zero();
        let mut measure_start = start_time;

        loop {
            if let Some(max) = self.config.iterations {
                if started >= max {
                    break;
                }
            }

            let permit = tokio::select! {
                biased;
                _ = &mut deadline => break,
                permit = semaphore.clone().acquire_owned() => permit?,
            };

            if !warmup_complete && start_time.elapsed() >= warmup_duration {
                warmup_complete = true;
                measure_start = Instant::now();
                pb.set_message("Test phase");
                // Reset metrics after warmup
                *metrics.lock().await = MetricsCollector::new();
            }

            let iteration = started;
            started += 1;

            let workflow = workflow.clone();
            let metrics = metrics.clone();
            let pb = pb.clone();
            let in_warmup = !warmup_complete;

            tokio::spawn(async move {
                let mut trace = IterationTrace::new();
                let iteration_start = Instant::now();
                let outcome = workflow.iterate(iteration, &mut trace).await;
                let latency_us = iteration_start.elapsed().as_micros() as u64;

                // Record metrics (skip during warmup)
                if !in_warmup {
                    metrics
                        .lock()
                        .await
                        .record_iteration(&trace, latency_us, outcome);
                }
                debug!(iteration, ?outcome, latency_us, "Iteration finished");

                pb.inc(1);
                drop(permit);
            });
        }

        // Wait for all in-flight iterations to complete
        pb.set_message("Waiting for in-flight iterations...");
        let _all = semaphore.acquire_many(vus).await?;
        pb.finish_with_message("Complete!");

        let elapsed = measure_start.elapsed();
        info!(started, elapsed_secs = elapsed.as_secs_f64(), "Load test finished");

        let m = metrics.lock().await;
        Ok(m.results(
            self.config.name.clone(),
            workflow.name().to_string(),
            vus,
            elapsed,
        ))
    }

    /// Counts iterations against the cap, or just counts when only a duration is set.
    fn progress_bar(&self) -> anyhow::Result<ProgressBar> {
        let pb = match self.config.iterations {
            Some(total) => {
                let pb = ProgressBar::new(total);
                pb.set_style(
                    ProgressStyle::default_bar()
                        .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")?
                        .progress_chars("##-"),
                );
                pb
            }
            None => {
                let pb = ProgressBar::new_spinner();
                pb.set_style(
                    ProgressStyle::default_spinner()
                        .template("[{elapsed_precise}] {spinner} {pos} iterations {msg}")?,
                );
                pb.enable_steady_tick(Duration::from_millis(200));
                pb
            }
        };
        if self.config.warmup_secs > 0 {
            pb.set_message(format!("Warmup ({}s)", self.config.warmup_secs));
        }
        Ok(pb)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
    use tas_protocol::FailureClass;

    /// Records concurrency and fails every third iteration.
    struct CountingWorkflow {
        calls: AtomicU64,
        in_flight: AtomicU32,
        max_in_flight: AtomicU32,
        delay: Duration,
    }

    impl CountingWorkflow {
        fn new(delay: Duration) -> Self {
            Self {
                calls: AtomicU64::new(0),
                in_flight: AtomicU32::new(0),
                max_in_flight: AtomicU32::new(0),
                delay,
            }
        }
    }

    #[async_trait]
    impl Workflow for CountingWorkflow {
        fn name(&self) -> &'static str {
            "counting"
        }

        async fn iterate(&self, iteration: u64, trace: &mut IterationTrace) -> IterationOutcome {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);

            tokio::time::sleep(self.delay).await;
            trace.record_request("Counting_Step", Some(200), self.delay);
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            if iteration % 3 == 2 {
                IterationOutcome::Failed(FailureClass::ServiceAssertion)
            } else {
                IterationOutcome::Passed
            }
        }
    }

    fn config(vus: u32, iterations: Option<u64>, duration_secs: Option<u64>) -> TestConfig {
        TestConfig {
            name: "runner-test".to_string(),
            vus,
            iterations,
            duration_secs,
            ..TestConfig::default()
        }
    }

    #[tokio::test]
    async fn test_iteration_cap_is_exact() {
        let workflow = Arc::new(CountingWorkflow::new(Duration::from_millis(5)));
        let runner = LoadRunner::new(config(4, Some(9), None));

        let results = runner.run(workflow.clone()).await.unwrap();

        assert_eq!(workflow.calls.load(Ordering::SeqCst), 9);
        assert_eq!(results.total_iterations, 9);
        assert_eq!(results.passed_iterations, 6);
        assert_eq!(results.failed_iterations, 3);
        assert_eq!(results.workflow, "counting");
        assert_eq!(results.requests[0].count, 9);
    }

    #[tokio::test]
    async fn test_concurrency_never_exceeds_vus() {
        let workflow = Arc::new(CountingWorkflow::new(Duration::from_millis(20)));
        let runner = LoadRunner::new(config(3, Some(12), None));

        runner.run(workflow.clone()).await.unwrap();

        let max = workflow.max_in_flight.load(Ordering::SeqCst);
        assert!(max <= 3, "max in flight was {max}");
        assert!(max >= 2);
    }

    #[tokio::test]
    async fn test_duration_bounds_the_run() {
        let workflow = Arc::new(CountingWorkflow::new(Duration::from_millis(50)));
        let runner = LoadRunner::new(config(2, None, Some(1)));

        let started = Instant::now();
        let results = runner.run(workflow.clone()).await.unwrap();

        assert!(started.elapsed() < Duration::from_secs(3));
        assert!(results.total_iterations > 0);
        assert_eq!(
            results.total_iterations,
            workflow.calls.load(Ordering::SeqCst)
        );
    }
}
