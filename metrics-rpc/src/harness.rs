//! Concurrent client harness.
//!
//! Fans out `workers` independent tasks, each issuing `invocations` rounds of
//! `echo -> compute -> get_time` against the service, waits for all of them
//! within a bounded interval, and then reads the final metrics report.

use std::{ops::ControlFlow, time::Duration};

use tokio::{task::JoinSet, time::Instant};
use tracing::{error, info, warn};

use crate::{
    client::ServiceClient,
    error::{CallError, HarnessError},
    metrics::{Invocation, MetricsReport},
    operation::Operation,
    transport::Transport,
};

/// Shape of one harness run.
#[derive(Clone, Debug)]
pub struct HarnessConfig {
    /// Concurrent workers.
    pub workers: usize,
    /// Sequential rounds per worker.
    pub invocations: usize,
    /// Pause between rounds of one worker.
    pub think_time: Duration,
    /// Bound on a single call.
    pub call_timeout: Duration,
    /// Bound on the wait for every worker to finish.
    pub completion_timeout: Duration,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            workers: 5,
            invocations: 3,
            think_time: Duration::from_millis(100),
            call_timeout: Duration::from_secs(10),
            completion_timeout: Duration::from_secs(60),
        }
    }
}

impl HarnessConfig {
    /// Rejects zero workers, rounds or timeouts.
    pub fn validate(&self) -> Result<(), HarnessError> {
        if self.workers == 0 {
            return Err(HarnessError::InvalidConfig("workers must be positive".into()));
        }
        if self.invocations == 0 {
            return Err(HarnessError::InvalidConfig(
                "invocations must be positive".into(),
            ));
        }
        if self.call_timeout.is_zero() || self.completion_timeout.is_zero() {
            return Err(HarnessError::InvalidConfig("timeouts must be non-zero".into()));
        }
        Ok(())
    }

    /// Calls of each kind the run issues when nothing fails.
    pub fn expected_per_kind(&self) -> u64 {
        (self.workers * self.invocations) as u64
    }
}

/// Calls of each kind that reached the service, as seen by one worker.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct CallTally {
    pub time: u64,
    pub echo: u64,
    pub compute: u64,
}

impl CallTally {
    fn increment(&mut self, kind: Invocation) {
        match kind {
            Invocation::Time => self.time += 1,
            Invocation::Echo => self.echo += 1,
            Invocation::Compute => self.compute += 1,
        }
    }

    /// Count recorded for `kind`.
    pub fn get(&self, kind: Invocation) -> u64 {
        match kind {
            Invocation::Time => self.time,
            Invocation::Echo => self.echo,
            Invocation::Compute => self.compute,
        }
    }
}

/// What one worker got through before finishing or giving up.
#[derive(Clone, Debug)]
pub struct WorkerOutcome {
    pub worker: usize,
    pub rounds_completed: usize,
    /// Calls answered by the service, successfully or with an application error.
    pub answered: CallTally,
    pub errors: Vec<(Invocation, CallError)>,
}

impl WorkerOutcome {
    fn new(worker: usize) -> Self {
        Self {
            worker,
            rounds_completed: 0,
            answered: CallTally::default(),
            errors: Vec::new(),
        }
    }

    /// Records one call's result; breaks when the worker cannot go on.
    fn record<V>(&mut self, kind: Invocation, result: Result<V, CallError>) -> ControlFlow<()> {
        match result {
            Ok(_) => {
                self.answered.increment(kind);
                ControlFlow::Continue(())
            }
            Err(err) => {
                warn!(worker = self.worker, %kind, %err, "call failed");
                let flow = match &err {
                    CallError::Remote(_) => {
                        self.answered.increment(kind);
                        ControlFlow::Continue(())
                    }
                    CallError::TransportUnavailable(_) => ControlFlow::Break(()),
                    CallError::TimeoutExceeded(_) | CallError::UnexpectedReply { .. } => {
                        ControlFlow::Continue(())
                    }
                };
                self.errors.push((kind, err));
                flow
            }
        }
    }
}

/// Per-worker outcomes and the metrics read after every worker finished.
#[derive(Clone, Debug)]
pub struct HarnessReport {
    pub config: HarnessConfig,
    pub outcomes: Vec<WorkerOutcome>,
    pub metrics: MetricsReport,
    pub elapsed: Duration,
}

impl HarnessReport {
    /// Calls of `kind` answered by the service across all workers.
    pub fn answered(&self, kind: Invocation) -> u64 {
        self.outcomes.iter().map(|o| o.answered.get(kind)).sum()
    }

    /// Errors recorded across all workers.
    pub fn failed_calls(&self) -> usize {
        self.outcomes.iter().map(|o| o.errors.len()).sum()
    }

    /// Checks that no answered call is missing from the service's counters.
    pub fn verify(&self) -> Result<(), HarnessError> {
        for kind in Invocation::ALL {
            let observed = self.metrics.count(kind);
            let expected_at_least = self.answered(kind);
            if observed < expected_at_least {
                return Err(HarnessError::InconsistentMetrics {
                    kind,
                    observed,
                    expected_at_least,
                });
            }
        }
        Ok(())
    }

    /// Whether every counter equals `workers * invocations`.
    pub fn is_exact(&self) -> bool {
        let expected = self.config.expected_per_kind();
        Invocation::ALL
            .iter()
            .all(|kind| self.metrics.count(*kind) == expected)
    }
}

/// Runs the harness against `transport` and returns the final report.
pub async fn run<T>(transport: T, config: &HarnessConfig) -> Result<HarnessReport, HarnessError>
where
    T: Transport + Clone + 'static,
{
    config.validate()?;

    let client = ServiceClient::new(transport, config.call_timeout);
    let started = Instant::now();
    let deadline = started + config.completion_timeout;

    let mut workers = JoinSet::new();
    for worker in 1..=config.workers {
        workers.spawn(run_worker(
            worker,
            client.clone(),
            config.invocations,
            config.think_time,
        ));
    }
    info!(
        workers = config.workers,
        invocations = config.invocations,
        "started concurrent workers"
    );

    let mut outcomes = Vec::with_capacity(config.workers);
    while !workers.is_empty() {
        match tokio::time::timeout_at(deadline, workers.join_next()).await {
            Ok(Some(Ok(outcome))) => outcomes.push(outcome),
            Ok(Some(Err(err))) => {
                workers.abort_all();
                return Err(HarnessError::WorkerFailed(err.to_string()));
            }
            Ok(None) => break,
            Err(_) => {
                let outstanding = workers.len();
                workers.abort_all();
                error!(outstanding, "workers did not complete in time");
                return Err(HarnessError::TimeoutExceeded {
                    outstanding,
                    waited: config.completion_timeout,
                });
            }
        }
    }
    outcomes.sort_by_key(|outcome| outcome.worker);
    let elapsed = started.elapsed();
    info!(?elapsed, "all workers finished");

    let metrics = client.get_metrics_report().await?;
    Ok(HarnessReport {
        config: config.clone(),
        outcomes,
        metrics,
        elapsed,
    })
}

async fn run_worker<T: Transport>(
    worker: usize,
    client: ServiceClient<T>,
    invocations: usize,
    think_time: Duration,
) -> WorkerOutcome {
    let mut outcome = WorkerOutcome::new(worker);

    for round in 1..=invocations {
        let message = format!("call {round} from worker-{worker}");
        let echoed = client.echo(&message).await;
        if let Ok(reply) = &echoed {
            info!(worker, round, %reply, "echo");
        }
        if outcome.record(Invocation::Echo, echoed).is_break() {
            break;
        }

        let scale = round as f64;
        let op = Operation::sum(scale * 10.0, scale * 5.0);
        let computed = client.compute(op).await;
        if let Ok(value) = &computed {
            info!(worker, round, operation = %op, value, "compute");
        }
        if outcome.record(Invocation::Compute, computed).is_break() {
            break;
        }

        let time = client.get_time().await;
        if outcome.record(Invocation::Time, time).is_break() {
            break;
        }

        outcome.rounds_completed = round;
        if !think_time.is_zero() {
            tokio::time::sleep(think_time).await;
        }
    }

    outcome
}
